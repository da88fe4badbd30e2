use std::collections::HashMap;
use std::time::Duration;

use color_eyre::eyre::{Context, Result, eyre};
use reqwest::Client;
use serde::Deserialize;

use crate::records::{Source, Uploader};

use super::{Extraction, PlaylistDescriptor, TrackDescriptor};

const API_BASE: &str = "https://api-v2.soundcloud.com";

/// SoundCloud caps `/tracks?ids=` lookups at 50 ids per request.
const TRACK_LOOKUP_CHUNK: usize = 50;

/* ---------- api-v2 response shapes (subset) ---------- */

#[derive(Debug, Deserialize)]
struct ScPlaylist {
    id: u64,
    title: Option<String>,
    description: Option<String>,
    artwork_url: Option<String>,
    permalink_url: Option<String>,
    secret_token: Option<String>,
    #[serde(default)]
    tracks: Vec<ScTrackEntry>,
}

/// Playlist entries past the first page come back as id-only stubs that have
/// to be re-fetched through the `/tracks` endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScTrackEntry {
    Full(ScTrack),
    Stub(ScTrackStub),
}

#[derive(Debug, Deserialize)]
struct ScTrack {
    id: u64,
    title: Option<String>,
    /// Milliseconds.
    duration: Option<u64>,
    description: Option<String>,
    artwork_url: Option<String>,
    permalink_url: String,
    user: ScUser,
}

#[derive(Debug, Deserialize)]
struct ScUser {
    id: u64,
    username: Option<String>,
    permalink_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScTrackStub {
    id: u64,
}

/// Extract a SoundCloud playlist through the api-v2 resolve endpoint.
pub async fn extract_playlist(url: &str, client_id: Option<&str>) -> Result<Option<Extraction>> {
    let client_id = client_id.ok_or_else(|| {
        eyre!("SoundCloud playlists need a client_id; add a [soundcloud] section to the config")
    })?;

    let client = Client::new();

    log::info!("Resolving SoundCloud playlist...");
    let resolve_url = format!(
        "{}/resolve?url={}&client_id={}",
        API_BASE,
        urlencoding::encode(url),
        urlencoding::encode(client_id)
    );
    let playlist = client
        .get(resolve_url)
        .timeout(Duration::from_secs(30))
        .send()
        .await?
        .error_for_status()?
        .json::<ScPlaylist>()
        .await
        .wrap_err("Failed to deserialize SoundCloud resolve response")?;

    if playlist.tracks.is_empty() {
        log::warn!("No tracks found in the playlist.");
        return Ok(None);
    }

    let descriptor = PlaylistDescriptor {
        source: Source::SoundCloud,
        external_id: Some(playlist.id.to_string()),
        link: playlist.permalink_url.clone(),
        name: playlist.title.clone(),
        description: playlist.description.clone(),
        thumbnail: playlist.artwork_url.clone(),
    };

    // Re-fetch id-only stubs, then reassemble in playlist order.
    let stub_ids: Vec<u64> = playlist
        .tracks
        .iter()
        .filter_map(|entry| match entry {
            ScTrackEntry::Stub(stub) => Some(stub.id),
            ScTrackEntry::Full(_) => None,
        })
        .collect();
    let mut fetched = fetch_tracks_by_id(
        &client,
        client_id,
        &stub_ids,
        playlist.id,
        playlist.secret_token.as_deref(),
    )
    .await?;

    let mut tracks = Vec::with_capacity(playlist.tracks.len());
    for entry in playlist.tracks {
        let track = match entry {
            ScTrackEntry::Full(track) => track,
            ScTrackEntry::Stub(stub) => match fetched.remove(&stub.id) {
                Some(track) => track,
                None => {
                    log::warn!("Track {} missing from the /tracks lookup, skipping", stub.id);
                    continue;
                }
            },
        };
        tracks.push(track_descriptor(track));
    }

    if tracks.is_empty() {
        log::warn!("No tracks found in the playlist.");
        return Ok(None);
    }

    Ok(Some(Extraction {
        playlist: descriptor,
        tracks,
    }))
}

async fn fetch_tracks_by_id(
    client: &Client,
    client_id: &str,
    ids: &[u64],
    playlist_id: u64,
    secret_token: Option<&str>,
) -> Result<HashMap<u64, ScTrack>> {
    let mut tracks = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(TRACK_LOOKUP_CHUNK) {
        let ids_param = chunk
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut lookup_url = format!(
            "{}/tracks?ids={}&client_id={}",
            API_BASE,
            ids_param,
            urlencoding::encode(client_id)
        );
        // Secret playlists only expose their tracks when the lookup names them.
        if let Some(token) = secret_token {
            lookup_url.push_str(&format!(
                "&playlistId={}&playlistSecretToken={}",
                playlist_id,
                urlencoding::encode(token)
            ));
        }

        let page = client
            .get(lookup_url)
            .timeout(Duration::from_secs(30))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<ScTrack>>()
            .await
            .wrap_err("Failed to deserialize SoundCloud tracks response")?;

        for track in page {
            tracks.insert(track.id, track);
        }
    }
    Ok(tracks)
}

fn track_descriptor(track: ScTrack) -> TrackDescriptor {
    TrackDescriptor {
        source: Source::SoundCloud,
        external_id: Some(track.id.to_string()),
        url: track.permalink_url,
        title: track.title,
        uploader: Uploader {
            name: track.user.username,
            id: Some(track.user.id.to_string()),
            url: track.user.permalink_url,
        },
        thumbnail: track.artwork_url,
        duration: track.duration.map(|ms| (ms / 1000) as u32),
        description: track.description,
        lyrics: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_entries_split_into_full_and_stub() {
        let playlist: ScPlaylist = serde_json::from_value(serde_json::json!({
            "id": 9000,
            "title": "Likes",
            "permalink_url": "https://soundcloud.com/user/sets/likes",
            "tracks": [
                {
                    "id": 1,
                    "title": "Full Track",
                    "duration": 184_500,
                    "permalink_url": "https://soundcloud.com/a/full-track",
                    "user": {"id": 7, "username": "a", "permalink_url": "https://soundcloud.com/a"}
                },
                {"id": 2, "kind": "track", "monetization_model": "NOT_APPLICABLE"}
            ]
        }))
        .unwrap();

        assert!(matches!(playlist.tracks[0], ScTrackEntry::Full(_)));
        assert!(matches!(playlist.tracks[1], ScTrackEntry::Stub(ScTrackStub { id: 2 })));
    }

    #[test]
    fn durations_convert_from_millis_to_whole_seconds() {
        let track = ScTrack {
            id: 1,
            title: Some("t".into()),
            duration: Some(184_500),
            description: None,
            artwork_url: None,
            permalink_url: "https://soundcloud.com/a/t".into(),
            user: ScUser {
                id: 7,
                username: Some("a".into()),
                permalink_url: None,
            },
        };

        let descriptor = track_descriptor(track);
        assert_eq!(descriptor.duration, Some(184));
        assert_eq!(descriptor.external_id.as_deref(), Some("1"));
        assert_eq!(descriptor.uploader.id.as_deref(), Some("7"));
    }
}
