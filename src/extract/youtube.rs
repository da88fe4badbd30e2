use color_eyre::eyre::{Context, Result, eyre};
use serde::Deserialize;
use tokio::process::Command;

use crate::records::{Source, Uploader};

use super::{Extraction, PlaylistDescriptor, TrackDescriptor};

/* ---------- yt-dlp JSON dump (subset) ---------- */

#[derive(Debug, Deserialize)]
struct YtPlaylist {
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    #[serde(default)]
    thumbnails: Vec<YtThumbnail>,
    #[serde(default)]
    entries: Vec<Option<YtEntry>>,
}

#[derive(Debug, Deserialize)]
struct YtThumbnail {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YtEntry {
    id: Option<String>,
    title: Option<String>,
    uploader: Option<String>,
    channel_id: Option<String>,
    channel_url: Option<String>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    description: Option<String>,
    webpage_url: Option<String>,
}

/// Extract a YouTube playlist via a `yt-dlp -J` dump.
pub async fn extract_playlist(url: &str) -> Result<Option<Extraction>> {
    if which::which("yt-dlp").is_err() {
        return Err(eyre!(
            "yt-dlp not found in PATH. Please install yt-dlp and ensure it's available."
        ));
    }

    log::info!("Retrieving YouTube playlist data via yt-dlp...");
    let output = Command::new("yt-dlp")
        .arg("-J")
        .arg(url)
        .output()
        .await
        .wrap_err("Failed to run yt-dlp")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(eyre!("yt-dlp failed for {}: {}", url, stderr.trim()));
    }

    let playlist: YtPlaylist = serde_json::from_slice(&output.stdout)
        .wrap_err("Failed to parse yt-dlp JSON output")?;

    let entries: Vec<YtEntry> = playlist.entries.into_iter().flatten().collect();
    if entries.is_empty() {
        log::warn!("No tracks found in the playlist.");
        return Ok(None);
    }

    let descriptor = PlaylistDescriptor {
        source: Source::YouTube,
        link: playlist
            .id
            .as_deref()
            .map(|id| format!("https://www.youtube.com/playlist?list={}", id)),
        external_id: playlist.id,
        name: playlist.title,
        description: playlist.description,
        // yt-dlp orders thumbnails small to large; take the largest.
        thumbnail: playlist.thumbnails.into_iter().next_back().and_then(|t| t.url),
    };

    let mut tracks = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(url) = entry.webpage_url else {
            log::warn!(
                "Skipping playlist entry without a page URL: {:?}",
                entry.title
            );
            continue;
        };
        tracks.push(TrackDescriptor {
            source: Source::YouTube,
            external_id: entry.id,
            url,
            title: entry.title,
            uploader: Uploader {
                name: entry.uploader,
                id: entry.channel_id,
                url: entry.channel_url,
            },
            thumbnail: entry.thumbnail,
            duration: entry.duration.map(|d| d.round() as u32),
            description: entry.description,
            lyrics: None,
        });
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_parses_with_null_entries() {
        let dump = serde_json::json!({
            "id": "PL123",
            "title": "Mix",
            "thumbnails": [{"url": "https://i.ytimg.com/small.jpg"}, {"url": "https://i.ytimg.com/large.jpg"}],
            "entries": [
                null,
                {
                    "id": "v1",
                    "title": "First",
                    "uploader": "Chan",
                    "channel_id": "UC1",
                    "channel_url": "https://www.youtube.com/channel/UC1",
                    "duration": 213.4,
                    "webpage_url": "https://www.youtube.com/watch?v=v1"
                }
            ]
        });

        let playlist: YtPlaylist = serde_json::from_value(dump).unwrap();
        let entries: Vec<YtEntry> = playlist.entries.into_iter().flatten().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].duration.map(|d| d.round() as u32), Some(213));
    }
}
