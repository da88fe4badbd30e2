use serde::{Deserialize, Serialize};

use crate::extract::{PlaylistDescriptor, TrackDescriptor};

/// Collection NSIDs for the three record types kept in the user's repository.
pub const PLAYLIST_COLLECTION: &str = "dev.dreary.tunes.playlist";
pub const TRACK_COLLECTION: &str = "dev.dreary.tunes.track";
pub const PLAYLIST_ITEM_COLLECTION: &str = "dev.dreary.tunes.playlistitem";

/* ---------- Source platforms ---------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    Bandcamp,
    SoundCloud,
    YouTube,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Bandcamp => write!(f, "Bandcamp"),
            Source::SoundCloud => write!(f, "SoundCloud"),
            Source::YouTube => write!(f, "YouTube"),
        }
    }
}

/* ---------- Playlist records ---------- */

/// Identity triple that deduplicates playlist records across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistReference {
    pub source: Source,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    #[serde(rename = "$type")]
    pub record_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "createdAt")]
    pub created_at: String,

    pub reference: PlaylistReference,
}

impl PlaylistRecord {
    pub fn from_descriptor(descriptor: &PlaylistDescriptor, created_at: &str) -> Self {
        Self {
            record_type: PLAYLIST_COLLECTION.to_string(),
            thumbnail: descriptor.thumbnail.clone(),
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            created_at: created_at.to_string(),
            reference: PlaylistReference {
                source: descriptor.source,
                link: descriptor.link.clone(),
                id: descriptor.external_id.clone(),
            },
        }
    }
}

/* ---------- Track records ---------- */

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Uploader {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    #[serde(rename = "$type")]
    pub record_type: String,

    #[serde(default)]
    pub title: Option<String>,

    pub uploader: Uploader,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default)]
    pub duration: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,

    /// Canonical page URL on the source platform; the track identity key.
    pub url: String,

    #[serde(default)]
    pub id: Option<String>,

    pub source: Source,

    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl TrackRecord {
    pub fn from_descriptor(descriptor: &TrackDescriptor, created_at: &str) -> Self {
        Self {
            record_type: TRACK_COLLECTION.to_string(),
            title: descriptor.title.clone(),
            uploader: descriptor.uploader.clone(),
            thumbnail: descriptor.thumbnail.clone(),
            duration: descriptor.duration,
            description: descriptor.description.clone(),
            lyrics: descriptor.lyrics.clone(),
            url: descriptor.url.clone(),
            id: descriptor.external_id.clone(),
            source: descriptor.source,
            created_at: created_at.to_string(),
        }
    }
}

/* ---------- Playlist item records ---------- */

/// Linked-list pointers carried on every playlist item. Both sides hold the
/// *track* URI of the adjacent item, not the sibling item's own URI.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemNodes {
    #[serde(rename = "previousUri", default)]
    pub previous_uri: Option<String>,

    #[serde(rename = "nextUri", default)]
    pub next_uri: Option<String>,
}

/// Ordering primitive: one record per (playlist, track) pair. The only field
/// ever rewritten after creation is the old tail's `nodes.nextUri`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItemRecord {
    #[serde(rename = "$type")]
    pub record_type: String,

    /// URI of the owning playlist record.
    pub playlist: String,

    /// URI of the referenced track record.
    pub track: String,

    #[serde(rename = "createdAt")]
    pub created_at: String,

    #[serde(default)]
    pub nodes: ItemNodes,
}

impl PlaylistItemRecord {
    pub fn new(
        playlist: &str,
        track: &str,
        previous_uri: Option<String>,
        next_uri: Option<String>,
        created_at: &str,
    ) -> Self {
        Self {
            record_type: PLAYLIST_ITEM_COLLECTION.to_string(),
            playlist: playlist.to_string(),
            track: track.to_string(),
            created_at: created_at.to_string(),
            nodes: ItemNodes {
                previous_uri,
                next_uri,
            },
        }
    }
}
