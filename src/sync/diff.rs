use std::collections::{HashMap, HashSet};

use color_eyre::eyre::{Result, eyre};

use crate::extract::TrackDescriptor;
use crate::sync::resolve::TrackIndex;

/// Ordered split of the extracted tracks into already-persisted record URIs
/// and descriptors that still need creation. Both sides keep the original
/// descriptor order; a URL appearing twice collapses to its first occurrence.
#[derive(Debug, Default)]
pub struct TrackPartition {
    pub reused: Vec<String>,
    pub pending: Vec<TrackDescriptor>,
}

pub fn partition_tracks(descriptors: &[TrackDescriptor], index: &TrackIndex) -> TrackPartition {
    let mut partition = TrackPartition::default();
    let mut seen = HashSet::new();

    for descriptor in descriptors {
        if !seen.insert(descriptor.url.as_str()) {
            continue;
        }
        match index.uri_for(&descriptor.url) {
            Some(uri) => partition.reused.push(uri.to_string()),
            None => partition.pending.push(descriptor.clone()),
        }
    }

    partition
}

/// Rebuild the descriptor-order URI sequence once the pending creates have
/// been applied. `created_uris` must line up positionally with `pending`
/// (the batch submitter's request-order contract).
pub fn merged_track_uris(
    descriptors: &[TrackDescriptor],
    index: &TrackIndex,
    pending: &[TrackDescriptor],
    created_uris: &[String],
) -> Result<Vec<String>> {
    if pending.len() != created_uris.len() {
        return Err(eyre!(
            "Track creation returned {} URIs for {} records",
            created_uris.len(),
            pending.len()
        ));
    }

    let created: HashMap<&str, &str> = pending
        .iter()
        .map(|descriptor| descriptor.url.as_str())
        .zip(created_uris.iter().map(String::as_str))
        .collect();

    let mut seen = HashSet::new();
    let mut ordered = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        if !seen.insert(descriptor.url.as_str()) {
            continue;
        }
        let uri = index
            .uri_for(&descriptor.url)
            .or_else(|| created.get(descriptor.url.as_str()).copied())
            .ok_or_else(|| eyre!("No record URI resolved for track {}", descriptor.url))?;
        ordered.push(uri.to_string());
    }

    Ok(ordered)
}
