pub mod batch;
pub mod chain;
pub mod diff;
pub mod resolve;

use chrono::{SecondsFormat, Utc};
use color_eyre::eyre::{Result, WrapErr};

use crate::extract::{PlaylistDescriptor, TrackDescriptor};
use crate::ports::repo::{RepoClient, RepoContext, RepoWrite};
use crate::records::{
    PLAYLIST_COLLECTION, PLAYLIST_ITEM_COLLECTION, PlaylistRecord, TRACK_COLLECTION, TrackRecord,
};

/// Result of reconciling one extracted playlist into the repository.
#[derive(Debug, Clone)]
pub struct MirrorReport {
    pub playlist_uri: String,
    pub playlist_created: bool,
    pub tracks_created: u32,
    pub tracks_reused: u32,
    pub items_created: u32,
    pub tail_updated: bool,
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Reconcile one extracted playlist into the account's repository.
///
/// Re-running with identical input is a no-op: the playlist is matched by its
/// reference triple, tracks by URL, items by (playlist, track) pair, and only
/// the missing remainder is written. Every write happens after every read, so
/// a failed run leaves nothing half-linked that a re-run can't pick up.
///
/// # Errors
/// Returns an error if:
/// - Any collection listing fails (no writes have been issued yet)
/// - A record create or batch write fails (already-applied batches remain)
/// - The existing item chain is corrupted (ambiguous or missing tail)
pub async fn mirror_playlist<C: RepoClient>(
    repo: &C,
    ctx: &RepoContext,
    playlist: &PlaylistDescriptor,
    tracks: &[TrackDescriptor],
) -> Result<MirrorReport> {
    let created_at = now_timestamp();

    // Step 1: Find or create the playlist record
    log::info!("Searching for existing playlist record matches...");
    let existing_playlists = repo
        .list_records(ctx, PLAYLIST_COLLECTION)
        .await
        .wrap_err("Failed to list playlist records")?;

    let playlist_record = PlaylistRecord::from_descriptor(playlist, &created_at);
    let (playlist_uri, playlist_created) =
        match resolve::find_playlist(&existing_playlists, &playlist_record.reference) {
            Some(uri) => {
                log::info!("Existing playlist record found");
                (uri.to_string(), false)
            }
            None => {
                let value = serde_json::to_value(&playlist_record)
                    .wrap_err("Failed to encode playlist record")?;
                let uri = repo
                    .create_record(ctx, PLAYLIST_COLLECTION, value)
                    .await
                    .wrap_err("Failed to create playlist record")?;
                log::info!("Created playlist record: {}", uri);
                (uri, true)
            }
        };

    // Step 2: Partition tracks against the existing track collection
    log::info!("Retrieving existing track records...");
    let existing_tracks = repo
        .list_records(ctx, TRACK_COLLECTION)
        .await
        .wrap_err("Failed to list track records")?;
    let track_index = resolve::TrackIndex::from_records(&existing_tracks);
    log::debug!("Track index holds {} unique URLs", track_index.len());
    let partition = diff::partition_tracks(tracks, &track_index);
    log::info!(
        "{} tracks already recorded, {} to create",
        partition.reused.len(),
        partition.pending.len()
    );

    // Step 3: Create the missing track records in batches
    let track_creates = partition
        .pending
        .iter()
        .map(|descriptor| {
            Ok(RepoWrite::Create {
                collection: TRACK_COLLECTION.to_string(),
                value: serde_json::to_value(TrackRecord::from_descriptor(descriptor, &created_at))
                    .wrap_err("Failed to encode track record")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let created_uris = batch::submit_writes(repo, ctx, &track_creates).await?;
    let ordered_track_uris =
        diff::merged_track_uris(tracks, &track_index, &partition.pending, &created_uris)?;

    // Step 4: Load this playlist's existing item chain
    log::info!("Retrieving existing playlistitem records...");
    let existing_items = repo
        .list_records(ctx, PLAYLIST_ITEM_COLLECTION)
        .await
        .wrap_err("Failed to list playlistitem records")?;
    let items = resolve::items_for_playlist(&existing_items, &playlist_uri)?;

    // Step 5: Plan the chain extension
    let insertions = chain::insertion_list(&ordered_track_uris, &items);
    let item_writes = chain::plan_appends(&items, &playlist_uri, &insertions, &created_at)?;
    let tail_updated = matches!(item_writes.first(), Some(RepoWrite::Update { .. }));

    // Step 6: Submit the tail update and the new items as one ordered batch
    if item_writes.is_empty() {
        log::info!("Playlist items already up to date");
    } else {
        log::info!(
            "Linking {} new items{}",
            insertions.len(),
            if tail_updated {
                " (rewriting old tail pointer)"
            } else {
                ""
            }
        );
        batch::submit_writes(repo, ctx, &item_writes).await?;
    }

    let report = MirrorReport {
        playlist_uri,
        playlist_created,
        tracks_created: partition.pending.len() as u32,
        tracks_reused: partition.reused.len() as u32,
        items_created: insertions.len() as u32,
        tail_updated,
    };

    log::info!(
        "Mirror complete: {} tracks created, {} reused, {} items linked",
        report.tracks_created,
        report.tracks_reused,
        report.items_created
    );

    Ok(report)
}
