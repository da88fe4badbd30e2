use std::collections::HashSet;

use crate::ports::repo::{RepoWrite, rkey_from_uri};
use crate::records::{PLAYLIST_ITEM_COLLECTION, PlaylistItemRecord};

/// One existing playlist item together with its record URI.
#[derive(Debug, Clone)]
pub struct ChainItem {
    pub uri: String,
    pub record: PlaylistItemRecord,
}

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Playlist has {0} items with no next pointer; refusing to extend a corrupted chain")]
    AmbiguousTail(usize),
    #[error("Playlist items form no tail (pointer cycle); refusing to extend a corrupted chain")]
    MissingTail,
    #[error("Playlist item URI has no record key: {0}")]
    InvalidUri(String),
    #[error("Failed to encode playlist item record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Locate the current tail: the single item whose `nextUri` is unset.
///
/// `Ok(None)` means the chain is empty. More than one candidate, or none at
/// all among a non-empty item set, is a consistency violation.
pub fn find_tail(items: &[ChainItem]) -> Result<Option<&ChainItem>, ChainError> {
    if items.is_empty() {
        return Ok(None);
    }

    let mut tails = items
        .iter()
        .filter(|item| item.record.nodes.next_uri.is_none());

    match (tails.next(), tails.count()) {
        (Some(tail), 0) => Ok(Some(tail)),
        (Some(_), extra) => Err(ChainError::AmbiguousTail(extra + 1)),
        (None, _) => Err(ChainError::MissingTail),
    }
}

/// Track URIs not yet linked into this playlist, in descriptor order.
pub fn insertion_list(ordered_track_uris: &[String], items: &[ChainItem]) -> Vec<String> {
    let linked: HashSet<&str> = items.iter().map(|item| item.record.track.as_str()).collect();

    let mut seen = HashSet::new();
    let mut insertions = Vec::new();
    for uri in ordered_track_uris {
        if linked.contains(uri.as_str()) || !seen.insert(uri.as_str()) {
            continue;
        }
        insertions.push(uri.clone());
    }
    insertions
}

/// Plan the writes that splice `insertions` onto the end of the chain: one
/// update rewriting the old tail's `nextUri` (when a tail exists), then one
/// create per new item, linked through the adjacent *track* URIs.
///
/// The caller submits the result as a single ordered batch so the tail
/// update and the new items land together.
pub fn plan_appends(
    items: &[ChainItem],
    playlist_uri: &str,
    insertions: &[String],
    created_at: &str,
) -> Result<Vec<RepoWrite>, ChainError> {
    if insertions.is_empty() {
        return Ok(Vec::new());
    }

    let tail = find_tail(items)?;
    let mut writes = Vec::with_capacity(insertions.len() + 1);

    if let Some(tail) = tail {
        let rkey = rkey_from_uri(&tail.uri).map_err(|_| ChainError::InvalidUri(tail.uri.clone()))?;
        let mut updated = tail.record.clone();
        updated.nodes.next_uri = Some(insertions[0].clone());
        writes.push(RepoWrite::Update {
            collection: PLAYLIST_ITEM_COLLECTION.to_string(),
            rkey: rkey.to_string(),
            value: serde_json::to_value(&updated)?,
        });
    }

    for (i, track_uri) in insertions.iter().enumerate() {
        let previous_uri = if i == 0 {
            tail.map(|tail| tail.record.track.clone())
        } else {
            Some(insertions[i - 1].clone())
        };
        let next_uri = insertions.get(i + 1).cloned();

        let record =
            PlaylistItemRecord::new(playlist_uri, track_uri, previous_uri, next_uri, created_at);
        writes.push(RepoWrite::Create {
            collection: PLAYLIST_ITEM_COLLECTION.to_string(),
            value: serde_json::to_value(&record)?,
        });
    }

    Ok(writes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYLIST: &str = "at://did/dev.dreary.tunes.playlist/p1";
    const NOW: &str = "2026-01-01T00:00:00.000Z";

    fn item(rkey: &str, track: &str, previous: Option<&str>, next: Option<&str>) -> ChainItem {
        ChainItem {
            uri: format!("at://did/{}/{}", PLAYLIST_ITEM_COLLECTION, rkey),
            record: PlaylistItemRecord::new(
                PLAYLIST,
                track,
                previous.map(str::to_string),
                next.map(str::to_string),
                NOW,
            ),
        }
    }

    fn uris(tracks: &[&str]) -> Vec<String> {
        tracks.iter().map(|t| t.to_string()).collect()
    }

    /// Walk created item values head to tail and return the track order.
    fn walk(writes: &[RepoWrite]) -> Vec<String> {
        let values: Vec<&serde_json::Value> = writes
            .iter()
            .filter_map(|write| match write {
                RepoWrite::Create { value, .. } => Some(value),
                RepoWrite::Update { .. } => None,
            })
            .collect();

        let mut order = Vec::new();
        let mut current = values
            .iter()
            .find(|v| v["nodes"]["previousUri"].is_null())
            .copied();
        while let Some(value) = current {
            let track = value["track"].as_str().unwrap().to_string();
            current = value["nodes"]["nextUri"].as_str().and_then(|next| {
                values
                    .iter()
                    .find(|v| v["track"].as_str() == Some(next))
                    .copied()
            });
            order.push(track);
        }
        order
    }

    #[test]
    fn empty_chain_cold_start_links_all_items() {
        let insertions = uris(&["at://did/track/t1", "at://did/track/t2", "at://did/track/t3"]);
        let writes = plan_appends(&[], PLAYLIST, &insertions, NOW).unwrap();

        assert_eq!(writes.len(), 3);
        assert!(writes
            .iter()
            .all(|write| matches!(write, RepoWrite::Create { .. })));
        assert_eq!(
            walk(&writes),
            vec!["at://did/track/t1", "at://did/track/t2", "at://did/track/t3"]
        );
    }

    #[test]
    fn append_after_tail_rewrites_its_next_pointer() {
        let existing = vec![
            item("a", "at://did/track/t0", None, Some("at://did/track/t1")),
            item("b", "at://did/track/t1", Some("at://did/track/t0"), None),
        ];
        let insertions = uris(&["at://did/track/t2", "at://did/track/t3"]);

        let writes = plan_appends(&existing, PLAYLIST, &insertions, NOW).unwrap();
        assert_eq!(writes.len(), 3);

        let RepoWrite::Update { rkey, value, .. } = &writes[0] else {
            panic!("first write must update the old tail");
        };
        assert_eq!(rkey, "b");
        assert_eq!(value["nodes"]["nextUri"], "at://did/track/t2");
        // Only the pointer changes on the tail.
        assert_eq!(value["track"], "at://did/track/t1");
        assert_eq!(value["nodes"]["previousUri"], "at://did/track/t0");

        let RepoWrite::Create { value: first, .. } = &writes[1] else {
            panic!("expected create");
        };
        assert_eq!(first["nodes"]["previousUri"], "at://did/track/t1");
        assert_eq!(first["nodes"]["nextUri"], "at://did/track/t3");

        let RepoWrite::Create { value: last, .. } = &writes[2] else {
            panic!("expected create");
        };
        assert_eq!(last["nodes"]["previousUri"], "at://did/track/t2");
        assert_eq!(last["nodes"]["nextUri"], serde_json::Value::Null);
    }

    #[test]
    fn empty_insertion_list_is_a_no_op() {
        let existing = vec![item("a", "at://did/track/t0", None, None)];
        let writes = plan_appends(&existing, PLAYLIST, &[], NOW).unwrap();
        assert!(writes.is_empty());
    }

    #[test]
    fn ambiguous_tail_is_surfaced_not_guessed() {
        let existing = vec![
            item("a", "at://did/track/t0", None, None),
            item("b", "at://did/track/t1", Some("at://did/track/t0"), None),
        ];

        let err = plan_appends(&existing, PLAYLIST, &uris(&["at://did/track/t2"]), NOW)
            .unwrap_err();
        assert!(matches!(err, ChainError::AmbiguousTail(2)));
    }

    #[test]
    fn tailless_non_empty_chain_is_surfaced() {
        let existing = vec![
            item(
                "a",
                "at://did/track/t0",
                Some("at://did/track/t1"),
                Some("at://did/track/t1"),
            ),
            item(
                "b",
                "at://did/track/t1",
                Some("at://did/track/t0"),
                Some("at://did/track/t0"),
            ),
        ];

        let err = plan_appends(&existing, PLAYLIST, &uris(&["at://did/track/t2"]), NOW)
            .unwrap_err();
        assert!(matches!(err, ChainError::MissingTail));
    }

    #[test]
    fn insertion_list_subtracts_already_linked_tracks() {
        let existing = vec![item("a", "at://did/track/t1", None, None)];
        let ordered = uris(&[
            "at://did/track/t1",
            "at://did/track/t2",
            "at://did/track/t2",
            "at://did/track/t3",
        ]);

        let insertions = insertion_list(&ordered, &existing);
        assert_eq!(insertions, vec!["at://did/track/t2", "at://did/track/t3"]);
    }
}
