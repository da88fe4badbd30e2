use std::collections::HashMap;

use color_eyre::eyre::{Result, WrapErr};
use serde_json::Value;

use crate::ports::repo::ListedRecord;
use crate::records::PlaylistReference;
use crate::sync::chain::ChainItem;

/// Find the existing playlist record matching a reference triple.
///
/// Every non-null field of the new reference must equal the stored one;
/// extra fields on the stored record are ignored.
pub fn find_playlist<'a>(
    existing: &'a [ListedRecord],
    reference: &PlaylistReference,
) -> Option<&'a str> {
    existing
        .iter()
        .find(|record| {
            record
                .value
                .get("reference")
                .is_some_and(|stored| reference_matches(stored, reference))
        })
        .map(|record| record.uri.as_str())
}

fn reference_matches(stored: &Value, reference: &PlaylistReference) -> bool {
    if !stored.is_object() {
        return false;
    }

    let source = reference.source.to_string();
    if stored.get("source").and_then(|v| v.as_str()) != Some(source.as_str()) {
        return false;
    }

    if let Some(link) = &reference.link
        && stored.get("link").and_then(|v| v.as_str()) != Some(link.as_str())
    {
        return false;
    }

    if let Some(id) = &reference.id {
        // Ids may have been persisted as JSON numbers; compare string forms.
        let stored_id = stored.get("id").and_then(scalar_string);
        if stored_id.as_deref() != Some(id.as_str()) {
            return false;
        }
    }

    true
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Lookup table from track URL (the track identity key) to record URI, built
/// once per run from the full track collection listing.
#[derive(Debug, Default)]
pub struct TrackIndex {
    by_url: HashMap<String, String>,
}

impl TrackIndex {
    pub fn from_records(records: &[ListedRecord]) -> Self {
        let mut by_url = HashMap::with_capacity(records.len());
        for record in records {
            if let Some(url) = record.value.get("url").and_then(|v| v.as_str()) {
                // First record wins should the collection ever hold duplicates.
                by_url
                    .entry(url.to_string())
                    .or_insert_with(|| record.uri.clone());
            }
        }
        Self { by_url }
    }

    pub fn uri_for(&self, url: &str) -> Option<&str> {
        self.by_url.get(url).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}

/// Parse the playlist item records belonging to one playlist.
pub fn items_for_playlist(records: &[ListedRecord], playlist_uri: &str) -> Result<Vec<ChainItem>> {
    let mut items = Vec::new();
    for record in records {
        if record.value.get("playlist").and_then(|v| v.as_str()) != Some(playlist_uri) {
            continue;
        }
        let parsed = serde_json::from_value(record.value.clone())
            .wrap_err_with(|| format!("Malformed playlist item record: {}", record.uri))?;
        items.push(ChainItem {
            uri: record.uri.clone(),
            record: parsed,
        });
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{PLAYLIST_ITEM_COLLECTION, Source};

    fn listed(uri: &str, value: Value) -> ListedRecord {
        ListedRecord {
            uri: uri.to_string(),
            value,
        }
    }

    fn reference(link: Option<&str>, id: Option<&str>) -> PlaylistReference {
        PlaylistReference {
            source: Source::Bandcamp,
            link: link.map(str::to_string),
            id: id.map(str::to_string),
        }
    }

    #[test]
    fn matches_on_full_reference_triple() {
        let existing = vec![listed(
            "at://did/playlist/1",
            serde_json::json!({
                "reference": {"source": "Bandcamp", "link": "https://a.bandcamp.com/album/x", "id": "5"},
                "name": "X"
            }),
        )];

        let found = find_playlist(
            &existing,
            &reference(Some("https://a.bandcamp.com/album/x"), Some("5")),
        );
        assert_eq!(found, Some("at://did/playlist/1"));
    }

    #[test]
    fn null_fields_in_new_reference_are_not_compared() {
        let existing = vec![listed(
            "at://did/playlist/1",
            serde_json::json!({
                "reference": {"source": "Bandcamp", "link": "https://a.bandcamp.com/album/x", "id": "5"}
            }),
        )];

        // A reference with no id still matches on source + link.
        let found = find_playlist(
            &existing,
            &reference(Some("https://a.bandcamp.com/album/x"), None),
        );
        assert_eq!(found, Some("at://did/playlist/1"));
    }

    #[test]
    fn mismatched_source_or_link_is_no_match() {
        let existing = vec![listed(
            "at://did/playlist/1",
            serde_json::json!({
                "reference": {"source": "SoundCloud", "link": "https://a.bandcamp.com/album/x", "id": "5"}
            }),
        )];

        assert!(
            find_playlist(
                &existing,
                &reference(Some("https://a.bandcamp.com/album/x"), Some("5"))
            )
            .is_none()
        );
    }

    #[test]
    fn numeric_stored_ids_match_their_string_form() {
        let existing = vec![listed(
            "at://did/playlist/1",
            serde_json::json!({
                "reference": {"source": "Bandcamp", "link": "https://a.bandcamp.com/album/x", "id": 5}
            }),
        )];

        let found = find_playlist(
            &existing,
            &reference(Some("https://a.bandcamp.com/album/x"), Some("5")),
        );
        assert_eq!(found, Some("at://did/playlist/1"));
    }

    #[test]
    fn records_without_reference_are_skipped() {
        let existing = vec![
            listed("at://did/playlist/1", serde_json::json!({"name": "no ref"})),
            listed(
                "at://did/playlist/2",
                serde_json::json!({
                    "reference": {"source": "Bandcamp", "link": "https://a.bandcamp.com/album/x", "id": "5"}
                }),
            ),
        ];

        let found = find_playlist(
            &existing,
            &reference(Some("https://a.bandcamp.com/album/x"), Some("5")),
        );
        assert_eq!(found, Some("at://did/playlist/2"));
    }

    #[test]
    fn track_index_maps_url_to_uri() {
        let records = vec![
            listed(
                "at://did/track/1",
                serde_json::json!({"url": "https://a/t1", "title": "T1"}),
            ),
            listed(
                "at://did/track/2",
                serde_json::json!({"url": "https://a/t2", "title": "T2"}),
            ),
        ];

        let index = TrackIndex::from_records(&records);
        assert_eq!(index.len(), 2);
        assert_eq!(index.uri_for("https://a/t1"), Some("at://did/track/1"));
        assert_eq!(index.uri_for("https://a/t3"), None);
    }

    #[test]
    fn items_filter_to_the_requested_playlist() {
        let records = vec![
            listed(
                "at://did/item/1",
                serde_json::json!({
                    "$type": PLAYLIST_ITEM_COLLECTION,
                    "playlist": "at://did/playlist/1",
                    "track": "at://did/track/1",
                    "createdAt": "2026-01-01T00:00:00.000Z",
                    "nodes": {"previousUri": null, "nextUri": null}
                }),
            ),
            listed(
                "at://did/item/2",
                serde_json::json!({
                    "$type": PLAYLIST_ITEM_COLLECTION,
                    "playlist": "at://did/playlist/other",
                    "track": "at://did/track/2",
                    "createdAt": "2026-01-01T00:00:00.000Z",
                    "nodes": {"previousUri": null, "nextUri": null}
                }),
            ),
        ];

        let items = items_for_playlist(&records, "at://did/playlist/1").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].record.track, "at://did/track/1");
    }

    #[test]
    fn malformed_item_record_is_an_error() {
        let records = vec![listed(
            "at://did/item/1",
            serde_json::json!({"playlist": "at://did/playlist/1", "track": 42}),
        )];

        assert!(items_for_playlist(&records, "at://did/playlist/1").is_err());
    }
}
