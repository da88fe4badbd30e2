use std::time::Duration;

use color_eyre::eyre::{Result, eyre};
use html_parser::{Dom, Node};
use reqwest::Client;
use serde_json::Value;

use crate::records::{Source, Uploader};

use super::{Extraction, PlaylistDescriptor, TrackDescriptor};

/// Extract a Bandcamp album/track page.
///
/// Bandcamp embeds everything we need in two places: an
/// `application/ld+json` script (tracklist, artist, artwork) and a
/// `data-tralbum` attribute (numeric ids, per-track durations).
pub async fn extract_playlist(url: &str) -> Result<Option<Extraction>> {
    let client = Client::new();

    log::info!("Fetching Bandcamp page...");
    let response = client
        .get(url)
        .timeout(Duration::from_secs(30))
        .send()
        .await?;

    if !response.status().is_success() {
        log::warn!(
            "The album/track requested does not exist at: {} (status {})",
            url,
            response.status()
        );
        return Ok(None);
    }

    let body = response.text().await?;
    let page = parse_page(&body)?;
    build_extraction(&page)
}

/* ---------- embedded JSON extraction ---------- */

#[derive(Debug, Default)]
struct PageJson {
    ld: Value,
    tralbum: Value,
}

fn parse_page(body: &str) -> Result<PageJson> {
    let html = Dom::parse(body).map_err(|e| eyre!("Failed to parse Bandcamp page: {}", e))?;

    let mut page = PageJson::default();
    let mut stack = html.children;
    while let Some(node) = stack.pop() {
        if let Node::Element(element) = node {
            if element.name == "script" {
                if element.attributes.get("type")
                    == Some(&Some("application/ld+json".to_string()))
                    && let Ok(value) = serde_json::from_str(&text_content(&element.children))
                {
                    page.ld = value;
                }
                if let Some(Some(raw)) = element.attributes.get("data-tralbum")
                    && let Ok(value) = serde_json::from_str(&decode_entities(raw))
                {
                    page.tralbum = value;
                }
            }
            stack.extend(element.children);
        }
    }

    Ok(page)
}

fn text_content(children: &[Node]) -> String {
    children
        .iter()
        .filter_map(|child| match child {
            Node::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// The tralbum attribute arrives HTML-escaped; undo the entities the page
/// actually uses before handing it to the JSON parser.
fn decode_entities(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/* ---------- field accessors ---------- */

/// String form of a JSON scalar; Bandcamp stores ids as numbers.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field_str(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn field_id(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(scalar_string)
}

/// `additionalProperty` entry value for a named property.
fn additional_property(value: &Value, name: &str) -> Option<Value> {
    value
        .get("additionalProperty")?
        .as_array()?
        .iter()
        .find(|prop| prop.get("name").and_then(|n| n.as_str()) == Some(name))?
        .get("value")
        .cloned()
}

fn ld_track_id(item: &Value) -> Option<i64> {
    additional_property(item, "track_id")?.as_i64()
}

/// Duration/title table entry matching a track id; older pages key it as
/// `id`, newer ones as `track_id`.
fn trackinfo_for<'a>(tralbum: &'a Value, track_id: i64) -> Option<&'a Value> {
    tralbum.get("trackinfo")?.as_array()?.iter().find(|info| {
        info.get("id").and_then(|v| v.as_i64()) == Some(track_id)
            || info.get("track_id").and_then(|v| v.as_i64()) == Some(track_id)
    })
}

fn uploader_info(page: &PageJson) -> Uploader {
    let by_artist = page.ld.get("byArtist");
    let publisher = page.ld.get("publisher");

    let name = field_str(&page.tralbum, "artist")
        .or_else(|| by_artist.and_then(|a| field_str(a, "name")))
        .or_else(|| publisher.and_then(|p| field_str(p, "name")));

    let id = page
        .tralbum
        .get("current")
        .and_then(|current| {
            field_id(current, "band_id").or_else(|| field_id(current, "selling_band_id"))
        })
        .or_else(|| {
            publisher
                .and_then(|p| additional_property(p, "band_id"))
                .as_ref()
                .and_then(scalar_string)
        });

    let url = by_artist
        .and_then(|a| field_str(a, "@id"))
        .or_else(|| publisher.and_then(|p| field_str(p, "@id")));

    Uploader { name, id, url }
}

fn build_extraction(page: &PageJson) -> Result<Option<Extraction>> {
    let tracklist = page
        .ld
        .get("track")
        .and_then(|t| t.get("itemListElement"))
        .and_then(|l| l.as_array());
    let Some(tracklist) = tracklist else {
        log::warn!("No tracks found in the playlist.");
        return Ok(None);
    };

    let thumbnail = field_str(&page.ld, "image");

    let descriptor = PlaylistDescriptor {
        source: Source::Bandcamp,
        external_id: field_id(&page.tralbum, "id"),
        link: field_str(&page.tralbum, "url").or_else(|| field_str(&page.ld, "@id")),
        name: field_str(&page.ld, "name"),
        description: field_str(&page.ld, "description"),
        thumbnail: thumbnail.clone(),
    };

    let uploader = uploader_info(page);

    let mut tracks = Vec::with_capacity(tracklist.len());
    for element in tracklist {
        let Some(item) = element.get("item") else {
            continue;
        };

        let track_id = ld_track_id(item);
        let info = track_id.and_then(|id| trackinfo_for(&page.tralbum, id));

        let Some(url) =
            field_str(item, "@id").or_else(|| field_str(item, "mainEntityOfPage"))
        else {
            log::warn!(
                "Skipping tracklist entry without a page URL: {:?}",
                field_str(item, "name")
            );
            continue;
        };

        tracks.push(TrackDescriptor {
            source: Source::Bandcamp,
            external_id: track_id.map(|id| id.to_string()),
            url,
            title: field_str(item, "name")
                .or_else(|| info.and_then(|i| field_str(i, "title"))),
            uploader: uploader.clone(),
            thumbnail: thumbnail.clone(),
            duration: info
                .and_then(|i| i.get("duration"))
                .and_then(|d| d.as_f64())
                .map(|d| d.round() as u32),
            description: None,
            lyrics: item
                .get("recordingOf")
                .and_then(|r| r.get("lyrics"))
                .and_then(|l| field_str(l, "text")),
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
