use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use color_eyre::eyre::{Context, Result, eyre};
use reqwest::Client;
use serde::Deserialize;

use crate::ports::repo::{ListedRecord, RepoContext, RepoWrite};

const LIST_PAGE_LIMIT: u32 = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/* ---------- listRecords ---------- */

#[derive(Debug, Deserialize)]
struct ListRecordsResponse {
    #[serde(default)]
    records: Vec<ListedRecord>,
    cursor: Option<String>,
}

/// List every record of one collection, following the pagination cursor.
///
/// Listing is an unauthenticated, idempotent read, so transient failures are
/// retried with exponential backoff. Writes are never retried.
pub async fn list_records(
    client: &Client,
    ctx: &RepoContext,
    collection: &str,
) -> Result<Vec<ListedRecord>> {
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = (|| async { list_page(client, ctx, collection, cursor.as_deref()).await })
            .retry(ExponentialBuilder::default())
            .notify(|err, delay| {
                log::warn!("Retrying listRecords in {:?} after error: {}", delay, err);
            })
            .await?;

        let page_empty = page.records.is_empty();
        records.extend(page.records);

        match page.cursor {
            Some(next) if !page_empty => cursor = Some(next),
            _ => break,
        }
    }

    log::debug!("Listed {} records from {}", records.len(), collection);
    Ok(records)
}

async fn list_page(
    client: &Client,
    ctx: &RepoContext,
    collection: &str,
    cursor: Option<&str>,
) -> Result<ListRecordsResponse> {
    let mut url = ctx.service.join("xrpc/com.atproto.repo.listRecords")?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("repo", &ctx.did);
        query.append_pair("collection", collection);
        query.append_pair("limit", &LIST_PAGE_LIMIT.to_string());
        if let Some(cursor) = cursor {
            query.append_pair("cursor", cursor);
        }
    }

    client
        .get(url)
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await?
        .error_for_status()
        .wrap_err(format!("Failed to list {} records", collection))?
        .json::<ListRecordsResponse>()
        .await
        .wrap_err("Failed to deserialize listRecords response")
}

/* ---------- createRecord ---------- */

#[derive(Debug, Deserialize)]
struct CreateRecordResponse {
    uri: String,
}

/// Create one record, returning its URI.
pub async fn create_record(
    client: &Client,
    ctx: &RepoContext,
    collection: &str,
    value: serde_json::Value,
) -> Result<String> {
    let url = ctx.service.join("xrpc/com.atproto.repo.createRecord")?;

    let response = client
        .post(url)
        .timeout(REQUEST_TIMEOUT)
        .bearer_auth(&ctx.access_jwt)
        .json(&serde_json::json!({
            "repo": ctx.did,
            "collection": collection,
            "record": value,
        }))
        .send()
        .await?
        .error_for_status()
        .wrap_err(format!("Failed to create {} record", collection))?
        .json::<CreateRecordResponse>()
        .await
        .wrap_err("Failed to deserialize createRecord response")?;

    Ok(response.uri)
}

/* ---------- applyWrites ---------- */

#[derive(Debug, Deserialize)]
struct ApplyWritesResponse {
    #[serde(default)]
    results: Vec<WriteResult>,
}

#[derive(Debug, Deserialize)]
struct WriteResult {
    uri: Option<String>,
}

/// Apply a batch of writes atomically; the returned URIs are positional with
/// the submitted operations.
pub async fn apply_writes(
    client: &Client,
    ctx: &RepoContext,
    writes: &[RepoWrite],
) -> Result<Vec<String>> {
    let url = ctx.service.join("xrpc/com.atproto.repo.applyWrites")?;

    let response = client
        .post(url)
        .timeout(REQUEST_TIMEOUT)
        .bearer_auth(&ctx.access_jwt)
        .json(&serde_json::json!({
            "repo": ctx.did,
            "writes": writes,
        }))
        .send()
        .await?
        .error_for_status()
        .wrap_err("Failed to apply write batch")?
        .json::<ApplyWritesResponse>()
        .await
        .wrap_err("Failed to deserialize applyWrites response")?;

    response
        .results
        .into_iter()
        .map(|result| {
            result
                .uri
                .ok_or_else(|| eyre!("applyWrites result is missing a record URI"))
        })
        .collect()
}
