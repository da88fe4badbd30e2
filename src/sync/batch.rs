use color_eyre::eyre::{Result, WrapErr, eyre};

use crate::ports::repo::{MAX_WRITES_PER_BATCH, RepoClient, RepoContext, RepoWrite};

/// Submit an ordered list of writes as consecutive atomic chunks of at most
/// [`MAX_WRITES_PER_BATCH`] operations, returning the affected record URIs in
/// request order.
///
/// Chunks are submitted sequentially; a failed chunk aborts the remainder and
/// already-applied chunks stay applied (recovery is a re-run, which the
/// idempotent reconciliation turns into a no-op for the committed part).
pub async fn submit_writes<C: RepoClient>(
    repo: &C,
    ctx: &RepoContext,
    writes: &[RepoWrite],
) -> Result<Vec<String>> {
    if writes.is_empty() {
        return Ok(Vec::new());
    }

    let chunk_count = writes.len().div_ceil(MAX_WRITES_PER_BATCH);
    let mut uris = Vec::with_capacity(writes.len());

    for (index, chunk) in writes.chunks(MAX_WRITES_PER_BATCH).enumerate() {
        log::debug!(
            "Submitting write batch {}/{} ({} operations)",
            index + 1,
            chunk_count,
            chunk.len()
        );
        let chunk_uris = repo
            .apply_writes(ctx, chunk)
            .await
            .wrap_err_with(|| format!("Write batch {}/{} failed", index + 1, chunk_count))?;

        // The per-write result mapping is positional.
        if chunk_uris.len() != chunk.len() {
            return Err(eyre!(
                "Repository returned {} results for a batch of {} writes",
                chunk_uris.len(),
                chunk.len()
            ));
        }
        uris.extend(chunk_uris);
    }

    Ok(uris)
}
