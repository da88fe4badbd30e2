use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};
use url::Url;

/// Repository's maximum number of operations in one atomic `applyWrites` call.
pub const MAX_WRITES_PER_BATCH: usize = 200;

/// Immutable per-run context for one account's repository: resolved DID, the
/// PDS the account lives on, and the session token writes are signed with.
#[derive(Debug, Clone)]
pub struct RepoContext {
    pub did: String,
    pub service: Url,
    pub access_jwt: String,
}

/// One record as returned by a collection listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListedRecord {
    pub uri: String,
    pub value: serde_json::Value,
}

/// A single repository write, tagged the way `applyWrites` expects it on the
/// wire. Updates replace the whole record value under an existing record key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "$type")]
pub enum RepoWrite {
    #[serde(rename = "com.atproto.repo.applyWrites#create")]
    Create {
        collection: String,
        value: serde_json::Value,
    },
    #[serde(rename = "com.atproto.repo.applyWrites#update")]
    Update {
        collection: String,
        rkey: String,
        value: serde_json::Value,
    },
}

/// Port trait wrapping the repository capabilities used by the reconciliation
/// logic.
///
/// Implementations live in `atproto::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RepoClient: Send + Sync {
    /// List every record of one collection in the account's repository.
    async fn list_records(&self, ctx: &RepoContext, collection: &str) -> Result<Vec<ListedRecord>>;

    /// Create one record and return its URI.
    async fn create_record(
        &self,
        ctx: &RepoContext,
        collection: &str,
        value: serde_json::Value,
    ) -> Result<String>;

    /// Apply up to [`MAX_WRITES_PER_BATCH`] writes atomically, returning the
    /// affected record URIs in request order.
    async fn apply_writes(&self, ctx: &RepoContext, writes: &[RepoWrite]) -> Result<Vec<String>>;
}

/// Record key (final path segment) of an `at://` record URI.
pub fn rkey_from_uri(uri: &str) -> Result<&str> {
    uri.rsplit('/')
        .next()
        .filter(|rkey| !rkey.is_empty())
        .ok_or_else(|| color_eyre::eyre::eyre!("Record URI has no record key: {}", uri))
}
