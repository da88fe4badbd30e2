use color_eyre::eyre::Result;
use reqwest::Client;

use crate::atproto::repo::{apply_writes, create_record, list_records};
use crate::ports::repo::{ListedRecord, RepoClient, RepoContext, RepoWrite};

pub struct AtprotoHttpAdapter {
    client: Client,
}

impl AtprotoHttpAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl RepoClient for AtprotoHttpAdapter {
    async fn list_records(&self, ctx: &RepoContext, collection: &str) -> Result<Vec<ListedRecord>> {
        list_records(&self.client, ctx, collection).await
    }

    async fn create_record(
        &self,
        ctx: &RepoContext,
        collection: &str,
        value: serde_json::Value,
    ) -> Result<String> {
        create_record(&self.client, ctx, collection, value).await
    }

    async fn apply_writes(&self, ctx: &RepoContext, writes: &[RepoWrite]) -> Result<Vec<String>> {
        apply_writes(&self.client, ctx, writes).await
    }
}
