use std::time::Duration;

use color_eyre::eyre::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::ports::repo::RepoContext;

#[derive(Debug, Deserialize)]
pub struct Session {
    pub did: String,

    pub handle: String,

    #[serde(rename = "accessJwt")]
    pub access_jwt: String,
}

/// Open an authenticated session on the account's PDS.
pub async fn create_session(
    client: &Client,
    service: &Url,
    identifier: &str,
    password: &str,
) -> Result<Session> {
    let url = service.join("xrpc/com.atproto.server.createSession")?;

    let response = client
        .post(url)
        .timeout(Duration::from_secs(30))
        .json(&serde_json::json!({
            "identifier": identifier,
            "password": password,
        }))
        .send()
        .await?
        .error_for_status()
        .wrap_err("Repository login failed (check handle and app password)")?
        .json::<Session>()
        .await
        .wrap_err("Failed to deserialize session response")?;

    Ok(response)
}

impl Session {
    /// Immutable per-run context threaded through the reconciliation.
    pub fn into_context(self, service: Url) -> RepoContext {
        RepoContext {
            did: self.did,
            service,
            access_jwt: self.access_jwt,
        }
    }
}
