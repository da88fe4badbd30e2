use std::time::Duration;

use color_eyre::eyre::{Context, OptionExt, Result, eyre};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const PUBLIC_API: &str = "https://public.api.bsky.app";
const PLC_DIRECTORY: &str = "https://plc.directory";

#[derive(Debug, Deserialize)]
struct ResolveHandleResponse {
    did: String,
}

/// Resolve an account handle to its DID.
pub async fn resolve_handle(client: &Client, handle: &str) -> Result<String> {
    let url = format!(
        "{}/xrpc/com.atproto.identity.resolveHandle?handle={}",
        PUBLIC_API,
        urlencoding::encode(handle)
    );

    let response = client
        .get(url)
        .timeout(Duration::from_secs(30))
        .send()
        .await?
        .error_for_status()
        .wrap_err(format!("Failed to resolve handle: {}", handle))?
        .json::<ResolveHandleResponse>()
        .await
        .wrap_err("Failed to deserialize handle resolution response")?;

    Ok(response.did)
}

/* ---------- DID document ---------- */

#[derive(Debug, Deserialize)]
struct DidDocument {
    #[serde(default)]
    service: Vec<DidService>,
}

#[derive(Debug, Deserialize)]
struct DidService {
    id: String,

    #[serde(rename = "type")]
    service_type: String,

    #[serde(rename = "serviceEndpoint")]
    service_endpoint: String,
}

/// Look up the PDS a DID's repository lives on, from its DID document.
pub async fn get_service_endpoint(client: &Client, did: &str) -> Result<Url> {
    if !did.starts_with("did:plc:") {
        return Err(eyre!("Unsupported DID method: {}", did));
    }

    let document = client
        .get(format!("{}/{}", PLC_DIRECTORY, did))
        .timeout(Duration::from_secs(30))
        .send()
        .await?
        .error_for_status()
        .wrap_err(format!("Failed to fetch DID document for {}", did))?
        .json::<DidDocument>()
        .await
        .wrap_err("Failed to deserialize DID document")?;

    let pds = document
        .service
        .into_iter()
        .find(|service| {
            service.id.ends_with("atproto_pds")
                && service.service_type == "AtprotoPersonalDataServer"
        })
        .ok_or_eyre("DID document has no PDS service endpoint")?;

    Url::parse(&pds.service_endpoint)
        .wrap_err(format!("Invalid PDS endpoint: {}", pds.service_endpoint))
}
