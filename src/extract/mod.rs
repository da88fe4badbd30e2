mod bandcamp;
mod soundcloud;
mod youtube;

use color_eyre::eyre::{Result, eyre};
use url::Url;

use crate::config::Config;
use crate::records::{Source, Uploader};

/// Pre-persistence description of a playlist as extracted from a source
/// platform. The `(source, link, external_id)` triple is the identity key.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistDescriptor {
    pub source: Source,
    pub external_id: Option<String>,
    pub link: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

/// Pre-persistence description of one track. `url` is the identity key and is
/// assumed unique per source platform.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDescriptor {
    pub source: Source,
    pub external_id: Option<String>,
    pub url: String,
    pub title: Option<String>,
    pub uploader: Uploader,
    pub thumbnail: Option<String>,
    pub duration: Option<u32>,
    pub description: Option<String>,
    pub lyrics: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub playlist: PlaylistDescriptor,
    pub tracks: Vec<TrackDescriptor>,
}

/// Extract a playlist description from a supported source URL.
///
/// Returns `Ok(None)` when the URL is reachable but holds no usable
/// tracklist. Unsupported hosts and unparseable URLs are errors.
pub async fn extract(url: &str, config: &Config) -> Result<Option<Extraction>> {
    let parsed = Url::parse(url).map_err(|e| eyre!("Invalid URL `{}`: {}", url, e))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| eyre!("Invalid URL `{}`: no host", url))?;

    if host.contains("soundcloud") {
        soundcloud::extract_playlist(url, config.soundcloud_client_id()).await
    } else if host.contains("bandcamp") {
        bandcamp::extract_playlist(url).await
    } else if host.contains("youtu") {
        youtube::extract_playlist(url).await
    } else {
        Err(eyre!("Unsupported source URL: {}", url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        toml::from_str("handle = \"h\"\napp_password = \"p\"\n").unwrap()
    }

    #[tokio::test]
    async fn rejects_unsupported_hosts() {
        let result = extract("https://example.com/playlist", &test_config()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn rejects_urls_without_host() {
        let result = extract("not a url", &test_config()).await;
        assert!(result.is_err());
    }
}
