mod atproto;
mod config;
mod extract;
mod logging;
mod ports;
mod records;
mod sync;

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::{Result, eyre::Context};
use reqwest::Client;

use crate::atproto::client::AtprotoHttpAdapter;
use crate::atproto::{identity, session};
use crate::config::Config;
use crate::logging::setup_logging;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Playlist URL to mirror (Bandcamp, SoundCloud, or YouTube); prompted for when omitted
    url: Option<String>,

    /// The config file to use
    #[arg(short, long, env = "TUNES_MIRROR_CONFIG")]
    config: Option<PathBuf>,

    /// Console log level (default: info)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// File log level (default: debug)
    #[arg(long, default_value = "debug")]
    log_file_level: log::LevelFilter,

    /// Path to log file
    #[arg(long, env = "TUNES_MIRROR_LOG_FILE")]
    log_file: Option<PathBuf>,
}

fn prompt_for_url() -> Result<Option<String>> {
    print!("Input a URL: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    let url = line.trim();
    if url.is_empty() {
        Ok(None)
    } else {
        Ok(Some(url.to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    setup_logging(args.log_level, args.log_file.clone(), args.log_file_level)?;

    log::debug!("tunes-mirror starting");
    log::debug!("Loading configuration");

    let config = {
        if let Some(path) = args.config {
            Config::from_file(&path)
        } else {
            let path = Config::create_default()?;
            Config::from_file(&path)
        }
    }
    .with_context(|| "Failed to load tunes-mirror config")?;
    let (handle, password) = config.credentials()?;

    let client = Client::new();

    log::debug!("Resolving handle: {}", handle);
    let did = identity::resolve_handle(&client, handle).await?;
    let service = identity::get_service_endpoint(&client, &did).await?;
    log::debug!("Account {} lives on {}", did, service);
    let session = session::create_session(&client, &service, &did, password).await?;
    log::debug!("Session opened for {}", session.handle);
    let ctx = session.into_context(service);

    let url = match args.url {
        Some(url) => url,
        None => match prompt_for_url()? {
            Some(url) => url,
            None => return Ok(()),
        },
    };

    let Some(extraction) = extract::extract(&url, &config).await? else {
        // Nothing usable at that URL; the adapter already said why.
        return Ok(());
    };
    log::info!(
        "Extracted {} tracks from {}",
        extraction.tracks.len(),
        extraction.playlist.source
    );

    let repo = AtprotoHttpAdapter::new();
    let report = sync::mirror_playlist(&repo, &ctx, &extraction.playlist, &extraction.tracks)
        .await?;

    log::info!(
        "Playlist {} is up to date ({} items added)",
        report.playlist_uri,
        report.items_created
    );

    Ok(())
}
