//! `taglens lookup-tag` / `taglens lookup-artist`: one-off lookups.

use anyhow::{Context, Result};

use crate::cli::api_client;
use crate::config::Settings;

/// Translate one tag and print the matches as JSON.
pub async fn run_tag(text: &str, settings: &Settings) -> Result<()> {
    let api = api_client(settings);
    let tags = api.translate_tag(text).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&tags).context("serializing tag matches")?
    );
    Ok(())
}

/// Resolve the artists behind a profile URL and print them as JSON.
pub async fn run_artist(url: &str, settings: &Settings) -> Result<()> {
    let api = api_client(settings);
    let artists = api.artists_by_url(url).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&artists).context("serializing artists")?
    );
    Ok(())
}
