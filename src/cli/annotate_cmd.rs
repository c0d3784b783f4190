//! `taglens annotate <file>`: run a profile's rules over an HTML file.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::api_client;
use crate::config::Settings;
use crate::dom::parse::parse_html;
use crate::engine::Engine;
use crate::profiles;

/// Run the annotate command: parse, apply every rule once, print.
pub async fn run(file: &Path, profile_name: &str, settings: &Settings) -> Result<()> {
    let profile = profiles::named(profile_name)?;
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let mut doc = parse_html(&html);
    let engine = Engine::new(api_client(settings));

    let mut attached = 0;
    for rule in &profile.rules {
        attached += engine.apply_rule(&mut doc, rule).await.len();
    }
    info!(profile = profile.name, attached, "annotation finished");

    println!("{}", doc.to_html(doc.root()));
    Ok(())
}
