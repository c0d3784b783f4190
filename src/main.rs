use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use url::Url;

use taglens::cli;
use taglens::config::Settings;

#[derive(Parser)]
#[command(
    name = "taglens",
    about = "Taglens: booru-backed tag and artist annotation for HTML documents",
    version,
    after_help = "Run 'taglens <command> --help' for details on each command."
)]
struct Cli {
    /// Booru endpoint every lookup goes to
    #[arg(long, global = true)]
    base_url: Option<Url>,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a profile's rules to an HTML file and print the result
    Annotate {
        /// HTML file to annotate
        file: PathBuf,
        /// Profile to run (tag-list, artist-credit, status-feed)
        #[arg(long)]
        profile: String,
    },
    /// Translate a single tag and print the matches as JSON
    LookupTag {
        /// Tag text as it appears on the page
        text: String,
    },
    /// Resolve the artists behind a profile URL and print them as JSON
    LookupArtist {
        /// Profile URL to resolve
        #[arg(long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "taglens=debug"
    } else {
        "taglens=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut settings = Settings::default();
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    settings.validate()?;

    let result = match cli.command {
        Commands::Annotate { file, profile } => {
            cli::annotate_cmd::run(&file, &profile, &settings).await
        }
        Commands::LookupTag { text } => cli::lookup_cmd::run_tag(&text, &settings).await,
        Commands::LookupArtist { url } => cli::lookup_cmd::run_artist(&url, &settings).await,
    };

    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }
    result
}
