use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use og_notion::config::{self, Credentials};
use og_notion::importer::{self, Importer, Outcome};
use og_notion::notion::NotionClient;
use og_notion::opengraph::HttpMetadataFetcher;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Open Graph utility for Notion",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    wwdc: WwdcArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Enters a WWDC video URL into Notion (default)
    Wwdc(WwdcArgs),
}

#[derive(Debug, Clone, Args)]
struct WwdcArgs {
    /// WWDC session video URL
    url: Option<String>,

    /// Path to YAML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the derived record without contacting Notion
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let args = match cli.command {
        Some(Command::Wwdc(args)) => args,
        None => cli.wwdc,
    };
    let Some(url) = args.url else {
        Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "the following required arguments were not provided: <URL>",
            )
            .exit()
    };

    let settings = config::load(args.config.as_deref())?;
    let fetcher = HttpMetadataFetcher::new(&settings.http.user_agent)?;
    println!("got {}", url);

    if args.dry_run {
        let outcome = match importer::derive_record(&fetcher, &url).await? {
            Ok(record) => Outcome::DryRun(record),
            Err(missing) => Outcome::Incomplete(missing),
        };
        report(&url, &outcome);
        return Ok(());
    }

    let creds = Credentials::from_env()?;
    info!(database_id = %creds.database_id, "credentials resolved");
    let notion = NotionClient::from_settings(&settings, &creds)?;
    let importer = Importer::new(
        fetcher,
        notion,
        creds.database_id.clone(),
        settings.notion.properties.clone(),
    );

    let outcome = importer.import(&url).await?;
    report(&url, &outcome);
    Ok(())
}

fn report(url: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Imported { page_url, .. } => {
            println!("{} imported into Notion", url);
            if let Some(page_url) = page_url {
                println!("{}", page_url);
            }
        }
        Outcome::Skipped { existing_page_id } => {
            println!("existing page found ({}) ... skipping the rest", existing_page_id);
        }
        Outcome::Incomplete(missing) => println!("Incomplete data: missing {}", missing),
        Outcome::DryRun(record) => println!("{}", record.summary()),
    }
}
