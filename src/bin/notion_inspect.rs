use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use og_notion::config::{self, Credentials};
use og_notion::notion::NotionClient;

/// Print the target database schema and check the properties the importer writes.
#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database ID to inspect (defaults to WWDC_IMPORTER_DB_ID)
    #[arg(long)]
    db_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let settings = config::load(args.config.as_deref())?;
    let creds = Credentials::from_env()?;
    let client = NotionClient::from_settings(&settings, &creds)?;

    let db_id = args.db_id.unwrap_or(creds.database_id);
    let db = client.retrieve_database(&db_id).await?;
    println!("Database ID: {}", db.id);
    println!("Title: {}", db.plain_title());
    println!("Properties:");
    for (name, prop) in &db.properties {
        println!("  {} -> {{ id: {}, type: {} }}", name, prop.id, prop.typ);
    }

    let p = &settings.notion.properties;
    let expected = [
        (&p.title, "title"),
        (&p.year, "select"),
        (&p.url, "url"),
        (&p.image, "files"),
    ];
    let mut problems = 0;
    for (name, typ) in expected {
        match db.properties.get(name.as_str()) {
            Some(prop) if prop.typ == typ => println!("ok      {} ({})", name, typ),
            Some(prop) => {
                problems += 1;
                println!("WRONG   {} is {}, expected {}", name, prop.typ, typ);
            }
            None => {
                problems += 1;
                println!("MISSING {} ({})", name, typ);
            }
        }
    }
    if problems > 0 {
        bail!("{} property mismatch(es) in database {}", problems, db_id);
    }
    Ok(())
}
