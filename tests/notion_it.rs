use anyhow::Result;

use og_notion::config::{self, Credentials};
use og_notion::importer::{Importer, Outcome};
use og_notion::notion::NotionClient;
use og_notion::opengraph::HttpMetadataFetcher;

// Talks to the real Apple and Notion endpoints. Needs
// WWDC_IMPORTER_NOTION_ACCESS_KEY and WWDC_IMPORTER_DB_ID pointing at a
// scratch database; run with `--ignored`.
#[tokio::test]
#[ignore]
async fn notion_it_imports_session_once() -> Result<()> {
    let settings = config::load(None)?;
    let creds = Credentials::from_env()?;
    let url = std::env::var("WWDC_IMPORTER_IT_URL")
        .unwrap_or_else(|_| "https://developer.apple.com/videos/play/wwdc2023/10187/".into());

    let client = NotionClient::from_settings(&settings, &creds)?;
    let fetcher = HttpMetadataFetcher::new(&settings.http.user_agent)?;
    let importer = Importer::new(
        fetcher,
        client,
        creds.database_id.clone(),
        settings.notion.properties.clone(),
    );

    let first = importer.import(&url).await?;
    match &first {
        Outcome::Imported { page_id, .. } => {
            assert!(!page_id.trim().is_empty());
            println!(
                "Created page: https://www.notion.so/{}",
                page_id.replace('-', "")
            );
        }
        Outcome::Skipped { existing_page_id } => {
            println!("Already imported as {}", existing_page_id);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let second = importer.import(&url).await?;
    assert!(matches!(second, Outcome::Skipped { .. }));
    Ok(())
}
