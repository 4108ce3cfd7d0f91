//! The import workflow: metadata → record → duplicate check → page → cover.
//!
//! Every remote call is awaited before the next one starts. Nothing is
//! retried and nothing is rolled back.
use reqwest::Url;
use tracing::{debug, info, instrument, warn};

use crate::config::Properties;
use crate::error::ImportError;
use crate::model::{Missing, VideoRecord};
use crate::notion::{build_cover_update_request, build_page_create_request, NotionService};
use crate::opengraph::MetadataFetcher;

/// How a run ended when no error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Imported {
        page_id: String,
        page_url: Option<String>,
        record: VideoRecord,
    },
    /// A page with the same URL already exists.
    Skipped { existing_page_id: String },
    Incomplete(Missing),
    /// Record derived but Notion was not contacted.
    DryRun(VideoRecord),
}

pub fn parse_url(raw: &str) -> Result<Url, ImportError> {
    Url::parse(raw.trim()).map_err(|err| ImportError::InvalidUrl {
        input: raw.to_string(),
        reason: err.to_string(),
    })
}

/// Parse the input, fetch its metadata and derive the record. The inner
/// `Err` is the graceful "incomplete data" branch.
pub async fn derive_record<F>(
    fetcher: &F,
    raw_url: &str,
) -> Result<Result<VideoRecord, Missing>, ImportError>
where
    F: MetadataFetcher + ?Sized,
{
    let url = parse_url(raw_url)?;
    let og = fetcher.fetch(&url).await.map_err(ImportError::Fetch)?;
    let record = VideoRecord::derive(raw_url.trim(), &url, &og);
    if let Err(missing) = &record {
        debug!(%url, %missing, "record not derived");
    }
    Ok(record)
}

pub struct Importer<F, N> {
    fetcher: F,
    notion: N,
    database_id: String,
    properties: Properties,
}

impl<F, N> Importer<F, N>
where
    F: MetadataFetcher,
    N: NotionService,
{
    pub fn new(fetcher: F, notion: N, database_id: String, properties: Properties) -> Self {
        Self {
            fetcher,
            notion,
            database_id,
            properties,
        }
    }

    #[instrument(skip_all, fields(url = %raw_url))]
    pub async fn import(&self, raw_url: &str) -> Result<Outcome, ImportError> {
        let record = match derive_record(&self.fetcher, raw_url).await? {
            Ok(record) => record,
            Err(missing) => return Ok(Outcome::Incomplete(missing)),
        };

        info!(name = %record.name, "searching for existing page");
        if let Some(existing_page_id) = self.find_existing(&record).await? {
            info!(page_id = %existing_page_id, "existing page found, skipping");
            return Ok(Outcome::Skipped { existing_page_id });
        }

        info!(name = %record.name, year = %record.year, "creating page");
        let body = build_page_create_request(&self.database_id, &self.properties, &record);
        let page = self
            .notion
            .create_page(body)
            .await
            .map_err(ImportError::Notion)?;

        let cover = build_cover_update_request(&record.image_url);
        if let Err(err) = self.notion.update_page(&page.id, cover).await {
            warn!(page_id = %page.id, ?err, "page left without cover");
            return Err(ImportError::CoverUpdate {
                page_id: page.id,
                source: err,
            });
        }

        Ok(Outcome::Imported {
            page_id: page.id,
            page_url: page.url,
            record,
        })
    }

    /// Id of the first page whose URL property equals the input URL
    /// byte-for-byte.
    async fn find_existing(&self, record: &VideoRecord) -> Result<Option<String>, ImportError> {
        let pages = self
            .notion
            .query_database(&self.database_id)
            .await
            .map_err(ImportError::Notion)?;
        let wanted = record.source_url.as_str();
        Ok(pages
            .into_iter()
            .find(|page| page.url_property(&self.properties.url) == Some(wanted))
            .map(|page| page.id))
    }
}
