use thiserror::Error;

use crate::config::ConfigError;

/// Failures that end an import run with a non-zero exit status.
///
/// Incomplete metadata and duplicate pages are not errors; see
/// [`crate::importer::Outcome`].
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },
    #[error("failed to fetch metadata")]
    Fetch(#[source] anyhow::Error),
    #[error("Notion request failed")]
    Notion(#[source] anyhow::Error),
    #[error("page {page_id} was created but its cover could not be set")]
    CoverUpdate {
        page_id: String,
        #[source]
        source: anyhow::Error,
    },
}
