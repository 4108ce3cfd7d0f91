use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::fmt;

use crate::opengraph::OpenGraph;

pub const TITLE_SEPARATOR: &str = " - ";

static YEAR_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"WWDC\s*(\d{2})\b").expect("valid year marker regex"));

/// One WWDC session, derived from the session page's Open Graph metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    pub id: String,
    /// The input exactly as given (trimmed); written to Notion and used as
    /// the duplicate key.
    pub source_url: String,
    pub parsed_url: Url,
    pub name: String,
    pub year: String,
    pub image_url: Url,
    pub description: String,
    pub icon_url: Option<Url>,
}

/// Why a record could not be derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Id,
    Title,
    Year,
    Image,
    Description,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Missing::Id => "session id in URL path",
            Missing::Title => "title",
            Missing::Year => "year segment in title",
            Missing::Image => "image URL",
            Missing::Description => "description",
        };
        f.write_str(what)
    }
}

/// Split a title on `" - "`, dropping empty pieces.
pub fn split_title(title: &str) -> Vec<&str> {
    title
        .split(TITLE_SEPARATOR)
        .filter(|part| !part.is_empty())
        .collect()
}

/// `"WWDC 24"` and `"WWDC24"` both become `"WWDC 2024"`; a four-digit year
/// is left alone.
pub fn expand_year(segment: &str) -> String {
    YEAR_MARKER.replace_all(segment, "WWDC 20${1}").into_owned()
}

/// Last non-empty path segment, so a trailing slash is ignored.
pub fn session_id(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

impl VideoRecord {
    pub fn derive(source_url: &str, parsed_url: &Url, og: &OpenGraph) -> Result<Self, Missing> {
        let parts = split_title(og.title().unwrap_or_default());

        let id = session_id(parsed_url).ok_or(Missing::Id)?;
        let name = parts
            .first()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or(Missing::Title)?;
        let year = parts
            .get(1)
            .map(|s| expand_year(s.trim()))
            .filter(|s| !s.is_empty())
            .ok_or(Missing::Year)?;
        let image_url = og.image_url().ok_or(Missing::Image)?;
        let description = og.description().ok_or(Missing::Description)?;

        Ok(Self {
            id,
            source_url: source_url.to_string(),
            parsed_url: parsed_url.clone(),
            name: name.to_string(),
            year,
            image_url,
            description: description.to_string(),
            icon_url: og.url_value("icon"),
        })
    }

    /// Name given to the external file in the image property.
    pub fn image_file_name(&self) -> String {
        format!("{}{}Image", self.name, TITLE_SEPARATOR)
    }

    /// Multi-line dump of the derived fields.
    pub fn summary(&self) -> String {
        format!(
            "host: {}\nid: {}\ntitle: {}\nyear: {}\nimage: {}\ndescription: {}\nicon: {}\nurl: {}",
            self.parsed_url.host_str().unwrap_or("N/A"),
            self.id,
            self.name,
            self.year,
            self.image_url,
            self.description,
            self.icon_url
                .as_ref()
                .map(Url::as_str)
                .unwrap_or("N/A"),
            self.source_url,
        )
    }
}
