//! Open Graph metadata fetching.
//!
//! The fetcher downloads a page and collects its `<meta property|name>` tags.
//! Keys are looked up without the `og:` prefix, so `og:title` answers
//! `title`. `og:` properties shadow generic tags of the same name, and the
//! first occurrence of a key wins, which makes the first `og:image` the
//! primary image.
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

static META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").expect("valid meta selector"));
static LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("link[rel][href]").expect("valid link selector"));

/// Metadata extracted from a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenGraph {
    base: Url,
    og: HashMap<String, String>,
    other: HashMap<String, String>,
}

impl OpenGraph {
    /// Build from `(key, value)` pairs, treating `og:`-prefixed keys the
    /// same way as when parsing HTML.
    pub fn from_pairs<I, K, V>(base: Url, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut og = HashMap::new();
        let mut other = HashMap::new();
        for (key, value) in pairs {
            let (is_og, key) = normalize_key(key.as_ref());
            let map = if is_og { &mut og } else { &mut other };
            map.entry(key).or_insert_with(|| value.into());
        }
        Self { base, og, other }
    }

    pub fn title(&self) -> Option<&str> {
        self.value("title")
    }

    pub fn description(&self) -> Option<&str> {
        self.value("description")
    }

    /// Primary image, resolved against the page URL.
    pub fn image_url(&self) -> Option<Url> {
        ["image", "image:url", "image:secure_url"]
            .iter()
            .find_map(|key| self.url_value(key))
    }

    /// Raw string value for an arbitrary key (`og:` prefix optional).
    pub fn value(&self, key: &str) -> Option<&str> {
        let (_, key) = normalize_key(key);
        [&self.og, &self.other].into_iter().find_map(|map| {
            map.get(&key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        })
    }

    /// Value for an arbitrary key interpreted as a URL relative to the page.
    pub fn url_value(&self, key: &str) -> Option<Url> {
        self.value(key).and_then(|v| self.base.join(v).ok())
    }

    pub fn page_url(&self) -> &Url {
        &self.base
    }
}

/// Lowercased key without its `og:` prefix, and whether it had one.
fn normalize_key(key: &str) -> (bool, String) {
    let key = key.trim().to_ascii_lowercase();
    match key.strip_prefix("og:") {
        Some(stripped) => (true, stripped.to_string()),
        None => (false, key),
    }
}

/// Parse the metadata out of an HTML document. `<link rel="icon">` is
/// exposed under the `icon` key unless a meta tag already provided one.
pub fn parse_html(html: &str, base: &Url) -> OpenGraph {
    let document = Html::parse_document(html);

    let mut pairs: Vec<(String, String)> = document
        .select(&META)
        .filter_map(|element| {
            let el = element.value();
            let key = el.attr("property").or_else(|| el.attr("name"))?;
            let content = el.attr("content")?;
            Some((key.to_string(), content.to_string()))
        })
        .collect();

    let icon = document.select(&LINK).find_map(|element| {
        let el = element.value();
        let rel = el.attr("rel")?;
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("icon"))
            .then(|| el.attr("href"))
            .flatten()
    });
    if let Some(href) = icon {
        pairs.push(("icon".to_string(), href.to_string()));
    }

    OpenGraph::from_pairs(base.clone(), pairs)
}

#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<OpenGraph>;
}

#[derive(Clone)]
pub struct HttpMetadataFetcher {
    http: Client,
}

impl fmt::Debug for HttpMetadataFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpMetadataFetcher").finish_non_exhaustive()
    }
}

impl HttpMetadataFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, url: &Url) -> Result<OpenGraph> {
        info!(%url, "fetching metadata");
        let res = self
            .http
            .get(url.clone())
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await
            .with_context(|| format!("failed to reach {}", url))?;

        let status = res.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("metadata fetch for {} failed with {}", url, status));
        }

        let final_url = res.url().clone();
        let body = res
            .text()
            .await
            .with_context(|| format!("failed to read body of {}", final_url))?;
        debug!(url = %final_url, bytes = body.len(), "metadata page downloaded");

        Ok(parse_html(&body, &final_url))
    }
}
