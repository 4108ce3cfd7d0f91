use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::{Credentials, Properties, Settings};
use crate::model::VideoRecord;
use crate::notion::model::{Page, PageSummary, QueryDatabaseResp, RetrieveDatabaseResp};

pub mod model;

const NOTION_API_BASE: &str = "https://api.notion.com/";
const NOTION_VERSION: &str = "2022-06-28";
const QUERY_PAGE_SIZE: u32 = 100;
/// Notion rejects rich-text runs longer than this many characters.
pub const RICH_TEXT_LIMIT: usize = 2000;

#[derive(Clone)]
pub struct NotionClient {
    http: Client,
    base_url: Url,
    token: String,
    version: String,
}

impl fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// The three workspace operations the importer depends on.
#[async_trait]
pub trait NotionService: Send + Sync {
    /// Every page of the database, following pagination to the end.
    async fn query_database(&self, database_id: &str) -> Result<Vec<PageSummary>>;

    async fn create_page(&self, body: Value) -> Result<Page>;

    async fn update_page(&self, page_id: &str, body: Value) -> Result<Page>;
}

impl NotionClient {
    pub fn new(token: String) -> Result<Self> {
        let base_url = Url::parse(NOTION_API_BASE).context("invalid default Notion URL")?;
        Self::with_base_url(token, NOTION_VERSION.into(), base_url, "og-notion")
    }

    pub fn with_base_url(
        token: String,
        version: String,
        base_url: Url,
        user_agent: &str,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("failed to build Notion HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token,
            version,
        })
    }

    pub fn from_settings(settings: &Settings, creds: &Credentials) -> Result<Self> {
        let base_url = Url::parse(&settings.notion.base_url).context("invalid Notion base URL")?;
        Self::with_base_url(
            creds.access_key.clone(),
            settings.notion.version.clone(),
            base_url,
            &settings.http.user_agent,
        )
    }

    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(path)
            .context("invalid Notion base URL")?;
        let mut builder = self
            .http
            .request(method, endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", &self.version);
        if let Some(body) = body {
            builder = builder
                .header("Content-Type", "application/json")
                .json(body);
        }
        builder.build().context("failed to build Notion request")
    }

    async fn execute<T: DeserializeOwned>(&self, request: reqwest::Request) -> Result<T> {
        debug!(method = %request.method(), url = %request.url(), "=== NOTION API REQUEST ===");
        for (name, value) in request.headers() {
            if name.as_str().eq_ignore_ascii_case("authorization") {
                debug!("  {}: Bearer [REDACTED]", name);
            } else {
                debug!("  {}: {}", name, value.to_str().unwrap_or("[invalid]"));
            }
        }
        if let Some(payload) = request.body().and_then(|b| b.as_bytes()) {
            debug!("Request Payload: {}", String::from_utf8_lossy(payload));
        }

        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach Notion")?;

        let status = res.status();
        debug!(%status, "=== NOTION API RESPONSE ===");

        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!("Rate limited by Notion: {}", body);
            return Err(anyhow!("received 429 from Notion: {}", body));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!("Notion API error - Status: {}, Body: {}", status, body);
            return Err(anyhow!("notion error {}: {}", status, body));
        }

        let response_body = res.text().await.context("failed to read Notion response")?;
        debug!("Response Body: {}", response_body);
        serde_json::from_str(&response_body).context("invalid Notion response JSON")
    }

    pub async fn query_database(&self, database_id: &str) -> Result<Vec<PageSummary>> {
        let path = format!("v1/databases/{}/query", database_id);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let body = build_query_request(cursor.as_deref());
            let request = self.build_request(Method::POST, &path, Some(&body))?;
            let resp: QueryDatabaseResp = self
                .execute(request)
                .await
                .with_context(|| format!("failed to query Notion database {}", database_id))?;
            pages.extend(resp.results);
            match resp.next_cursor.filter(|_| resp.has_more) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        info!(database_id, count = pages.len(), "queried Notion database");
        Ok(pages)
    }

    pub async fn create_page(&self, body: Value) -> Result<Page> {
        let request = self.build_request(Method::POST, "v1/pages", Some(&body))?;
        let page: Page = self.execute(request).await?;
        info!("Successfully created Notion page with ID: {}", page.id);
        Ok(page)
    }

    pub async fn update_page(&self, page_id: &str, body: Value) -> Result<Page> {
        let path = format!("v1/pages/{}", page_id);
        let request = self.build_request(Method::PATCH, &path, Some(&body))?;
        let page: Page = self.execute(request).await?;
        info!("Successfully updated Notion page with ID: {}", page.id);
        Ok(page)
    }

    pub async fn retrieve_database(&self, database_id: &str) -> Result<RetrieveDatabaseResp> {
        let path = format!("v1/databases/{}", database_id);
        let request = self.build_request(Method::GET, &path, None)?;
        self.execute(request)
            .await
            .with_context(|| format!("failed to retrieve Notion database {}", database_id))
    }
}

#[async_trait]
impl NotionService for NotionClient {
    async fn query_database(&self, database_id: &str) -> Result<Vec<PageSummary>> {
        NotionClient::query_database(self, database_id).await
    }

    async fn create_page(&self, body: Value) -> Result<Page> {
        NotionClient::create_page(self, body).await
    }

    async fn update_page(&self, page_id: &str, body: Value) -> Result<Page> {
        NotionClient::update_page(self, page_id, body).await
    }
}

pub fn build_query_request(start_cursor: Option<&str>) -> Value {
    let mut body = Map::new();
    body.insert("page_size".into(), json!(QUERY_PAGE_SIZE));
    if let Some(cursor) = start_cursor {
        body.insert("start_cursor".into(), json!(cursor));
    }
    Value::Object(body)
}

/// Split text into rich-text runs that each fit the per-run length limit.
pub fn rich_text_runs(text: &str) -> Vec<Value> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(RICH_TEXT_LIMIT)
        .map(|chunk| {
            let content: String = chunk.iter().collect();
            json!({ "type": "text", "text": { "content": content } })
        })
        .collect()
}

pub fn build_page_create_request(
    database_id: &str,
    props: &Properties,
    record: &VideoRecord,
) -> Value {
    let mut properties = Map::new();
    properties.insert(
        props.title.clone(),
        json!({
            "title": [
                {
                    "text": {
                        "content": record.name,
                    }
                }
            ]
        }),
    );
    properties.insert(
        props.year.clone(),
        json!({ "select": { "name": record.year } }),
    );
    properties.insert(
        props.url.clone(),
        json!({ "url": record.source_url }),
    );
    properties.insert(
        props.image.clone(),
        json!({
            "files": [
                {
                    "name": record.image_file_name(),
                    "type": "external",
                    "external": { "url": record.image_url.as_str() }
                }
            ]
        }),
    );

    json!({
        "parent": { "database_id": database_id },
        "properties": Value::Object(properties),
        "children": [
            {
                "object": "block",
                "type": "paragraph",
                "paragraph": {
                    "rich_text": rich_text_runs(&record.description),
                    "color": "default"
                }
            }
        ],
    })
}

pub fn build_cover_update_request(image_url: &Url) -> Value {
    json!({
        "cover": {
            "type": "external",
            "external": { "url": image_url.as_str() }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opengraph::OpenGraph;

    fn sample_record() -> VideoRecord {
        let src = Url::parse("https://developer.apple.com/videos/play/wwdc2024/10123/").unwrap();
        let og = OpenGraph::from_pairs(
            src.clone(),
            [
                ("og:title", "Building with SwiftData - WWDC 24"),
                ("og:description", "A talk."),
                ("og:image", "https://example.com/img.png"),
            ],
        );
        VideoRecord::derive(src.as_str(), &src, &og).unwrap()
    }

    #[test]
    fn build_page_create_request_includes_all_properties() {
        let body = build_page_create_request("db-1", &Properties::default(), &sample_record());
        assert_eq!(body["parent"]["database_id"], "db-1");
        let props = &body["properties"];
        assert_eq!(
            props["Name"]["title"][0]["text"]["content"],
            "Building with SwiftData"
        );
        assert_eq!(props["Year"]["select"]["name"], "WWDC 2024");
        assert_eq!(
            props["URL"]["url"],
            "https://developer.apple.com/videos/play/wwdc2024/10123/"
        );
        assert_eq!(
            props["Image"]["files"][0]["name"],
            "Building with SwiftData - Image"
        );
        assert_eq!(props["Image"]["files"][0]["type"], "external");
        assert_eq!(
            props["Image"]["files"][0]["external"]["url"],
            "https://example.com/img.png"
        );
        assert_eq!(body["children"].as_array().unwrap().len(), 1);
        assert_eq!(body["children"][0]["type"], "paragraph");
        assert_eq!(
            body["children"][0]["paragraph"]["rich_text"][0]["text"]["content"],
            "A talk."
        );
    }

    #[test]
    fn build_page_create_request_uses_configured_names() {
        let props = Properties {
            title: "Title".into(),
            year: "Event".into(),
            url: "Link".into(),
            image: "Poster".into(),
        };
        let body = build_page_create_request("db-1", &props, &sample_record());
        assert!(body["properties"].get("Name").is_none());
        assert_eq!(body["properties"]["Event"]["select"]["name"], "WWDC 2024");
        assert!(body["properties"]["Link"]["url"].is_string());
        assert!(body["properties"]["Poster"]["files"].is_array());
    }

    #[test]
    fn rich_text_runs_respect_limit() {
        let text = "é".repeat(RICH_TEXT_LIMIT * 2 + 5);
        let runs = rich_text_runs(&text);
        assert_eq!(runs.len(), 3);
        let last = runs[2]["text"]["content"].as_str().unwrap();
        assert_eq!(last.chars().count(), 5);
        assert!(rich_text_runs("").is_empty());
    }

    #[test]
    fn build_cover_update_request_is_external() {
        let url = Url::parse("https://example.com/img.png").unwrap();
        let body = build_cover_update_request(&url);
        assert_eq!(body["cover"]["type"], "external");
        assert_eq!(body["cover"]["external"]["url"], "https://example.com/img.png");
    }

    #[test]
    fn build_query_request_adds_cursor() {
        assert_eq!(build_query_request(None), json!({ "page_size": 100 }));
        assert_eq!(
            build_query_request(Some("abc"))["start_cursor"],
            "abc"
        );
    }

    #[test]
    fn query_response_exposes_url_property() {
        let raw = json!({
            "object": "list",
            "results": [
                {
                    "object": "page",
                    "id": "p1",
                    "properties": {
                        "URL": { "id": "a", "type": "url", "url": "https://example.com/id" },
                        "Name": { "id": "title", "type": "title", "title": [] }
                    }
                },
                {
                    "object": "page",
                    "id": "p2",
                    "properties": {
                        "URL": { "id": "a", "type": "url", "url": null }
                    }
                }
            ],
            "has_more": true,
            "next_cursor": "cur-2"
        });
        let resp: QueryDatabaseResp = serde_json::from_value(raw).unwrap();
        assert!(resp.has_more);
        assert_eq!(resp.next_cursor.as_deref(), Some("cur-2"));
        assert_eq!(resp.results[0].url_property("URL"), Some("https://example.com/id"));
        assert_eq!(resp.results[0].url_property("Name"), None);
        assert_eq!(resp.results[1].url_property("URL"), None);
    }

    #[test]
    fn build_request_sets_headers() {
        let client = NotionClient::new("token".into()).unwrap();
        let body = json!({ "sample": true });
        let request = client
            .build_request(Method::PATCH, "v1/pages/abc", Some(&body))
            .unwrap();
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(request.url().path(), "/v1/pages/abc");
        let headers = request.headers();
        assert_eq!(
            headers
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "Bearer token"
        );
        assert_eq!(
            headers
                .get("Notion-Version")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "2022-06-28"
        );
        assert_eq!(
            headers
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "application/json"
        );
    }

    #[test]
    fn build_request_without_body_has_no_content_type() {
        let client = NotionClient::new("token".into()).unwrap();
        let request = client
            .build_request(Method::GET, "v1/databases/db-1", None)
            .unwrap();
        assert_eq!(request.url().as_str(), "https://api.notion.com/v1/databases/db-1");
        assert!(request.headers().get("Content-Type").is_none());
    }
}
