use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Deserialize, Debug)]
pub struct DatabaseProperty {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: String,
}

#[derive(Deserialize, Debug)]
pub struct RetrieveDatabaseResp {
    pub id: String,
    #[serde(default)]
    pub title: Vec<Value>,
    pub properties: HashMap<String, DatabaseProperty>,
}

impl RetrieveDatabaseResp {
    /// Concatenated plain text of the database title.
    pub fn plain_title(&self) -> String {
        self.title
            .iter()
            .filter_map(|t| t.get("plain_text").and_then(Value::as_str))
            .collect()
    }
}

/// One page of a database query.
#[derive(Deserialize, Debug)]
pub struct QueryDatabaseResp {
    pub results: Vec<PageSummary>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PageSummary {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
}

impl PageSummary {
    /// Value of a URL-typed property; other property types yield `None`.
    pub fn url_property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .filter(|p| p.typ == "url")
            .and_then(|p| p.url.as_deref())
    }
}

/// Only the `url` payload is kept; other property payloads are ignored.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PropertyValue {
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Page object returned by create/update.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}
