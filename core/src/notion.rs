use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";

#[derive(Debug, thiserror::Error)]
pub enum NotionError {
    #[error("{message}")]
    Api { status: u16, code: String, message: String },
    #[error("Request to Notion API failed with status: {0}")]
    UnexpectedStatus(u16),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

impl NotionError {
    /// Builds the error for a non-2xx reply, preferring Notion's own error
    /// object when the body is one.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(err) if err.object == "error" => NotionError::Api {
                status,
                code: err.code,
                message: err.message,
            },
            _ => NotionError::UnexpectedStatus(status),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    object: String,
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// The database query capability the handlers depend on.
#[async_trait]
pub trait DatabaseQuery: Send + Sync {
    async fn query_database(&self, api_key: &str, query: &QueryRequest) -> Result<QueryResponse, NotionError>;
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Goes in the URL, not the body.
    #[serde(skip)]
    pub database_id: String,
    pub sorts: Vec<Sort>,
}

impl QueryRequest {
    pub fn sorted_by_day(database_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            sorts: vec![Sort {
                property: "day".to_string(),
                direction: SortDirection::Ascending,
            }],
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Sort {
    pub property: String,
    pub direction: SortDirection,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct QueryResponse {
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Page {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
}

/// A page property, read by which value fields are present rather than by
/// its `type` tag. Each field decodes on its own, so a malformed `title`
/// does not hide a good `rich_text` next to it.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(from = "serde_json::Value")]
pub struct PropertyValue {
    pub select: Option<SelectOption>,
    pub rich_text: Option<Vec<RichTextSegment>>,
    pub title: Option<Vec<RichTextSegment>>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SelectOption {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RichTextSegment {
    #[serde(default)]
    pub plain_text: Option<String>,
}

impl RichTextSegment {
    pub fn text(&self) -> &str {
        self.plain_text.as_deref().unwrap_or_default()
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        let field = |name: &str| value.get(name).filter(|v| !v.is_null()).cloned();

        Self {
            select: field("select").and_then(|v| serde_json::from_value(v).ok()),
            rich_text: field("rich_text").and_then(|v| serde_json::from_value(v).ok()),
            title: field("title").and_then(|v| serde_json::from_value(v).ok()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotionClient {
    client: reqwest::Client,
    base_url: Arc<String>,
}

impl NotionClient {
    pub fn new_w_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: Arc::new(base_url.into().trim_end_matches('/').to_string()),
        }
    }

    pub fn new() -> Self {
        Self::new_w_client(reqwest::Client::new(), NOTION_API_BASE)
    }
}

impl Default for NotionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseQuery for NotionClient {
    async fn query_database(&self, api_key: &str, query: &QueryRequest) -> Result<QueryResponse, NotionError> {
        let url = format!("{}/databases/{}/query", self.base_url, query.database_id);

        let res = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(query)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_else(|err| {
                debug!(error = %err, %status, "failed to read Notion error body");
                String::new()
            });
            return Err(NotionError::from_response(status.as_u16(), &body));
        }

        Ok(res.json::<QueryResponse>().await?)
    }
}
