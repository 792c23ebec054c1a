use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use http::{Method, StatusCode};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::{ConfigError, Credentials, Environment, ProcessEnv};
use crate::horoscope::Horoscope;
use crate::notion::{DatabaseQuery, NotionError, QueryRequest};

/// Sent on every response, whatever the outcome.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, OPTIONS"),
    ("access-control-allow-headers", "Content-Type"),
];

#[derive(thiserror::Error, Debug)]
pub enum HoroscopeError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Server configuration error")]
    Configuration(#[from] ConfigError),
    #[error("Failed to fetch horoscope data")]
    Fetch(#[from] NotionError),
}

impl HoroscopeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HoroscopeError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            HoroscopeError::Configuration(_) | HoroscopeError::Fetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Extra detail safe to show the client.
    pub fn message(&self) -> Option<String> {
        match self {
            HoroscopeError::Fetch(err) => Some(err.to_string()),
            _ => None,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Horoscope>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Envelope {
    pub fn success(data: Vec<Horoscope>) -> Self {
        Self {
            success: true,
            data: Some(data),
            updated_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            error: None,
            message: None,
        }
    }

    pub fn failure(err: &HoroscopeError) -> Self {
        Self {
            success: false,
            data: None,
            updated_at: None,
            error: Some(err.to_string()),
            message: err.message(),
        }
    }
}

/// Queries the database sorted by day and flattens every row, keeping the
/// order the database returned. Only the first page is read.
pub async fn fetch_horoscopes(
    source: &dyn DatabaseQuery,
    credentials: &Credentials,
) -> Result<Vec<Horoscope>, HoroscopeError> {
    let query = QueryRequest::sorted_by_day(credentials.database_id.as_str());

    let response = source
        .query_database(&credentials.api_key, &query)
        .await
        .map_err(|err| {
            error!(error = %err, "Notion API error");
            err
        })?;

    if response.has_more {
        warn!(
            next_cursor = response.next_cursor.as_deref().unwrap_or_default(),
            "database has more rows than the first page, the rest are not returned"
        );
    }

    let horoscopes: Vec<Horoscope> = response.results.iter().map(Horoscope::from_page).collect();
    info!(count = horoscopes.len(), "fetched horoscopes");

    Ok(horoscopes)
}

/// Request dispatch shared by every hosting adapter.
#[derive(Clone)]
pub struct HoroscopeService {
    source: Arc<dyn DatabaseQuery>,
    env: Arc<dyn Environment>,
}

impl HoroscopeService {
    pub fn new(source: impl DatabaseQuery + 'static) -> Self {
        Self::from_parts(Arc::new(source), Arc::new(ProcessEnv))
    }

    pub fn from_parts(source: Arc<dyn DatabaseQuery>, env: Arc<dyn Environment>) -> Self {
        Self { source, env }
    }

    /// `Ok(None)` means an empty 200 (CORS preflight), `Ok(Some(_))` a 200
    /// with the success envelope.
    pub async fn handle(&self, method: &Method) -> Result<Option<Envelope>, HoroscopeError> {
        if *method == Method::OPTIONS {
            return Ok(None);
        }

        if *method != Method::GET {
            warn!(%method, "method not allowed");
            return Err(HoroscopeError::MethodNotAllowed);
        }

        let horoscopes = self.fetch().await?;
        Ok(Some(Envelope::success(horoscopes)))
    }

    pub async fn fetch(&self) -> Result<Vec<Horoscope>, HoroscopeError> {
        let credentials = Credentials::from_env(self.env.as_ref()).map_err(|err| {
            error!(error = %err, "Missing environment variables");
            err
        })?;

        fetch_horoscopes(self.source.as_ref(), &credentials).await
    }
}
