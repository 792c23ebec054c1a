use std::sync::Arc;

use axum::{
    http::{HeaderName, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::any,
    Extension, Json, Router,
};
use dotenvy::dotenv;
use horoscope_core::{Envelope, HoroscopeError, HoroscopeService, NotionClient, CORS_HEADERS};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

type GenericError = Box<dyn std::error::Error + Send + Sync + 'static>;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> Result<(), GenericError> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let service = Arc::new(HoroscopeService::new(NotionClient::new()));
    let addr = std::env::var("HOROSCOPE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}

fn app(service: Arc<HoroscopeService>) -> Router {
    let router = Router::new()
        .route("/horoscope", any(horoscope))
        .route("/api/horoscope", any(horoscope))
        .layer(Extension(service));

    CORS_HEADERS
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ))
        })
        .layer(TraceLayer::new_for_http())
}

async fn horoscope(
    method: Method,
    Extension(service): Extension<Arc<HoroscopeService>>,
) -> Result<Response, ApiError> {
    match service.handle(&method).await? {
        Some(envelope) => Ok(Json(envelope).into_response()),
        None => Ok(().into_response()),
    }
}

pub struct ApiError(pub HoroscopeError);

impl From<HoroscopeError> for ApiError {
    fn from(err: HoroscopeError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(Envelope::failure(&self.0));
        (self.0.status_code(), body).into_response()
    }
}
