use horoscope_core::{Envelope, HoroscopeService, NotionClient, CORS_HEADERS};
use lambda_http::http::StatusCode;
use lambda_http::{run, service_fn, tracing};
use lambda_http::{Body, Error, Request, Response};

async fn function_handler(service: &HoroscopeService, event: Request) -> Result<Response<Body>, Error> {
    let (status, body) = match service.handle(event.method()).await {
        Ok(Some(envelope)) => (StatusCode::OK, serde_json::to_string(&envelope)?),
        Ok(None) => (StatusCode::OK, String::new()),
        Err(err) => (err.status_code(), serde_json::to_string(&Envelope::failure(&err))?),
    };

    let builder = CORS_HEADERS.into_iter().fold(
        Response::builder()
            .status(status)
            .header("content-type", "application/json"),
        |builder, (name, value)| builder.header(name, value),
    );

    Ok(builder.body(body.into())?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let service = HoroscopeService::new(NotionClient::new());

    run(service_fn(|event| function_handler(&service, event))).await
}

#[cfg(test)]
mod tests {
    use super::*;

    use horoscope_core::testutil::{configured_env, env_with, horoscope_page, StubSource};
    use lambda_http::http::Method;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn service(stub: &Arc<StubSource>, env: HashMap<String, String>) -> HoroscopeService {
        HoroscopeService::from_parts(stub.clone(), Arc::new(env))
    }

    fn event(method: Method) -> Request {
        lambda_http::http::Request::builder()
            .method(method)
            .uri("/.netlify/functions/horoscope")
            .body(Body::Empty)
            .unwrap()
    }

    fn body_json(response: &Response<Body>) -> Value {
        let bytes: &[u8] = response.body().as_ref();
        serde_json::from_slice(bytes).unwrap()
    }

    fn assert_headers(response: &Response<Body>) {
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "GET, OPTIONS");
        assert_eq!(headers["access-control-allow-headers"], "Content-Type");
        assert_eq!(headers["content-type"], "application/json");
    }

    #[tokio::test]
    async fn get_returns_success_envelope() {
        let stub = Arc::new(StubSource::pages(vec![
            horoscope_page("Monday", "Mar 21 - Apr 19", &["Start ", "fresh."]),
            horoscope_page("Wednesday", "May 21 - Jun 20", &["Talk it out."]),
        ]));

        let response = function_handler(&service(&stub, configured_env()), event(Method::GET))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_headers(&response);

        let body = body_json(&response);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"][0]["horoscope"], "Start fresh.");
        assert_eq!(body["data"][1]["day"], "Wednesday");
        assert!(body["updated_at"].is_string());
    }

    #[tokio::test]
    async fn options_returns_empty_body() {
        let stub = Arc::new(StubSource::pages(vec![]));

        let response = function_handler(&service(&stub, env_with(None, None)), event(Method::OPTIONS))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_headers(&response);
        let bytes: &[u8] = response.body().as_ref();
        assert!(bytes.is_empty());
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn post_returns_405() {
        let stub = Arc::new(StubSource::pages(vec![]));

        let response = function_handler(&service(&stub, configured_env()), event(Method::POST))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_headers(&response);
        assert_eq!(body_json(&response), json!({ "success": false, "error": "Method not allowed" }));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn missing_database_id_returns_500() {
        let stub = Arc::new(StubSource::pages(vec![]));

        let response = function_handler(&service(&stub, env_with(Some("secret_abc"), Some(""))), event(Method::GET))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_headers(&response);
        assert_eq!(body_json(&response), json!({ "success": false, "error": "Server configuration error" }));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn upstream_error_message_is_returned() {
        let stub = Arc::new(StubSource::failing("rate limited"));

        let response = function_handler(&service(&stub, configured_env()), event(Method::GET))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(&response),
            json!({ "success": false, "error": "Failed to fetch horoscope data", "message": "rate limited" })
        );
    }
}
