//! HTTP API handlers using axum.
//!
//! # Rust Learning Note
//!
//! ## Extractors and Shared State
//!
//! ```rust,ignore
//! async fn lookup_handler(
//!     State(catalog): State<Arc<Catalog>>,
//!     Path(name): Path<String>,
//! ) -> Result<Response, ApiError>
//! ```
//!
//! - `State(catalog)`: the catalog handed to `Router::with_state`
//! - `Path(name)`: the `{name}` URL segment
//! - `Result<_, ApiError>`: `ApiError` implements `IntoResponse`, so `?`
//!   turns any failure into an HTTP response
//!
//! POST bodies are taken as raw `Bytes` and parsed here rather than with
//! the `Json` extractor, so a client that forgets the `Content-Type`
//! header still gets through and parse failures use our message format.
//!
//! The catalog is synchronous and its file backend blocks on disk I/O, so
//! every call runs on tokio's blocking pool via `spawn_blocking`.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use catalog_common::{
    DeregisterOutcome, DeregisterRequest, Error, MessageResponse, RegisterOutcome,
    RegisterRequest, ServiceSummary, StorageErrorKind, WarnResponse,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::catalog::Catalog;
use crate::rate_limit::{rate_limit_middleware, ClientRateLimiter};

/// Creates the API router.
///
/// With a limiter, every route is rate limited per client address. CORS
/// wraps the limiter so 429 responses carry the CORS headers too.
pub fn create_router(catalog: Arc<Catalog>, limiter: Option<Arc<ClientRateLimiter>>) -> Router {
    let mut router = Router::new()
        .route("/api/v1/catalog/register", post(register_handler))
        .route("/api/v1/catalog/deregister", post(deregister_handler))
        .route("/api/v1/catalog/services", get(services_handler))
        .route("/api/v1/catalog/service/", get(missing_name_handler))
        .route("/api/v1/catalog/service/{name}", get(lookup_handler))
        .route("/api/v1/health", get(health_handler));

    if let Some(limiter) = limiter {
        router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
    }

    router
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(catalog)
}

/// Runs a catalog operation on the blocking pool.
async fn with_catalog<T, F>(catalog: Arc<Catalog>, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&Catalog) -> catalog_common::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&catalog))
        .await
        .map_err(|e| ApiError::Internal(format!("catalog task failed: {}", e)))?
        .map_err(ApiError::from)
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))
}

/// Registers a node.
async fn register_handler(
    State(catalog): State<Arc<Catalog>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req: RegisterRequest = parse_body(&body)?;
    debug!("Register request: {:?}", req);

    let outcome = with_catalog(catalog, move |c| c.register(req)).await?;

    Ok(match outcome {
        RegisterOutcome::Created => (
            StatusCode::CREATED,
            Json(MessageResponse::new("service added")),
        )
            .into_response(),
        RegisterOutcome::AlreadyExists => (
            StatusCode::CONFLICT,
            Json(WarnResponse {
                warn: "service already exists".to_string(),
            }),
        )
            .into_response(),
    })
}

/// Deregisters a node.
async fn deregister_handler(
    State(catalog): State<Arc<Catalog>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let req: DeregisterRequest = parse_body(&body)?;
    debug!("Deregister request: {:?}", req);

    let outcome = with_catalog(catalog, move |c| c.deregister(req)).await?;

    Ok(match outcome {
        DeregisterOutcome::Removed => Json(MessageResponse::new("service removed")).into_response(),
        DeregisterOutcome::NotFound => {
            ApiError::NotFound("service not found".to_string()).into_response()
        }
    })
}

/// Lists all registered services.
async fn services_handler(
    State(catalog): State<Arc<Catalog>>,
) -> Result<Json<Vec<ServiceSummary>>, ApiError> {
    let services = with_catalog(catalog, |c| c.list()).await?;
    Ok(Json(services))
}

/// Returns one service, wrapped in a single-element array.
async fn lookup_handler(
    State(catalog): State<Arc<Catalog>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    debug!("Lookup: {}", name);

    match with_catalog(catalog, move |c| c.lookup(&name)).await? {
        Some(details) => Ok(Json(vec![details]).into_response()),
        None => Err(ApiError::NotFound("service name not found".to_string())),
    }
}

async fn missing_name_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

/// API error type.
///
/// # Rust Learning Note
///
/// Implementing `IntoResponse` lets handlers return `Result<_, ApiError>`
/// and use `?`. The `From<Error>` impl decides the status code for each
/// catalog error in one place.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match &err {
            Error::Validation { message } => ApiError::BadRequest(message.clone()),
            _ if err.is_not_found() => ApiError::NotFound(err.to_string()),
            _ => match err.storage_kind() {
                Some(StorageErrorKind::Retryable) => ApiError::Unavailable(err.to_string()),
                _ => ApiError::Internal(err.to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            error!("API error: {} - {}", status, message);
        } else {
            warn!("API error: {} - {}", status, message);
        }

        (status, Json(MessageResponse::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, ServiceQuery, ServiceStore};
    use crate::types::Service;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::util::ServiceExt; // for `oneshot`

    const ID_A: &str = "11111111-1111-1111-1111-111111111111";

    fn app() -> Router {
        create_router(Arc::new(Catalog::new(Arc::new(MemoryStore::new()))), None)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        (status, body)
    }

    fn web_node() -> Value {
        json!({
            "name": "web",
            "address": "10.0.0.1",
            "service_port": 8080,
            "node_id": ID_A,
        })
    }

    #[tokio::test]
    async fn test_register_then_conflict() {
        let app = app();

        let (status, body) = send(&app, post_json("/api/v1/catalog/register", web_node())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"message": "service added"}));

        let (status, body) = send(&app, post_json("/api/v1/catalog/register", web_node())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, json!({"warn": "service already exists"}));
    }

    #[tokio::test]
    async fn test_register_missing_field() {
        let app = app();
        let body = json!({"name": "web", "address": "10.0.0.1", "node_id": ID_A});

        let (status, body) = send(&app, post_json("/api/v1/catalog/register", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "'service_port' can't be null"}));
    }

    #[tokio::test]
    async fn test_register_without_content_type() {
        let app = app();
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/catalog/register")
            .body(Body::from(serde_json::to_vec(&web_node()).unwrap()))
            .unwrap();

        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = app();
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/catalog/deregister")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("invalid JSON"));
    }

    #[tokio::test]
    async fn test_lookup_redacts_node_id() {
        let app = app();
        send(&app, post_json("/api/v1/catalog/register", web_node())).await;

        let (status, body) = send(&app, get_req("/api/v1/catalog/service/web")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{
                "name": "web",
                "description": null,
                "nodes": [{"address": "10.0.0.1", "service_port": 8080}]
            }])
        );
        assert!(!body.to_string().contains(ID_A));
    }

    #[tokio::test]
    async fn test_lookup_unknown_and_missing_name() {
        let app = app();

        let (status, body) = send(&app, get_req("/api/v1/catalog/service/ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"message": "service name not found"}));

        let (status, _) = send(&app, get_req("/api/v1/catalog/service/")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_services_and_deregister() {
        let app = app();
        let mut with_description = web_node();
        with_description["description"] = json!("frontend");
        send(&app, post_json("/api/v1/catalog/register", with_description)).await;

        let (status, body) = send(&app, get_req("/api/v1/catalog/services")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"name": "web", "description": "frontend"}]));

        let dereg = json!({"name": "web", "node_id": ID_A});
        let (status, body) = send(&app, post_json("/api/v1/catalog/deregister", dereg.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "service removed"}));

        let (status, body) = send(&app, post_json("/api/v1/catalog/deregister", dereg)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"message": "service not found"}));

        let (_, body) = send(&app, get_req("/api/v1/catalog/services")).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, body) = send(&app(), get_req("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("OK".to_string()));
    }

    #[tokio::test]
    async fn test_responses_allow_any_origin() {
        let app = app();

        let with_origin = Request::builder()
            .method("GET")
            .uri("/api/v1/catalog/services")
            .header("origin", "http://dashboard.example")
            .body(Body::empty())
            .unwrap();
        for req in [with_origin, get_req("/api/v1/catalog/service/ghost")] {
            let response = app.clone().oneshot(req).await.unwrap();
            assert_eq!(
                response.headers().get("access-control-allow-origin").unwrap(),
                "*"
            );
        }
    }

    fn from_client(mut req: Request<Body>, client: &str) -> Request<Body> {
        let addr: std::net::SocketAddr = client.parse().unwrap();
        req.extensions_mut().insert(axum::extract::ConnectInfo(addr));
        req
    }

    #[tokio::test]
    async fn test_rate_limit_is_per_client() {
        let limiter = ClientRateLimiter::per_minute(std::num::NonZeroU32::new(2).unwrap());
        let app = create_router(
            Arc::new(Catalog::new(Arc::new(MemoryStore::new()))),
            Some(Arc::new(limiter)),
        );

        for _ in 0..2 {
            let req = from_client(get_req("/api/v1/health"), "10.0.0.1:40000");
            assert_eq!(send(&app, req).await.0, StatusCode::OK);
        }

        let req = from_client(get_req("/api/v1/catalog/services"), "10.0.0.1:40001");
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = response.headers()["retry-after"].to_str().unwrap().parse().unwrap();
        assert!(retry_after >= 1 && retry_after <= 30);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            serde_json::from_slice::<Value>(&bytes).unwrap(),
            json!({"message": "rate limit exceeded"})
        );

        let other = from_client(get_req("/api/v1/health"), "10.0.0.2:40000");
        assert_eq!(send(&app, other).await.0, StatusCode::OK);
    }

    struct ReadOnlyStore;

    impl ServiceStore for ReadOnlyStore {
        fn get(&self, _query: &ServiceQuery) -> catalog_common::Result<Service> {
            Err(Error::not_found("service"))
        }

        fn filter(&self, _query: &ServiceQuery) -> catalog_common::Result<Vec<Service>> {
            Err(Error::storage(StorageErrorKind::Retryable, "timed out"))
        }

        fn save(&self, _service: &Service) -> catalog_common::Result<()> {
            Err(Error::storage(StorageErrorKind::Fatal, "read-only filesystem"))
        }

        fn delete(&self, _service: &Service) -> catalog_common::Result<()> {
            Ok(())
        }

        fn describe(&self) -> String {
            "read-only".to_string()
        }
    }

    #[tokio::test]
    async fn test_storage_errors_map_to_server_errors() {
        let app = create_router(Arc::new(Catalog::new(Arc::new(ReadOnlyStore))), None);

        let (status, _) = send(&app, post_json("/api/v1/catalog/register", web_node())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _) = send(&app, get_req("/api/v1/catalog/services")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
