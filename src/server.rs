//! HTTP surface: the three Pocket routes behind the access-token gate.
//!
//! Handlers stay thin. Each one builds a backend client from configuration,
//! makes one call into it, and serializes whatever Pocket shape comes back.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::backend::BackendConfig;
use crate::dispatch::{self, RawAction};
use crate::error::BackendError;
use crate::pocket::{item_id_from_url, PocketArticle, PocketList};

#[derive(Clone)]
pub struct AppState {
    backend: Arc<BackendConfig>,
    http: reqwest::Client,
    access_token: Arc<str>,
}

impl AppState {
    pub fn new(backend: BackendConfig, http: reqwest::Client, access_token: &str) -> Self {
        Self {
            backend: Arc::new(backend),
            http,
            access_token: Arc::from(access_token),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        let (status, code) = match &err {
            BackendError::UnsupportedAction(_) => {
                (StatusCode::BAD_REQUEST, "UNSUPPORTED_ACTION")
            }
            BackendError::InvalidId(_) => (StatusCode::BAD_REQUEST, "INVALID_ID"),
            BackendError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            BackendError::InvalidUrl { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_URL"),
            BackendError::UnsupportedContent(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNSUPPORTED_CONTENT")
            }
            BackendError::Transport(_) | BackendError::Status { .. } | BackendError::Decode(_) => {
                (StatusCode::BAD_GATEWAY, "BACKEND_ERROR")
            }
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = ErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(payload)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v3/send", post(send))
        .route("/v3/get", post(get_items))
        .route("/v3beta/text", post(text))
        .layer(middleware::from_fn_with_state(state.clone(), require_access_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn require_access_token(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Response {
    match query.get("access_token") {
        Some(token) if token.as_str() == &*state.access_token => next.run(request).await,
        _ => {
            tracing::warn!(uri = %request.uri().path(), "access token rejected");
            (StatusCode::FORBIDDEN, "Access Decline").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    #[serde(default)]
    actions: Vec<RawAction>,
}

/// `/v3/send`. The body is `{"action_results": []}` whatever happened; a
/// failed batch only changes the status code.
async fn send(State(state): State<AppState>, Json(body): Json<SendRequest>) -> Response {
    let backend = state.backend.connect(&state.http);
    let status = match dispatch::dispatch(backend.as_ref(), &body.actions).await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::error!(error = %err, "action batch failed");
            ApiError::from(err).status
        }
    };
    (status, Json(json!({ "action_results": [] }))).into_response()
}

/// Read `since` the way Pocket clients send it: a number, a numeric string,
/// or nothing at all.
fn parse_since(body: &Value) -> i64 {
    match body.get("since") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

async fn get_items(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<PocketList>> {
    let since = parse_since(&body);
    let backend = state.backend.connect(&state.http);
    let list = backend.list_since(since).await.map_err(|err| {
        tracing::error!(error = %err, since, "listing failed");
        ApiError::from(err)
    })?;
    tracing::info!(
        backend = backend.name(),
        since,
        items = list.list.len(),
        "listing served"
    );
    Ok(Json(list))
}

#[derive(Debug, Deserialize)]
struct TextRequest {
    url: String,
}

async fn text(
    State(state): State<AppState>,
    Form(form): Form<TextRequest>,
) -> ApiResult<Json<PocketArticle>> {
    let item_id = item_id_from_url(&form.url);
    let backend = state.backend.connect(&state.http);
    let article = backend.article(item_id).await.map_err(|err| {
        tracing::error!(error = %err, item_id, "article fetch failed");
        ApiError::from(err)
    })?;
    Ok(Json(article))
}

pub async fn serve(addr: SocketAddr, router: Router) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{to_bytes, Body};
    use axum::http::header::CONTENT_TYPE;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::backend::hoarder::tests::{link_bookmark, spawn_hoarder};
    use crate::backend::wallabag::tests::spawn_wallabag;
    use crate::backend::{HoarderConfig, WallabagConfig};

    const TOKEN: &str = "letmein";

    fn hoarder_app(base_url: &str) -> Router {
        router(AppState::new(
            BackendConfig::Hoarder(HoarderConfig {
                base_url: base_url.to_string(),
                api_key: "test-api-key".to_string(),
            }),
            reqwest::Client::new(),
            TOKEN,
        ))
    }

    fn wallabag_app(base_url: &str) -> Router {
        router(AppState::new(
            BackendConfig::Wallabag(WallabagConfig {
                base_url: base_url.to_string(),
                username: "reader".to_string(),
                password: "secret".to_string(),
                client_id: "cid".to_string(),
                client_secret: "csecret".to_string(),
            }),
            reqwest::Client::new(),
            TOKEN,
        ))
    }

    fn json_request(path: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("{path}?access_token={TOKEN}"))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn form_request(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("{path}?access_token={TOKEN}"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn response_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        serde_json::from_slice(&bytes).expect("parse json response")
    }

    #[test]
    fn since_is_read_leniently() {
        assert_eq!(parse_since(&json!({ "since": 1700000000 })), 1_700_000_000);
        assert_eq!(parse_since(&json!({ "since": 17.9 })), 17);
        assert_eq!(parse_since(&json!({ "since": "1700000000" })), 1_700_000_000);
        assert_eq!(parse_since(&json!({ "since": "invalid" })), 0);
        assert_eq!(parse_since(&json!({})), 0);
        assert_eq!(parse_since(&json!({ "since": null })), 0);
    }

    #[test]
    fn backend_errors_map_to_statuses() {
        let status = |err| ApiError::from(err).status;
        let upstream = BackendError::Status {
            status: 500,
            message: String::new(),
        };

        assert_eq!(
            status(BackendError::UnsupportedAction("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(BackendError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status(upstream), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status(BackendError::UnsupportedContent("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn wrong_token_is_declined() {
        let app = hoarder_app("http://127.0.0.1:1");
        let request = Request::builder()
            .method("POST")
            .uri("/v3/get?access_token=nope")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Access Decline");
    }

    #[tokio::test]
    async fn missing_token_is_declined_before_body_parsing() {
        let app = hoarder_app("http://127.0.0.1:1");
        let request = Request::builder()
            .method("POST")
            .uri("/v3/send")
            .body(Body::from("not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn get_lists_hoarder_bookmarks() {
        let page = vec![
            link_bookmark("b2", 1_700_000_600),
            link_bookmark("b1", 1_700_000_000),
        ];
        let (url, _recorder) = spawn_hoarder(vec![("", page, None)], vec![]).await;

        let response = hoarder_app(&url)
            .oneshot(json_request("/v3/get", json!({ "since": 1_699_999_000 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["status"], 1);
        assert_eq!(body["since"], 1_699_999_000);
        assert_eq!(
            body["list"]["b1"]["resolved_url"],
            "https://example.com/b1#b1"
        );
        assert_eq!(body["list"]["b2"]["word_count"], "2");
        assert_eq!(body["list"]["b2"]["favorite"], "0");
    }

    #[tokio::test]
    async fn get_with_invalid_since_walks_from_zero() {
        let (url, _recorder) = spawn_hoarder(vec![("", vec![], None)], vec![]).await;

        let response = hoarder_app(&url)
            .oneshot(json_request("/v3/get", json!({ "since": "invalid" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["since"], 0);
        assert!(body["list"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn text_resolves_id_from_fragment() {
        let items = vec![link_bookmark("abc123", 1_700_000_000)];
        let (url, _recorder) = spawn_hoarder(vec![], items).await;

        let response = hoarder_app(&url)
            .oneshot(form_request(
                "/v3beta/text",
                "url=https%3A%2F%2Fsite.test%23abc123",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["resolved_id"], "abc123");
        assert_eq!(body["article"], "<p>hello world</p>");
        assert_eq!(body["host"], "example.com");
    }

    #[tokio::test]
    async fn text_for_missing_bookmark_is_404() {
        let (url, _recorder) = spawn_hoarder(vec![], vec![]).await;

        let response = hoarder_app(&url)
            .oneshot(form_request(
                "/v3beta/text",
                "url=https%3A%2F%2Fsite.test%23gone",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response_json(response).await["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn send_with_bogus_action_still_archives_and_answers_empty_results() {
        let (url, recorder) = spawn_hoarder(vec![], vec![link_bookmark("42", 0)]).await;

        let actions = json!({ "actions": [
            { "action": "archive", "item_id": "42" },
            { "action": "bogus" }
        ] });

        let response = hoarder_app(&url)
            .oneshot(json_request("/v3/send", actions))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response_json(response).await,
            json!({ "action_results": [] })
        );
        assert_eq!(
            recorder.lock().unwrap().patches,
            vec![("42".to_string(), json!({ "archived": true }))]
        );
    }

    #[tokio::test]
    async fn send_runs_adds_and_deletes() {
        let (url, recorder) = spawn_hoarder(vec![], vec![]).await;

        let response = hoarder_app(&url)
            .oneshot(json_request(
                "/v3/send",
                json!({ "actions": [
                    { "action": "add", "url": "https://example.org" },
                    { "action": "delete", "item_id": 7 }
                ] }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response_json(response).await,
            json!({ "action_results": [] })
        );
        let recorder = recorder.lock().unwrap();
        assert_eq!(recorder.posts.len(), 1);
        assert_eq!(recorder.deletes, vec!["7".to_string()]);
    }

    #[tokio::test]
    async fn send_keeps_path_like_ids_inside_the_bookmark_route() {
        let (url, recorder) = spawn_hoarder(vec![], vec![]).await;
        let actions = json!({ "actions": [
            { "action": "delete", "item_id": "../lists/9" },
            { "action": "favorite", "item_id": "x?cursor=1" }
        ] });

        let response = hoarder_app(&url)
            .oneshot(json_request("/v3/send", actions))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let recorder = recorder.lock().unwrap();
        assert!(recorder.strays.is_empty(), "escaped: {:?}", recorder.strays);
        assert_eq!(recorder.deletes, vec!["../lists/9".to_string()]);
        assert_eq!(recorder.patches[0].0, "x?cursor=1");
    }

    #[tokio::test]
    async fn get_on_wallabag_advances_since() {
        let (url, _recorder) = spawn_wallabag().await;

        let response = wallabag_app(&url)
            .oneshot(json_request("/v3/get", json!({ "since": 5 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["status"], 1);
        assert_eq!(body["since"], 1_707_213_600);
        assert_eq!(body["list"]["1"]["time_to_read"], 3);
        assert_eq!(body["list"]["2"]["favorite"], "1");
    }

    #[tokio::test]
    async fn unreachable_backend_is_bad_gateway() {
        let response = hoarder_app("http://127.0.0.1:1")
            .oneshot(json_request("/v3/get", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
