//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: maps method and path to an
//! endpoint, enforces allowed methods, stamps common headers, and writes
//! the access log.

use crate::config::AppState;
use crate::handler::{dev_server, sheets, static_files};
use crate::http::{self, HttpResponse, ALLOW_READ};
use crate::logger::{self, AccessLogEntry};
use hyper::body::Body;
use hyper::header::{HeaderMap, HeaderValue};
use hyper::http::request::Parts;
use hyper::{Method, Request};
use std::borrow::Cow;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

const ALLOW_SAVE: &str = "POST, OPTIONS";
const ALLOW_START: &str = "GET, OPTIONS";

/// Request context encapsulating information needed for static file serving
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub range_header: Option<String>,
}

/// Endpoint a request path resolves to
#[derive(Debug, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Health,
    Save,
    Load(Cow<'a, str>),
    StartDevServer,
    DevServerStatus,
    Static,
}

impl<'a> Endpoint<'a> {
    /// Resolve a raw (still percent-encoded) request path. Sheet ids are
    /// decoded before the segment check, so `%2F` never joins segments.
    pub fn resolve(path: &'a str, health_path: Option<&str>) -> Self {
        if health_path == Some(path) {
            return Self::Health;
        }
        match path {
            "/save" => Self::Save,
            "/start-react" => Self::StartDevServer,
            "/dev-server/status" => Self::DevServerStatus,
            _ => match path.strip_prefix("/load/").map(urlencoding::decode) {
                // A sheet id is one non-empty path segment once decoded
                Some(Ok(id)) if !id.is_empty() && !id.contains('/') => Self::Load(id),
                _ => Self::Static,
            },
        }
    }

    const fn allow(&self) -> &'static str {
        match self {
            Self::Save => ALLOW_SAVE,
            Self::StartDevServer => ALLOW_START,
            _ => ALLOW_READ,
        }
    }

    fn accepts(&self, method: &Method) -> bool {
        match self {
            Self::Save => *method == Method::POST,
            Self::StartDevServer => *method == Method::GET,
            _ => *method == Method::GET || *method == Method::HEAD,
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<HttpResponse, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let mut response = route_request(&parts, body, &state).await;
    stamp_common_headers(response.headers_mut(), &state);

    if state.access_log() {
        logger::log_access(&access_entry(&parts, &response, peer_addr, started));
    }
    Ok(response)
}

/// Dispatch to the endpoint handler
async fn route_request<B>(parts: &Parts, body: B, state: &AppState) -> HttpResponse
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let health_path = state
        .config
        .health
        .enabled
        .then_some(state.config.health.path.as_str());
    let endpoint = Endpoint::resolve(parts.uri.path(), health_path);

    if parts.method == Method::OPTIONS {
        return http::build_options_response(endpoint.allow(), state.config.http.enable_cors);
    }
    if !endpoint.accepts(&parts.method) {
        logger::log_warning(&format!(
            "Method not allowed: {} {}",
            parts.method,
            parts.uri.path()
        ));
        return http::build_405_response(endpoint.allow());
    }
    if let Some(resp) = check_body_size(&parts.headers, state.config.http.max_body_size) {
        return resp;
    }

    match endpoint {
        Endpoint::Health => http::build_text_response("ok"),
        Endpoint::Save => sheets::save(body, state).await,
        Endpoint::Load(id) => sheets::load(&id, state).await,
        Endpoint::StartDevServer => dev_server::start(state).await,
        Endpoint::DevServerStatus => dev_server::status(state).await,
        Endpoint::Static => {
            let ctx = RequestContext {
                path: parts.uri.path(),
                is_head: parts.method == Method::HEAD,
                if_none_match: header_string(&parts.headers, "if-none-match"),
                range_header: header_string(&parts.headers, "range"),
            };
            static_files::serve(&ctx, &state.config.static_files).await
        }
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<HttpResponse> {
    let size_str = headers.get("content-length")?.to_str().ok()?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_error(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_413_response())
        }
        Ok(_) => None,
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            None
        }
    }
}

/// `Server` on every response, `Access-Control-Allow-Origin` when CORS is on
fn stamp_common_headers(headers: &mut HeaderMap, state: &AppState) {
    if let Ok(name) = HeaderValue::from_str(&state.config.http.server_name) {
        headers.insert("server", name);
    }
    if state.config.http.enable_cors {
        headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    }
}

fn access_entry(
    parts: &Parts,
    response: &HttpResponse,
    peer_addr: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = match parts.version {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    entry.referer = header_string(&parts.headers, "referer");
    entry.user_agent = header_string(&parts.headers, "user-agent");
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use hyper::StatusCode;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    const INDEX: &str = "<!doctype html><title>zxcel</title>\n";

    fn app() -> (TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), INDEX).unwrap();
        std::fs::write(dir.path().join("manifest.json"), r#"{"name":"zxcel"}"#).unwrap();

        let mut cfg = Config::load_from("definitely/not/a/config/file").unwrap();
        cfg.static_files.root = dir.path().to_str().unwrap().to_string();
        cfg.dev_server.program = "zxcel-no-such-dev-server-binary".to_string();
        cfg.dev_server.working_dir = ".".to_string();
        cfg.logging.access_log = false;
        (dir, Arc::new(AppState::new(&cfg)))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn send(
        state: &Arc<AppState>,
        method: Method,
        uri: &str,
        body: &str,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from(body.to_owned())))
            .unwrap();
        let resp = handle_request(req, Arc::clone(state), peer()).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, headers, bytes)
    }

    fn json(bytes: &Bytes) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn test_endpoint_resolution() {
        let health = Some("/healthz");
        assert_eq!(Endpoint::resolve("/healthz", health), Endpoint::Health);
        assert_eq!(Endpoint::resolve("/healthz", None), Endpoint::Static);
        assert_eq!(Endpoint::resolve("/save", health), Endpoint::Save);
        assert_eq!(
            Endpoint::resolve("/load/sheet1", health),
            Endpoint::Load("sheet1".into())
        );
        assert_eq!(
            Endpoint::resolve("/load/Q1%20budget", health),
            Endpoint::Load("Q1 budget".into())
        );
        assert_eq!(Endpoint::resolve("/load/a%2Fb", health), Endpoint::Static);
        assert_eq!(Endpoint::resolve("/load/%2f", health), Endpoint::Static);
        assert_eq!(Endpoint::resolve("/load/%FF", health), Endpoint::Static);
        assert_eq!(Endpoint::resolve("/load/", health), Endpoint::Static);
        assert_eq!(Endpoint::resolve("/load/a/b", health), Endpoint::Static);
        assert_eq!(Endpoint::resolve("/start-react", health), Endpoint::StartDevServer);
        assert_eq!(
            Endpoint::resolve("/dev-server/status", health),
            Endpoint::DevServerStatus
        );
        assert_eq!(Endpoint::resolve("/", health), Endpoint::Static);
        assert_eq!(Endpoint::resolve("/static/js/main.js", health), Endpoint::Static);
    }

    #[tokio::test]
    async fn test_save_then_load_scenario() {
        let (_dir, state) = app();

        let (status, headers, body) = send(
            &state,
            Method::POST,
            "/save",
            r#"{"id":"sheet1","content":[[1,2],[3,4]]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(
            json(&body),
            json!({"status": "success", "message": "Data saved successfully"})
        );

        let (status, _, body) = send(&state, Method::GET, "/load/sheet1", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body), json!({"status": "success", "content": [[1, 2], [3, 4]]}));
    }

    #[tokio::test]
    async fn test_load_unknown_scenario() {
        let (_dir, state) = app();
        let (status, _, body) = send(&state, Method::GET, "/load/unknown", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body), json!({"status": "error", "message": "Data not found"}));
    }

    #[tokio::test]
    async fn test_encoded_sheet_id() {
        let (_dir, state) = app();
        send(&state, Method::POST, "/save", r#"{"id":"Q1 budget","content":7}"#).await;

        let (status, _, body) = send(&state, Method::GET, "/load/Q1%20budget", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["content"], 7);
    }

    #[tokio::test]
    async fn test_start_react_without_tool() {
        let (_dir, state) = app();
        let (status, _, body) = send(&state, Method::GET, "/start-react", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let value = json(&body);
        assert_eq!(value["status"], "error");
        assert!(!value["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_root_returns_index_bytes() {
        let (_dir, state) = app();
        let (status, headers, body) = send(&state, Method::GET, "/", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_ref(), INDEX.as_bytes());
        assert_eq!(headers["server"], "zxcel-back");

        let (status, _, body) = send(&state, Method::GET, "/manifest.json", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_ref(), br#"{"name":"zxcel"}"#);

        let (status, _, _) = send(&state, Method::GET, "/nope.js", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, state) = app();
        let (status, _, body) = send(&state, Method::GET, "/healthz", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn test_method_rules() {
        let (_dir, state) = app();

        let (status, headers, _) = send(&state, Method::GET, "/save", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(headers["allow"], ALLOW_SAVE);

        let (status, _, _) = send(&state, Method::POST, "/load/sheet1", "{}").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _, _) = send(&state, Method::DELETE, "/", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, headers, _) = send(&state, Method::OPTIONS, "/save", "").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(headers["allow"], ALLOW_SAVE);
    }

    #[tokio::test]
    async fn test_malformed_save_is_400() {
        let (_dir, state) = app();
        let (status, _, body) = send(&state, Method::POST, "/save", r#"{"content":1}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["status"], "error");
        assert!(state.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_declared_oversized_body_is_413() {
        let (_dir, state) = app();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/save")
            .header("content-length", "99999999999")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = handle_request(req, Arc::clone(&state), peer()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_encoded_slash_in_id_is_not_a_sheet() {
        let (_dir, state) = app();
        send(&state, Method::POST, "/save", r#"{"id":"a/b","content":1}"#).await;

        let (status, headers, _) = send(&state, Method::GET, "/load/a%2Fb", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_ne!(headers["content-type"], "application/json");
    }

    #[tokio::test]
    async fn test_cors_header_on_json_responses() {
        let (dir, _) = app();
        let mut cfg = Config::load_from("definitely/not/a/config/file").unwrap();
        cfg.static_files.root = dir.path().to_str().unwrap().to_string();
        cfg.http.enable_cors = true;
        cfg.logging.access_log = false;
        let state = Arc::new(AppState::new(&cfg));

        let (status, headers, _) =
            send(&state, Method::POST, "/save", r#"{"id":"x","content":[1]}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["access-control-allow-origin"], "*");

        let (status, headers, _) = send(&state, Method::GET, "/load/x", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["access-control-allow-origin"], "*");

        let (status, headers, _) = send(&state, Method::GET, "/load/missing", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(headers["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_no_cors_header_by_default() {
        let (_dir, state) = app();
        let (_, headers, _) = send(&state, Method::GET, "/load/x", "").await;
        assert!(!headers.contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn test_head_load() {
        let (_dir, state) = app();
        send(&state, Method::POST, "/save", r#"{"id":"sheet1","content":[[1]]}"#).await;

        let (status, headers, _) = send(&state, Method::HEAD, "/load/sheet1", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["content-type"], "application/json");

        let (status, _, _) = send(&state, Method::HEAD, "/load/unknown", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
