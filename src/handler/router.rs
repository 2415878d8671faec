//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, body limits,
//! dispatch, common headers and the access log.

use super::{inference, pages, search, static_files, HandlerError};
use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, SERVER};
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const STATIC_PREFIX: &str = "/static/";

/// Form and JSON endpoints, all POST-only
#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Search,
    Predict,
    Results,
}

impl Endpoint {
    fn from_path(path: &str) -> Option<Self> {
        match path {
            "/search" => Some(Self::Search),
            "/predict" => Some(Self::Predict),
            "/results" => Some(Self::Results),
            _ => None,
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let entry = state
        .config
        .logging
        .access_log
        .then(|| start_access_entry(&req, peer_addr));

    let mut response = route(req, &state).await;
    apply_common_headers(response.headers_mut(), &state);

    if let Some(mut entry) = entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = body_len(&response);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.access_log_format);
    }

    Ok(response)
}

async fn route<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let is_head = method == Method::HEAD;

    // CORS preflight is answered for any path
    if method == Method::OPTIONS {
        return http::build_options_response(state.config.http.enable_cors);
    }

    // Health check endpoints (highest priority, always fast)
    let health = &state.config.health;
    if health.enabled && (path == health.liveness_path || path == health.readiness_path) {
        return match check_read_method(&method) {
            Some(resp) => resp,
            None => http::build_health_response("ok"),
        };
    }

    if let Some(endpoint) = Endpoint::from_path(&path) {
        if method != Method::POST {
            logger::log_warning(&format!("Method not allowed: {method} {path}"));
            return http::build_405_response("POST, OPTIONS");
        }
        return dispatch_post(endpoint, req, state)
            .await
            .unwrap_or_else(HandlerError::into_response);
    }

    if path == "/" {
        if let Some(resp) = check_read_method(&method) {
            return resp;
        }
        return pages::index(state, is_head)
            .await
            .unwrap_or_else(HandlerError::into_response);
    }

    if let Some(relative) = path.strip_prefix(STATIC_PREFIX) {
        if let Some(resp) = check_read_method(&method) {
            return resp;
        }
        let if_none_match = req
            .headers()
            .get("if-none-match")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        return static_files::serve_static(
            &state.static_dir,
            relative,
            if_none_match.as_deref(),
            is_head,
        )
        .await;
    }

    http::build_404_response()
}

/// 405 for anything but GET/HEAD on read-only paths
fn check_read_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response("GET, HEAD, OPTIONS"))
        }
    }
}

async fn dispatch_post<B>(
    endpoint: Endpoint,
    req: Request<B>,
    state: &AppState,
) -> Result<Response<Full<Bytes>>, HandlerError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let max_body_size = state.config.http.max_body_size;
    if let Some(resp) = check_body_size(req.headers(), max_body_size) {
        return Ok(resp);
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let body = http::collect_limited(req.into_body(), limit).await?;

    match endpoint {
        Endpoint::Search => search::handle_search(&body, state).await,
        Endpoint::Predict => inference::handle_predict(&body, state).await,
        Endpoint::Results => inference::handle_results(&body, state),
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = headers.get(CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_warning(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', relying on streaming limit"
                ));
                None
            }
            _ => None,
        },
    )
}

fn apply_common_headers(headers: &mut HeaderMap, state: &AppState) {
    if let Ok(name) = HeaderValue::from_str(&state.config.http.server_name) {
        headers.insert(SERVER, name);
    }
    if state.config.http.enable_cors {
        headers.insert(
            "access-control-allow-origin",
            HeaderValue::from_static("*"),
        );
    }
}

fn start_access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    let version = req.version();
    entry.http_version = if version == Version::HTTP_10 {
        "1.0"
    } else if version == Version::HTTP_2 {
        "2.0"
    } else {
        "1.1"
    }
    .to_string();
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry
}

/// Bytes sent, from Content-Length when set (HEAD keeps the full length there)
fn body_len(response: &Response<Full<Bytes>>) -> usize {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .or_else(|| {
            response
                .body()
                .size_hint()
                .exact()
                .and_then(|n| usize::try_from(n).ok())
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::fixtures;
    use http_body_util::BodyExt;
    use hyper::StatusCode;
    use serde_json::{json, Value};

    const TEMPLATE: &str =
        "<html><p id=\"prediction\">{{ prediction_text }}</p><q>{{ quote_text }}</q></html>";

    struct TestApp {
        _root: tempfile::TempDir,
        state: Arc<AppState>,
    }

    fn test_app() -> TestApp {
        let root = tempfile::tempdir().unwrap();
        let base = root.path();
        std::fs::create_dir_all(base.join("templates")).unwrap();
        std::fs::create_dir_all(base.join("static/json")).unwrap();
        std::fs::create_dir_all(base.join("static/js")).unwrap();
        std::fs::write(base.join("templates/index.html"), TEMPLATE).unwrap();
        std::fs::write(base.join("static/js/main.js"), "// autocomplete").unwrap();
        std::fs::write(
            base.join("static/json/author_names.json"),
            r#"["Albert Einstein", "Mark Twain", "Frank Einstein"]"#,
        )
        .unwrap();
        std::fs::write(
            base.join("static/json/context_clean.json"),
            r#"["In a speech", "Letter to a friend"]"#,
        )
        .unwrap();

        let mut config = Config::load_from("does-not-exist/quotelens").unwrap();
        let dir = |name: &str| base.join(name).to_str().unwrap().to_string();
        config.assets.template_dir = dir("templates");
        config.assets.static_dir = dir("static");
        config.assets.json_dir = dir("static/json");
        config.http.max_body_size = 256;
        config.logging.access_log = false;

        TestApp {
            _root: root,
            state: Arc::new(AppState::new(config, fixtures::models())),
        }
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn send(app: &TestApp, method: &str, uri: &str, body: &str) -> (StatusCode, HeaderMap, String) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap();
        let resp = handle_request(req, Arc::clone(&app.state), peer()).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_index_page() {
        let app = test_app();
        let (status, headers, body) = send(&app, "GET", "/", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html><p id=\"prediction\"></p><q></q></html>");
        assert_eq!(headers[SERVER], "quotelens");
        assert_eq!(headers["access-control-allow-origin"], "*");

        let (status, headers, body) = send(&app, "HEAD", "/", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert_eq!(headers[CONTENT_LENGTH], "43");
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_containment() {
        let app = test_app();
        let (status, headers, body) =
            send(&app, "POST", "/search", "term=EINSTEIN&category=author").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["content-type"], "application/json");
        let hits: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(hits, json!(["Albert Einstein", "Frank Einstein"]));

        let (_, _, body) = send(&app, "POST", "/search", "term=zzz&category=author").await;
        assert_eq!(body, "[]");

        let (_, _, body) = send(&app, "POST", "/search", "term=letter&category=context").await;
        assert_eq!(body, r#"["Letter to a friend"]"#);
    }

    #[tokio::test]
    async fn test_search_missing_field() {
        let app = test_app();
        let (status, _, body) = send(&app, "POST", "/search", "term=x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("category"));
    }

    #[tokio::test]
    async fn test_search_unreadable_list() {
        let app = test_app();
        std::fs::remove_file(app.state.json_dir.join("author_names.json")).unwrap();
        let (status, _, _) = send(&app, "POST", "/search", "term=a&category=author").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_predict_renders_label_and_quote() {
        let app = test_app();
        let (status, _, body) = send(&app, "POST", "/predict", "quote=fake+fake+quote").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            "<html><p id=\"prediction\">False</p><q>fake fake quote</q></html>"
        );

        // The field name is irrelevant, only its position
        let (_, _, body) = send(&app, "POST", "/predict", "anything=a+real+quote&x=fake").await;
        assert!(body.contains(">True<"));
        assert!(body.contains("<q>a real quote</q>"));
    }

    #[tokio::test]
    async fn test_predict_escapes_quote() {
        let app = test_app();
        let (_, _, body) = send(&app, "POST", "/predict", "q=%3Cscript%3E").await;
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>"));
    }

    #[tokio::test]
    async fn test_predict_empty_form() {
        let app = test_app();
        let (status, _, _) = send(&app, "POST", "/predict", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_results_returns_class_value() {
        let app = test_app();
        let (status, headers, body) =
            send(&app, "POST", "/results", r#"{"fake": 0.9, "quote": 0, "real": 0}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(body, "0");

        let (_, _, body) =
            send(&app, "POST", "/results", r#"{"z": "0.1", "a": true, "m": 2}"#).await;
        assert_eq!(body, "1");
    }

    #[tokio::test]
    async fn test_results_rejects_bad_payloads() {
        let app = test_app();
        let (status, _, _) = send(&app, "POST", "/results", "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Decoded JSON the model cannot score
        for payload in [
            "[0.1, 0.2, 0.3]",
            r#"{"a": 1, "b": 2}"#,
            r#"{"a": 1, "b": [2], "c": 3}"#,
            r#"{"a": "NaN", "b": "inf", "c": 0}"#,
        ] {
            let (status, _, body) = send(&app, "POST", "/results", payload).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "payload {payload}");
            assert!(!body.contains("features"), "payload {payload}");
        }
    }

    #[tokio::test]
    async fn test_body_limit() {
        let app = test_app();
        let big = format!("term={}&category=author", "a".repeat(300));
        let (status, _, _) = send(&app, "POST", "/search", &big).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let req = Request::builder()
            .method("POST")
            .uri("/search")
            .header(CONTENT_LENGTH, "100000")
            .body(Full::new(Bytes::from_static(b"term=a&category=author")))
            .unwrap();
        let resp = handle_request(req, Arc::clone(&app.state), peer()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_method_and_path_errors() {
        let app = test_app();
        let (status, headers, _) = send(&app, "GET", "/search", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(headers["allow"], "POST, OPTIONS");

        let (status, headers, _) = send(&app, "POST", "/", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(headers["allow"], "GET, HEAD, OPTIONS");

        let (status, _, _) = send(&app, "GET", "/nowhere", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_options_health_and_static() {
        let app = test_app();
        let (status, headers, _) = send(&app, "OPTIONS", "/predict", "").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(headers["allow"], http::ALLOWED_METHODS);

        let (status, _, body) = send(&app, "GET", "/healthz", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
        let (status, _, _) = send(&app, "GET", "/readyz", "").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = send(&app, "GET", "/static/js/main.js", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "// autocomplete");

        let (status, _, _) = send(&app, "GET", "/static/json/author_names.json", "").await;
        assert_eq!(status, StatusCode::OK);
    }
}
