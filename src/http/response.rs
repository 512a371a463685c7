//! HTTP response building module
//!
//! Builders for every status the backend emits, decoupled from handlers.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::response::Builder;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::logger;

pub type HttpResponse = Response<Full<Bytes>>;

/// Methods the static bundle and GET endpoints answer to
pub const ALLOW_READ: &str = "GET, HEAD, OPTIONS";

/// Finish a builder, degrading to an empty response if a header was invalid
fn finish(builder: Builder, body: Bytes, what: &str) -> HttpResponse {
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        logger::log_error(&format!("Failed to build {what} response: {e}"));
        Response::new(Full::new(Bytes::new()))
    })
}

fn plain_text(status: StatusCode, text: &'static str) -> HttpResponse {
    finish(
        Response::builder()
            .status(status)
            .header("Content-Type", "text/plain; charset=utf-8"),
        Bytes::from_static(text.as_bytes()),
        status.as_str(),
    )
}

/// Serialize `body` as the JSON response body
pub fn build_json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    match serde_json::to_vec(body) {
        Ok(json) => finish(
            Response::builder()
                .status(status)
                .header("Content-Type", "application/json"),
            Bytes::from(json),
            "JSON",
        ),
        Err(e) => {
            logger::log_error(&format!("Failed to serialize response: {e}"));
            finish(
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .header("Content-Type", "application/json"),
                Bytes::from_static(br#"{"status":"error","message":"Internal server error"}"#),
                "500",
            )
        }
    }
}

/// 200 with a short plain-text body (health probe)
pub fn build_text_response(text: &'static str) -> HttpResponse {
    plain_text(StatusCode::OK, text)
}

/// Build 404 Not Found response
pub fn build_404_response() -> HttpResponse {
    plain_text(StatusCode::NOT_FOUND, "404 Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(allow: &str) -> HttpResponse {
    finish(
        Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header("Content-Type", "text/plain; charset=utf-8")
            .header("Allow", allow),
        Bytes::from_static(b"405 Method Not Allowed"),
        "405",
    )
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> HttpResponse {
    plain_text(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large")
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(allow: &str, enable_cors: bool) -> HttpResponse {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", allow);

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", allow)
            .header("Access-Control-Allow-Headers", "Content-Type, Range, If-None-Match")
            .header("Access-Control-Max-Age", "86400");
    }

    finish(builder, Bytes::new(), "OPTIONS")
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str) -> HttpResponse {
    finish(
        Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header("ETag", etag)
            .header("Cache-Control", "no-cache"),
        Bytes::new(),
        "304",
    )
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: usize) -> HttpResponse {
    finish(
        Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header("Content-Type", "text/plain; charset=utf-8")
            .header("Content-Range", format!("bytes */{file_size}")),
        Bytes::from_static(b"416 Range Not Satisfiable"),
        "416",
    )
}

/// Build 200 response for a whole static file
///
/// `no-cache` makes browsers revalidate the bundle with `If-None-Match`.
pub fn build_file_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
    is_head: bool,
) -> HttpResponse {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    finish(
        Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", content_type)
            .header("Content-Length", content_length)
            .header("Accept-Ranges", "bytes")
            .header("ETag", etag)
            .header("Cache-Control", "no-cache"),
        body,
        "200",
    )
}

/// Build 206 Partial Content response; `data` is already the sliced span
pub fn build_partial_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
    (start, end): (usize, usize),
    total_size: usize,
    is_head: bool,
) -> HttpResponse {
    let content_length = end - start + 1;
    let body = if is_head { Bytes::new() } else { data };

    finish(
        Response::builder()
            .status(StatusCode::PARTIAL_CONTENT)
            .header("Content-Type", content_type)
            .header("Content-Length", content_length)
            .header("Content-Range", format!("bytes {start}-{end}/{total_size}"))
            .header("Accept-Ranges", "bytes")
            .header("ETag", etag),
        body,
        "206",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_bytes(resp: HttpResponse) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_json_response() {
        let resp = build_json_response(
            StatusCode::NOT_FOUND,
            &serde_json::json!({"status": "error", "message": "Data not found"}),
        );
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()["content-type"], "application/json");
        let value: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(value["message"], "Data not found");
    }

    #[tokio::test]
    async fn test_head_file_response_keeps_length() {
        let resp = build_file_response(Bytes::from_static(b"hello"), "text/plain", "\"e\"", true);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-length"], "5");
        assert!(body_bytes(resp).await.is_empty());
    }

    #[test]
    fn test_options_cors_headers() {
        let plain = build_options_response(ALLOW_READ, false);
        assert_eq!(plain.status(), StatusCode::NO_CONTENT);
        assert!(plain.headers().get("access-control-allow-origin").is_none());

        let cors = build_options_response(ALLOW_READ, true);
        assert_eq!(cors.headers()["access-control-allow-origin"], "*");
        assert_eq!(cors.headers()["allow"], ALLOW_READ);
    }

    #[test]
    fn test_partial_response_headers() {
        let resp = build_partial_response(
            Bytes::from_static(b"cd"),
            "text/plain",
            "\"x\"",
            (2, 3),
            10,
            false,
        );
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()["content-range"], "bytes 2-3/10");
        assert_eq!(resp.headers()["content-length"], "2");
    }
}
