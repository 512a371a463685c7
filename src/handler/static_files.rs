//! Static bundle serving module
//!
//! Resolves request paths inside the configured bundle root, then answers
//! with the file bytes unchanged, honoring `If-None-Match` and `Range`.

use crate::config::StaticFilesConfig;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, ByteRange, HttpResponse};
use crate::logger;
use hyper::body::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Serve `ctx.path` from the bundle, or 404
pub async fn serve(ctx: &RequestContext<'_>, cfg: &StaticFilesConfig) -> HttpResponse {
    let Some(file_path) = resolve_path(&cfg.root, ctx.path, &cfg.index_files).await else {
        return http::build_404_response();
    };

    match fs::read(&file_path).await {
        Ok(content) => build_static_file_response(
            Bytes::from(content),
            mime::content_type_for(&file_path),
            ctx,
        ),
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            http::build_404_response()
        }
    }
}

/// Map a URL path to a file under `root`.
///
/// Percent-escapes are decoded first. Paths with `..` segments, or that
/// resolve (through symlinks) outside `root`, are refused. Directories
/// resolve through `index_files`, first existing file wins.
pub async fn resolve_path(root: &str, url_path: &str, index_files: &[String]) -> Option<PathBuf> {
    let decoded = urlencoding::decode(url_path).ok()?;
    let relative = Path::new(decoded.trim_start_matches('/'));

    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        logger::log_warning(&format!("Path traversal attempt blocked: {url_path}"));
        return None;
    }

    let root_canonical = match fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static directory not found or inaccessible '{root}': {e}"
            ));
            return None;
        }
    };

    let mut candidate = root_canonical.join(relative);
    if fs::metadata(&candidate).await.is_ok_and(|m| m.is_dir()) {
        let mut found = None;
        for index in index_files {
            let index_path = candidate.join(index);
            if fs::metadata(&index_path).await.is_ok_and(|m| m.is_file()) {
                found = Some(index_path);
                break;
            }
        }
        candidate = found?;
    }

    // Missing files are the common 404 case, not worth a warning
    let canonical = fs::canonicalize(&candidate).await.ok()?;
    if !canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {url_path} -> {}",
            canonical.display()
        ));
        return None;
    }
    if !fs::metadata(&canonical).await.is_ok_and(|m| m.is_file()) {
        return None;
    }
    Some(canonical)
}

/// Build static file response with `ETag` and Range support
fn build_static_file_response(
    data: Bytes,
    content_type: &str,
    ctx: &RequestContext<'_>,
) -> HttpResponse {
    let etag = cache::generate_etag(&data);
    let total_size = data.len();

    if cache::etag_matches(ctx.if_none_match.as_deref(), &etag) {
        return http::build_304_response(&etag);
    }

    match ByteRange::resolve(ctx.range_header.as_deref(), total_size) {
        ByteRange::Partial { start, end } => http::response::build_partial_response(
            data.slice(start..=end),
            content_type,
            &etag,
            (start, end),
            total_size,
            ctx.is_head,
        ),
        ByteRange::Unsatisfiable => http::build_416_response(total_size),
        ByteRange::Full => {
            http::response::build_file_response(data, content_type, &etag, ctx.is_head)
        }
    }
}
