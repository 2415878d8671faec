//! Static file serving module
//!
//! Serves the page's scripts, styles and lookup lists from the static
//! directory with `ETag` validation.

use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Serve `relative` (the path after `/static/`) from `static_dir`
pub async fn serve_static(
    static_dir: &Path,
    relative: &str,
    if_none_match: Option<&str>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let Some(file_path) = resolve(static_dir, relative).await else {
        return http::build_404_response();
    };

    let content = match fs::read(&file_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            return http::build_404_response();
        }
    };

    let etag = cache::generate_etag(&content);
    if cache::check_etag_match(if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    http::build_cached_response(
        Bytes::from(content),
        mime::content_type_for(&file_path),
        &etag,
        is_head,
    )
}

/// Canonical path of a regular file inside `static_dir`, if any
async fn resolve(static_dir: &Path, relative: &str) -> Option<PathBuf> {
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }

    let static_dir_canonical = match fs::canonicalize(static_dir).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static directory not found or inaccessible '{}': {e}",
                static_dir.display()
            ));
            return None;
        }
    };

    // File not found is common (404), no need to log at warning level
    let file_path = fs::canonicalize(static_dir.join(relative)).await.ok()?;
    if !file_path.starts_with(&static_dir_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {relative} -> {}",
            file_path.display()
        ));
        return None;
    }

    let metadata = fs::metadata(&file_path).await.ok()?;
    metadata.is_file().then_some(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;

    /// `<root>/static` holds the assets; `<root>/secret.txt` sits outside it
    fn asset_root() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("static/js")).unwrap();
        std::fs::write(root.path().join("static/js/main.js"), "console.log(1);").unwrap();
        std::fs::write(root.path().join("secret.txt"), "x").unwrap();
        root
    }

    #[tokio::test]
    async fn test_serves_file_with_etag() {
        let root = asset_root();
        let dir = root.path().join("static");
        let resp = serve_static(&dir, "js/main.js", None, false).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["content-type"],
            "text/javascript; charset=utf-8"
        );

        let etag = resp.headers()["etag"].to_str().unwrap().to_string();
        let resp = serve_static(&dir, "js/main.js", Some(&etag), false).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_missing_directory_and_traversal() {
        let root = asset_root();
        let dir = root.path().join("static");

        for path in ["missing.css", "js", "", "../secret.txt"] {
            let resp = serve_static(&dir, path, None, false).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "path {path:?}");
        }

        let resp = serve_static(&root.path().join("nope"), "js/main.js", None, false).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
