//! The static asset layer.
//!
//! Serves the client build output (assets and prerendered pages) ahead of
//! dynamic dispatch, and provides prerendered error documents to the
//! fallback path.
//!
//! Request paths are resolved inside the root only: `..` components,
//! hidden files and anything that canonicalizes outside the root are
//! rejected.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use daedalus_core::{empty, full, Response};
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use thiserror::Error;

/// Why a path could not be served.
#[derive(Debug, Error)]
pub enum StaticFileError {
    /// Nothing at that path.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The path escapes the root or names a hidden file.
    #[error("forbidden path: {0}")]
    Forbidden(String),

    /// Only GET and HEAD are served.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Reading the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StaticFileError {
    /// Returns the status this error would be reported with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true if dynamic dispatch should get a chance at the request.
    #[must_use]
    pub fn falls_through(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::MethodNotAllowed)
    }
}

/// Files under the client output directory.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
    index_file: String,
    cache_control: Option<String>,
}

impl StaticAssets {
    /// Serves files under `root`, with `index.html` for directories.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_file: "index.html".to_string(),
            cache_control: None,
        }
    }

    /// Sets the file served for directory paths.
    #[must_use]
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index_file = index.into();
        self
    }

    /// Adds a `Cache-Control` header to every file response.
    #[must_use]
    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serves a request path.
    pub async fn serve(
        &self,
        pathname: &str,
        method: &Method,
        headers: &HeaderMap,
    ) -> Result<Response, StaticFileError> {
        if method != Method::GET && method != Method::HEAD {
            return Err(StaticFileError::MethodNotAllowed);
        }
        let mut path = self.resolve(pathname)?;
        if path.is_dir() {
            path = path.join(&self.index_file);
            if !path.is_file() {
                return Err(StaticFileError::NotFound(pathname.to_string()));
            }
        }
        self.file_response(&path, method, headers).await
    }

    /// Looks up the prerendered document for an error status.
    ///
    /// Tries `{status}.html`, then `{status}/index.html`. The document is
    /// returned with status 200; callers force the error status.
    pub async fn error_page(&self, status: StatusCode) -> Option<Response> {
        let code = status.as_u16();
        for candidate in [format!("/{code}.html"), format!("/{code}/{}", self.index_file)] {
            let Ok(path) = self.resolve(&candidate) else {
                continue;
            };
            if !path.is_file() {
                continue;
            }
            match self.file_response(&path, &Method::GET, &HeaderMap::new()).await {
                Ok(response) => return Some(response),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "unreadable error page"),
            }
        }
        None
    }

    fn resolve(&self, pathname: &str) -> Result<PathBuf, StaticFileError> {
        let relative = pathname.trim_start_matches('/');
        for component in Path::new(relative).components() {
            match component {
                Component::ParentDir => {
                    return Err(StaticFileError::Forbidden(pathname.to_string()));
                }
                Component::Normal(name) if name.to_string_lossy().starts_with('.') => {
                    return Err(StaticFileError::Forbidden(pathname.to_string()));
                }
                _ => {}
            }
        }

        let canonical = self
            .root
            .join(relative)
            .canonicalize()
            .map_err(|_| StaticFileError::NotFound(pathname.to_string()))?;
        let root = self
            .root
            .canonicalize()
            .map_err(|_| StaticFileError::NotFound(pathname.to_string()))?;
        if !canonical.starts_with(&root) {
            return Err(StaticFileError::Forbidden(pathname.to_string()));
        }
        Ok(canonical)
    }

    async fn file_response(
        &self,
        path: &Path,
        method: &Method,
        headers: &HeaderMap,
    ) -> Result<Response, StaticFileError> {
        let metadata = tokio::fs::metadata(path).await?;
        let modified = metadata.modified().ok();

        if let (Some(modified), Some(since)) = (modified, if_modified_since(headers)) {
            if unix_secs(modified) <= unix_secs(since) {
                let mut response = http::Response::new(empty());
                *response.status_mut() = StatusCode::NOT_MODIFIED;
                return Ok(response);
            }
        }

        let body = if method == Method::HEAD {
            empty()
        } else {
            full(Bytes::from(tokio::fs::read(path).await?))
        };
        let mut response = http::Response::new(body);
        let response_headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(mime_type(path)) {
            response_headers.insert(header::CONTENT_TYPE, value);
        }
        response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));
        if let Some(modified) = modified {
            if let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(modified)) {
                response_headers.insert(header::LAST_MODIFIED, value);
            }
        }
        if let Some(cache) = self.cache_control.as_deref() {
            if let Ok(value) = HeaderValue::from_str(cache) {
                response_headers.insert(header::CACHE_CONTROL, value);
            }
        }
        Ok(response)
    }
}

fn if_modified_since(headers: &HeaderMap) -> Option<SystemTime> {
    let value = headers.get(header::IF_MODIFIED_SINCE)?.to_str().ok()?;
    httpdate::parse_http_date(value).ok()
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Content type by file extension.
#[must_use]
pub fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "wasm" => "application/wasm",
        "webmanifest" => "application/manifest+json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::body_bytes;
    use std::fs;
    use tempfile::TempDir;

    fn client_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("style.css"), "body{}").unwrap();
        fs::write(dir.path().join(".env"), "SECRET=1").unwrap();
        fs::create_dir(dir.path().join("about")).unwrap();
        fs::write(dir.path().join("about/index.html"), "<h1>About</h1>").unwrap();
        fs::write(dir.path().join("404.html"), "<h1>Missing</h1>").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_serves_file_with_mime_type() {
        let dir = client_dir();
        let assets = StaticAssets::new(dir.path()).cache_control("max-age=60");
        let response = assets
            .serve("/style.css", &Method::GET, &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/css; charset=utf-8"
        );
        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "max-age=60");
        assert!(response.headers().contains_key(header::LAST_MODIFIED));
        assert_eq!(&body_bytes(response.into_body()).await[..], b"body{}");
    }

    #[tokio::test]
    async fn test_directory_serves_index() {
        let dir = client_dir();
        let response = StaticAssets::new(dir.path())
            .serve("/about", &Method::GET, &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(&body_bytes(response.into_body()).await[..], b"<h1>About</h1>");
    }

    #[tokio::test]
    async fn test_rejects_traversal_and_hidden_files() {
        let dir = client_dir();
        let assets = StaticAssets::new(dir.path());
        let err = assets
            .serve("/../etc/passwd", &Method::GET, &HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        let err = assets
            .serve("/.env", &Method::GET, &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(!err.falls_through());
    }

    #[tokio::test]
    async fn test_missing_and_post_fall_through() {
        let dir = client_dir();
        let assets = StaticAssets::new(dir.path());
        let missing = assets
            .serve("/missing.js", &Method::GET, &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(missing.falls_through());
        let post = assets
            .serve("/style.css", &Method::POST, &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(post.falls_through());
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let dir = client_dir();
        let response = StaticAssets::new(dir.path())
            .serve("/style.css", &Method::HEAD, &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "6");
        assert!(body_bytes(response.into_body()).await.is_empty());
    }

    #[tokio::test]
    async fn test_if_modified_since() {
        let dir = client_dir();
        let mut headers = HeaderMap::new();
        let later = SystemTime::now() + std::time::Duration::from_secs(3600);
        headers.insert(
            header::IF_MODIFIED_SINCE,
            HeaderValue::from_str(&httpdate::fmt_http_date(later)).unwrap(),
        );
        let response = StaticAssets::new(dir.path())
            .serve("/style.css", &Method::GET, &headers)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_error_page_lookup() {
        let dir = client_dir();
        fs::create_dir(dir.path().join("500")).unwrap();
        fs::write(dir.path().join("500/index.html"), "<h1>Broken</h1>").unwrap();
        let assets = StaticAssets::new(dir.path());

        let not_found = assets.error_page(StatusCode::NOT_FOUND).await.unwrap();
        assert_eq!(not_found.status(), StatusCode::OK);
        assert_eq!(&body_bytes(not_found.into_body()).await[..], b"<h1>Missing</h1>");

        let broken = assets.error_page(StatusCode::INTERNAL_SERVER_ERROR).await.unwrap();
        assert_eq!(&body_bytes(broken.into_body()).await[..], b"<h1>Broken</h1>");

        assert!(assets.error_page(StatusCode::BAD_GATEWAY).await.is_none());
    }

    #[test]
    fn test_mime_type_fallback() {
        assert_eq!(mime_type(Path::new("a.WOFF2")), "font/woff2");
        assert_eq!(mime_type(Path::new("archive.bin")), "application/octet-stream");
    }
}
