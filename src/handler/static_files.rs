//! Static file serving module
//!
//! Resolves a (already rewritten) request path under the web root and builds
//! the response: index files, content type, byte ranges and compression.
//! `ETag` and `Cache-Control` are not set here; the pipeline owns them.

use crate::config::AssetsConfig;
use crate::http::encoding::{self, Encoding};
use crate::http::mime;
use crate::http::range::{parse_range_header, ByteRange, RangeParseResult};
use crate::http::response::{build_file_response, build_partial_response, FileHeaders};
use crate::http::{build_403_response, build_404_response, build_416_response, build_500_response};
use crate::logger;
use chrono::{DateTime, Utc};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

/// What the file layer needs from a request
#[derive(Debug, Clone, Copy, Default)]
pub struct FileRequest<'a> {
    /// Path relative to the web root (leading `/` optional)
    pub path: &'a str,
    pub range: Option<&'a str>,
    pub accept_encoding: Option<&'a str>,
}

/// Why a path could not be served
#[derive(Debug, thiserror::Error)]
enum FileError {
    #[error("not found")]
    NotFound,
    #[error("directory has no index file")]
    DirectoryIndex,
    #[error("permission denied")]
    Forbidden,
    #[error("path escapes the web root")]
    OutsideRoot,
    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for FileError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Forbidden,
            _ => Self::Io(err),
        }
    }
}

/// A file read from disk, ready to be sent
struct LoadedFile {
    data: Bytes,
    content_type: mime::ContentType,
    last_modified: Option<String>,
}

/// Filesystem-backed file server rooted at the web root
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index_files: Vec<String>,
    compress: bool,
    compress_brotli: bool,
    compress_min_size: u64,
    accept_byte_range: bool,
}

impl StaticFiles {
    pub fn from_config(assets: &AssetsConfig) -> Self {
        Self {
            root: PathBuf::from(&assets.web_root),
            index_files: assets.index_files.clone(),
            compress: assets.compress,
            compress_brotli: assets.compress_brotli,
            compress_min_size: assets.compress_min_size,
            accept_byte_range: assets.accept_byte_range,
        }
    }

    /// Serve one request
    pub async fn serve(&self, req: &FileRequest<'_>) -> Response<Full<Bytes>> {
        let file = match self.load(req.path).await {
            Ok(file) => file,
            Err(err) => return error_response(req.path, &err),
        };

        let headers = FileHeaders {
            content_type: file.content_type.mime,
            last_modified: file.last_modified.as_deref(),
            accept_ranges: self.accept_byte_range,
        };
        let total_size = file.data.len() as u64;

        if self.accept_byte_range {
            match parse_range_header(req.range, total_size) {
                RangeParseResult::Valid(range) => {
                    return match slice_range(&file.data, range) {
                        Some(part) => build_partial_response(part, headers, range, total_size),
                        None => build_416_response(total_size),
                    };
                }
                RangeParseResult::NotSatisfiable => return build_416_response(total_size),
                RangeParseResult::None => {}
            }
        }

        // Ranges are computed on the identity encoding, so never compress them
        let encoding = if req.range.is_none() {
            self.pick_encoding(&file, req.accept_encoding)
        } else {
            None
        };

        match encoding {
            Some(enc) => match compress(enc, file.data.clone()).await {
                Some(compressed) => build_file_response(compressed, headers, Some(enc)),
                None => build_file_response(file.data, headers, None),
            },
            None => build_file_response(file.data, headers, None),
        }
    }

    fn pick_encoding(&self, file: &LoadedFile, accept_encoding: Option<&str>) -> Option<Encoding> {
        if !self.compress
            || !file.content_type.compressible
            || (file.data.len() as u64) < self.compress_min_size
        {
            return None;
        }
        encoding::negotiate(accept_encoding, self.compress_brotli)
    }

    /// Resolve and read the file behind a request path
    async fn load(&self, path: &str) -> Result<LoadedFile, FileError> {
        let file_path = self.resolve(path).await?;
        let metadata = fs::metadata(&file_path).await?;
        let data = fs::read(&file_path).await?;

        let content_type = mime::content_type_for(file_path.extension().and_then(|e| e.to_str()));
        let last_modified = metadata.modified().ok().map(http_date);

        Ok(LoadedFile {
            data: Bytes::from(data),
            content_type,
            last_modified,
        })
    }

    /// Map a request path to a file inside the web root
    async fn resolve(&self, path: &str) -> Result<PathBuf, FileError> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(FileError::OutsideRoot);
        }

        let root = match fs::canonicalize(&self.root).await {
            Ok(p) => p,
            Err(e) => {
                logger::log_warning(&format!(
                    "Web root not found or inaccessible '{}': {e}",
                    self.root.display()
                ));
                return Err(FileError::Io(e));
            }
        };

        let mut file_path = root.join(relative);
        if fs::metadata(&file_path).await?.is_dir() {
            file_path = self
                .find_index(&file_path)
                .await
                .ok_or(FileError::DirectoryIndex)?;
        }

        // Symlinks may point anywhere; only serve what lands inside the root
        let canonical = fs::canonicalize(&file_path).await?;
        if !canonical.starts_with(&root) {
            return Err(FileError::OutsideRoot);
        }

        Ok(canonical)
    }

    async fn find_index(&self, dir: &Path) -> Option<PathBuf> {
        for name in &self.index_files {
            let candidate = dir.join(name);
            if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
                return Some(candidate);
            }
        }
        None
    }
}

/// Turn a load failure into a response
fn error_response(path: &str, err: &FileError) -> Response<Full<Bytes>> {
    match err {
        // File not found is common (404), no need to log at warning level
        FileError::NotFound => build_404_response(),
        FileError::OutsideRoot => {
            logger::log_warning(&format!("Path traversal attempt blocked: {path}"));
            build_404_response()
        }
        FileError::DirectoryIndex => {
            logger::log_debug(&format!("Directory index is forbidden: {path}"));
            build_403_response()
        }
        FileError::Forbidden => {
            logger::log_warning(&format!("Permission denied reading '{path}'"));
            build_403_response()
        }
        FileError::Io(e) => {
            logger::log_error(&format!("Failed to read file '{path}': {e}"));
            build_500_response()
        }
    }
}

/// Compress on the blocking pool; `None` means send the original bytes
async fn compress(encoding: Encoding, data: Bytes) -> Option<Bytes> {
    let original_len = data.len();
    match tokio::task::spawn_blocking(move || encoding.encode(&data)).await {
        Ok(Ok(compressed)) if compressed.len() < original_len => Some(Bytes::from(compressed)),
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            logger::log_error(&format!("{} compression failed: {e}", encoding.as_str()));
            None
        }
        Err(e) => {
            logger::log_error(&format!("Compression task failed: {e}"));
            None
        }
    }
}

fn slice_range(data: &Bytes, range: ByteRange) -> Option<Bytes> {
    let start = usize::try_from(range.start).ok()?;
    let end = usize::try_from(range.end).ok()?;
    (end < data.len()).then(|| data.slice(start..=end))
}

/// Format a timestamp as an HTTP-date (`Sun, 06 Nov 1994 08:49:37 GMT`)
fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetsConfig;
    use http_body_util::BodyExt;
    use hyper::header::{
        ACCEPT_RANGES, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_RANGE, CONTENT_TYPE, ETAG,
        LAST_MODIFIED,
    };
    use std::time::{Duration, UNIX_EPOCH};

    fn assets(root: &Path) -> AssetsConfig {
        AssetsConfig {
            web_root: root.to_str().unwrap().to_string(),
            app_root: None,
            no_cache: false,
            index_files: vec!["index.html".to_string()],
            compress: true,
            compress_brotli: true,
            compress_min_size: 64,
            accept_byte_range: true,
        }
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), b"<h1>home</h1>").unwrap();
        std::fs::write(dir.path().join("data.bin"), (0u8..100).collect::<Vec<_>>()).unwrap();
        std::fs::write(dir.path().join("big.css"), "body { margin: 0; }\n".repeat(100)).unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/index.html"), b"docs").unwrap();
        std::fs::create_dir(dir.path().join("empty")).unwrap();
        dir
    }

    async fn body(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    fn get(path: &str) -> FileRequest<'_> {
        FileRequest {
            path,
            ..FileRequest::default()
        }
    }

    #[tokio::test]
    async fn test_serves_file() {
        let dir = site();
        let files = StaticFiles::from_config(&assets(dir.path()));
        let response = files.serve(&get("/index.html")).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(response.headers()[ACCEPT_RANGES], "bytes");
        assert!(response.headers().contains_key(LAST_MODIFIED));
        assert!(response.headers().get(ETAG).is_none());
        assert!(response.headers().get(CACHE_CONTROL).is_none());
        assert_eq!(body(response).await, "<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_index_resolution() {
        let dir = site();
        let files = StaticFiles::from_config(&assets(dir.path()));
        for path in ["/", "", "/docs", "/docs/"] {
            let response = files.serve(&get(path)).await;
            assert_eq!(response.status(), 200, "{path}");
        }
        assert_eq!(body(files.serve(&get("/docs/")).await).await, "docs");
    }

    #[tokio::test]
    async fn test_directory_without_index_is_forbidden() {
        let dir = site();
        let files = StaticFiles::from_config(&assets(dir.path()));
        assert_eq!(files.serve(&get("/empty/")).await.status(), 403);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = site();
        let files = StaticFiles::from_config(&assets(dir.path()));
        assert_eq!(files.serve(&get("/nope.txt")).await.status(), 404);
    }

    #[tokio::test]
    async fn test_traversal_blocked() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), b"secret").unwrap();
        let root = outer.path().join("www");
        std::fs::create_dir(&root).unwrap();

        let files = StaticFiles::from_config(&assets(&root));
        assert_eq!(files.serve(&get("/../secret.txt")).await.status(), 404);
        assert_eq!(files.serve(&get("/a/../../secret.txt")).await.status(), 404);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_outside_root_blocked() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), b"secret").unwrap();
        let root = outer.path().join("www");
        std::fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(outer.path().join("secret.txt"), root.join("link.txt")).unwrap();

        let files = StaticFiles::from_config(&assets(&root));
        assert_eq!(files.serve(&get("/link.txt")).await.status(), 404);
    }

    #[tokio::test]
    async fn test_range_request() {
        let dir = site();
        let files = StaticFiles::from_config(&assets(dir.path()));
        let req = FileRequest {
            path: "/data.bin",
            range: Some("bytes=10-19"),
            accept_encoding: Some("gzip"),
        };
        let response = files.serve(&req).await;
        assert_eq!(response.status(), 206);
        assert_eq!(response.headers()[CONTENT_RANGE], "bytes 10-19/100");
        assert!(response.headers().get(CONTENT_ENCODING).is_none());
        assert_eq!(body(response).await, (10u8..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_range_not_satisfiable() {
        let dir = site();
        let files = StaticFiles::from_config(&assets(dir.path()));
        let req = FileRequest {
            path: "/data.bin",
            range: Some("bytes=500-"),
            accept_encoding: None,
        };
        let response = files.serve(&req).await;
        assert_eq!(response.status(), 416);
        assert_eq!(response.headers()[CONTENT_RANGE], "bytes */100");
    }

    #[tokio::test]
    async fn test_ranges_disabled() {
        let dir = site();
        let mut cfg = assets(dir.path());
        cfg.accept_byte_range = false;
        let files = StaticFiles::from_config(&cfg);
        let req = FileRequest {
            path: "/data.bin",
            range: Some("bytes=0-9"),
            accept_encoding: None,
        };
        let response = files.serve(&req).await;
        assert_eq!(response.status(), 200);
        assert!(response.headers().get(ACCEPT_RANGES).is_none());
        assert_eq!(body(response).await.len(), 100);
    }

    #[tokio::test]
    async fn test_compression_negotiated() {
        let dir = site();
        let files = StaticFiles::from_config(&assets(dir.path()));

        let req = FileRequest {
            path: "/big.css",
            range: None,
            accept_encoding: Some("gzip, br"),
        };
        let response = files.serve(&req).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()[CONTENT_ENCODING], "br");

        let req = FileRequest {
            accept_encoding: Some("gzip"),
            ..req
        };
        let response = files.serve(&req).await;
        assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");
        assert!(body(response).await.len() < 2000);
    }

    #[tokio::test]
    async fn test_no_compression_for_small_or_binary() {
        let dir = site();
        let files = StaticFiles::from_config(&assets(dir.path()));

        for path in ["/index.html", "/data.bin"] {
            let req = FileRequest {
                path,
                range: None,
                accept_encoding: Some("gzip, br"),
            };
            let response = files.serve(&req).await;
            assert!(response.headers().get(CONTENT_ENCODING).is_none(), "{path}");
        }
    }

    #[tokio::test]
    async fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let files = StaticFiles::from_config(&assets(&dir.path().join("gone")));
        assert_eq!(files.serve(&get("/index.html")).await.status(), 500);
    }

    #[test]
    fn test_http_date() {
        let time = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(http_date(time), "Sun, 06 Nov 1994 08:49:37 GMT");
    }
}
