//! HTTP response building module
//!
//! Provides builders for the status codes the server produces.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    ACCEPT_RANGES, ALLOW, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE, ETAG, LAST_MODIFIED, VARY,
};
use hyper::Response;

use super::cache::CACHE_CONTROL_VALUE;
use super::encoding::Encoding;
use super::method::ALLOWED_METHODS;
use super::range::ByteRange;

/// Headers shared by full and partial file responses
#[derive(Debug, Clone, Copy)]
pub struct FileHeaders<'a> {
    pub content_type: &'a str,
    pub last_modified: Option<&'a str>,
    pub accept_ranges: bool,
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(304)
        .header(ETAG, etag)
        .header(CACHE_CONTROL, CACHE_CONTROL_VALUE)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            empty_response(304)
        })
}

/// Build 400 Bad Request response
pub fn build_400_response() -> Response<Full<Bytes>> {
    text_response(400, "400 Bad Request")
}

/// Build 403 Forbidden response
pub fn build_403_response() -> Response<Full<Bytes>> {
    text_response(403, "403 Forbidden")
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    text_response(404, "404 Not Found")
}

/// Build 405 Method Not Allowed response (empty body)
pub fn build_405_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(405)
        .header(ALLOW, ALLOWED_METHODS)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            empty_response(405)
        })
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: u64) -> Response<Full<Bytes>> {
    Response::builder()
        .status(416)
        .header(CONTENT_TYPE, "text/plain")
        .header(CONTENT_RANGE, format!("bytes */{file_size}"))
        .body(Full::new(Bytes::from("416 Range Not Satisfiable")))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            empty_response(416)
        })
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<Full<Bytes>> {
    text_response(500, "500 Internal Server Error")
}

/// Build 200 response for a whole file, optionally compressed
pub fn build_file_response(
    data: Bytes,
    headers: FileHeaders<'_>,
    encoding: Option<Encoding>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(200)
        .header(CONTENT_TYPE, headers.content_type)
        .header(CONTENT_LENGTH, data.len());

    if headers.accept_ranges {
        builder = builder.header(ACCEPT_RANGES, "bytes");
    }
    if let Some(last_modified) = headers.last_modified {
        builder = builder.header(LAST_MODIFIED, last_modified);
    }
    if let Some(encoding) = encoding {
        builder = builder
            .header(CONTENT_ENCODING, encoding.as_str())
            .header(VARY, "Accept-Encoding");
    }

    builder.body(Full::new(data)).unwrap_or_else(|e| {
        log_build_error("200", &e);
        empty_response(500)
    })
}

/// Build 206 Partial Content response
pub fn build_partial_response(
    data: Bytes,
    headers: FileHeaders<'_>,
    range: ByteRange,
    total_size: u64,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(206)
        .header(CONTENT_TYPE, headers.content_type)
        .header(CONTENT_LENGTH, range.len())
        .header(CONTENT_RANGE, range.content_range(total_size))
        .header(ACCEPT_RANGES, "bytes");

    if let Some(last_modified) = headers.last_modified {
        builder = builder.header(LAST_MODIFIED, last_modified);
    }

    builder.body(Full::new(data)).unwrap_or_else(|e| {
        log_build_error("206", &e);
        empty_response(500)
    })
}

/// Plain-text error response
fn text_response(status: u16, message: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain")
        .body(Full::new(Bytes::from(message)))
        .unwrap_or_else(|e| {
            log_build_error(message, &e);
            empty_response(status)
        })
}

/// Fallback when a builder rejects its input
fn empty_response(status: u16) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    if let Ok(code) = hyper::StatusCode::from_u16(status) {
        *response.status_mut() = code;
    }
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
