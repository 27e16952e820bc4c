//! Request pipeline
//!
//! Entry point for HTTP request processing. Every request runs through the
//! same stages, in order, and any stage may answer early:
//!
//! 1. method gate (405 for anything but `GET`)
//! 2. path decoding (400 for malformed paths)
//! 3. `ETag` validation (304 when `If-None-Match` carries the current `ETag`)
//! 4. prefix rewriting
//! 5. static file serving

use crate::config::AppState;
use crate::error::RequestError;
use crate::handler::static_files::FileRequest;
use crate::http::cache::{self, CacheDecision};
use crate::http::{self, method, path};
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{
    HeaderMap, HeaderName, ACCEPT_ENCODING, IF_NONE_MATCH, RANGE, REFERER, USER_AGENT,
};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for request processing
///
/// Owned copies of the headers, so the request itself can be dropped before
/// any file I/O is awaited.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Raw (still percent-encoded) URI path
    pub raw_path: String,
    pub query: Option<String>,
    pub version: Version,
    pub if_none_match: Option<String>,
    pub range: Option<String>,
    pub accept_encoding: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        let headers = &parts.headers;
        Self {
            method: parts.method.clone(),
            raw_path: parts.uri.path().to_string(),
            query: parts.uri.query().map(ToString::to_string),
            version: parts.version,
            if_none_match: header_string(headers, &IF_NONE_MATCH),
            range: header_string(headers, &RANGE),
            accept_encoding: header_string(headers, &ACCEPT_ENCODING),
            referer: header_string(headers, &REFERER),
            user_agent: header_string(headers, &USER_AGENT),
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();
    let ctx = RequestContext::from_parts(&parts);

    let response = process(&ctx, &state).await;

    if state.config.logging.access_log {
        log_access(
            &ctx,
            &response,
            peer_addr,
            started,
            &state.config.logging.access_log_format,
        );
    }

    Ok(response)
}

/// Run the pipeline stages for one request
pub async fn process(ctx: &RequestContext, state: &AppState) -> Response<Full<Bytes>> {
    // 1. Method gate: nothing else runs for rejected methods
    if let Err(err) = method::check_method(&ctx.method) {
        return reject(&err);
    }

    // 2. Decode path
    let decoded = match path::decode_request_path(&ctx.raw_path) {
        Ok(p) => p,
        Err(err) => return reject(&err),
    };

    // 3. Cache validation on the path as requested, before rewriting
    let validation = state
        .validator
        .validate(&decoded, ctx.if_none_match.as_deref());
    if let Some(v) = &validation {
        if v.decision == CacheDecision::NotModified {
            return http::build_304_response(&v.etag);
        }
    }

    // 4. Prefix rewrite
    let file_path = state.rewrite.rewrite(&decoded);

    // 5. File serving
    let file_req = FileRequest {
        path: file_path,
        range: ctx.range.as_deref(),
        accept_encoding: ctx.accept_encoding.as_deref(),
    };
    let mut response = state.files.serve(&file_req).await;

    if let Some(v) = validation {
        cache::attach_headers(response.headers_mut(), &v.etag);
    }

    response
}

fn reject(err: &RequestError) -> Response<Full<Bytes>> {
    logger::log_debug(&format!("Rejected with {}: {err}", err.status()));
    match err {
        RequestError::UnsupportedMethod(_) => http::build_405_response(),
        RequestError::MalformedPath(_) => http::build_400_response(),
    }
}

/// Header value as text; bytes outside ASCII are kept as UTF-8
///
/// `ETag`s embed the decoded path, so `If-None-Match` may carry raw UTF-8
/// that `HeaderValue::to_str` would reject.
fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

fn log_access(
    ctx: &RequestContext,
    response: &Response<Full<Bytes>>,
    peer_addr: SocketAddr,
    started: Instant,
    format: &str,
) {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        ctx.method.to_string(),
        ctx.raw_path.clone(),
    );
    entry.query.clone_from(&ctx.query);
    entry.http_version = version_label(ctx.version).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
    entry.referer.clone_from(&ctx.referer);
    entry.user_agent.clone_from(&ctx.user_agent);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, format);
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
