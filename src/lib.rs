//! Static asset server
//!
//! Serves a directory over HTTP/1.1 for `GET` requests, with process-scoped
//! `ETag` validation and optional path prefix stripping.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
