//! HTTP protocol layer module
//!
//! Protocol-level building blocks: the method gate, path decoding and
//! rewriting, `ETag` validation, ranges, MIME types, compression and
//! response builders. Nothing here touches the filesystem.

pub mod cache;
pub mod encoding;
pub mod method;
pub mod mime;
pub mod path;
pub mod range;
pub mod response;
pub mod rewrite;

// Re-export commonly used types
pub use range::parse_range_header;
pub use response::{
    build_304_response, build_400_response, build_403_response, build_404_response,
    build_405_response, build_416_response, build_500_response,
};
