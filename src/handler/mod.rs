//! Request handler module
//!
//! The request pipeline and the static file layer it delegates to.

pub mod pipeline;
pub mod static_files;

// Re-export main entry point
pub use pipeline::handle_request;
