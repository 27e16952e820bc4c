//! Method gate
//!
//! The server is read-only: only `GET` gets past this check.

use crate::error::RequestError;
use hyper::Method;

/// Value of the `Allow` header on 405 responses
pub const ALLOWED_METHODS: &str = "GET";

/// Reject every method other than `GET`
pub fn check_method(method: &Method) -> Result<(), RequestError> {
    if *method == Method::GET {
        Ok(())
    } else {
        Err(RequestError::UnsupportedMethod(method.clone()))
    }
}
