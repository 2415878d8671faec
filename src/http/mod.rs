//! HTTP protocol layer module
//!
//! Response builders, cache validation, content types and request body
//! decoding, kept apart from the page and prediction handlers.

pub mod cache;
pub mod mime;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use request::{collect_limited, FormData, RequestError};
pub use response::{
    build_304_response, build_404_response, build_405_response, build_413_response,
    build_cached_response, build_error_response, build_health_response, build_html_response,
    build_json_response, build_options_response, ALLOWED_METHODS,
};
