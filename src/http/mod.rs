//! HTTP protocol layer module
//!
//! Response builders plus the conditional/partial request helpers used by
//! static file serving. Knows nothing about sheets or the dev server.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used items
pub use range::ByteRange;
pub use response::{
    build_304_response, build_404_response, build_405_response, build_413_response,
    build_416_response, build_json_response, build_options_response, build_text_response,
    HttpResponse, ALLOW_READ,
};
