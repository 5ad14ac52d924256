//! Remote API boundary for Tollgate.
//!
//! This crate defines the [`InferenceBackend`] trait the dispatcher calls and
//! the request/response types that cross it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;
mod types;

pub use traits::InferenceBackend;
pub use types::{ApiRequest, ApiRequestBuilder, ApiRequestBuilderError, ApiResponse};
