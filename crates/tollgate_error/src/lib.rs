//! Error types for Tollgate.
//!
//! This crate provides the error types shared by every Tollgate crate.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use tollgate_error::{TollgateResult, ApiError};
//!
//! fn call_remote() -> TollgateResult<String> {
//!     Err(ApiError::http(401, "invalid api key"))?
//! }
//!
//! assert!(call_remote().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod builder;
mod checkpoint;
mod config;
mod dispatch;
mod error;
mod json;
mod rate_limit;
mod tokenizer;

pub use api::{ApiError, ApiErrorKind, RetryableError};
pub use builder::{BuilderError, BuilderErrorKind};
pub use checkpoint::{CheckpointError, CheckpointErrorKind};
pub use config::ConfigError;
pub use dispatch::{DispatchError, DispatchErrorKind};
pub use error::{TollgateError, TollgateErrorKind, TollgateResult};
pub use json::JsonError;
pub use rate_limit::{RateLimitError, RateLimitErrorKind};
pub use tokenizer::TokenizerError;
