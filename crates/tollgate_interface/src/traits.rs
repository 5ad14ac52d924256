//! Trait definitions for inference backends.

use crate::{ApiRequest, ApiResponse};
use async_trait::async_trait;
use std::sync::Arc;
use tollgate_error::ApiError;

/// Core trait that every remote backend implements.
///
/// A backend performs exactly one remote call per invocation. It does not
/// retry, wait for quota or time out on its own; the dispatcher owns those
/// concerns and classifies the returned [`ApiError`].
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Perform one completion or embedding call.
    async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;

    /// Provider name (e.g., "openai").
    fn provider_name(&self) -> &'static str;
}

#[async_trait]
impl<T: InferenceBackend + ?Sized> InferenceBackend for Arc<T> {
    async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        (**self).call(request).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}
