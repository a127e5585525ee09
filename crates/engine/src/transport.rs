use bindery_types::RequestOptions;

use crate::{TransportError, http::Request, http::Response};

/// Sends a resolved request. Implementations own connection handling,
/// timeouts and redirects as described by `options`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request, options: &RequestOptions) -> Result<Response, TransportError>;
}
