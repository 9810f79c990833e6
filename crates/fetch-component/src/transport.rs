//! Transport boundary.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::request::FetchRequest;
use crate::response::FetchResponse;

/// Performs one physical HTTP exchange.
///
/// Implementations must watch `cancel` and return [`TransportError::Cancelled`]
/// promptly once it fires.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, TransportError> {
        (**self).send(request, cancel).await
    }
}
