//! Relay and navigation seams between the coordinator and the live page.
//!
//! The coordinator never touches the DOM: it sends typed requests to a
//! relay executing inside the page, and commands tab navigation itself.
//! The two contexts share no memory; everything crosses this boundary as
//! request/response messages.

use std::sync::Arc;

use async_trait::async_trait;

use crate::protocol::{RelayRequest, RelayResponse};

/// Transport failure between coordinator and relay, or a failed tab load.
/// Conditions the relay could observe but not satisfy travel inside
/// [`RelayResponse`] instead.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("relay unreachable: {0}")]
    Unreachable(String),
}

/// Executes page-context queries and actions on behalf of the coordinator.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn call(&self, request: RelayRequest) -> Result<RelayResponse, RelayError>;
}

#[async_trait]
impl<R: Relay + ?Sized> Relay for Arc<R> {
    async fn call(&self, request: RelayRequest) -> Result<RelayResponse, RelayError> {
        (**self).call(request).await
    }
}

/// Commands the tab to load a URL.
///
/// Implementations resolve only after the page's load-completion signal
/// plus a settle delay, so the next relay request sees an initialized page.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), RelayError>;
}

#[async_trait]
impl<N: Navigator + ?Sized> Navigator for Arc<N> {
    async fn goto(&self, url: &str) -> Result<(), RelayError> {
        (**self).goto(url).await
    }
}
