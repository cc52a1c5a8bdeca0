//! The provider contract.

use std::sync::Arc;

use axum::Router;

/// A handler bound to a URL path prefix, owning one area of functionality.
///
/// Providers only expose their state through their own methods; a provider
/// that depends on another receives its `Arc` at construction.
pub trait Provider: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Routes relative to the provider's prefix.
    fn router(self: Arc<Self>) -> Router;

    /// Whether password auth guards this provider.
    fn requires_auth(&self) -> bool {
        true
    }

    /// Release resources. Called once, in reverse registration order.
    fn dispose(&self) {}
}
