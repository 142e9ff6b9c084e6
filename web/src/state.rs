//! Application state shared by all handlers.

use feria_core::FairLifecycle;
use feria_core::auth::Authenticator;
use std::sync::Arc;

/// Shared state: the lifecycle (which owns the store) and the authenticator.
///
/// Cheap to clone; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Fair and sale operations
    pub lifecycle: FairLifecycle,
    /// Resolves bearer tokens to principals
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    /// Create the state
    #[must_use]
    pub fn new(lifecycle: FairLifecycle, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            lifecycle,
            authenticator,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}
