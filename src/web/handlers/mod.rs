//! API handlers.

pub mod connections;
pub mod definitions;
pub mod preview;

pub use connections::*;
pub use definitions::*;
pub use preview::*;

use std::sync::Arc;

use crate::preview::PreviewService;
use crate::store::ConnectionStore;

/// Shared application state.
pub struct AppState {
    /// Connection registry.
    pub connections: Arc<ConnectionStore>,
    /// Preview renderer.
    pub preview: Arc<PreviewService>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(connections: Arc<ConnectionStore>, preview: Arc<PreviewService>) -> Self {
        Self {
            connections,
            preview,
        }
    }
}
