//! Web API module.
//!
//! JSON REST API for managing connections, saving their definitions and
//! previewing projected articles.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::{create_health_router, create_router};
pub use server::WebServer;
