//! Web API module for orcapost.
//!
//! This module serves the contact form relay and the read side of the
//! message registry over HTTP.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_router, create_swagger_router, ApiDoc};
pub use server::WebServer;
