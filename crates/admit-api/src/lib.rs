//! HTTP front end for the admissions assistant.
//!
//! A thin axum layer over [`admit_chat::ResponseComposer`]: chat, statistics,
//! session history and reset, and a health check.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
