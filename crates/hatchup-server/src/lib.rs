//! HTTP surface for the HatchUp research backend.

pub mod app;
pub mod error;
pub mod identity;
pub mod routes;
pub mod session;

pub use app::{AppState, build_state};
pub use routes::build_router;
