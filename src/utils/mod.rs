//! Cross-cutting utilities: the error taxonomy, logging bootstrap, and the
//! shared application state handed to every axum route.

pub mod errors;
pub mod shared;
pub mod trace;

pub use errors::{ApiError, EngineError, ErrorKind};
pub use shared::{AppState, Shared};
