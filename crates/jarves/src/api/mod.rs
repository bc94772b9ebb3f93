//! HTTP API module.
//!
//! Exposes the stateless chat proxy: `/api/health`, `/api/models` and
//! `/api/chat`.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, ChatSettings, WebSettings};
