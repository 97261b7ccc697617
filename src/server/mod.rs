//! HTTP surface

mod app;
mod handlers;
mod landing;

pub use app::{build_router, run_server, AppState, StartupError};
pub use handlers::{ChatRequest, SetModelForm};
pub use landing::render_landing;
