//! Status page and manual controls for curfewd
//!
//! Reads the live status published by the enforcement cycle and offers
//! the toggle and volume buttons. Every mutating route redirects to `/`.

mod errors;
mod handlers;
mod page;
mod state;
mod view;

use axum::{
    Router,
    routing::{get, post},
};

pub use errors::HttpError;
pub use state::HttpState;
pub use view::StatusView;

pub fn router(state: HttpState) -> Router<()> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/status", get(handlers::api_status))
        .route("/toggle", post(handlers::toggle))
        .route("/volume/up", post(handlers::volume_up))
        .route("/volume/down", post(handlers::volume_down))
        .with_state(state)
}
