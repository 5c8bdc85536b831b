use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

/// API routes; verification endpoints only when the flow is enabled.
pub fn router(verification_enabled: bool) -> Router<AppState> {
    let router = Router::new().merge(handlers::register_routes());
    if verification_enabled {
        router.merge(handlers::verification_routes())
    } else {
        router
    }
}
