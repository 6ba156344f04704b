use crate::state::AppState;
use axum::Router;

pub mod documents;
pub mod dto;
pub mod handlers;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new().nest("/riders", handlers::rider_routes())
}
