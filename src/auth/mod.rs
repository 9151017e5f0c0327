use crate::state::AppState;
use axum::Router;

pub(crate) mod dto;
pub mod error;
pub mod handlers;
pub mod repo;
pub(crate) mod repo_types;
pub mod services;
pub(crate) mod extractors;
mod jwt;
mod password;
mod validate;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::api_routes())
}
