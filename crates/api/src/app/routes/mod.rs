use axum::Router;

pub mod inventory;
pub mod orders;
pub mod system;

/// Router for every endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .nest("/inventory", inventory::router())
        .merge(orders::router())
}
