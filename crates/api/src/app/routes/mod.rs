use axum::{
    routing::{get, post},
    Router,
};

pub mod admin;
pub mod cart;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod system;
pub mod wishlist;

/// Routes that need no token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/products", products::router())
}

/// Routes for any authenticated caller. The `/admin` subtree is mounted
/// separately so it can carry its own role gate.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/orders", orders::router())
        .nest("/cart", cart::router())
        .nest("/wishlist", wishlist::router())
        .route("/restock-requests", post(wishlist::request_restock))
        .nest("/notifications", notifications::router())
}
