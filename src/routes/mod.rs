use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod doc;
pub mod estimates;
pub mod health;
pub mod params;
pub mod payments;
pub mod public;
pub mod templates;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/templates", templates::router())
        .nest("/estimates", estimates::router())
        .nest("/public", public::router())
        .nest("/payments", payments::router())
        .nest("/admin", admin::router())
}
