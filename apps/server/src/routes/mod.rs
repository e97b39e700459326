//! API route definitions.

use axum::{middleware, Router};

use crate::middleware::auth::auth_middleware;
use crate::AppState;

pub mod auth;
pub mod health;
pub mod products;
pub mod sales;
pub mod users;

/// Creates the `/api` router: public routes plus everything behind the
/// token check.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(auth::protected_routes())
        .merge(products::routes())
        .merge(sales::routes())
        .merge(users::routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(protected_routes)
}
