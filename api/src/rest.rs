use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::liveness))
        .route("/authentication", post(handlers::auth::issue_token))
        .route("/wishlist/:userId", get(handlers::wishlist::get_wishlist))
        .route("/wishlist/add", patch(handlers::wishlist::add))
        .route("/wishlist/remove", patch(handlers::wishlist::remove))
        .route("/all-porducts", get(handlers::products::list))
        .route("/add-porduct", post(handlers::products::create))
        .route("/user/:email", get(handlers::users::get_user))
        .route("/users", post(handlers::users::register))
        .with_state(state)
}

/// Allows the configured browser origins. Unparseable origins are skipped.
pub fn cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// The router with request tracing and CORS applied.
pub fn app(state: AppState, origins: &[String]) -> Router {
    router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors(origins)),
    )
}
