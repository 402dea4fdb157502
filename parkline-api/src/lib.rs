use axum::{
    http::Method,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod error;
pub mod middleware;
pub mod payments;
pub mod state;
pub mod webhooks;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // The confirm endpoint is where the gateway redirect lands; it carries
    // its own two-signature verification instead of a bearer token.
    let public_routes = Router::new()
        .merge(auth::routes())
        .route("/v1/payments/confirm", post(webhooks::confirm_payment));

    let customer_routes = Router::new()
        .route("/v1/payments/intent", post(payments::issue_payment_intent))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::customer_auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/v1/bookings", post(bookings::create_manual_booking))
        .route("/v1/bookings/{id}", get(bookings::get_booking))
        .route("/v1/vehicles/upcoming", get(bookings::upcoming_vehicles))
        .route("/v1/vehicles/due", get(bookings::due_vehicles))
        .route("/v1/vehicles/{id}/settle", post(bookings::settle_vehicle))
        .route("/v1/vehicles/sweep", post(bookings::sweep_vehicles))
        .route("/v1/admin/lots", post(admin::create_lot).get(admin::list_lots))
        .route(
            "/v1/admin/lots/{id}",
            get(admin::get_lot).delete(admin::delete_lot),
        )
        .route(
            "/v1/admin/categories",
            post(admin::create_category).get(admin::list_categories),
        )
        .route("/v1/admin/categories/{id}", delete(admin::delete_category))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(customer_routes)
        .merge(admin_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
