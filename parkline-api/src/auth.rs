use axum::{extract::State, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth::{AdminClaims, CustomerClaims},
    state::AppState,
};

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct AdminLoginRequest {
    api_key: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/guest", post(login_guest))
        .route("/v1/auth/admin", post(login_admin))
}

async fn login_guest(State(state): State<AppState>) -> Result<Json<AuthResponse>, ApiError> {
    let my_claims = CustomerClaims {
        sub: format!("guest-{}", Uuid::new_v4()),
        role: "CUSTOMER".to_owned(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| {
        ApiError::Engine(parkline_core::EngineError::storage(format!(
            "token encoding failed: {e}"
        )))
    })?;

    Ok(Json(AuthResponse { token }))
}

async fn login_admin(
    State(state): State<AppState>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if req.api_key != state.auth.admin_api_key {
        return Err(ApiError::AuthenticationError("invalid admin api key".to_string()));
    }

    let my_claims = AdminClaims {
        sub: "attendant".to_owned(),
        role: "ADMIN".to_owned(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &my_claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| {
        ApiError::Engine(parkline_core::EngineError::storage(format!(
            "token encoding failed: {e}"
        )))
    })?;

    Ok(Json(AuthResponse { token }))
}
