use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parkline_core::gateway::{self, GatewayConfig, GatewayRequest};
use parkline_core::intent::{self, PaymentIntent};
use parkline_core::EngineError;

use crate::{error::ApiError, middleware::auth::CustomerClaims, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IssueIntentRequest {
    pub parking_lot_id: Uuid,
    pub category_id: Uuid,
    pub company: String,
    pub registration: String,
    pub in_time: DateTime<Utc>,
    pub email: Option<String>,
}

/// Merchant fields the client forwards to the gateway's hosted page.
#[derive(Debug, Serialize)]
pub struct GatewayRedirect {
    pub url: String,
    pub key: String,
    pub txnid: String,
    pub amount: String,
    pub productinfo: String,
    pub firstname: String,
    pub email: String,
    pub hash: String,
}

#[derive(Debug, Serialize)]
pub struct IssueIntentResponse {
    pub token: String,
    pub expires_in: u64,
    pub gateway: GatewayRedirect,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/payments/intent
/// Sign the booking intent and hand back the gateway redirect payload. No
/// slot is reserved here; the slot is only taken at confirmation.
pub async fn issue_payment_intent(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<IssueIntentRequest>,
) -> Result<Json<IssueIntentResponse>, ApiError> {
    if req.registration.trim().is_empty() {
        return Err(EngineError::validation("registration must not be empty").into());
    }
    if req.company.trim().is_empty() {
        return Err(EngineError::validation("company must not be empty").into());
    }

    let lot = state
        .lots
        .get_lot(req.parking_lot_id)
        .await?
        .ok_or(EngineError::LotNotFound(req.parking_lot_id))?;

    let txn_id = format!("TXN-{}", Uuid::new_v4().simple());
    let amount = format!("{}.00", lot.price_per_hour);
    let email = req.email.unwrap_or_else(|| "guest@parkline.local".to_string());

    let payment_intent = PaymentIntent {
        user_id: claims.sub,
        parking_lot_id: req.parking_lot_id,
        category_id: req.category_id,
        company: req.company.clone(),
        registration: req.registration.clone(),
        in_time: req.in_time,
        txn_id: txn_id.clone(),
    };

    let token = intent::issue(
        &payment_intent,
        &state.payment.intent_secret,
        state.payment.intent_ttl_seconds,
    )?;

    let gateway_config = GatewayConfig {
        merchant_key: state.payment.merchant_key.clone(),
        merchant_salt: state.payment.merchant_salt.clone(),
    };
    let gateway_request = GatewayRequest {
        txn_id: txn_id.clone(),
        amount: amount.clone(),
        product_info: lot.location.clone(),
        first_name: req.company.clone(),
        email: email.clone(),
    };
    let hash = gateway::request_hash(&gateway_config, &gateway_request);

    tracing::info!(%txn_id, lot_id = %req.parking_lot_id, "payment intent issued");

    Ok(Json(IssueIntentResponse {
        token,
        expires_in: state.payment.intent_ttl_seconds,
        gateway: GatewayRedirect {
            url: state.payment.gateway_url.clone(),
            key: state.payment.merchant_key.clone(),
            txnid: txn_id,
            amount,
            productinfo: lot.location,
            firstname: req.company,
            email,
            hash,
        },
    }))
}
