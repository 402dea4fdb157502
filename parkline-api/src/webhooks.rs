use axum::{extract::State, Json};
use serde::Deserialize;

use parkline_core::gateway::{self, GatewayCallback, GatewayConfig};
use parkline_core::intent;
use parkline_core::models::{CreatedBooking, NewBooking, VehicleDetails};
use parkline_core::EngineError;

use crate::{error::ApiError, state::AppState};

/// Fields the gateway posts back to us after the payer completes checkout,
/// plus the intent token we embedded in the callback URL.
#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub token: String,
    pub txnid: String,
    pub amount: String,
    pub productinfo: String,
    pub firstname: String,
    pub email: String,
    pub status: String,
    pub gateway_payment_id: Option<String>,
    pub hash: String,
}

/// POST /v1/payments/confirm
/// The only path from a gateway callback to a booking. Both signatures must
/// pass: the callback hash proves the payment, the intent token proves what
/// was being paid for. Replays are idempotent.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<Json<CreatedBooking>, ApiError> {
    let gateway_config = GatewayConfig {
        merchant_key: state.payment.merchant_key.clone(),
        merchant_salt: state.payment.merchant_salt.clone(),
    };

    let callback = GatewayCallback {
        txn_id: req.txnid,
        amount: req.amount,
        product_info: req.productinfo,
        first_name: req.firstname,
        email: req.email,
        status: req.status,
        gateway_payment_id: req.gateway_payment_id,
        hash: req.hash,
    };

    gateway::verify_callback(&gateway_config, &callback).map_err(|err| {
        tracing::warn!(txn_id = %callback.txn_id, "gateway callback hash mismatch");
        err
    })?;

    if callback.status != "success" {
        tracing::warn!(txn_id = %callback.txn_id, status = %callback.status,
            "gateway reported non-success status");
        return Err(EngineError::PaymentVerificationFailed.into());
    }

    let payment_intent = intent::verify(&req.token, &state.payment.intent_secret)?;

    // The signed callback and the signed token must describe the same
    // transaction; a mismatch means one of them was swapped.
    if payment_intent.txn_id != callback.txn_id {
        tracing::warn!(token_txn = %payment_intent.txn_id, callback_txn = %callback.txn_id,
            "intent token and gateway callback disagree on transaction id");
        return Err(EngineError::PaymentVerificationFailed.into());
    }

    let payment_id = callback
        .gateway_payment_id
        .clone()
        .unwrap_or_else(|| payment_intent.txn_id.clone());

    let new_booking = NewBooking {
        user_id: payment_intent.user_id,
        parking_lot_id: payment_intent.parking_lot_id,
        payment_id,
        vehicle: VehicleDetails {
            category_id: payment_intent.category_id,
            company: payment_intent.company,
            registration: payment_intent.registration,
            in_time: payment_intent.in_time,
        },
    };

    match state.bookings.create_booking(&new_booking).await {
        Ok(created) => Ok(Json(created)),
        // The payer was charged but the lot filled up during the redirect.
        Err(EngineError::NoAvailableSlots(_)) => Err(ApiError::SlotTakenAfterPayment),
        Err(err) => Err(err.into()),
    }
}
