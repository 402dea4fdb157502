use sha2::{Digest, Sha512};

use crate::error::EngineError;

/// Merchant-side shared secrets for the payment gateway. The salt never
/// leaves the server; the key is public to the gateway form.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub merchant_key: String,
    pub merchant_salt: String,
}

/// Fields posted to the gateway when redirecting the payer.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub txn_id: String,
    /// Decimal amount string, exactly as sent to the gateway.
    pub amount: String,
    pub product_info: String,
    pub first_name: String,
    pub email: String,
}

/// Fields the gateway posts back after the payer completes (or abandons)
/// the payment. Unsigned input until `verify_callback` has passed.
#[derive(Debug, Clone)]
pub struct GatewayCallback {
    pub txn_id: String,
    pub amount: String,
    pub product_info: String,
    pub first_name: String,
    pub email: String,
    pub status: String,
    /// The gateway's own payment id, when it assigns one.
    pub gateway_payment_id: Option<String>,
    pub hash: String,
}

/// Unused user-defined fields in the gateway's hash string. They are part
/// of the signed field order even when empty.
const UDF_SLOTS: usize = 10;

fn sha512_hex(input: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash for the outbound redirect:
/// `key|txnid|amount|productinfo|firstname|email|<udf x10>|salt`.
pub fn request_hash(config: &GatewayConfig, request: &GatewayRequest) -> String {
    let mut segments: Vec<&str> = vec![
        &config.merchant_key,
        &request.txn_id,
        &request.amount,
        &request.product_info,
        &request.first_name,
        &request.email,
    ];
    segments.extend(std::iter::repeat_n("", UDF_SLOTS));
    segments.push(&config.merchant_salt);

    sha512_hex(&segments.join("|"))
}

/// Hash for the inbound callback: the request field order reversed, with
/// the transaction status spliced in after the salt:
/// `salt|status|<udf x10>|email|firstname|productinfo|amount|txnid|key`.
pub fn callback_hash(config: &GatewayConfig, callback: &GatewayCallback) -> String {
    let mut segments: Vec<&str> = vec![&config.merchant_salt, &callback.status];
    segments.extend(std::iter::repeat_n("", UDF_SLOTS));
    segments.extend([
        callback.email.as_str(),
        callback.first_name.as_str(),
        callback.product_info.as_str(),
        callback.amount.as_str(),
        callback.txn_id.as_str(),
        config.merchant_key.as_str(),
    ]);

    sha512_hex(&segments.join("|"))
}

/// Recompute the callback hash from the shared salt and compare it against
/// what the gateway sent. This is independent of the intent token: both
/// must pass before any booking is created. The token proves intent, this
/// hash proves payment.
pub fn verify_callback(config: &GatewayConfig, callback: &GatewayCallback) -> Result<(), EngineError> {
    let expected = callback_hash(config, callback);
    if expected != callback.hash.to_lowercase() {
        return Err(EngineError::PaymentVerificationFailed);
    }
    Ok(())
}
