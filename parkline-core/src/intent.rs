use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// Tolerated wall-clock drift when checking token expiry.
pub const CLOCK_SKEW_LEEWAY_SECS: u64 = 60;

/// Booking intent carried across the external payment redirect. Never
/// persisted; its integrity rests entirely on the signature and expiry, so
/// nothing in it may be trusted before `verify` has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub user_id: String,
    pub parking_lot_id: Uuid,
    pub category_id: Uuid,
    pub company: String,
    pub registration: String,
    pub in_time: DateTime<Utc>,
    pub txn_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct IntentClaims {
    sub: String,
    lot: Uuid,
    cat: Uuid,
    company: String,
    reg: String,
    in_time: DateTime<Utc>,
    txn: String,
    exp: usize,
}

/// Sign the intent with an expiry `ttl_seconds` from now. The resulting
/// token is the opaque reference handed to the gateway and echoed back in
/// its success-callback URL.
pub fn issue(intent: &PaymentIntent, secret: &str, ttl_seconds: u64) -> Result<String, EngineError> {
    let exp = (Utc::now() + Duration::seconds(ttl_seconds as i64)).timestamp() as usize;

    let claims = IntentClaims {
        sub: intent.user_id.clone(),
        lot: intent.parking_lot_id,
        cat: intent.category_id,
        company: intent.company.clone(),
        reg: intent.registration.clone(),
        in_time: intent.in_time,
        txn: intent.txn_id.clone(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| EngineError::storage(format!("intent token encoding failed: {e}")))
}

/// Check signature and expiry before trusting any field. Failure modes map
/// onto the error taxonomy: `TokenExpired`, `TokenSignatureMismatch`,
/// `TokenMalformed`.
pub fn verify(token: &str, secret: &str) -> Result<PaymentIntent, EngineError> {
    let mut validation = Validation::default();
    validation.leeway = CLOCK_SKEW_LEEWAY_SECS;

    let data = decode::<IntentClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => EngineError::TokenExpired,
        ErrorKind::InvalidSignature => EngineError::TokenSignatureMismatch,
        _ => EngineError::TokenMalformed,
    })?;

    let claims = data.claims;
    Ok(PaymentIntent {
        user_id: claims.sub,
        parking_lot_id: claims.lot,
        category_id: claims.cat,
        company: claims.company,
        registration: claims.reg,
        in_time: claims.in_time,
        txn_id: claims.txn,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    fn sample_intent() -> PaymentIntent {
        PaymentIntent {
            user_id: "user-17".to_string(),
            parking_lot_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            company: "Toyota".to_string(),
            registration: "KA-01-AB-1234".to_string(),
            in_time: Utc::now() + Duration::hours(2),
            txn_id: "TXN-abc123".to_string(),
        }
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let intent = sample_intent();
        let token = issue(&intent, SECRET, 3600).unwrap();
        let decoded = verify(&token, SECRET).unwrap();

        assert_eq!(decoded.user_id, intent.user_id);
        assert_eq!(decoded.parking_lot_id, intent.parking_lot_id);
        assert_eq!(decoded.category_id, intent.category_id);
        assert_eq!(decoded.registration, intent.registration);
        assert_eq!(decoded.txn_id, intent.txn_id);
        assert_eq!(decoded.in_time.timestamp(), intent.in_time.timestamp());
    }

    #[test]
    fn test_wrong_secret_is_a_signature_mismatch() {
        let token = issue(&sample_intent(), SECRET, 3600).unwrap();
        let err = verify(&token, "some-other-secret").unwrap_err();
        assert!(matches!(err, EngineError::TokenSignatureMismatch));
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let token = issue(&sample_intent(), SECRET, 3600).unwrap();

        // Flip the last signature character to a different base64url symbol
        // so the token still parses but no longer verifies.
        let mut chars: Vec<char> = token.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();

        let err = verify(&tampered, SECRET).unwrap_err();
        assert!(matches!(
            err,
            EngineError::TokenSignatureMismatch | EngineError::TokenMalformed
        ));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let token = issue(&sample_intent(), SECRET, 3600).unwrap();

        // Swap the payload segment wholesale; the signature no longer covers it.
        let other = issue(&sample_intent(), SECRET, 3600).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        parts[1] = other_parts[1];
        let spliced = parts.join(".");

        assert!(verify(&spliced, SECRET).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected_past_leeway() {
        let intent = sample_intent();

        // Forge an exp two hours in the past, well beyond the 60s leeway.
        let exp = (Utc::now() - Duration::hours(2)).timestamp() as usize;
        let claims = IntentClaims {
            sub: intent.user_id.clone(),
            lot: intent.parking_lot_id,
            cat: intent.category_id,
            company: intent.company.clone(),
            reg: intent.registration.clone(),
            in_time: intent.in_time,
            txn: intent.txn_id.clone(),
            exp,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = verify(&token, SECRET).unwrap_err();
        assert!(matches!(err, EngineError::TokenExpired));
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let err = verify("not-a-token", SECRET).unwrap_err();
        assert!(matches!(err, EngineError::TokenMalformed));
    }
}
