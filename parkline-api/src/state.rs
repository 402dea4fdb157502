use std::sync::Arc;

use parkline_core::repository::{BookingEngine, LotDirectory, VehicleLifecycle};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    pub admin_api_key: String,
}

#[derive(Clone)]
pub struct PaymentConfig {
    pub merchant_key: String,
    pub merchant_salt: String,
    pub intent_secret: String,
    pub intent_ttl_seconds: u64,
    pub gateway_url: String,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<dyn BookingEngine>,
    pub vehicles: Arc<dyn VehicleLifecycle>,
    pub lots: Arc<dyn LotDirectory>,
    pub auth: AuthConfig,
    pub payment: PaymentConfig,
}
