use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::clock::Clock;
use crate::store::{BookingStore, MembershipLookup, PaymentLookup};

pub struct AppState {
    pub bookings: Arc<dyn BookingStore>,
    pub payments: Arc<dyn PaymentLookup>,
    pub memberships: Arc<dyn MembershipLookup>,
    pub clock: Arc<dyn Clock>,
    pub config: AppConfig,
}
