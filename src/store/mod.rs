pub mod sqlite;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, CancellationReason, Membership, Payment, SlotTime};

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub date: Option<NaiveDate>,
    pub customer_id: Option<String>,
    pub status: Option<BookingStatus>,
    pub limit: Option<i64>,
}

/// A conditional mutation. Stores must apply each variant atomically.
#[derive(Debug, Clone)]
pub enum BookingPatch {
    /// Only applies if the booking is active and no other active booking holds the slot.
    Reschedule {
        date: NaiveDate,
        time: SlotTime,
        at: NaiveDateTime,
    },
    /// Only applies if the booking is not already cancelled.
    Cancel {
        reason: CancellationReason,
        at: NaiveDateTime,
    },
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;

    async fn create(&self, booking: Booking) -> Result<Booking, AppError>;

    /// `Ok(None)` when the booking does not exist; conflicts surface as
    /// `SlotTaken` or `AlreadyCancelled`.
    async fn update_by_id(&self, id: &str, patch: BookingPatch) -> Result<Option<Booking>, AppError>;

    /// Normalized slots held by active appointments on `date`.
    async fn occupied_times(
        &self,
        date: NaiveDate,
        exclude_id: Option<&str>,
    ) -> Result<Vec<SlotTime>, AppError>;

    async fn delete_by_id(&self, id: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait PaymentLookup: Send + Sync {
    async fn get_payment(&self, id: &str) -> Result<Option<Payment>, AppError>;

    async fn record_payment(&self, payment: Payment) -> Result<Payment, AppError>;
}

#[async_trait]
pub trait MembershipLookup: Send + Sync {
    async fn get_membership(&self, id: &str) -> Result<Option<Membership>, AppError>;

    async fn record_membership(&self, membership: Membership) -> Result<Membership, AppError>;
}
