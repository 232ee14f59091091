use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::Connection;

use super::{BookingFilter, BookingPatch, BookingStore, MembershipLookup, PaymentLookup};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, Membership, Payment, SlotTime};

/// SQLite-backed store. Every call holds the connection lock for its full
/// duration, so check-and-set patches are not interleaved with other writes.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::UnavailableData("database lock poisoned".to_string()))
    }
}

#[async_trait]
impl BookingStore for SqliteStore {
    async fn find(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        let db = self.lock()?;
        queries::find_bookings(&db, filter)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        let db = self.lock()?;
        queries::get_booking_by_id(&db, id)
    }

    async fn create(&self, booking: Booking) -> Result<Booking, AppError> {
        let db = self.lock()?;
        queries::create_booking(&db, &booking)?;
        Ok(booking)
    }

    async fn update_by_id(&self, id: &str, patch: BookingPatch) -> Result<Option<Booking>, AppError> {
        let db = self.lock()?;
        match patch {
            BookingPatch::Reschedule { date, time, at } => {
                queries::reschedule_booking(&db, id, date, time, at)
            }
            BookingPatch::Cancel { reason, at } => queries::cancel_booking(&db, id, &reason, at),
        }
    }

    async fn occupied_times(
        &self,
        date: NaiveDate,
        exclude_id: Option<&str>,
    ) -> Result<Vec<SlotTime>, AppError> {
        let db = self.lock()?;
        queries::get_occupied_times(&db, date, exclude_id)
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, AppError> {
        let db = self.lock()?;
        queries::delete_booking(&db, id)
    }
}

#[async_trait]
impl PaymentLookup for SqliteStore {
    async fn get_payment(&self, id: &str) -> Result<Option<Payment>, AppError> {
        let db = self.lock()?;
        queries::get_payment(&db, id)
    }

    async fn record_payment(&self, payment: Payment) -> Result<Payment, AppError> {
        let db = self.lock()?;
        queries::create_payment(&db, &payment)?;
        Ok(payment)
    }
}

#[async_trait]
impl MembershipLookup for SqliteStore {
    async fn get_membership(&self, id: &str) -> Result<Option<Membership>, AppError> {
        let db = self.lock()?;
        queries::get_membership(&db, id)
    }

    async fn record_membership(&self, membership: Membership) -> Result<Membership, AppError> {
        let db = self.lock()?;
        queries::create_membership(&db, &membership)?;
        Ok(membership)
    }
}
