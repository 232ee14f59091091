use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, CancellationReason};
use crate::services::clock::Clock;
use crate::store::{BookingPatch, BookingStore, PaymentLookup};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// Share of the paid amount returned on cancellation, by lead time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundTier {
    /// More than two days ahead.
    Full,
    /// Between one and two days ahead, both ends inclusive.
    Partial,
    /// Less than a day ahead, or already past.
    NoRefund,
}

impl RefundTier {
    pub fn for_lead_time(lead: Duration) -> Self {
        if lead > Duration::days(2) {
            RefundTier::Full
        } else if lead >= Duration::days(1) {
            RefundTier::Partial
        } else {
            RefundTier::NoRefund
        }
    }

    pub fn percent(&self) -> i64 {
        match self {
            RefundTier::Full => 100,
            RefundTier::Partial => 50,
            RefundTier::NoRefund => 0,
        }
    }
}

/// Advisory refund figure; moving the money is the payment provider's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refund {
    pub tier: RefundTier,
    pub percent: i64,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationOutcome {
    pub booking: Booking,
    pub refund: Refund,
}

/// Refund owed on `paid_cents` if `booking` is cancelled at `now`.
pub fn refund_for(booking: &Booking, paid_cents: i64, now: NaiveDateTime) -> Refund {
    // Membership purchases have no appointment to measure lead time against.
    let tier = booking
        .starts_at()
        .map(|starts_at| RefundTier::for_lead_time(starts_at - now))
        .unwrap_or(RefundTier::NoRefund);
    let amount = i128::from(paid_cents.max(0)) * i128::from(tier.percent()) / 100;
    Refund {
        tier,
        percent: tier.percent(),
        amount_cents: i64::try_from(amount).unwrap_or(i64::MAX),
    }
}

/// Cancels a booking and reports the refund it is entitled to.
///
/// The payment is read before anything is written, so a failing lookup leaves
/// the booking untouched. A second cancellation fails with `AlreadyCancelled`
/// and keeps the first cancellation's reason and timestamp.
pub async fn cancel(
    store: &dyn BookingStore,
    payments: &dyn PaymentLookup,
    clock: &dyn Clock,
    booking_id: &str,
    request: &CancelRequest,
) -> Result<CancellationOutcome, AppError> {
    let reason = request
        .reason
        .as_deref()
        .and_then(CancellationReason::parse)
        .ok_or_else(|| AppError::Validation("a cancellation reason is required".to_string()))?;

    let booking = store
        .find_by_id(booking_id)
        .await
        .map_err(AppError::into_unavailable)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
    if booking.status == BookingStatus::Cancelled {
        return Err(AppError::AlreadyCancelled(booking.id));
    }

    let payment = match booking.payment_id.as_deref() {
        Some(payment_id) => payments
            .get_payment(payment_id)
            .await
            .map_err(AppError::into_unavailable)?,
        None => None,
    };
    let paid_cents = booking.paid_cents(payment.as_ref());

    let now = clock.now();
    let booking = store
        .update_by_id(booking_id, BookingPatch::Cancel { reason, at: now })
        .await
        .map_err(AppError::into_unavailable)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    let refund = refund_for(&booking, paid_cents, now);
    tracing::info!(
        booking_id = %booking.id,
        code = %booking.code,
        refund_percent = refund.percent,
        refund_cents = refund.amount_cents,
        "booking cancelled"
    );

    Ok(CancellationOutcome { booking, refund })
}
