use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{Payment, PaymentStatus, SlotTime};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    /// Human-readable code shown to the customer, e.g. `NB-3F9A01C2`.
    pub code: String,
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub service_name: String,
    pub category: Option<String>,
    #[serde(flatten)]
    pub kind: BookingKind,
    pub amount_cents: i64,
    pub payment_id: Option<String>,
    pub status: BookingStatus,
    pub cancellation: Option<Cancellation>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingKind {
    Appointment { date: NaiveDate, time: SlotTime },
    MembershipPurchase { membership_id: String },
}

impl BookingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingKind::Appointment { .. } => "appointment",
            BookingKind::MembershipPurchase { .. } => "membership",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cancellation {
    pub reason: CancellationReason,
    pub cancelled_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum CancellationReason {
    ScheduleConflict,
    FoundAnotherSalon,
    PriceConcerns,
    FeelingUnwell,
    BookedByMistake,
    Other(String),
}

impl CancellationReason {
    /// Known slugs map to their variant; anything else is kept verbatim.
    /// Returns `None` for blank input.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed {
            "schedule_conflict" => CancellationReason::ScheduleConflict,
            "found_another_salon" => CancellationReason::FoundAnotherSalon,
            "price_concerns" => CancellationReason::PriceConcerns,
            "feeling_unwell" => CancellationReason::FeelingUnwell,
            "booked_by_mistake" => CancellationReason::BookedByMistake,
            other => CancellationReason::Other(other.to_string()),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            CancellationReason::ScheduleConflict => "schedule_conflict",
            CancellationReason::FoundAnotherSalon => "found_another_salon",
            CancellationReason::PriceConcerns => "price_concerns",
            CancellationReason::FeelingUnwell => "feeling_unwell",
            CancellationReason::BookedByMistake => "booked_by_mistake",
            CancellationReason::Other(text) => text,
        }
    }
}

impl From<CancellationReason> for String {
    fn from(value: CancellationReason) -> Self {
        value.as_str().to_string()
    }
}

impl From<String> for CancellationReason {
    fn from(value: String) -> Self {
        CancellationReason::parse(&value).unwrap_or(CancellationReason::Other(value))
    }
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }

    /// Scheduled date and slot, for appointments only.
    pub fn schedule(&self) -> Option<(NaiveDate, SlotTime)> {
        match &self.kind {
            BookingKind::Appointment { date, time } => Some((*date, *time)),
            BookingKind::MembershipPurchase { .. } => None,
        }
    }

    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        self.schedule()
            .map(|(date, time)| date.and_time(time.as_naive()))
    }

    /// Money actually collected. Without a payment record the booking amount
    /// is taken at face value; a payment that did not succeed counts as nothing.
    pub fn paid_cents(&self, payment: Option<&Payment>) -> i64 {
        match payment {
            Some(p) if p.status == PaymentStatus::Succeeded => p.amount_cents,
            Some(_) => 0,
            None => self.amount_cents,
        }
    }

    pub fn membership_id(&self) -> Option<&str> {
        match &self.kind {
            BookingKind::MembershipPurchase { membership_id } => Some(membership_id),
            BookingKind::Appointment { .. } => None,
        }
    }
}

pub fn generate_code() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("NB-{}", raw[..8].to_ascii_uppercase())
}
