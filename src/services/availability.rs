use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::errors::AppError;
use crate::models::{SlotSchedule, SlotTime};
use crate::store::BookingStore;

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::InvalidInput(format!("invalid date: {raw}")))
}

/// Slots on `date` held by active (non-cancelled) appointments.
///
/// Always reads through to the store. A store failure is reported as
/// `UnavailableData`; callers must not read it as "everything is free".
pub async fn occupied_slots(
    store: &dyn BookingStore,
    date: NaiveDate,
) -> Result<BTreeSet<SlotTime>, AppError> {
    let times = store
        .occupied_times(date, None)
        .await
        .map_err(AppError::into_unavailable)?;
    Ok(times.into_iter().collect())
}

pub async fn occupied_slots_on(
    store: &dyn BookingStore,
    raw_date: &str,
) -> Result<BTreeSet<SlotTime>, AppError> {
    let date = parse_date(raw_date)?;
    occupied_slots(store, date).await
}

/// Enumerated slots on `date` that are neither in `occupied` nor already elapsed.
pub fn available_slots(
    schedule: &SlotSchedule,
    date: NaiveDate,
    occupied: &BTreeSet<SlotTime>,
    now: NaiveDateTime,
) -> Vec<SlotTime> {
    if date < now.date() {
        return vec![];
    }
    schedule
        .slots()
        .into_iter()
        .filter(|slot| !occupied.contains(slot))
        .filter(|slot| date.and_time(slot.as_naive()) > now)
        .collect()
}
