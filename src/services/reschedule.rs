use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, SlotSchedule, SlotTime};
use crate::services::clock::Clock;
use crate::store::{BookingPatch, BookingStore};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RescheduleRequest {
    pub date: Option<String>,
    pub time: Option<String>,
}

/// Parses a requested date and slot; the time must be one of the schedule's slots.
pub fn parse_slot_request(
    schedule: &SlotSchedule,
    date: Option<&str>,
    time: Option<&str>,
) -> Result<(NaiveDate, SlotTime), AppError> {
    let date = date
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::Validation("date is required".to_string()))?;
    let time = time
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("time is required".to_string()))?;

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {date}")))?;
    let time = SlotTime::parse(time).map_err(AppError::Validation)?;
    if !schedule.contains(&time) {
        return Err(AppError::Validation(format!("{time} is not a bookable slot")));
    }
    Ok((date, time))
}

pub fn ensure_not_past(date: NaiveDate, time: SlotTime, now: NaiveDateTime) -> Result<(), AppError> {
    if date.and_time(time.as_naive()) <= now {
        return Err(AppError::PastTime);
    }
    Ok(())
}

/// Moves an appointment to a new slot.
///
/// Input and past-time checks run before the store is touched. The final
/// write re-checks occupancy atomically, so a slot freed and grabbed by
/// someone else between the two reads still fails with `SlotTaken`.
pub async fn reschedule(
    store: &dyn BookingStore,
    clock: &dyn Clock,
    schedule: &SlotSchedule,
    booking_id: &str,
    request: &RescheduleRequest,
) -> Result<Booking, AppError> {
    let (date, time) =
        parse_slot_request(schedule, request.date.as_deref(), request.time.as_deref())?;
    let now = clock.now();
    ensure_not_past(date, time, now)?;

    let booking = store
        .find_by_id(booking_id)
        .await
        .map_err(AppError::into_unavailable)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
    if booking.status == BookingStatus::Cancelled {
        return Err(AppError::AlreadyCancelled(booking.id));
    }
    if booking.schedule().is_none() {
        return Err(AppError::Validation(
            "membership purchases have no appointment to reschedule".to_string(),
        ));
    }

    let occupied = store
        .occupied_times(date, Some(booking_id))
        .await
        .map_err(AppError::into_unavailable)?;
    if occupied.contains(&time) {
        return Err(AppError::SlotTaken {
            date: date.to_string(),
            time: time.to_string(),
        });
    }

    let updated = store
        .update_by_id(booking_id, BookingPatch::Reschedule { date, time, at: now })
        .await
        .map_err(AppError::into_unavailable)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    tracing::info!(
        booking_id = %updated.id,
        code = %updated.code,
        %date,
        %time,
        "booking rescheduled"
    );
    Ok(updated)
}
