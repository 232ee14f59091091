use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::errors::AppError;
use crate::models::{
    Booking, BookingKind, BookingStatus, Cancellation, CancellationReason, Membership,
    MembershipStatus, Payment, PaymentStatus, SlotTime,
};
use crate::store::BookingFilter;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

const BOOKING_COLUMNS: &str = "id, code, customer_id, customer_name, service_name, category, kind, \
     date, time, membership_id, amount_cents, payment_id, status, cancellation_reason, \
     cancelled_at, created_at, updated_at";

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> Result<(), AppError> {
    let (date, time, membership_id) = match &booking.kind {
        BookingKind::Appointment { date, time } => (
            Some(date.format(DATE_FORMAT).to_string()),
            Some(time.to_string()),
            None,
        ),
        BookingKind::MembershipPurchase { membership_id } => {
            (None, None, Some(membership_id.clone()))
        }
    };
    let (cancellation_reason, cancelled_at) = match &booking.cancellation {
        Some(c) => (
            Some(c.reason.as_str().to_string()),
            Some(c.cancelled_at.format(TIMESTAMP_FORMAT).to_string()),
        ),
        None => (None, None),
    };

    conn.execute(
        "INSERT INTO bookings (id, code, customer_id, customer_name, service_name, category, kind,
            date, time, membership_id, amount_cents, payment_id, status, cancellation_reason,
            cancelled_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            booking.id,
            booking.code,
            booking.customer_id,
            booking.customer_name,
            booking.service_name,
            booking.category,
            booking.kind.as_str(),
            date,
            time,
            membership_id,
            booking.amount_cents,
            booking.payment_id,
            booking.status.as_str(),
            cancellation_reason,
            cancelled_at,
            booking.created_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )
    .map_err(|e| slot_conflict(e, date.as_deref(), time.as_deref()))?;
    Ok(())
}

pub fn find_bookings(conn: &Connection, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
    let mut clauses: Vec<&str> = vec![];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(date) = filter.date {
        clauses.push("date = ?");
        values.push(Box::new(date.format(DATE_FORMAT).to_string()));
    }
    if let Some(customer_id) = &filter.customer_id {
        clauses.push("customer_id = ?");
        values.push(Box::new(customer_id.clone()));
    }
    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(Box::new(status.as_str()));
    }

    let mut sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY COALESCE(date || ' ' || time, created_at) DESC, created_at DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        values.push(Box::new(limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> Result<Option<Booking>, AppError> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    result.transpose()
}

/// Slots held by active appointments on `date`, normalized; `exclude_id` is left out.
pub fn get_occupied_times(
    conn: &Connection,
    date: NaiveDate,
    exclude_id: Option<&str>,
) -> Result<Vec<SlotTime>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, time FROM bookings
         WHERE kind = 'appointment' AND date = ?1 AND status != 'cancelled'
           AND (?2 IS NULL OR id != ?2)",
    )?;

    let rows = stmt.query_map(
        params![date.format(DATE_FORMAT).to_string(), exclude_id],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
    )?;

    let mut times = vec![];
    for row in rows {
        let (id, raw) = row?;
        match raw.as_deref().map(SlotTime::parse) {
            Some(Ok(time)) => times.push(time),
            Some(Err(e)) => tracing::warn!(booking_id = %id, error = %e, "skipping booking with unreadable time"),
            None => tracing::warn!(booking_id = %id, "skipping appointment without a time"),
        }
    }
    Ok(times)
}

/// Moves an active appointment to `date`/`time` if no other active booking holds that slot.
///
/// The occupancy check and the write share one transaction, so the slot cannot be
/// claimed by another writer in between. Returns `Ok(None)` when `id` does not exist.
pub fn reschedule_booking(
    conn: &Connection,
    id: &str,
    date: NaiveDate,
    time: SlotTime,
    now: NaiveDateTime,
) -> Result<Option<Booking>, AppError> {
    let tx = conn.unchecked_transaction()?;

    let Some(booking) = get_booking_by_id(&tx, id)? else {
        return Ok(None);
    };
    if booking.status == BookingStatus::Cancelled {
        return Err(AppError::AlreadyCancelled(booking.id));
    }
    if booking.schedule().is_none() {
        return Err(AppError::Validation(
            "membership purchases have no appointment to reschedule".to_string(),
        ));
    }

    let date_str = date.format(DATE_FORMAT).to_string();
    let time_str = time.to_string();
    if get_occupied_times(&tx, date, Some(id))?.contains(&time) {
        return Err(AppError::SlotTaken {
            date: date_str,
            time: time_str,
        });
    }

    tx.execute(
        "UPDATE bookings SET date = ?1, time = ?2, updated_at = ?3
         WHERE id = ?4 AND status != 'cancelled'",
        params![date_str, time_str, now.format(TIMESTAMP_FORMAT).to_string(), id],
    )
    .map_err(|e| slot_conflict(e, Some(date_str.as_str()), Some(time_str.as_str())))?;

    let updated = get_booking_by_id(&tx, id)?;
    tx.commit()?;
    Ok(updated)
}

/// Marks an active booking cancelled. Returns `Ok(None)` when `id` does not exist.
pub fn cancel_booking(
    conn: &Connection,
    id: &str,
    reason: &CancellationReason,
    at: NaiveDateTime,
) -> Result<Option<Booking>, AppError> {
    let stamp = at.format(TIMESTAMP_FORMAT).to_string();
    let count = conn.execute(
        "UPDATE bookings SET status = 'cancelled', cancellation_reason = ?1, cancelled_at = ?2,
            updated_at = ?2
         WHERE id = ?3 AND status != 'cancelled'",
        params![reason.as_str(), stamp, id],
    )?;

    match get_booking_by_id(conn, id)? {
        Some(booking) if count > 0 => Ok(Some(booking)),
        Some(booking) => Err(AppError::AlreadyCancelled(booking.id)),
        None => Ok(None),
    }
}

pub fn delete_booking(conn: &Connection, id: &str) -> Result<bool, AppError> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> Result<Booking, AppError> {
    let id: String = row.get(0)?;
    let kind_str: String = row.get(6)?;
    let date_str: Option<String> = row.get(7)?;
    let time_str: Option<String> = row.get(8)?;
    let membership_id: Option<String> = row.get(9)?;
    let status_str: String = row.get(12)?;
    let cancellation_reason: Option<String> = row.get(13)?;
    let cancelled_at_str: Option<String> = row.get(14)?;
    let created_at_str: String = row.get(15)?;
    let updated_at_str: String = row.get(16)?;

    let corrupt = |field: &str| AppError::UnavailableData(format!("booking {id} has unreadable {field}"));

    let kind = match kind_str.as_str() {
        "appointment" => {
            let date = date_str
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
                .ok_or_else(|| corrupt("date"))?;
            let time = time_str
                .as_deref()
                .and_then(|t| SlotTime::parse(t).ok())
                .ok_or_else(|| corrupt("time"))?;
            BookingKind::Appointment { date, time }
        }
        "membership" => BookingKind::MembershipPurchase {
            membership_id: membership_id.ok_or_else(|| corrupt("membership reference"))?,
        },
        _ => return Err(corrupt("kind")),
    };

    let status = BookingStatus::parse(&status_str).ok_or_else(|| corrupt("status"))?;
    let cancellation = match (cancellation_reason, cancelled_at_str) {
        (Some(reason), Some(at)) => Some(Cancellation {
            reason: CancellationReason::from(reason),
            cancelled_at: NaiveDateTime::parse_from_str(&at, TIMESTAMP_FORMAT)
                .map_err(|_| corrupt("cancellation timestamp"))?,
        }),
        _ => None,
    };
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)
        .map_err(|_| corrupt("created_at"))?;
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, TIMESTAMP_FORMAT)
        .map_err(|_| corrupt("updated_at"))?;

    Ok(Booking {
        code: row.get(1)?,
        customer_id: row.get(2)?,
        customer_name: row.get(3)?,
        service_name: row.get(4)?,
        category: row.get(5)?,
        kind,
        amount_cents: row.get(10)?,
        payment_id: row.get(11)?,
        status,
        cancellation,
        created_at,
        updated_at,
        id,
    })
}

/// Maps a unique-index violation on the active slot to `SlotTaken`.
fn slot_conflict(err: rusqlite::Error, date: Option<&str>, time: Option<&str>) -> AppError {
    match &err {
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == ErrorCode::ConstraintViolation && msg.contains("bookings.date") =>
        {
            AppError::SlotTaken {
                date: date.unwrap_or_default().to_string(),
                time: time.unwrap_or_default().to_string(),
            }
        }
        _ => AppError::Database(err),
    }
}

// ── Payments ──

pub fn create_payment(conn: &Connection, payment: &Payment) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO payments (id, amount_cents, method, status) VALUES (?1, ?2, ?3, ?4)",
        params![
            payment.id,
            payment.amount_cents,
            payment.method,
            payment.status.as_str()
        ],
    )?;
    Ok(())
}

pub fn get_payment(conn: &Connection, id: &str) -> Result<Option<Payment>, AppError> {
    let row = conn
        .query_row(
            "SELECT id, amount_cents, method, status FROM payments WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, amount_cents, method, status)| {
        let status = PaymentStatus::parse(&status)
            .ok_or_else(|| AppError::UnavailableData(format!("payment {id} has unreadable status")))?;
        Ok(Payment {
            id,
            amount_cents,
            method,
            status,
        })
    })
    .transpose()
}

// ── Memberships ──

pub fn create_membership(conn: &Connection, membership: &Membership) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO memberships (id, customer_id, package_name, start_date, end_date, sessions,
            remaining_sessions, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            membership.id,
            membership.customer_id,
            membership.package_name,
            membership.start_date.format(DATE_FORMAT).to_string(),
            membership.end_date.format(DATE_FORMAT).to_string(),
            membership.sessions,
            membership.remaining_sessions,
            membership.status.as_str(),
        ],
    )?;
    Ok(())
}

pub fn get_membership(conn: &Connection, id: &str) -> Result<Option<Membership>, AppError> {
    let row = conn
        .query_row(
            "SELECT id, customer_id, package_name, start_date, end_date, sessions,
                remaining_sessions, status
             FROM memberships WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    (
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ),
                    (row.get::<_, String>(3)?, row.get::<_, String>(4)?),
                    (
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, String>(7)?,
                    ),
                ))
            },
        )
        .optional()?;

    let Some(((id, customer_id, package_name), (start, end), (sessions, remaining, status))) = row
    else {
        return Ok(None);
    };

    let corrupt = |field: &str| AppError::UnavailableData(format!("membership {id} has unreadable {field}"));
    let start_date = NaiveDate::parse_from_str(&start, DATE_FORMAT).map_err(|_| corrupt("start_date"))?;
    let end_date = NaiveDate::parse_from_str(&end, DATE_FORMAT).map_err(|_| corrupt("end_date"))?;
    let status = MembershipStatus::parse(&status).ok_or_else(|| corrupt("status"))?;

    Ok(Some(Membership {
        id,
        customer_id,
        package_name,
        start_date,
        end_date,
        sessions,
        remaining_sessions: remaining,
        status,
    }))
}
