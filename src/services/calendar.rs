use chrono::Duration;

use crate::errors::AppError;
use crate::models::Booking;

/// Escapes a value for an iCalendar TEXT property (RFC 5545 §3.3.11).
/// Line breaks become `\n` so a value can never start a new property line.
fn escape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Renders a single-event iCalendar file for an appointment.
pub fn generate_ics(
    booking: &Booking,
    business_name: &str,
    slot_length: Duration,
) -> Result<String, AppError> {
    let starts_at = booking.starts_at().ok_or_else(|| {
        AppError::Validation("membership purchases have no calendar entry".to_string())
    })?;

    let dtstart = starts_at.format("%Y%m%dT%H%M%S").to_string();
    let dtend = (starts_at + slot_length).format("%Y%m%dT%H%M%S").to_string();
    let dtstamp = booking.created_at.format("%Y%m%dT%H%M%S").to_string();
    let uid = format!("{}@nailbook", booking.id);

    let summary = format!(
        "{} at {}",
        escape_text(&booking.service_name),
        escape_text(business_name)
    );
    let status = if booking.is_active() {
        "CONFIRMED"
    } else {
        "CANCELLED"
    };

    Ok(format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Nailbook//Salon Booking//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:Booking code {code}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n",
        code = escape_text(&booking.code),
    ))
}
