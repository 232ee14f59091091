use std::env;

use chrono::FixedOffset;

use crate::errors::AppError;
use crate::models::{SlotSchedule, SlotTime};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub business_name: String,
    /// Salon wall-clock offset from UTC.
    pub utc_offset: FixedOffset,
    pub schedule: SlotSchedule,
    pub membership_validity_days: i64,
    pub analytics_top_n: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let offset_minutes: i32 = parse_var("SALON_UTC_OFFSET_MINUTES", 0)?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            AppError::Config(format!("SALON_UTC_OFFSET_MINUTES out of range: {offset_minutes}"))
        })?;

        let open = slot_var("SLOTS_OPEN", "09:00")?;
        let close = slot_var("SLOTS_CLOSE", "17:30")?;
        let step: u32 = parse_var("SLOT_MINUTES", 30)?;
        let schedule = SlotSchedule::new(open, close, step).map_err(AppError::Config)?;

        Ok(Self {
            port: parse_var("PORT", 3000)?,
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "nailbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            business_name: env::var("BUSINESS_NAME").unwrap_or_else(|_| "Nail Studio".to_string()),
            utc_offset,
            schedule,
            membership_validity_days: validity_days(parse_var("MEMBERSHIP_VALIDITY_DAYS", 90)?)?,
            analytics_top_n: parse_var("ANALYTICS_TOP_N", 5)?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

/// Memberships run at least one day and at most ten years.
fn validity_days(days: i64) -> Result<i64, AppError> {
    if !(1..=3650).contains(&days) {
        return Err(AppError::Config(format!(
            "MEMBERSHIP_VALIDITY_DAYS must be between 1 and 3650, got {days}"
        )));
    }
    Ok(days)
}

fn slot_var(name: &str, default: &str) -> Result<SlotTime, AppError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    SlotTime::parse(&raw).map_err(|e| AppError::Config(format!("{name}: {e}")))
}
