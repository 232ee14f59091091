use std::fmt;

use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// A bookable time of day, always rendered as 24-hour `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(SlotTime)
    }

    /// Accepts `"H:MM AM"`, `"H:MMpm"`, `"HH:MM"` and `"HH:MM:SS"`; seconds are dropped.
    pub fn parse(s: &str) -> Result<Self, String> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err("empty time".to_string());
        }

        let upper = raw.to_ascii_uppercase();
        let (clock, meridiem) = if let Some(rest) = upper.strip_suffix("AM") {
            (rest.trim_end(), Some(false))
        } else if let Some(rest) = upper.strip_suffix("PM") {
            (rest.trim_end(), Some(true))
        } else {
            (upper.as_str(), None)
        };

        let parts: Vec<&str> = clock.split(':').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(format!("invalid time format: {s}"));
        }
        let hour: u32 = parts[0]
            .parse()
            .map_err(|_| format!("invalid hour in: {s}"))?;
        let minute: u32 = match parts.get(1) {
            Some(m) if m.len() == 2 => m.parse().map_err(|_| format!("invalid minute in: {s}"))?,
            Some(_) => return Err(format!("invalid minute in: {s}")),
            // A bare hour is only meaningful with a meridiem, e.g. "3 PM".
            None if meridiem.is_some() => 0,
            None => return Err(format!("invalid time format: {s}")),
        };
        if let Some(sec) = parts.get(2) {
            let sec: u32 = sec.parse().map_err(|_| format!("invalid seconds in: {s}"))?;
            if sec > 59 {
                return Err(format!("time out of range: {s}"));
            }
        }

        let hour = match meridiem {
            Some(pm) => {
                if !(1..=12).contains(&hour) {
                    return Err(format!("time out of range: {s}"));
                }
                match (hour, pm) {
                    (12, false) => 0,
                    (12, true) => 12,
                    (h, false) => h,
                    (h, true) => h + 12,
                }
            }
            None => hour,
        };
        if hour > 23 || minute > 59 {
            return Err(format!("time out of range: {s}"));
        }

        SlotTime::new(hour, minute).ok_or_else(|| format!("time out of range: {s}"))
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }

    fn minutes_of_day(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

impl TryFrom<String> for SlotTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SlotTime::parse(&value)
    }
}

impl From<SlotTime> for String {
    fn from(value: SlotTime) -> Self {
        value.to_string()
    }
}

/// The fixed, ordered list of bookable times in a business day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSchedule {
    pub open: SlotTime,
    /// Start of the last bookable slot (inclusive).
    pub close: SlotTime,
    pub step_minutes: u32,
}

impl SlotSchedule {
    pub fn new(open: SlotTime, close: SlotTime, step_minutes: u32) -> Result<Self, String> {
        if step_minutes == 0 || step_minutes > 24 * 60 {
            return Err(format!("invalid slot length: {step_minutes} minutes"));
        }
        if close < open {
            return Err(format!("closing slot {close} is before opening slot {open}"));
        }
        if (close.minutes_of_day() - open.minutes_of_day()) % step_minutes != 0 {
            return Err(format!(
                "closing slot {close} is not aligned to {step_minutes}-minute steps from {open}"
            ));
        }
        Ok(Self {
            open,
            close,
            step_minutes,
        })
    }

    pub fn slots(&self) -> Vec<SlotTime> {
        let mut slots = vec![];
        let mut current = self.open.as_naive();
        let step = Duration::minutes(self.step_minutes as i64);
        loop {
            slots.push(SlotTime(current));
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 || next > self.close.as_naive() {
                break;
            }
            current = next;
        }
        slots
    }

    pub fn contains(&self, time: &SlotTime) -> bool {
        *time >= self.open
            && *time <= self.close
            && (time.minutes_of_day() - self.open.minutes_of_day()) % self.step_minutes == 0
    }

    pub fn slot_length(&self) -> Duration {
        Duration::minutes(self.step_minutes as i64)
    }
}

impl Default for SlotSchedule {
    fn default() -> Self {
        Self {
            open: SlotTime(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)),
            close: SlotTime(NaiveTime::from_hms_opt(17, 30, 0).unwrap_or(NaiveTime::MIN)),
            step_minutes: 30,
        }
    }
}
