use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Membership {
    pub id: String,
    pub customer_id: String,
    pub package_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sessions: i64,
    pub remaining_sessions: i64,
    pub status: MembershipStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Active,
    Expired,
    Cancelled,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
            MembershipStatus::Expired => "expired",
            MembershipStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(MembershipStatus::Active),
            "expired" => Some(MembershipStatus::Expired),
            "cancelled" => Some(MembershipStatus::Cancelled),
            _ => None,
        }
    }
}

impl Membership {
    pub fn services_used(&self) -> i64 {
        (self.sessions - self.remaining_sessions).max(0)
    }

    /// A stored `active` membership past its end date reads as expired.
    pub fn effective_status(&self, today: NaiveDate) -> MembershipStatus {
        match self.status {
            MembershipStatus::Active if self.end_date < today => MembershipStatus::Expired,
            other => other,
        }
    }
}
