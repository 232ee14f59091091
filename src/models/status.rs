use serde::{Deserialize, Serialize};

/// Lifecycle label shown to customers and staff; computed, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Upcoming,
    Confirmed,
    Pending,
    Completed,
    Cancelled,
    Active,
    Expired,
}
