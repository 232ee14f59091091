pub mod aggregation;
pub mod availability;
pub mod booking;
pub mod calendar;
pub mod cancellation;
pub mod clock;
pub mod reschedule;
pub mod status;
