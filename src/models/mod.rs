pub mod booking;
pub mod membership;
pub mod payment;
pub mod slot;
pub mod status;

pub use booking::{Booking, BookingKind, BookingStatus, Cancellation, CancellationReason};
pub use membership::{Membership, MembershipStatus};
pub use payment::{Payment, PaymentStatus};
pub use slot::{SlotSchedule, SlotTime};
pub use status::DisplayStatus;
