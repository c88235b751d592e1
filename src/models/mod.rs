pub mod availability;
pub mod booking;
pub mod role;
pub mod station;

pub use availability::{SlotAvailability, StationAvailability};
pub use booking::{Booking, BookingStatus};
pub use role::Role;
pub use station::Station;
