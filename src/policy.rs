//! Booking time-window and status-transition rules.
//!
//! Every function here is pure: the caller supplies the current time and the
//! caller's role. The same checks run on both sides of the wire, in
//! [`crate::client`] before a request is sent and in
//! [`crate::services::bookings`] before a booking is mutated.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Booking, BookingStatus, Role};

/// Hours before the reservation at which cancellation closes and status
/// edits become restricted.
pub const RESTRICTION_WINDOW_HOURS: f64 = 12.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

const ADMINISTRATOR_STATUSES: [BookingStatus; 5] = [
    BookingStatus::Pending,
    BookingStatus::Confirmed,
    BookingStatus::Completed,
    BookingStatus::InProgress,
    BookingStatus::NoShow,
];

const STATION_OPERATOR_STATUSES: [BookingStatus; 3] = [
    BookingStatus::InProgress,
    BookingStatus::Completed,
    BookingStatus::NoShow,
];

/// Targets still reachable once the reservation is less than twelve hours away.
const RESTRICTED_WINDOW_STATUSES: [BookingStatus; 3] = [
    BookingStatus::InProgress,
    BookingStatus::Completed,
    BookingStatus::NoShow,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRestriction {
    pub allowed: bool,
    pub hours_remaining: Option<f64>,
    pub within_twelve_hours: bool,
}

pub fn time_restriction(
    reservation_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> TimeRestriction {
    let Some(reservation) = reservation_time else {
        return TimeRestriction {
            allowed: true,
            hours_remaining: None,
            within_twelve_hours: false,
        };
    };

    let hours_remaining = (reservation - now).num_milliseconds() as f64 / MILLIS_PER_HOUR;

    TimeRestriction {
        allowed: hours_remaining > RESTRICTION_WINDOW_HOURS,
        hours_remaining: Some(hours_remaining),
        within_twelve_hours: hours_remaining > 0.0 && hours_remaining <= RESTRICTION_WINDOW_HOURS,
    }
}

pub fn role_statuses(role: Role) -> &'static [BookingStatus] {
    match role {
        Role::Administrator => &ADMINISTRATOR_STATUSES,
        Role::StationOperator => &STATION_OPERATOR_STATUSES,
    }
}

/// Why the status edit action is disabled for a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditBlock {
    /// Pending or confirmed booking inside the twelve-hour window. This blocks
    /// the restricted transitions too, unlike other statuses.
    WithinTwelveHours(BookingStatus),
    Cancelled,
    Completed,
}

impl fmt::Display for EditBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditBlock::WithinTwelveHours(_) => f.write_str(
                "Status update restricted within 12 hours for confirmed/pending bookings",
            ),
            EditBlock::Cancelled => f.write_str("Cannot edit status for cancelled bookings"),
            EditBlock::Completed => f.write_str("Cannot edit status for completed bookings"),
        }
    }
}

pub fn status_edit_block(booking: &Booking, now: DateTime<Utc>) -> Option<EditBlock> {
    match booking.status {
        BookingStatus::Cancelled => Some(EditBlock::Cancelled),
        BookingStatus::Completed => Some(EditBlock::Completed),
        status @ (BookingStatus::Pending | BookingStatus::Confirmed) => {
            time_restriction(booking.reservation_time, now)
                .within_twelve_hours
                .then_some(EditBlock::WithinTwelveHours(status))
        }
        BookingStatus::InProgress | BookingStatus::NoShow => None,
    }
}

/// Statuses the caller may move the booking to. Empty when editing is blocked.
pub fn allowed_status_transitions(
    booking: &Booking,
    now: DateTime<Utc>,
    role: Role,
) -> BTreeSet<BookingStatus> {
    if status_edit_block(booking, now).is_some() {
        return BTreeSet::new();
    }

    let baseline = role_statuses(role).iter().copied();
    if time_restriction(booking.reservation_time, now).within_twelve_hours {
        baseline
            .filter(|status| RESTRICTED_WINDOW_STATUSES.contains(status))
            .collect()
    } else {
        baseline.collect()
    }
}

pub fn is_status_update_valid(
    booking: &Booking,
    target: BookingStatus,
    now: DateTime<Utc>,
    role: Role,
) -> bool {
    allowed_status_transitions(booking, now, role).contains(&target)
}

pub fn can_cancel(booking: &Booking, now: DateTime<Utc>) -> bool {
    check_cancel(booking, now).is_ok()
}

/// A rejected cancellation or status change. The text is shown to the user
/// as-is, on both the local and the remote path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("Bookings can only be cancelled at least 12 hours before the reservation time.")]
    CancellationWindowClosed,

    #[error("Booking is already {0} and cannot be cancelled.")]
    NotCancellable(BookingStatus),

    #[error("{0}")]
    EditBlocked(EditBlock),

    #[error("Only 'In Progress', 'Completed', and 'No Show' status updates are allowed within 12 hours of reservation time.")]
    RestrictedWindow { requested: BookingStatus },

    #[error("Status '{requested}' is not permitted for the {role} role.")]
    RoleNotPermitted {
        requested: BookingStatus,
        role: Role,
    },
}

pub fn check_cancel(booking: &Booking, now: DateTime<Utc>) -> Result<(), PolicyViolation> {
    if booking.status.is_terminal() {
        return Err(PolicyViolation::NotCancellable(booking.status));
    }
    if !time_restriction(booking.reservation_time, now).allowed {
        return Err(PolicyViolation::CancellationWindowClosed);
    }
    Ok(())
}

pub fn check_status_update(
    booking: &Booking,
    target: BookingStatus,
    now: DateTime<Utc>,
    role: Role,
) -> Result<(), PolicyViolation> {
    if let Some(block) = status_edit_block(booking, now) {
        return Err(PolicyViolation::EditBlocked(block));
    }

    if is_status_update_valid(booking, target, now, role) {
        return Ok(());
    }

    if time_restriction(booking.reservation_time, now).within_twelve_hours {
        Err(PolicyViolation::RestrictedWindow { requested: target })
    } else {
        Err(PolicyViolation::RoleNotPermitted {
            requested: target,
            role,
        })
    }
}

/// Everything a UI needs to enable or disable booking controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDecision {
    pub booking_id: String,
    pub time_restriction: TimeRestriction,
    pub can_cancel: bool,
    pub allowed_statuses: BTreeSet<BookingStatus>,
    pub edit_blocked_reason: Option<String>,
}

impl BookingDecision {
    pub fn evaluate(booking: &Booking, now: DateTime<Utc>, role: Role) -> Self {
        Self {
            booking_id: booking.id.clone(),
            time_restriction: time_restriction(booking.reservation_time, now),
            can_cancel: can_cancel(booking, now),
            allowed_statuses: allowed_status_transitions(booking, now, role),
            edit_blocked_reason: status_edit_block(booking, now).map(|b| b.to_string()),
        }
    }
}
