//! Server-side booking operations. Every mutation re-runs the booking policy
//! against the stored record before it is written.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries::{self, BookingFilter};
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Role};
use crate::policy;
use crate::services::availability;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    #[serde(rename = "ownerNIC")]
    pub owner_nic: String,
    pub station_id: String,
    pub reservation_time: DateTime<Utc>,
    pub slots_requested: u32,
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingChanges {
    #[serde(rename = "ownerNIC")]
    pub owner_nic: Option<String>,
    pub reservation_time: Option<DateTime<Utc>>,
    pub slots_requested: Option<u32>,
}

fn require_admin(role: Role, action: &str) -> Result<(), AppError> {
    if role == Role::Administrator {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("only administrators may {action}")))
    }
}

fn require_non_empty(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn validate_slots(slots: u32) -> Result<(), AppError> {
    if slots == 0 {
        return Err(AppError::Validation(
            "slotsRequested must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_reservation_time(
    reservation: DateTime<Utc>,
    now: DateTime<Utc>,
    horizon_days: i64,
) -> Result<(), AppError> {
    if reservation <= now {
        return Err(AppError::Validation(
            "reservationTime must be in the future".to_string(),
        ));
    }
    // A horizon past the last representable instant places no upper bound.
    let limit = Duration::try_days(horizon_days).and_then(|days| now.checked_add_signed(days));
    if limit.is_some_and(|limit| reservation > limit) {
        return Err(AppError::Validation(format!(
            "reservationTime must be within the next {horizon_days} days"
        )));
    }
    Ok(())
}

/// Timestamps are stored with millisecond precision.
fn stored(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

fn load(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

pub fn create_booking(
    conn: &Connection,
    role: Role,
    new: NewBooking,
    now: DateTime<Utc>,
    horizon_days: i64,
) -> Result<Booking, AppError> {
    require_admin(role, "create bookings")?;
    require_non_empty(&new.owner_nic, "ownerNIC")?;
    require_non_empty(&new.station_id, "stationId")?;
    validate_slots(new.slots_requested)?;
    validate_reservation_time(new.reservation_time, now, horizon_days)?;

    let now = stored(now);
    let status = new.status.unwrap_or(BookingStatus::Pending);
    if !matches!(status, BookingStatus::Pending | BookingStatus::Confirmed) {
        return Err(AppError::Validation(format!(
            "new bookings must be Pending or Confirmed, not {status}"
        )));
    }

    let reservation_time = stored(new.reservation_time);
    let station_id = new.station_id.trim().to_string();
    availability::ensure_capacity(conn, &station_id, reservation_time, new.slots_requested, None)?;

    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        owner_nic: new.owner_nic.trim().to_string(),
        station_id,
        reservation_time: Some(reservation_time),
        slots_requested: new.slots_requested,
        status,
        created_at: now,
        updated_at: now,
    };
    queries::insert_booking(conn, &booking)?;

    tracing::info!(
        booking_id = %booking.id,
        station_id = %booking.station_id,
        status = %booking.status,
        "booking created"
    );
    Ok(booking)
}

pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
    Ok(queries::list_bookings(conn, filter)?)
}

pub fn get_booking(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    load(conn, id)
}

pub fn update_booking(
    conn: &Connection,
    role: Role,
    id: &str,
    changes: BookingChanges,
    now: DateTime<Utc>,
    horizon_days: i64,
) -> Result<Booking, AppError> {
    require_admin(role, "edit bookings")?;
    let mut booking = load(conn, id)?;

    if booking.status.is_terminal() {
        return Err(AppError::Validation(format!(
            "booking is {} and can no longer be edited",
            booking.status
        )));
    }

    let reschedules = changes.reservation_time.is_some() || changes.slots_requested.is_some();
    if let Some(owner_nic) = changes.owner_nic {
        require_non_empty(&owner_nic, "ownerNIC")?;
        booking.owner_nic = owner_nic.trim().to_string();
    }
    if let Some(reservation_time) = changes.reservation_time {
        validate_reservation_time(reservation_time, now, horizon_days)?;
        booking.reservation_time = Some(stored(reservation_time));
    }
    if let Some(slots) = changes.slots_requested {
        validate_slots(slots)?;
        booking.slots_requested = slots;
    }
    if let Some(reservation_time) = booking.reservation_time {
        if reschedules && booking.status.holds_slot() {
            availability::ensure_capacity(
                conn,
                &booking.station_id,
                reservation_time,
                booking.slots_requested,
                Some(booking.id.as_str()),
            )?;
        }
    }
    booking.updated_at = stored(now);

    queries::update_booking_details(conn, &booking)?;
    tracing::info!(booking_id = %booking.id, "booking details updated");
    Ok(booking)
}

pub fn update_status(
    conn: &Connection,
    role: Role,
    id: &str,
    target: BookingStatus,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let mut booking = load(conn, id)?;

    if let Err(violation) = policy::check_status_update(&booking, target, now, role) {
        tracing::warn!(
            booking_id = %booking.id,
            current = %booking.status,
            requested = %target,
            role = %role,
            reason = %violation,
            "status update rejected"
        );
        return Err(violation.into());
    }

    let now = stored(now);
    queries::update_booking_status(conn, &booking.id, target, &now)?;
    tracing::info!(
        booking_id = %booking.id,
        from = %booking.status,
        to = %target,
        role = %role,
        "booking status updated"
    );

    booking.status = target;
    booking.updated_at = now;
    Ok(booking)
}

pub fn cancel_booking(
    conn: &Connection,
    role: Role,
    id: &str,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    require_admin(role, "cancel bookings")?;
    let mut booking = load(conn, id)?;

    if let Err(violation) = policy::check_cancel(&booking, now) {
        tracing::warn!(booking_id = %booking.id, reason = %violation, "cancellation rejected");
        return Err(violation.into());
    }

    let now = stored(now);
    queries::update_booking_status(conn, &booking.id, BookingStatus::Cancelled, &now)?;
    tracing::info!(booking_id = %booking.id, "booking cancelled");

    booking.status = BookingStatus::Cancelled;
    booking.updated_at = now;
    Ok(booking)
}
