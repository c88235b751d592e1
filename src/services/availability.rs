//! Per-slot station capacity. A booking holds `slots_requested` places in
//! the hour its reservation starts until it is cancelled, completed or
//! marked as a no-show.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;

use crate::db::queries::{self, BookingFilter};
use crate::errors::AppError;
use crate::models::availability::slot_usage;
use crate::models::{Booking, StationAvailability};
use crate::services::stations;

fn bookings_on(conn: &Connection, station_id: &str, date: NaiveDate) -> Result<Vec<Booking>, AppError> {
    let from = date.and_time(NaiveTime::MIN).and_utc();
    let filter = BookingFilter {
        station_id: Some(station_id.to_string()),
        from: Some(from),
        to: from.checked_add_signed(Duration::days(1)),
        ..Default::default()
    };
    Ok(queries::list_bookings(conn, &filter)?)
}

pub fn station_availability(
    conn: &Connection,
    station_id: &str,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<StationAvailability, AppError> {
    let station = stations::get_station(conn, station_id)?;
    let bookings = bookings_on(conn, station_id, date)?;
    Ok(StationAvailability::for_day(&station, date, &bookings, now))
}

/// Reject a reservation that needs more places than the slot has left.
pub fn ensure_capacity(
    conn: &Connection,
    station_id: &str,
    reservation: DateTime<Utc>,
    slots: u32,
    exclude_id: Option<&str>,
) -> Result<(), AppError> {
    let station = stations::get_station(conn, station_id)?;
    let bookings = bookings_on(conn, station_id, reservation.date_naive())?;
    let booked = slot_usage(&bookings, reservation, exclude_id);
    let available = station.total_slots.saturating_sub(booked);

    if slots > available {
        tracing::warn!(
            station_id,
            requested = slots,
            available,
            "slot capacity exceeded"
        );
        return Err(AppError::Validation(format!(
            "Only {available} slots available for this time"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{BookingStatus, Role};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 16, 9, 0, 0).unwrap()
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 17, hour, minute, 0).unwrap()
    }

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        stations::set_total_slots(&conn, Role::Administrator, "st-1", 3, now()).unwrap();
        conn
    }

    fn seed(conn: &Connection, id: &str, reservation: DateTime<Utc>, slots: u32, status: BookingStatus) {
        let booking = Booking {
            id: id.to_string(),
            owner_nic: "200012345678".to_string(),
            station_id: "st-1".to_string(),
            reservation_time: Some(reservation),
            slots_requested: slots,
            status,
            created_at: now(),
            updated_at: now(),
        };
        queries::insert_booking(conn, &booking).unwrap();
    }

    #[test]
    fn test_capacity_counts_only_the_same_hour() {
        let conn = setup_db();
        seed(&conn, "a", at(14, 0), 2, BookingStatus::Confirmed);
        seed(&conn, "b", at(15, 0), 3, BookingStatus::Confirmed);

        ensure_capacity(&conn, "st-1", at(14, 30), 1, None).unwrap();
        let err = ensure_capacity(&conn, "st-1", at(14, 30), 2, None).unwrap_err();
        assert_eq!(err.to_string(), "Only 1 slots available for this time");
    }

    #[test]
    fn test_released_bookings_free_capacity() {
        let conn = setup_db();
        seed(&conn, "a", at(14, 0), 3, BookingStatus::Cancelled);
        seed(&conn, "b", at(14, 0), 3, BookingStatus::NoShow);
        ensure_capacity(&conn, "st-1", at(14, 0), 3, None).unwrap();
    }

    #[test]
    fn test_excluded_booking_does_not_compete_with_itself() {
        let conn = setup_db();
        seed(&conn, "a", at(14, 0), 3, BookingStatus::Pending);
        assert!(ensure_capacity(&conn, "st-1", at(14, 0), 3, None).is_err());
        ensure_capacity(&conn, "st-1", at(14, 0), 3, Some("a")).unwrap();
    }

    #[test]
    fn test_unknown_station() {
        let conn = setup_db();
        assert!(matches!(
            ensure_capacity(&conn, "st-9", at(14, 0), 1, None),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            station_availability(&conn, "st-9", at(0, 0).date_naive(), now()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_station_availability_for_day() {
        let conn = setup_db();
        seed(&conn, "a", at(14, 0), 2, BookingStatus::Confirmed);
        // Next day's midnight is outside the requested day.
        seed(&conn, "b", Utc.with_ymd_and_hms(2025, 6, 18, 0, 0, 0).unwrap(), 3, BookingStatus::Confirmed);

        let day = station_availability(&conn, "st-1", at(0, 0).date_naive(), now()).unwrap();
        assert_eq!(day.total_slots, 3);
        assert_eq!(day.availability_info[14].available_slots, 1);
        assert_eq!(day.availability_info[0].available_slots, 3);
        assert!(day.availability_info.iter().all(|slot| slot.is_available));
    }
}
