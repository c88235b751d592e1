use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::Serialize;

use super::{Booking, Station};

/// Bookable slots start on the hour and last one hour.
pub const SLOTS_PER_DAY: u32 = 24;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    pub display_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub booked_slots: u32,
    pub available_slots: u32,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StationAvailability {
    pub station_id: String,
    pub date: NaiveDate,
    pub total_slots: u32,
    pub availability_info: Vec<SlotAvailability>,
}

impl StationAvailability {
    /// Hour-by-hour capacity for one UTC day. Slots that have already
    /// started are reported as unavailable.
    pub fn for_day(
        station: &Station,
        date: NaiveDate,
        bookings: &[Booking],
        now: DateTime<Utc>,
    ) -> Self {
        let midnight = date.and_time(NaiveTime::MIN);

        let availability_info = (0..SLOTS_PER_DAY)
            .filter_map(|hour| {
                let start = midnight
                    .checked_add_signed(Duration::hours(i64::from(hour)))?
                    .and_utc();
                let end = start.checked_add_signed(Duration::hours(1))?;
                let booked_slots = slot_usage(bookings, start, None);
                let available_slots = station.total_slots.saturating_sub(booked_slots);

                Some(SlotAvailability {
                    display_name: format!("{}-{}", start.format("%H:%M"), end.format("%H:%M")),
                    start_time: start,
                    end_time: end,
                    booked_slots,
                    available_slots,
                    is_available: available_slots > 0 && start > now,
                })
            })
            .collect();

        Self {
            station_id: station.id.clone(),
            date,
            total_slots: station.total_slots,
            availability_info,
        }
    }
}

fn same_slot(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive() && a.hour() == b.hour()
}

/// Slots already held in the hour containing `at`. `exclude_id` leaves one
/// booking out, so an edit does not compete with itself.
pub fn slot_usage(bookings: &[Booking], at: DateTime<Utc>, exclude_id: Option<&str>) -> u32 {
    bookings
        .iter()
        .filter(|b| b.status.holds_slot())
        .filter(|b| exclude_id != Some(b.id.as_str()))
        .filter(|b| b.reservation_time.is_some_and(|t| same_slot(t, at)))
        .map(|b| b.slots_requested)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 16, 9, 30, 0).unwrap()
    }

    fn station(total_slots: u32) -> Station {
        Station {
            id: "st-1".to_string(),
            total_slots,
            updated_at: now(),
        }
    }

    fn booking(id: &str, hour: u32, minute: u32, slots: u32, status: BookingStatus) -> Booking {
        Booking {
            id: id.to_string(),
            owner_nic: "200012345678".to_string(),
            station_id: "st-1".to_string(),
            reservation_time: Some(Utc.with_ymd_and_hms(2025, 6, 16, hour, minute, 0).unwrap()),
            slots_requested: slots,
            status,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
    }

    #[test]
    fn test_day_has_hourly_slots() {
        let day = StationAvailability::for_day(&station(4), date(), &[], now());
        assert_eq!(day.availability_info.len(), SLOTS_PER_DAY as usize);

        let first = &day.availability_info[0];
        assert_eq!(first.display_name, "00:00-01:00");
        assert_eq!(first.start_time, Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap());
        assert_eq!(day.availability_info[23].display_name, "23:00-00:00");
    }

    #[test]
    fn test_active_bookings_consume_capacity() {
        let bookings = vec![
            booking("a", 14, 0, 2, BookingStatus::Confirmed),
            booking("b", 14, 45, 1, BookingStatus::Pending),
            booking("c", 14, 15, 3, BookingStatus::Cancelled),
            booking("d", 14, 30, 3, BookingStatus::NoShow),
            booking("e", 15, 0, 1, BookingStatus::InProgress),
        ];
        let day = StationAvailability::for_day(&station(4), date(), &bookings, now());

        let two_pm = &day.availability_info[14];
        assert_eq!(two_pm.booked_slots, 3);
        assert_eq!(two_pm.available_slots, 1);
        assert!(two_pm.is_available);
        assert_eq!(day.availability_info[15].available_slots, 3);
    }

    #[test]
    fn test_full_and_past_slots_are_unavailable() {
        let bookings = vec![booking("a", 12, 0, 4, BookingStatus::Confirmed)];
        let day = StationAvailability::for_day(&station(4), date(), &bookings, now());

        assert!(!day.availability_info[12].is_available);
        assert_eq!(day.availability_info[12].available_slots, 0);
        // 09:00 has already started at 09:30.
        assert!(!day.availability_info[9].is_available);
        assert!(day.availability_info[10].is_available);
    }

    #[test]
    fn test_overbooked_slot_saturates_at_zero() {
        let bookings = vec![booking("a", 12, 0, 6, BookingStatus::Confirmed)];
        let day = StationAvailability::for_day(&station(4), date(), &bookings, now());
        assert_eq!(day.availability_info[12].available_slots, 0);
    }

    #[test]
    fn test_slot_usage_can_exclude_a_booking() {
        let bookings = vec![
            booking("a", 14, 0, 2, BookingStatus::Confirmed),
            booking("b", 14, 10, 1, BookingStatus::Confirmed),
        ];
        let at = Utc.with_ymd_and_hms(2025, 6, 16, 14, 59, 0).unwrap();
        assert_eq!(slot_usage(&bookings, at, None), 3);
        assert_eq!(slot_usage(&bookings, at, Some("a")), 1);
    }

    #[test]
    fn test_wire_field_names() {
        let day = StationAvailability::for_day(&station(2), date(), &[], now());
        let value = serde_json::to_value(&day).unwrap();
        assert_eq!(value["stationId"], "st-1");
        assert_eq!(value["date"], "2025-06-16");
        assert_eq!(value["totalSlots"], 2);
        let slot = &value["availabilityInfo"][10];
        assert_eq!(slot["displayName"], "10:00-11:00");
        assert_eq!(slot["availableSlots"], 2);
        assert_eq!(slot["isAvailable"], true);
        assert!(slot.get("startTime").is_some());
    }
}
