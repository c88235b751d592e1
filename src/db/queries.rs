use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Booking, BookingStatus, Station};

const BOOKING_COLUMNS: &str =
    "id, owner_nic, station_id, reservation_time, slots_requested, status, created_at, updated_at";

/// Fixed-width UTC timestamps so that text comparison in SQL orders correctly.
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid stored timestamp: {s}"))?;
    Ok(parsed.with_timezone(&Utc))
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, owner_nic, station_id, reservation_time, slots_requested, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            booking.id,
            booking.owner_nic,
            booking.station_id,
            booking.reservation_time.as_ref().map(format_ts),
            booking.slots_requested,
            booking.status.as_str(),
            format_ts(&booking.created_at),
            format_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let row = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(read_booking_row(row)),
        )
        .optional()?;

    row.transpose()
}

#[derive(Debug, Default, Clone)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub station_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<Vec<Booking>> {
    let mut clauses: Vec<String> = vec![];
    let mut values: Vec<Box<dyn ToSql>> = vec![];

    if let Some(status) = filter.status {
        values.push(Box::new(status.as_str()));
        clauses.push(format!("status = ?{}", values.len()));
    }
    if let Some(station_id) = &filter.station_id {
        values.push(Box::new(station_id.clone()));
        clauses.push(format!("station_id = ?{}", values.len()));
    }
    if let Some(from) = &filter.from {
        values.push(Box::new(format_ts(from)));
        clauses.push(format!("reservation_time >= ?{}", values.len()));
    }
    if let Some(to) = &filter.to {
        values.push(Box::new(format_ts(to)));
        clauses.push(format!("reservation_time <= ?{}", values.len()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings{where_clause} ORDER BY reservation_time ASC, created_at ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(read_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    now: &DateTime<Utc>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), format_ts(now), id],
    )?;
    Ok(count > 0)
}

pub fn update_booking_details(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET owner_nic = ?1, reservation_time = ?2, slots_requested = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            booking.owner_nic,
            booking.reservation_time.as_ref().map(format_ts),
            booking.slots_requested,
            format_ts(&booking.updated_at),
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

// ── Stations ──

pub fn get_station(conn: &Connection, id: &str) -> anyhow::Result<Option<Station>> {
    let row = conn
        .query_row(
            "SELECT id, total_slots, updated_at FROM stations WHERE id = ?1",
            params![id],
            |row| {
                let id: String = row.get(0)?;
                let total_slots: u32 = row.get(1)?;
                let updated_at: String = row.get(2)?;
                Ok((id, total_slots, updated_at))
            },
        )
        .optional()?;

    row.map(|(id, total_slots, updated_at)| {
        Ok(Station {
            id,
            total_slots,
            updated_at: parse_ts(&updated_at)?,
        })
    })
    .transpose()
}

pub fn upsert_station(conn: &Connection, station: &Station) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO stations (id, total_slots, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET total_slots = excluded.total_slots, updated_at = excluded.updated_at",
        params![
            station.id,
            station.total_slots,
            format_ts(&station.updated_at)
        ],
    )?;
    Ok(())
}

fn read_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let owner_nic: String = row.get(1)?;
    let station_id: String = row.get(2)?;
    let reservation_time: Option<String> = row.get(3)?;
    let slots_requested: u32 = row.get(4)?;
    let status_str: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    let status = BookingStatus::parse(&status_str)
        .with_context(|| format!("booking {id} has unknown status {status_str:?}"))?;

    Ok(Booking {
        reservation_time: reservation_time.as_deref().map(parse_ts).transpose()?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        id,
        owner_nic,
        station_id,
        slots_requested,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::{Duration, TimeZone};

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 16, 9, 0, 0).unwrap()
    }

    fn make_booking(id: &str, station: &str, hours_ahead: i64, status: BookingStatus) -> Booking {
        Booking {
            id: id.to_string(),
            owner_nic: "200012345678".to_string(),
            station_id: station.to_string(),
            reservation_time: Some(now() + Duration::hours(hours_ahead)),
            slots_requested: 1,
            status,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_insert_and_get_booking() {
        let conn = setup_db();
        let booking = make_booking("b-1", "st-1", 20, BookingStatus::Pending);
        insert_booking(&conn, &booking).unwrap();

        let loaded = get_booking_by_id(&conn, "b-1").unwrap().unwrap();
        assert_eq!(loaded, booking);
        assert!(get_booking_by_id(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_booking_without_reservation_time() {
        let conn = setup_db();
        let mut booking = make_booking("b-2", "st-1", 0, BookingStatus::Pending);
        booking.reservation_time = None;
        insert_booking(&conn, &booking).unwrap();

        let loaded = get_booking_by_id(&conn, "b-2").unwrap().unwrap();
        assert_eq!(loaded.reservation_time, None);
    }

    #[test]
    fn test_list_filters_and_ordering() {
        let conn = setup_db();
        insert_booking(&conn, &make_booking("late", "st-1", 48, BookingStatus::Confirmed)).unwrap();
        insert_booking(&conn, &make_booking("early", "st-1", 2, BookingStatus::Confirmed)).unwrap();
        insert_booking(&conn, &make_booking("other", "st-2", 10, BookingStatus::Pending)).unwrap();

        let all = list_bookings(&conn, &BookingFilter::default()).unwrap();
        let ids: Vec<_> = all.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "other", "late"]);

        let confirmed = list_bookings(
            &conn,
            &BookingFilter {
                status: Some(BookingStatus::Confirmed),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(confirmed.len(), 2);

        let windowed = list_bookings(
            &conn,
            &BookingFilter {
                station_id: Some("st-1".to_string()),
                from: Some(now() + Duration::hours(1)),
                to: Some(now() + Duration::hours(24)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].id, "early");
    }

    #[test]
    fn test_update_status() {
        let conn = setup_db();
        insert_booking(&conn, &make_booking("b-3", "st-1", 20, BookingStatus::Pending)).unwrap();

        let later = now() + Duration::minutes(5);
        assert!(update_booking_status(&conn, "b-3", BookingStatus::InProgress, &later).unwrap());
        assert!(!update_booking_status(&conn, "nope", BookingStatus::InProgress, &later).unwrap());

        let loaded = get_booking_by_id(&conn, "b-3").unwrap().unwrap();
        assert_eq!(loaded.status, BookingStatus::InProgress);
        assert_eq!(loaded.updated_at, later);
    }

    #[test]
    fn test_upsert_station() {
        let conn = setup_db();
        assert!(get_station(&conn, "st-1").unwrap().is_none());

        let mut station = Station {
            id: "st-1".to_string(),
            total_slots: 4,
            updated_at: now(),
        };
        upsert_station(&conn, &station).unwrap();
        assert_eq!(get_station(&conn, "st-1").unwrap().unwrap(), station);

        station.total_slots = 6;
        station.updated_at = now() + Duration::hours(1);
        upsert_station(&conn, &station).unwrap();
        assert_eq!(get_station(&conn, "st-1").unwrap().unwrap(), station);
    }

    #[test]
    fn test_unknown_stored_status_is_an_error() {
        let conn = setup_db();
        insert_booking(&conn, &make_booking("b-4", "st-1", 20, BookingStatus::Pending)).unwrap();
        conn.execute("UPDATE bookings SET status = 'Expired' WHERE id = 'b-4'", [])
            .unwrap();

        assert!(get_booking_by_id(&conn, "b-4").is_err());
    }
}
