use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Role, Station};

pub fn get_station(conn: &Connection, id: &str) -> Result<Station, AppError> {
    queries::get_station(conn, id)?.ok_or_else(|| AppError::NotFound(format!("station {id}")))
}

/// Register a station or change its capacity. Existing bookings are kept
/// even when the new capacity is below what is already booked.
pub fn set_total_slots(
    conn: &Connection,
    role: Role,
    id: &str,
    total_slots: u32,
    now: DateTime<Utc>,
) -> Result<Station, AppError> {
    if role != Role::Administrator {
        return Err(AppError::Forbidden(
            "only administrators may change station capacity".to_string(),
        ));
    }
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::Validation("station id is required".to_string()));
    }

    let station = Station {
        id: id.to_string(),
        total_slots,
        updated_at: now.trunc_subsecs(3),
    };
    queries::upsert_station(conn, &station)?;

    tracing::info!(station_id = %station.id, total_slots, "station capacity set");
    Ok(station)
}
