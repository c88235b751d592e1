use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::bookings::authorize;
use crate::models::Station;
use crate::services::stations;
use crate::state::AppState;

// GET /stations/:id
pub async fn get_station(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Station>, AppError> {
    authorize(&headers, &state)?;
    let db = state.db()?;
    Ok(Json(stations::get_station(&db, &id)?))
}

// PATCH /stations/:id/slots
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsRequest {
    #[serde(alias = "TotalSlots")]
    pub total_slots: u32,
}

pub async fn update_station_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<SlotsRequest>,
) -> Result<Json<Station>, AppError> {
    let role = authorize(&headers, &state)?;
    let db = state.db()?;
    let station = stations::set_total_slots(&db, role, &id, body.total_slots, Utc::now())?;
    Ok(Json(station))
}
