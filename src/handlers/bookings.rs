use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::db::queries::BookingFilter;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Role, StationAvailability};
use crate::policy::BookingDecision;
use crate::services::availability;
use crate::services::bookings::{self, BookingChanges, NewBooking};
use crate::state::AppState;

/// The auth scheme is matched without regard to case.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}

/// Map the bearer token to the caller's role.
pub(crate) fn authorize(headers: &HeaderMap, state: &AppState) -> Result<Role, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = bearer_token(auth).unwrap_or("");

    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }
    if token == state.config.admin_token {
        Ok(Role::Administrator)
    } else if token == state.config.operator_token {
        Ok(Role::StationOperator)
    } else {
        Err(AppError::Unauthorized)
    }
}

// POST /bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewBooking>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let role = authorize(&headers, &state)?;
    let db = state.db()?;
    let booking = bookings::create_booking(
        &db,
        role,
        body,
        Utc::now(),
        state.config.booking_horizon_days,
    )?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /bookings
#[derive(Debug, Default, Deserialize)]
pub struct BookingsQuery {
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "StationId")]
    pub station_id: Option<String>,
    #[serde(rename = "FromDate")]
    pub from_date: Option<String>,
    #[serde(rename = "ToDate")]
    pub to_date: Option<String>,
}

#[derive(Clone, Copy)]
enum DateBound {
    Start,
    End,
}

/// Accepts a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date, which
/// covers the whole UTC day.
fn parse_date_bound(raw: &str, bound: DateBound) -> Result<DateTime<Utc>, AppError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {raw}")))?;
    let time = match bound {
        DateBound::Start => date.and_hms_opt(0, 0, 0),
        DateBound::End => date.and_hms_milli_opt(23, 59, 59, 999),
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| AppError::Validation(format!("invalid date: {raw}")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl BookingsQuery {
    fn into_filter(self) -> Result<BookingFilter, AppError> {
        let status = non_empty(self.status)
            .map(|s| {
                BookingStatus::parse(&s)
                    .ok_or_else(|| AppError::Validation(format!("unknown status: {s}")))
            })
            .transpose()?;
        let from = non_empty(self.from_date)
            .map(|d| parse_date_bound(&d, DateBound::Start))
            .transpose()?;
        let to = non_empty(self.to_date)
            .map(|d| parse_date_bound(&d, DateBound::End))
            .transpose()?;

        Ok(BookingFilter {
            status,
            station_id: non_empty(self.station_id),
            from,
            to,
        })
    }
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    authorize(&headers, &state)?;
    let filter = query.into_filter()?;
    let db = state.db()?;
    Ok(Json(bookings::list_bookings(&db, &filter)?))
}

// GET /bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    authorize(&headers, &state)?;
    let db = state.db()?;
    Ok(Json(bookings::get_booking(&db, &id)?))
}

// GET /bookings/:id/policy
pub async fn get_booking_policy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingDecision>, AppError> {
    let role = authorize(&headers, &state)?;
    let booking = {
        let db = state.db()?;
        bookings::get_booking(&db, &id)?
    };
    Ok(Json(BookingDecision::evaluate(&booking, Utc::now(), role)))
}

// GET /bookings/availability/:station_id/date/:date
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((station_id, date)): Path<(String, String)>,
) -> Result<Json<StationAvailability>, AppError> {
    authorize(&headers, &state)?;
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {date}")))?;
    let db = state.db()?;
    let day = availability::station_availability(&db, &station_id, date, Utc::now())?;
    Ok(Json(day))
}

// PATCH /bookings/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<BookingChanges>,
) -> Result<Json<Booking>, AppError> {
    let role = authorize(&headers, &state)?;
    let db = state.db()?;
    let booking = bookings::update_booking(
        &db,
        role,
        &id,
        body,
        Utc::now(),
        state.config.booking_horizon_days,
    )?;
    Ok(Json(booking))
}

// PATCH /bookings/status/:id
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: BookingStatus,
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<Booking>, AppError> {
    let role = authorize(&headers, &state)?;
    let db = state.db()?;
    let booking = bookings::update_status(&db, role, &id, body.status, Utc::now())?;
    Ok(Json(booking))
}

// PATCH /bookings/cancel/:id
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let role = authorize(&headers, &state)?;
    let db = state.db()?;
    let booking = bookings::cancel_booking(&db, role, &id, Utc::now())?;
    Ok(Json(booking))
}
