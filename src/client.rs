//! HTTP client for the booking API.
//!
//! Mutations are checked against [`crate::policy`] first, so a request that
//! the policy already rejects never leaves the process. The server stays the
//! final authority and its rejections come back as [`ClientError::Remote`].

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response};
use serde_json::json;

use crate::models::{Booking, BookingStatus, Role};
use crate::policy::{self, PolicyViolation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    Fetch,
    UpdateStatus,
    Cancel,
}

impl BookingAction {
    /// Message shown when the server rejects the action for a reason the
    /// user cannot act on.
    pub fn failure_message(&self) -> &'static str {
        match self {
            BookingAction::Fetch => "Failed to load booking. Please try again.",
            BookingAction::UpdateStatus => "Failed to update booking status. Please try again.",
            BookingAction::Cancel => "Failed to cancel booking. Please try again.",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    #[error("booking API rejected {action:?} ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Remote {
        action: BookingAction,
        status: u16,
        message: Option<String>,
    },

    #[error("booking API request failed during {action:?}: {source:#}")]
    Transport {
        action: BookingAction,
        source: anyhow::Error,
    },
}

impl ClientError {
    /// Text to surface to the user. Server messages about the twelve-hour
    /// window are shown verbatim; other remote failures get a generic message.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Policy(violation) => violation.to_string(),
            ClientError::Remote {
                message: Some(message),
                ..
            } if message.contains("12 hours") => message.clone(),
            ClientError::Remote { action, .. } | ClientError::Transport { action, .. } => {
                action.failure_message().to_string()
            }
        }
    }
}

pub struct BookingClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl BookingClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    pub async fn get_booking(&self, id: &str) -> Result<Booking, ClientError> {
        let req = self.request(Method::GET, &format!("/bookings/{id}"));
        send(req, BookingAction::Fetch).await
    }

    /// Change a booking's status after checking the move locally.
    pub async fn update_status(
        &self,
        booking: &Booking,
        target: BookingStatus,
        now: DateTime<Utc>,
        role: Role,
    ) -> Result<Booking, ClientError> {
        policy::check_status_update(booking, target, now, role)?;

        let req = self
            .request(Method::PATCH, &format!("/bookings/status/{}", booking.id))
            .json(&json!({ "status": target }));
        send(req, BookingAction::UpdateStatus).await
    }

    /// Cancel a booking unless it is terminal or inside the twelve-hour window.
    pub async fn cancel(&self, booking: &Booking, now: DateTime<Utc>) -> Result<Booking, ClientError> {
        policy::check_cancel(booking, now)?;

        let req = self.request(Method::PATCH, &format!("/bookings/cancel/{}", booking.id));
        send(req, BookingAction::Cancel).await
    }
}

async fn send(req: RequestBuilder, action: BookingAction) -> Result<Booking, ClientError> {
    let transport = |source: anyhow::Error| ClientError::Transport { action, source };

    let resp = req
        .send()
        .await
        .context("failed to call booking API")
        .map_err(transport)?;

    if !resp.status().is_success() {
        return Err(remote_rejection(resp, action).await);
    }

    resp.json::<Booking>()
        .await
        .context("failed to parse booking response")
        .map_err(transport)
}

async fn remote_rejection(resp: Response, action: BookingAction) -> ClientError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    tracing::debug!(status, ?action, body = %body, "booking API rejected request");

    ClientError::Remote {
        action,
        status,
        message: extract_message(&body),
    }
}

/// Pull the human-readable message out of an error body. Falls back to the
/// raw text when the body is not JSON.
fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => ["message", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()))
            .map(|s| s.to_string()),
        Err(_) => Some(body.to_string()),
    }
}
