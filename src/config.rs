use std::env;

/// Reservations can never be placed further ahead than this.
pub const MAX_BOOKING_HORIZON_DAYS: i64 = 365;
const DEFAULT_BOOKING_HORIZON_DAYS: i64 = 7;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub operator_token: String,
    /// How many days ahead a reservation may be placed.
    pub booking_horizon_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "chargebook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            operator_token: env::var("OPERATOR_TOKEN").unwrap_or_default(),
            booking_horizon_days: parse_horizon_days(env::var("BOOKING_HORIZON_DAYS").ok().as_deref()),
        }
    }
}

/// Non-positive or unparsable values fall back to the default; larger ones
/// are capped at [`MAX_BOOKING_HORIZON_DAYS`].
fn parse_horizon_days(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|days| *days > 0)
        .map(|days| days.min(MAX_BOOKING_HORIZON_DAYS))
        .unwrap_or(DEFAULT_BOOKING_HORIZON_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizon_days() {
        assert_eq!(parse_horizon_days(None), 7);
        assert_eq!(parse_horizon_days(Some("14")), 14);
        assert_eq!(parse_horizon_days(Some("0")), 7);
        assert_eq!(parse_horizon_days(Some("-3")), 7);
        assert_eq!(parse_horizon_days(Some("soon")), 7);
        assert_eq!(parse_horizon_days(Some("1000000000")), MAX_BOOKING_HORIZON_DAYS);
    }
}
