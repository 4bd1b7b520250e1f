use serde::Deserialize;

/// Accepted range for the adherence window, in days.
pub const STATS_WINDOW_RANGE: std::ops::RangeInclusive<i64> = 1..=3650;
const DEFAULT_STATS_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    /// Trailing window (in days) the adherence rate is computed over.
    pub stats_window_days: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let db_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "medtrack".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "medtrack-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let stats_window_days = stats_window_days(std::env::var("STATS_WINDOW_DAYS").ok());
        Ok(Self {
            database_url,
            db_max_connections,
            jwt,
            stats_window_days,
        })
    }
}

/// Falls back to the default when the value is missing, malformed or out of
/// range.
fn stats_window_days(raw: Option<String>) -> i64 {
    match raw.as_deref().map(str::trim).map(str::parse::<i64>) {
        Some(Ok(days)) if STATS_WINDOW_RANGE.contains(&days) => days,
        Some(_) => {
            tracing::warn!(value = ?raw, "STATS_WINDOW_DAYS out of range, using default");
            DEFAULT_STATS_WINDOW_DAYS
        }
        None => DEFAULT_STATS_WINDOW_DAYS,
    }
}
