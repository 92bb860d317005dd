//! Configuration module for the docket-watch application.
//!
//! This module handles loading and parsing configuration from environment variables
//! using the figment crate. It supports flexible duration parsing that accepts both
//! numeric values (interpreted as seconds) and duration strings with units.

use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Main application configuration containing all sub-configurations
#[derive(Deserialize)]
pub struct Config {
    /// Log level for the application
    ///
    /// This value is used to set the log level for this application's target specifically.
    /// e.g. "debug" would be similar to "warn,docket_watch=debug,..."
    ///
    /// Valid values are: "trace", "debug", "info", "warn", "error"
    /// Defaults to "info" if not specified
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Database connection URL
    pub database_url: String,
    /// Graceful shutdown timeout duration
    ///
    /// Accepts both numeric values (seconds) and duration strings
    /// Defaults to 8 seconds if not specified
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,

    /// Base HTML page for the live display board.
    #[serde(default = "default_court_base_url")]
    pub court_base_url: String,
    /// XHR endpoint the board polls for row data.
    #[serde(default = "default_court_xhr_url")]
    pub court_xhr_url: String,
    /// Tick interval for the ingest scheduler.
    ///
    /// Accepts both numeric values (seconds) and duration strings.
    /// Defaults to 30 seconds if not specified.
    #[serde(
        default = "default_scraper_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub scraper_interval: Duration,
    /// Master switch for the ingest scheduler. When `false`, no tick ever
    /// fires regardless of business hours.
    #[serde(default = "default_enable_scraper")]
    pub enable_scraper: bool,

    /// Push gateway endpoint. When unset (together with `push_gateway_api_key`)
    /// the application falls back to a no-op gateway that logs and drops.
    pub push_gateway_endpoint: Option<String>,
    /// Bearer credential for the push gateway.
    pub push_gateway_api_key: Option<String>,
}

impl Config {
    /// Whether both push gateway credentials are present.
    pub fn has_push_gateway(&self) -> bool {
        self.push_gateway_endpoint.is_some() && self.push_gateway_api_key.is_some()
    }
}

/// Default log level of "info"
fn default_log_level() -> String {
    "info".to_string()
}

/// Default shutdown timeout of 8 seconds
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

/// Default court board base URL
fn default_court_base_url() -> String {
    "https://hcservices.ecourts.gov.in/ecourtindiaHC/cases/display_board.php".to_string()
}

/// Default court board XHR endpoint
fn default_court_xhr_url() -> String {
    "https://hcservices.ecourts.gov.in/ecourtindiaHC/cases/livecourt_data.php".to_string()
}

/// Default scraper tick interval of 30 seconds
fn default_scraper_interval() -> Duration {
    Duration::from_secs(30)
}

/// Default enable_scraper of true
fn default_enable_scraper() -> bool {
    true
}

/// Duration parser configured to handle various time units with seconds as default
///
/// Supports:
/// - Seconds (s) - default unit
/// - Milliseconds (ms)
/// - Minutes (m)
/// - Hours (h)
///
/// Does not support fractions, exponents, or infinity values
/// Allows for whitespace between the number and the time unit
/// Allows for multiple time units to be specified (summed together, e.g "10s 2m" = 120 + 10 = 130 seconds)
const DURATION_PARSER: DurationParser<'static> = DurationParser::builder()
    .time_units(&[TimeUnit::Second, TimeUnit::MilliSecond, TimeUnit::Minute])
    .parse_multiple(None)
    .allow_time_unit_delimiter()
    .disable_infinity()
    .disable_fraction()
    .disable_exponent()
    .default_unit(TimeUnit::Second)
    .build();

/// Custom deserializer for duration fields that accepts both numeric and string values
///
/// This deserializer handles the flexible duration parsing by accepting:
/// - Unsigned integers (interpreted as seconds)
/// - Signed integers (interpreted as seconds, must be non-negative)
/// - Strings (parsed using the fundu duration parser)
///
/// # Examples
///
/// - `1` -> 1 second
/// - `"30s"` -> 30 seconds
/// - `"2 m"` -> 2 minutes
/// - `"1500ms"` -> 15 seconds
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Visitor;

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a duration string or number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            DURATION_PARSER.parse(value)
                .map_err(|e| {
                    serde::de::Error::custom(format!(
                        "Invalid duration format '{}': {}. Examples: '5' (5 seconds), '3500ms', '30s', '2m', '1.5h'",
                        value, e
                    ))
                })?
                .try_into()
                .map_err(|e| serde::de::Error::custom(format!("Duration conversion error: {}", e)))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Duration::from_secs(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value < 0 {
                return Err(serde::de::Error::custom("Duration cannot be negative"));
            }
            Ok(Duration::from_secs(value as u64))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}
