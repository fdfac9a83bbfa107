//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use domain::{Money, ShippingRates};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL URL; unset means the in-memory store
/// - `ORDER_CACHE_CAPACITY`: order cache entries (default: `1024`)
/// - `ORDER_LIST_CACHE_CAPACITY`: per-customer list cache entries (default: `256`)
/// - `NOTIFICATION_INTERVAL_SECS`: dispatcher tick interval (default: `5`)
/// - `STANDARD_SHIPPING_CENTS` / `EXPRESS_SHIPPING_CENTS`: flat shipping rates
///
/// Values that fail to parse, and zero capacities or intervals, fall back to
/// the defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub order_cache_capacity: usize,
    pub order_list_cache_capacity: usize,
    pub notification_interval: Duration,
    pub shipping: ShippingRates,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let positive = |key: &str| parsed(key).filter(|v| *v > 0);
        let rate = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|cents| *cents >= 0)
                .map(Money::from_cents)
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(lookup("PORT"), defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            order_cache_capacity: positive("ORDER_CACHE_CAPACITY")
                .map_or(defaults.order_cache_capacity, |v| v as usize),
            order_list_cache_capacity: positive("ORDER_LIST_CACHE_CAPACITY")
                .map_or(defaults.order_list_cache_capacity, |v| v as usize),
            notification_interval: positive("NOTIFICATION_INTERVAL_SECS")
                .map_or(defaults.notification_interval, Duration::from_secs),
            shipping: ShippingRates {
                standard: rate("STANDARD_SHIPPING_CENTS").unwrap_or(defaults.shipping.standard),
                express: rate("EXPRESS_SHIPPING_CENTS").unwrap_or(defaults.shipping.express),
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            order_cache_capacity: 1024,
            order_list_cache_capacity: 256,
            notification_interval: Duration::from_secs(5),
            shipping: ShippingRates::default(),
        }
    }
}
