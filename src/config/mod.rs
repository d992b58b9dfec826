//! Configuration module for the stock ledger backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Hard ceiling for any caller-supplied page size.
pub const MAX_PAGE_SIZE_LIMIT: usize = 100;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Largest page size a listing call may request
    pub max_page_size: usize,
    /// Page size used when the caller does not supply one
    pub default_page_size: usize,
    /// Number of entries in the top-selling ranking
    pub top_selling: usize,
    /// Problems found while loading, logged once tracing is up
    pub warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/stock.sqlite"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            max_page_size: MAX_PAGE_SIZE_LIMIT,
            default_page_size: 10,
            top_selling: 10,
            warnings: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let db_path = env::var("STOCK_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let bind_addr = match env::var("STOCK_BIND_ADDR") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| format!("Invalid STOCK_BIND_ADDR '{}': {}", raw, e))?,
            Err(_) => defaults.bind_addr,
        };

        let log_level = env::var("STOCK_LOG_LEVEL").unwrap_or(defaults.log_level);

        let mut warnings = Vec::new();
        let max_page_size =
            numeric_var("STOCK_MAX_PAGE_SIZE", defaults.max_page_size, &mut warnings)
                .clamp(1, MAX_PAGE_SIZE_LIMIT);
        let default_page_size = numeric_var(
            "STOCK_DEFAULT_PAGE_SIZE",
            defaults.default_page_size,
            &mut warnings,
        )
        .clamp(1, max_page_size);
        let top_selling =
            numeric_var("STOCK_TOP_SELLING", defaults.top_selling, &mut warnings).max(1);

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            max_page_size,
            default_page_size,
            top_selling,
            warnings,
        })
    }
}

/// Read a numeric variable, keeping the default when it is absent or unparsable.
fn numeric_var<T: FromStr + Copy + std::fmt::Display>(
    name: &str,
    default: T,
    warnings: &mut Vec<String>,
) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warnings.push(format!("Ignoring invalid {}='{}', using {}", name, raw, default));
            default
        }),
        Err(_) => default,
    }
}
