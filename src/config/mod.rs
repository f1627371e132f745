use std::env;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub listing: ListingConfig,
    pub reporting: ReportingConfig,
    pub environment: Environment,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Per-request limits
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Overall deadline for one request; expiry is reported as store unavailability.
    pub timeout_ms: u64,
}

/// Pagination defaults for listing operations
#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Number of recent records of each kind shown on the dashboard.
    pub dashboard_recent_limit: u32,
}

/// Calendar settings for month-aligned reports
#[derive(Debug, Clone, Default)]
pub struct ReportingConfig {
    /// Offset used to find calendar month boundaries. `None` follows the
    /// host's local zone, resolved at each report so DST changes apply.
    pub utc_offset: Option<FixedOffset>,
}

impl ReportingConfig {
    /// Offset in effect at `now`.
    pub fn offset_at(&self, now: DateTime<Utc>) -> FixedOffset {
        self.utc_offset
            .unwrap_or_else(|| now.with_timezone(&Local).offset().fix())
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Whether internal error detail may be returned to callers.
    pub fn exposes_error_detail(self) -> bool {
        self != Environment::Production
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/portfolio.db".to_string()),
            ),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS")?.unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: parse_var("REQUEST_TIMEOUT_MS")?.unwrap_or(30000),
        };

        let listing = ListingConfig {
            default_page_size: parse_var("LISTING_DEFAULT_PAGE_SIZE")?.unwrap_or(20),
            max_page_size: parse_var("LISTING_MAX_PAGE_SIZE")?.unwrap_or(100),
            dashboard_recent_limit: parse_var("DASHBOARD_RECENT_LIMIT")?.unwrap_or(5),
        };
        listing.validate()?;

        let utc_offset = parse_var::<i32>("REPORTING_UTC_OFFSET_MINUTES")?
            .map(|minutes| {
                FixedOffset::east_opt(minutes * 60).ok_or_else(|| AppError::Config {
                    message: format!("REPORTING_UTC_OFFSET_MINUTES out of range: {}", minutes),
                })
            })
            .transpose()?;

        let environment = match env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        Ok(Config {
            database,
            logging,
            request,
            listing,
            reporting: ReportingConfig { utc_offset },
            environment,
        })
    }
}

impl ListingConfig {
    fn validate(&self) -> Result<(), AppError> {
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(AppError::Config {
                message: "page sizes must be at least 1".to_string(),
            });
        }
        if self.default_page_size > self.max_page_size {
            return Err(AppError::Config {
                message: format!(
                    "LISTING_DEFAULT_PAGE_SIZE ({}) exceeds LISTING_MAX_PAGE_SIZE ({})",
                    self.default_page_size, self.max_page_size
                ),
            });
        }
        Ok(())
    }
}

/// Parse an optional numeric variable; a present but malformed value is an error.
fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, AppError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| AppError::Config {
            message: format!("{} must be a number, got '{}'", name, raw),
        }),
        Err(_) => Ok(None),
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 30000 }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
            dashboard_recent_limit: 5,
        }
    }
}
