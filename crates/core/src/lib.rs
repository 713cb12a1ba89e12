//! METAR collection agent core library
//!
//! Shared pieces of the agent's startup path:
//! - Configuration file discovery and loading (XDG-compliant)
//! - Configuration errors
//! - Built-in defaults

mod config;
mod error;

pub use config::{find_config_file, load_config, ConfigSource};
pub use error::ConfigError;

/// Application name used for XDG paths
pub const APP_NAME: &str = "metar-influx";

/// Default InfluxDB HTTP port
pub const DEFAULT_INFLUXDB_PORT: u16 = 8086;

/// Default airports polled when none are configured
pub const DEFAULT_AIRPORTS: &str = "KBJC,KFNL";

/// Default poll interval (5 minutes)
pub const DEFAULT_POLL_INTERVAL: u64 = 300;

/// Intervals below this many seconds risk exceeding the free CheckWX quota
pub const RATE_LIMIT_WARNING_INTERVAL: u64 = 60;

/// Default CheckWX API root
pub const DEFAULT_CHECKWX_BASE_URL: &str = "https://api.checkwx.com";

/// Default timeout for a single HTTP request, in seconds
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 20;
