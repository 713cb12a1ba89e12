use thiserror::Error;

/// Startup configuration failures. All of them stop the agent before the
/// poll loop begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid airport code {0:?}: expected 4 letters or digits")]
    InvalidAirport(String),

    #[error("no airports configured")]
    NoAirports,

    #[error("poll interval must be at least 1 second")]
    ZeroInterval,

    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
