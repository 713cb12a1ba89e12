use clap::Parser;
use metar_influx_core::{
    find_config_file, load_config, ConfigError, ConfigSource, DEFAULT_AIRPORTS,
    DEFAULT_CHECKWX_BASE_URL, DEFAULT_INFLUXDB_PORT, DEFAULT_POLL_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT, RATE_LIMIT_WARNING_INTERVAL,
};
use slog::{info, o, warn, Drain, Level, Logger};
use std::{env, fmt, time::Duration};

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "METAR Daemon - Polls CheckWX observations and writes them to InfluxDB"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $METAR_DAEMON_CONFIG, ./metar-daemon.toml,
    /// $XDG_CONFIG_HOME/metar-influx/metar-daemon.toml, /etc/metar-influx/metar-daemon.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "METAR_DAEMON_LEVEL")]
    pub level: Option<String>,

    /// CheckWX API key
    #[arg(long, env = "CHECKWX_API_KEY", hide_env_values = true)]
    pub checkwx_api_key: Option<String>,

    /// CheckWX API root
    #[arg(long, env = "CHECKWX_BASE_URL")]
    pub checkwx_base_url: Option<String>,

    /// InfluxDB API token
    #[arg(long, env = "INFLUXDB_API_KEY", hide_env_values = true)]
    pub influxdb_api_key: Option<String>,

    /// InfluxDB host, optionally with an http:// or https:// scheme
    #[arg(long, env = "INFLUXDB_HOST")]
    pub influxdb_host: Option<String>,

    /// InfluxDB port
    #[arg(long, env = "INFLUXDB_PORT")]
    pub influxdb_port: Option<u16>,

    /// InfluxDB bucket
    #[arg(long, env = "INFLUXDB_BUCKET")]
    pub influxdb_bucket: Option<String>,

    /// InfluxDB organization
    #[arg(long, env = "INFLUXDB_ORG")]
    pub influxdb_org: Option<String>,

    /// Comma-separated ICAO airport codes
    #[arg(short, long, env = "AIRPORTS")]
    pub airports: Option<String>,

    /// Poll interval in seconds (below 60 needs a paid CheckWX plan)
    #[arg(short, long, env = "INTERVAL")]
    pub interval: Option<u64>,

    /// Timeout for each HTTP request in seconds
    #[arg(long, env = "METAR_DAEMON_TIMEOUT")]
    pub request_timeout: Option<u64>,

    /// Request each airport separately instead of one batched request
    #[arg(
        long,
        env = "METAR_DAEMON_PER_AIRPORT",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub per_airport_requests: Option<bool>,
}

impl Cli {
    /// Fill every unset value from `fallback`.
    pub fn or(self, fallback: Cli) -> Cli {
        Cli {
            config: self.config.or(fallback.config),
            level: self.level.or(fallback.level),
            checkwx_api_key: self.checkwx_api_key.or(fallback.checkwx_api_key),
            checkwx_base_url: self.checkwx_base_url.or(fallback.checkwx_base_url),
            influxdb_api_key: self.influxdb_api_key.or(fallback.influxdb_api_key),
            influxdb_host: self.influxdb_host.or(fallback.influxdb_host),
            influxdb_port: self.influxdb_port.or(fallback.influxdb_port),
            influxdb_bucket: self.influxdb_bucket.or(fallback.influxdb_bucket),
            influxdb_org: self.influxdb_org.or(fallback.influxdb_org),
            airports: self.airports.or(fallback.airports),
            interval: self.interval.or(fallback.interval),
            request_timeout: self.request_timeout.or(fallback.request_timeout),
            per_airport_requests: self.per_airport_requests.or(fallback.per_airport_requests),
        }
    }

    /// Validate and freeze the merged settings. Required values are checked
    /// in a fixed order so the first missing one is reported.
    pub fn into_agent_config(self) -> Result<AgentConfig, ConfigError> {
        let checkwx_api_key = required(self.checkwx_api_key, "CHECKWX_API_KEY")?;
        let influxdb_api_key = required(self.influxdb_api_key, "INFLUXDB_API_KEY")?;
        let influxdb_host = required(self.influxdb_host, "INFLUXDB_HOST")?;
        let influxdb_bucket = required(self.influxdb_bucket, "INFLUXDB_BUCKET")?;
        let influxdb_org = required(self.influxdb_org, "INFLUXDB_ORG")?;

        let airports = parse_airports(self.airports.as_deref().unwrap_or(DEFAULT_AIRPORTS))?;
        let poll_interval = self.interval.unwrap_or(DEFAULT_POLL_INTERVAL);
        if poll_interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(AgentConfig {
            checkwx_api_key,
            checkwx_base_url: self
                .checkwx_base_url
                .unwrap_or_else(|| DEFAULT_CHECKWX_BASE_URL.to_string()),
            influxdb_api_key,
            influxdb_host,
            influxdb_port: self.influxdb_port.unwrap_or(DEFAULT_INFLUXDB_PORT),
            influxdb_bucket,
            influxdb_org,
            airports,
            poll_interval,
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            per_airport_requests: self.per_airport_requests.unwrap_or(false),
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Missing(name)),
    }
}

/// Split a comma-separated airport list into upper-case ICAO codes,
/// dropping blanks and repeats.
pub fn parse_airports(list: &str) -> Result<Vec<String>, ConfigError> {
    let mut airports: Vec<String> = vec![];
    for code in list.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if code.len() != 4 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::InvalidAirport(code.to_string()));
        }
        let code = code.to_ascii_uppercase();
        if !airports.contains(&code) {
            airports.push(code);
        }
    }
    if airports.is_empty() {
        return Err(ConfigError::NoAirports);
    }
    Ok(airports)
}

/// Settings the poll loop runs with. Built once at startup and never
/// modified.
#[derive(Clone, PartialEq)]
pub struct AgentConfig {
    pub checkwx_api_key: String,
    pub checkwx_base_url: String,
    pub influxdb_api_key: String,
    pub influxdb_host: String,
    pub influxdb_port: u16,
    pub influxdb_bucket: String,
    pub influxdb_org: String,
    pub airports: Vec<String>,
    /// Seconds
    pub poll_interval: u64,
    /// Seconds
    pub request_timeout: u64,
    pub per_airport_requests: bool,
}

impl AgentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn below_rate_limit_interval(&self) -> bool {
        self.poll_interval < RATE_LIMIT_WARNING_INTERVAL
    }

    pub fn influx_base_url(&self) -> String {
        let host = self.influxdb_host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}:{}", host, self.influxdb_port)
        } else {
            format!("http://{}:{}", host, self.influxdb_port)
        }
    }

    pub fn user_agent(&self) -> String {
        format!("metar-daemon/{}", env!("CARGO_PKG_VERSION"))
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("checkwx_api_key", &"<redacted>")
            .field("checkwx_base_url", &self.checkwx_base_url)
            .field("influxdb_api_key", &"<redacted>")
            .field("influxdb_host", &self.influxdb_host)
            .field("influxdb_port", &self.influxdb_port)
            .field("influxdb_bucket", &self.influxdb_bucket)
            .field("influxdb_org", &self.influxdb_org)
            .field("airports", &self.airports)
            .field("poll_interval", &self.poll_interval)
            .field("request_timeout", &self.request_timeout)
            .field("per_airport_requests", &self.per_airport_requests)
            .finish()
    }
}

/// Load configuration from CLI args, environment and config file
pub fn get_config_info() -> Result<Cli, ConfigError> {
    let cli_args = Cli::parse();

    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file("METAR_DAEMON_CONFIG", "metar-daemon.toml")
    };

    // CLI args override file config (env vars are handled by clap)
    let file_config: Cli = load_config(&source)?;
    Ok(cli_args.or(file_config))
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "warn" => Level::Warning,
        "error" => Level::Error,
        _ => Level::Info,
    }
}

pub fn setup_logger(cli: &Cli) -> Logger {
    let log_level = match cli.level.as_ref() {
        Some(level) => parse_level(level),
        None => parse_level(&env::var("RUST_LOG").unwrap_or_default()),
    };

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(log_level).fuse();
    slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

/// Startup banner, plus the rate-limit warning when the interval is short.
pub fn log_startup(logger: &Logger, config: &AgentConfig) {
    info!(logger, "METAR Daemon starting...");
    info!(logger, "  Airports: {}", config.airports.join(","));
    info!(
        logger,
        "  InfluxDB: {} (org {}, bucket {})",
        config.influx_base_url(),
        config.influxdb_org,
        config.influxdb_bucket
    );
    info!(logger, "  Poll interval: {} seconds", config.poll_interval);
    if config.below_rate_limit_interval() {
        warn!(
            logger,
            "Poll interval is set to less than {} seconds. Ensure you have a CheckWX subscription to avoid exceeding rate limits.",
            RATE_LIMIT_WARNING_INTERVAL
        );
    }
}
