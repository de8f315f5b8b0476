//! Application configuration structs
//!
//! Loads configuration from environment variables (optionally seeded from a
//! `.env` file) and validates value ranges before anything is wired.

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ServerConfig,
    pub storage: StorageConfig,
    /// Present when any store uses PostgreSQL
    pub database: Option<DatabaseConfig>,
    /// Present when the counter store uses Redis
    pub redis: Option<RedisConfig>,
    pub resilience: ResilienceConfig,
    pub ranking: RankingConfig,
    pub reconciler: ReconcilerConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Backend holding the like ledger and the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Backend holding the authoritative like counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    Postgres,
    Redis,
    Memory,
}

impl From<StorageBackend> for CounterBackend {
    fn from(backend: StorageBackend) -> Self {
        match backend {
            StorageBackend::Postgres => Self::Postgres,
            StorageBackend::Memory => Self::Memory,
        }
    }
}

/// Store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub counter: CounterBackend,
    /// Demo products generated into the in-memory catalog at startup
    pub seed_products: usize,
}

impl StorageConfig {
    /// Whether any store needs a PostgreSQL pool
    #[must_use]
    pub fn needs_postgres(&self) -> bool {
        self.backend == StorageBackend::Postgres || self.counter == CounterBackend::Postgres
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Timeout, retry and circuit breaker settings shared by every dependency
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    /// Per-attempt store call timeout
    pub store_timeout: Duration,
    pub retry: RetrySettings,
    pub circuit: CircuitSettings,
    /// Compare-and-set attempts before a ledger write reports a conflict
    pub ledger_conflict_retries: u32,
}

/// Upper bound for `RETRY_BACKOFF_FACTOR`
pub const MAX_BACKOFF_FACTOR: f64 = 10.0;

/// Exponential backoff for transient failures
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Total attempts including the first call
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_factor: f64,
}

/// Count-based circuit breaker settings
#[derive(Debug, Clone)]
pub struct CircuitSettings {
    /// Failure rate in (0, 1] that opens the circuit
    pub failure_rate_threshold: f64,
    /// Number of most recent calls the failure rate is computed over
    pub window_size: usize,
    /// Calls the window must hold before the rate is evaluated
    pub minimum_calls: usize,
    pub cooldown: Duration,
    pub half_open_trials: u32,
}

/// Ranking cache settings
#[derive(Debug, Clone)]
pub struct RankingConfig {
    /// Interval between scheduled full rebuilds
    pub rebuild_interval: Duration,
}

/// Consistency reconciler settings
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub interval: Duration,
    /// Total corrected drift that forces a full cache rebuild
    pub drift_threshold: u64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// Default value functions
fn default_app_name() -> String {
    "engagement-engine".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_burst() -> u32 {
    50
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(300),
            retry: RetrySettings::default(),
            circuit: CircuitSettings::default(),
            ledger_conflict_retries: 5,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(200),
            backoff_factor: 2.0,
        }
    }
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            window_size: 20,
            minimum_calls: 10,
            cooldown: Duration::from_millis(5000),
            half_open_trials: 3,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            rebuild_interval: Duration::from_secs(60),
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            drift_threshold: 50,
        }
    }
}

/// Parse an optional variable, failing on present-but-invalid values
fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(None),
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    Ok(parse_var(lookup, key)?.unwrap_or(default))
}

fn millis_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    Ok(parse_var::<u64>(lookup, key)?.map_or(default, Duration::from_millis))
}

fn secs_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    Ok(parse_var::<u64>(lookup, key)?.map_or(default, Duration::from_secs))
}

fn parse_storage_backend(raw: &str) -> Result<StorageBackend, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
        "memory" => Ok(StorageBackend::Memory),
        _ => Err(ConfigError::InvalidValue("STORAGE_BACKEND", raw.to_string())),
    }
}

fn parse_counter_backend(raw: &str) -> Result<CounterBackend, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "postgres" | "postgresql" => Ok(CounterBackend::Postgres),
        "redis" => Ok(CounterBackend::Redis),
        "memory" => Ok(CounterBackend::Memory),
        _ => Err(ConfigError::InvalidValue("COUNTER_BACKEND", raw.to_string())),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or a
    /// value is out of range
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = lookup("STORAGE_BACKEND")
            .map(|s| parse_storage_backend(&s))
            .transpose()?
            .unwrap_or(StorageBackend::Postgres);
        let counter = lookup("COUNTER_BACKEND")
            .map(|s| parse_counter_backend(&s))
            .transpose()?
            .unwrap_or_else(|| backend.into());
        let storage = StorageConfig {
            backend,
            counter,
            seed_products: parse_or(&lookup, "MEMORY_SEED_PRODUCTS", 0)?,
        };

        let database = if storage.needs_postgres() {
            Some(DatabaseConfig {
                url: lookup("DATABASE_URL").ok_or(ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: parse_or(
                    &lookup,
                    "DATABASE_MAX_CONNECTIONS",
                    default_max_connections(),
                )?,
                min_connections: parse_or(
                    &lookup,
                    "DATABASE_MIN_CONNECTIONS",
                    default_min_connections(),
                )?,
            })
        } else {
            None
        };

        let redis = if storage.counter == CounterBackend::Redis {
            Some(RedisConfig {
                url: lookup("REDIS_URL").ok_or(ConfigError::MissingVar("REDIS_URL"))?,
                max_connections: parse_or(
                    &lookup,
                    "REDIS_MAX_CONNECTIONS",
                    default_redis_max_connections(),
                )?,
            })
        } else {
            None
        };

        let defaults = ResilienceConfig::default();
        let retry_defaults = defaults.retry;
        let circuit_defaults = defaults.circuit;
        let resilience = ResilienceConfig {
            store_timeout: millis_or(&lookup, "STORE_TIMEOUT_MS", defaults.store_timeout)?,
            retry: RetrySettings {
                max_attempts: parse_or(&lookup, "RETRY_MAX_ATTEMPTS", retry_defaults.max_attempts)?,
                initial_backoff: millis_or(
                    &lookup,
                    "RETRY_INITIAL_BACKOFF_MS",
                    retry_defaults.initial_backoff,
                )?,
                max_backoff: millis_or(&lookup, "RETRY_MAX_BACKOFF_MS", retry_defaults.max_backoff)?,
                backoff_factor: parse_or(
                    &lookup,
                    "RETRY_BACKOFF_FACTOR",
                    retry_defaults.backoff_factor,
                )?,
            },
            circuit: CircuitSettings {
                failure_rate_threshold: parse_or(
                    &lookup,
                    "CIRCUIT_FAILURE_RATE_THRESHOLD",
                    circuit_defaults.failure_rate_threshold,
                )?,
                window_size: parse_or(&lookup, "CIRCUIT_WINDOW_SIZE", circuit_defaults.window_size)?,
                minimum_calls: parse_or(
                    &lookup,
                    "CIRCUIT_MINIMUM_CALLS",
                    circuit_defaults.minimum_calls,
                )?,
                cooldown: millis_or(&lookup, "CIRCUIT_COOLDOWN_MS", circuit_defaults.cooldown)?,
                half_open_trials: parse_or(
                    &lookup,
                    "CIRCUIT_HALF_OPEN_TRIALS",
                    circuit_defaults.half_open_trials,
                )?,
            },
            ledger_conflict_retries: parse_or(
                &lookup,
                "LEDGER_CONFLICT_RETRIES",
                defaults.ledger_conflict_retries,
            )?,
        };

        let config = Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            api: ServerConfig {
                host: lookup("API_HOST").unwrap_or_else(default_host),
                port: parse_var(&lookup, "API_PORT")?.ok_or(ConfigError::MissingVar("API_PORT"))?,
            },
            storage,
            database,
            redis,
            resilience,
            ranking: RankingConfig {
                rebuild_interval: secs_or(
                    &lookup,
                    "CACHE_REBUILD_INTERVAL_SECS",
                    RankingConfig::default().rebuild_interval,
                )?,
            },
            reconciler: ReconcilerConfig {
                interval: secs_or(
                    &lookup,
                    "RECONCILE_INTERVAL_SECS",
                    ReconcilerConfig::default().interval,
                )?,
                drift_threshold: parse_or(
                    &lookup,
                    "RECONCILE_DRIFT_THRESHOLD",
                    ReconcilerConfig::default().drift_threshold,
                )?,
            },
            rate_limit: RateLimitConfig {
                requests_per_second: parse_or(
                    &lookup,
                    "RATE_LIMIT_REQUESTS_PER_SECOND",
                    default_requests_per_second(),
                )?,
                burst: parse_or(&lookup, "RATE_LIMIT_BURST", default_burst())?,
            },
            cors: CorsConfig {
                allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                    .map(|s| s.split(',').map(str::trim).map(String::from).collect())
                    .unwrap_or_default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that parsing alone cannot enforce
    pub fn validate(&self) -> Result<(), ConfigError> {
        let retry = &self.resilience.retry;
        let circuit = &self.resilience.circuit;

        if self.resilience.store_timeout.is_zero() {
            return Err(invalid("STORE_TIMEOUT_MS", "must be greater than zero"));
        }
        if retry.max_attempts == 0 {
            return Err(invalid("RETRY_MAX_ATTEMPTS", "must be at least 1"));
        }
        if !(1.0..=MAX_BACKOFF_FACTOR).contains(&retry.backoff_factor) {
            return Err(invalid("RETRY_BACKOFF_FACTOR", "must be between 1.0 and 10.0"));
        }
        if retry.initial_backoff > retry.max_backoff {
            return Err(invalid(
                "RETRY_INITIAL_BACKOFF_MS",
                "must not exceed RETRY_MAX_BACKOFF_MS",
            ));
        }
        let rate = circuit.failure_rate_threshold;
        if rate.is_nan() || rate <= 0.0 || rate > 1.0 {
            return Err(invalid("CIRCUIT_FAILURE_RATE_THRESHOLD", "must be in (0, 1]"));
        }
        if circuit.window_size == 0 {
            return Err(invalid("CIRCUIT_WINDOW_SIZE", "must be greater than zero"));
        }
        if circuit.minimum_calls == 0 || circuit.minimum_calls > circuit.window_size {
            return Err(invalid(
                "CIRCUIT_MINIMUM_CALLS",
                "must be between 1 and CIRCUIT_WINDOW_SIZE",
            ));
        }
        if circuit.half_open_trials == 0 {
            return Err(invalid("CIRCUIT_HALF_OPEN_TRIALS", "must be at least 1"));
        }
        if self.resilience.ledger_conflict_retries == 0 {
            return Err(invalid("LEDGER_CONFLICT_RETRIES", "must be at least 1"));
        }
        if self.reconciler.interval.is_zero() {
            return Err(invalid("RECONCILE_INTERVAL_SECS", "must be greater than zero"));
        }
        if self.ranking.rebuild_interval.is_zero() {
            return Err(invalid("CACHE_REBUILD_INTERVAL_SECS", "must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue(key, reason.to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
