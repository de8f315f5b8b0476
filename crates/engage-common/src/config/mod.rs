//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, CircuitSettings, ConfigError, CorsConfig, CounterBackend,
    DatabaseConfig, Environment, RankingConfig, RateLimitConfig, ReconcilerConfig, RedisConfig,
    ResilienceConfig, RetrySettings, ServerConfig, StorageBackend, StorageConfig,
};
