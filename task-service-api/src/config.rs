/// Configuration management for the API server
///
/// Values are layered, later sources winning:
///
/// 1. Built-in defaults
/// 2. Optional `task-service.toml` in the working directory
/// 3. Environment variables prefixed `APP`, nested with `__`
///    (e.g. `APP__API__PORT=9090`, `APP__RATE_LIMIT__CAPACITY=20`)
/// 4. `DATABASE_URL`, if set
///
/// A `.env` file is loaded first when present.
///
/// # Example
///
/// ```no_run
/// use task_service_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::Deserialize;
use std::env;
use task_service_shared::db::pool::DatabaseConfig;
use task_service_shared::password::PasswordConfig;

/// Name of the optional configuration file, without extension
pub const CONFIG_FILE: &str = "task-service";

/// Complete application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Argon2id costs for stored passwords
    #[serde(default)]
    pub password: PasswordConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Token bucket settings for `/api/v1`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,

    /// Bucket size, i.e. the largest burst served without waiting
    pub capacity: u32,

    /// Tokens added per second
    pub refill_per_second: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 100,
            refill_per_second: 50.0,
        }
    }
}

impl Config {
    /// Loads configuration from `.env`, the config file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if a value has the wrong type, no database URL is
    /// configured, or the rate limit settings are unusable.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_sources(
            config::Environment::with_prefix("APP"),
            env::var("DATABASE_URL").ok(),
        )
    }

    /// Builds the configuration from an explicit environment source
    pub fn from_sources(
        environment: config::Environment,
        database_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                environment
                    .separator("__")
                    .prefix_separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("api.cors_origins"),
            );

        if let Some(url) = database_url {
            builder = builder.set_override("database.url", url)?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("DATABASE_URL (or APP__DATABASE__URL) is required");
        }

        if self.rate_limit.enabled {
            if self.rate_limit.capacity == 0 {
                anyhow::bail!("rate_limit.capacity must be at least 1");
            }
            let refill = self.rate_limit.refill_per_second;
            if refill.is_nan() || refill <= 0.0 {
                anyhow::bail!("rate_limit.refill_per_second must be positive");
            }
        }

        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
