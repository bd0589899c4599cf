use std::time::Duration;

/// Service configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Enables verbose plan logging for every request.
    pub debug_mode: bool,
    /// TCP port the HTTP server binds to.
    pub port: u16,
    /// When true, the `Origin` request header must match one of
    /// `acceptable_origins` on the scheduling endpoints.
    pub enable_origin_check: bool,
    pub acceptable_origins: Vec<String>,
    /// Path of the SQLite database backing tasks and the persistent cache.
    pub database_path: String,
    /// API token passed to the routing provider.
    pub google_api_token: String,
    pub scheduling: SchedulingDefaults,
    pub cache: CacheConfig,
    pub processor: ProcessorConfig,
    /// How long finished or stale tasks are retained before the sweep
    /// deletes them.
    pub task_ttl: Duration,
}

/// Default scheduling margins, all in seconds. The environment supplies
/// them in milliseconds; requests may override per call.
#[derive(Debug, Clone, Copy)]
pub struct SchedulingDefaults {
    /// How early a driver must arrive before an outgoing pickup.
    pub before_pickup_secs: i64,
    /// How late a driver may arrive on a passenger's last leg of the day.
    pub after_pickup_secs: i64,
    /// Unloading time added after every drop-off.
    pub dropoff_unloading_secs: i64,
}

impl Default for SchedulingDefaults {
    fn default() -> Self {
        Self {
            before_pickup_secs: 1800,
            after_pickup_secs: 1800,
            dropoff_unloading_secs: 300,
        }
    }
}

/// Which backend the directions cache uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enable: bool,
    pub kind: CacheKind,
    /// Capacity of the in-memory LRU backend.
    pub mem_capacity: usize,
    /// Uniform entry TTL. Zero means entries never expire.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable: false,
            kind: CacheKind::Memory,
            mem_capacity: 1000,
            ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Dispatcher and worker pool sizing.
#[derive(Debug, Clone, Copy)]
pub struct ProcessorConfig {
    /// Number of tasks executed concurrently.
    pub thread_number: usize,
    /// Maximum tasks claimed per dispatch tick.
    pub batch_size: u32,
    /// Interval between dispatch ticks.
    pub interval: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            thread_number: 4,
            batch_size: 8,
            interval: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let scheduling = SchedulingDefaults {
            before_pickup_secs: env_millis_as_secs("DEFAULT_BEFORE_PICKUP_TIME", 1800)?,
            after_pickup_secs: env_millis_as_secs("DEFAULT_AFTER_PICKUP_TIME", 1800)?,
            dropoff_unloading_secs: env_millis_as_secs("DEFAULT_DROPOFF_UNLOADING_TIME", 300)?,
        };

        let cache = CacheConfig {
            enable: env_bool("ENABLE_CACHE", false)?,
            kind: match env_string("CACHE_TYPE", "memory").as_str() {
                "memory" => CacheKind::Memory,
                "sqlite" => CacheKind::Sqlite,
                other => {
                    return Err(ConfigError::InvalidValue {
                        var: "CACHE_TYPE",
                        value: other.to_string(),
                    })
                }
            },
            mem_capacity: env_parse("CACHE_MEM_CAPACITY", 1000)?,
            ttl: Duration::from_millis(env_parse("CACHE_TTL", 86_400_000)?),
        };

        let processor = ProcessorConfig {
            thread_number: env_parse("PROCESSOR_THREAD_NUMBER", 4)?,
            batch_size: env_parse("PROCESSOR_BATCH_SIZE", 8)?,
            interval: Duration::from_millis(env_parse("PROCESSOR_INTERVAL", 10_000)?),
        };

        let config = Self {
            debug_mode: env_bool("DEBUG_MODE", false)?,
            port: env_parse("PORT", 8080)?,
            enable_origin_check: env_bool("ENABLE_ORIGIN_CHECK", false)?,
            acceptable_origins: env_string("ACCEPTABLE_ORIGINS", "")
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            database_path: env_string("DATABASE_PATH", "database/data.db"),
            google_api_token: env_string("GOOGLE_API_TOKEN", ""),
            scheduling,
            cache,
            processor,
            task_ttl: Duration::from_millis(env_parse("TASK_TTL", 86_400_000)?),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.enable && self.cache.kind == CacheKind::Memory && self.cache.mem_capacity == 0
        {
            return Err(ConfigError::InvalidValue {
                var: "CACHE_MEM_CAPACITY",
                value: "0".to_string(),
            });
        }
        if self.processor.thread_number == 0 {
            return Err(ConfigError::InvalidValue {
                var: "PROCESSOR_THREAD_NUMBER",
                value: "0".to_string(),
            });
        }
        if self.enable_origin_check && self.acceptable_origins.is_empty() {
            return Err(ConfigError::MissingOrigins);
        }
        Ok(())
    }
}

fn env_string(var: &'static str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_bool(var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" | "" => Ok(false),
            _ => Err(ConfigError::InvalidValue { var, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

fn env_parse<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
        Err(_) => Ok(default),
    }
}

/// The `DEFAULT_*_TIME` variables are stored in milliseconds but consumed
/// in seconds everywhere in the scheduler.
fn env_millis_as_secs(var: &'static str, default_secs: i64) -> Result<i64, ConfigError> {
    Ok(env_parse(var, default_secs * 1000)? / 1000)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
    #[error("ENABLE_ORIGIN_CHECK is set but ACCEPTABLE_ORIGINS is empty")]
    MissingOrigins,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let defaults = SchedulingDefaults::default();
        assert_eq!(defaults.before_pickup_secs, 1800);
        assert_eq!(defaults.after_pickup_secs, 1800);
        assert_eq!(defaults.dropoff_unloading_secs, 300);

        let processor = ProcessorConfig::default();
        assert!(processor.thread_number > 0);
        assert!(processor.batch_size > 0);
    }

    #[test]
    fn origin_check_requires_origins() {
        let config = Config {
            debug_mode: false,
            port: 8080,
            enable_origin_check: true,
            acceptable_origins: vec![],
            database_path: "database/data.db".to_string(),
            google_api_token: String::new(),
            scheduling: SchedulingDefaults::default(),
            cache: CacheConfig::default(),
            processor: ProcessorConfig::default(),
            task_ttl: Duration::from_secs(60),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingOrigins)
        ));
    }

    #[test]
    fn zero_worker_pool_is_rejected() {
        let config = Config {
            debug_mode: false,
            port: 8080,
            enable_origin_check: false,
            acceptable_origins: vec![],
            database_path: "database/data.db".to_string(),
            google_api_token: String::new(),
            scheduling: SchedulingDefaults::default(),
            cache: CacheConfig::default(),
            processor: ProcessorConfig {
                thread_number: 0,
                ..ProcessorConfig::default()
            },
            task_ttl: Duration::from_secs(60),
        };
        assert!(config.validate().is_err());
    }
}
