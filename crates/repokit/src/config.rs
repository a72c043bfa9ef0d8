use std::env;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Row ceiling for reads without pagination (default: 200)
    pub max_select_count: usize,
    /// Maximum number of in-memory cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Only used when the `redis` feature is enabled.
    pub redis_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `MAX_SELECT_COUNT` - Row ceiling for unpaginated reads (default: 200)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    ///
    /// Unparseable or non-positive numbers fall back to their defaults.
    pub fn from_env() -> Self {
        Self {
            max_select_count: positive_var("MAX_SELECT_COUNT").unwrap_or(200),
            cache_max_entries: positive_var("CACHE_MAX_ENTRIES").unwrap_or(10_000),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn positive_var(name: &str) -> Option<usize> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|v: &usize| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases share the process environment, so they run in one test.
    #[test]
    fn test_from_env_defaults_and_overrides() {
        env::remove_var("MAX_SELECT_COUNT");
        env::remove_var("CACHE_MAX_ENTRIES");
        env::remove_var("REDIS_URL");

        let config = Config::from_env();

        assert_eq!(config.max_select_count, 200);
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.redis_url, "redis://localhost:6379");

        env::set_var("MAX_SELECT_COUNT", "50");
        env::set_var("CACHE_MAX_ENTRIES", "0");
        env::set_var("REDIS_URL", "redis://cache:6380");

        let config = Config::from_env();

        assert_eq!(config.max_select_count, 50);
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.redis_url, "redis://cache:6380");

        env::remove_var("MAX_SELECT_COUNT");
        env::remove_var("CACHE_MAX_ENTRIES");
        env::remove_var("REDIS_URL");
    }
}
