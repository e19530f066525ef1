use std::time::Duration;

use crate::auth::DEFAULT_SIGNATURE_KEY;

pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_RETRY_COUNT: u32 = 1;
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;
pub const DEFAULT_RESULT_BUFFER: usize = 256;
pub const DEFAULT_NOTIFY_PAGE_SIZE: usize = 256;

/// Every tunable of the dispatch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Upper bound for one HTTP attempt.
    pub notify_timeout: Duration,
    /// Attempts per subscriber per event; 0 is treated as 1.
    pub retry_count: u32,
    /// Capacity of the event queue used in queued mode.
    pub queue_capacity: usize,
    /// Minimum buffer of the per-batch response channel.
    pub result_buffer: usize,
    /// Page size used when scanning the store for matching subscriptions.
    pub page_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            retry_count: DEFAULT_RETRY_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            result_buffer: DEFAULT_RESULT_BUFFER,
            page_size: DEFAULT_NOTIFY_PAGE_SIZE,
        }
    }
}

impl DispatchConfig {
    pub fn attempts(&self) -> u32 {
        self.retry_count.max(1)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub hookwire_env: String,
    pub api_bind: String,
    pub signature_key: String,
    pub dispatch: DispatchConfig,
}

impl Settings {
    pub fn from_env() -> Self {
        let hookwire_env = std::env::var("HOOKWIRE_ENV").unwrap_or_else(|_| "dev".to_string());
        let api_bind =
            std::env::var("HOOKWIRE_API_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let signature_key = std::env::var("HOOKWIRE_SIGNATURE_KEY")
            .unwrap_or_else(|_| DEFAULT_SIGNATURE_KEY.to_string());

        let defaults = DispatchConfig::default();
        let dispatch = DispatchConfig {
            notify_timeout: env_parse::<u64>("HOOKWIRE_NOTIFY_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.notify_timeout),
            retry_count: env_parse("HOOKWIRE_RETRY_COUNT").unwrap_or(defaults.retry_count),
            queue_capacity: env_parse("HOOKWIRE_QUEUE_CAPACITY").unwrap_or(defaults.queue_capacity),
            result_buffer: env_parse("HOOKWIRE_RESULT_BUFFER").unwrap_or(defaults.result_buffer),
            page_size: env_parse("HOOKWIRE_NOTIFY_PAGE_SIZE").unwrap_or(defaults.page_size),
        };

        Self {
            hookwire_env,
            api_bind,
            signature_key,
            dispatch,
        }
    }

    pub fn is_production(&self) -> bool {
        self.hookwire_env == "production"
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.notify_timeout, Duration::from_secs(15));
        assert_eq!(config.retry_count, 1);
        assert_eq!(config.queue_capacity, 4096);
        assert_eq!(config.result_buffer, 256);
    }

    #[test]
    fn test_attempts_never_zero() {
        let config = DispatchConfig {
            retry_count: 0,
            ..DispatchConfig::default()
        };
        assert_eq!(config.attempts(), 1);
    }

    #[test]
    fn test_is_production() {
        let settings = |env: &str| Settings {
            hookwire_env: env.to_string(),
            api_bind: "0.0.0.0:3000".to_string(),
            signature_key: DEFAULT_SIGNATURE_KEY.to_string(),
            dispatch: DispatchConfig::default(),
        };
        assert!(settings("production").is_production());
        assert!(!settings("dev").is_production());
        assert!(!settings("Production ").is_production());
    }

    #[test]
    fn test_env_parse_ignores_garbage() {
        assert_eq!(env_parse::<u32>("HOOKWIRE_TEST_UNSET_VARIABLE"), None);
    }
}
