//! Cache configuration.
//!
//! Controls the response cache via the `[cache]` section of `vellum.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CAPACITY: usize = 600;
const DEFAULT_TTL_SECS: u64 = 120;

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of rendered responses kept in memory. Zero disables caching.
    pub capacity: usize,
    /// Window after creation during which an entry may be served.
    #[serde(with = "ttl_seconds")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            capacity: if settings.enabled {
                settings.capacity
            } else {
                0
            },
            ttl: settings.ttl,
        }
    }
}

impl CacheConfig {
    /// A configuration that never stores anything.
    pub fn disabled() -> Self {
        Self {
            capacity: 0,
            ..Default::default()
        }
    }

    /// Returns true when responses should be cached.
    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    /// Returns the capacity as NonZeroUsize, or `None` when caching is disabled.
    pub fn capacity_non_zero(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.capacity)
    }
}

mod ttl_seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.is_enabled());
        assert_eq!(config.capacity, 600);
        assert_eq!(config.ttl, Duration::from_secs(120));
    }

    #[test]
    fn zero_capacity_disables_cache() {
        let config = CacheConfig {
            capacity: 0,
            ..Default::default()
        };
        assert!(!config.is_enabled());
        assert!(config.capacity_non_zero().is_none());
    }

    #[test]
    fn disabled_settings_force_zero_capacity() {
        let settings = crate::config::CacheSettings {
            enabled: false,
            capacity: 32,
            ttl: Duration::from_secs(5),
        };
        let config = CacheConfig::from(&settings);
        assert!(!config.is_enabled());
        assert_eq!(config.ttl, Duration::from_secs(5));
    }

    #[test]
    fn deserializes_ttl_from_seconds() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"capacity": 8, "ttl": 30}"#).expect("valid cache config");
        assert_eq!(config.capacity, 8);
        assert_eq!(config.ttl, Duration::from_secs(30));
    }
}
