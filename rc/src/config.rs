//! Cache limits configuration

use serde::{Deserialize, Serialize};

/// Limits for a bounded cache
///
/// `None` means the dimension is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries kept
    #[serde(rename = "max-item-count")]
    pub max_item_count: Option<usize>,

    /// Maximum aggregate weight of all entries, in bytes
    #[serde(rename = "max-byte-size")]
    pub max_byte_size: Option<u64>,
}

impl CacheConfig {
    /// No limits in either dimension
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Limit both item count and aggregate byte size
    pub fn new(max_item_count: usize, max_byte_size: u64) -> Self {
        Self {
            max_item_count: Some(max_item_count),
            max_byte_size: Some(max_byte_size),
        }
    }

    /// Limit only the number of entries
    pub fn with_max_item_count(max_item_count: usize) -> Self {
        Self {
            max_item_count: Some(max_item_count),
            max_byte_size: None,
        }
    }

    /// Limit only the aggregate byte size
    pub fn with_max_byte_size(max_byte_size: u64) -> Self {
        Self {
            max_item_count: None,
            max_byte_size: Some(max_byte_size),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_item_count.is_none() && self.max_byte_size.is_none()
    }

    /// Whether a store holding `items` entries weighing `bytes` is over either limit
    pub fn is_exceeded(&self, items: usize, bytes: u64) -> bool {
        self.max_item_count.is_some_and(|max| items > max) || self.max_byte_size.is_some_and(|max| bytes > max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded() {
        let config = CacheConfig::default();
        assert!(config.is_unbounded());
        assert!(!config.is_exceeded(usize::MAX, u64::MAX));
    }

    #[test]
    fn test_is_exceeded() {
        let config = CacheConfig::new(2, 100);
        assert!(!config.is_exceeded(2, 100));
        assert!(config.is_exceeded(3, 10));
        assert!(config.is_exceeded(1, 101));
    }

    #[test]
    fn test_parse_yaml() {
        let config: CacheConfig = serde_yaml::from_str("max-item-count: 64\n").unwrap();
        assert_eq!(config.max_item_count, Some(64));
        assert_eq!(config.max_byte_size, None);

        let config: CacheConfig = serde_yaml::from_str("max-item-count: 8\nmax-byte-size: 4096\n").unwrap();
        assert_eq!(config, CacheConfig::new(8, 4096));
    }
}
