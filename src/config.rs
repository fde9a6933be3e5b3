//! Environment-driven configuration for the import pipeline and the catalog store.

use std::env;
use std::time::Duration;

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(default)
}

fn env_duration_millis(key: &str, default_millis: u64) -> Duration {
    Duration::from_millis(env_u64(key, default_millis))
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// How import runs are batched and surfaced.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Records created concurrently per batch.
    pub batch_size: usize,
    /// Records kept in the session preview.
    pub preview_size: usize,
    /// Largest accepted upload body.
    pub max_upload_bytes: u64,
}

impl ImportConfig {
    pub fn from_env() -> Self {
        Self {
            batch_size: env_usize("IMPORT_BATCH_SIZE", 10).max(1),
            preview_size: env_usize("IMPORT_PREVIEW_SIZE", 10),
            max_upload_bytes: env_u64("IMPORT_MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Process-level values and naming conventions applied by the field mapper.
#[derive(Debug, Clone, PartialEq)]
pub struct MapperConfig {
    /// Discount percent stamped on every record unless a run overrides it.
    pub discount: f64,
    pub cost_factor: f64,
    pub default_species: String,
    pub fallback_brand: String,
    pub source_sku_prefix: String,
    pub primary_sku_prefix: String,
    pub secondary_sku_prefix: String,
}

impl MapperConfig {
    pub fn from_env() -> Self {
        Self {
            discount: env_f64("IMPORT_DEFAULT_DISCOUNT", 0.0).clamp(0.0, 100.0),
            cost_factor: env_f64("IMPORT_COST_FACTOR", 1.0),
            default_species: env_string("IMPORT_DEFAULT_SPECIES", "Birch"),
            fallback_brand: env_string("IMPORT_FALLBACK_BRAND", "Generic"),
            source_sku_prefix: env_string("IMPORT_SOURCE_SKU_PREFIX", "AZ-"),
            primary_sku_prefix: env_string("IMPORT_PRIMARY_SKU_PREFIX", "W-"),
            secondary_sku_prefix: env_string("IMPORT_SECONDARY_SKU_PREFIX", "V-"),
        }
    }
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Connection settings for the remote catalog service.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_string("STORE_BASE_URL", "http://catalog:8080"),
            api_token: env_optional("STORE_API_TOKEN"),
            request_timeout: env_duration_millis("STORE_TIMEOUT_MS", 15_000),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_environment() {
        let import = ImportConfig::from_env();
        assert!(import.batch_size >= 1);

        let mapper = MapperConfig::from_env();
        assert!((0.0..=100.0).contains(&mapper.discount));
        assert!(!mapper.primary_sku_prefix.is_empty());
        assert_ne!(mapper.primary_sku_prefix, mapper.secondary_sku_prefix);
    }

    #[test]
    fn unset_optional_is_none() {
        assert_eq!(env_optional("CATALOG_IMPORT_TEST_UNSET_VARIABLE"), None);
        assert_eq!(env_usize("CATALOG_IMPORT_TEST_UNSET_VARIABLE", 7), 7);
    }
}
