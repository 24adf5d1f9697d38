//! Buffer configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};
use crate::types::{LOG_TYPE_MAX, LogType};

/// Default per-type quota in bytes.
pub const DEFAULT_QUOTA: usize = 256 * 1024;
/// Smallest quota accepted at runtime.
pub const MIN_QUOTA: usize = 64 * 1024;
/// Largest quota accepted at runtime.
pub const MAX_QUOTA: usize = 512 * 1024 * 1024;
/// Longest accepted tag in bytes.
pub const MAX_TAG_LEN: usize = 32;
/// Largest accepted record (tag plus content) in bytes.
pub const MAX_RECORD_LEN: usize = 4096;
/// Share of the quota freed beyond the incoming record on eviction.
pub const DROP_RATIO: f64 = 0.05;

/// Configuration for the log buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Quota for every type without an override.
    pub default_quota: usize,
    /// Per-type quota overrides, keyed by type value.
    pub quotas: HashMap<u16, usize>,
    /// Lower bound for quotas.
    pub min_quota: usize,
    /// Upper bound for quotas.
    pub max_quota: usize,
    /// Longest accepted tag.
    pub max_tag_len: usize,
    /// Largest accepted record.
    pub max_record_len: usize,
    /// Eviction cushion as a fraction of the quota.
    pub drop_ratio: f64,
    /// Insert a zeroth record per type on construction.
    pub head_records: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            default_quota: DEFAULT_QUOTA,
            quotas: HashMap::new(),
            min_quota: MIN_QUOTA,
            max_quota: MAX_QUOTA,
            max_tag_len: MAX_TAG_LEN,
            max_record_len: MAX_RECORD_LEN,
            drop_ratio: DROP_RATIO,
            head_records: true,
        }
    }
}

impl BufferConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the values are invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration is self-consistent.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.min_quota == 0 || self.min_quota > self.max_quota {
            return Err(LogError::InvalidConfig(format!(
                "quota bounds [{}, {}] are empty",
                self.min_quota, self.max_quota
            )));
        }
        if !(0.0..1.0).contains(&self.drop_ratio) {
            return Err(LogError::InvalidConfig(format!(
                "drop_ratio {} must be within [0, 1)",
                self.drop_ratio
            )));
        }
        if self.max_tag_len == 0 || self.max_record_len == 0 {
            return Err(LogError::InvalidConfig(
                "max_tag_len and max_record_len must be positive".to_string(),
            ));
        }
        self.check_quota(self.default_quota)
            .map_err(|e| LogError::InvalidConfig(format!("default_quota: {e}")))?;
        for (&log_type, &quota) in &self.quotas {
            if !LogType(log_type).is_valid() {
                return Err(LogError::InvalidConfig(format!(
                    "quota override for unknown log type {log_type}"
                )));
            }
            self.check_quota(quota)
                .map_err(|e| LogError::InvalidConfig(format!("quota for type {log_type}: {e}")))?;
        }
        Ok(())
    }

    /// Checks a quota against the configured bounds.
    pub(crate) fn check_quota(&self, size: usize) -> Result<()> {
        if size < self.min_quota || size > self.max_quota {
            return Err(LogError::InvalidQuota {
                size,
                min: self.min_quota,
                max: self.max_quota,
            });
        }
        Ok(())
    }

    /// Initial quota for every type, overrides applied.
    pub(crate) fn initial_quotas(&self) -> [usize; LOG_TYPE_MAX as usize] {
        let mut quotas = [self.default_quota; LOG_TYPE_MAX as usize];
        for log_type in LogType::all() {
            if let Some(&quota) = self.quotas.get(&log_type.0) {
                quotas[log_type.index()] = quota;
            }
        }
        quotas
    }
}
