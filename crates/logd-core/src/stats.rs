//! Statistics fed by the buffer.
//!
//! The buffer reports one [`StatsEvent`] per stored record to a
//! [`StatsSink`]. Aggregation is the sink's business; [`LogStats`] is a
//! simple counting implementation.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::Serialize;

use crate::types::{LOG_TYPE_MAX, LogLevel, LogType};

/// One successfully stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsEvent {
    /// Type of the record
    pub log_type: LogType,
    /// Level of the record
    pub level: LogLevel,
    /// Bytes accounted for the record
    pub bytes: usize,
}

/// Receiver of per-record statistics events.
///
/// Called while the store lock is held, so implementations must be quick
/// and must not call back into the buffer.
pub trait StatsSink: Send + Sync {
    /// Counts one stored record.
    fn count(&self, event: &StatsEvent);

    /// Clears accumulated statistics.
    fn reset(&self) {}
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl StatsSink for NoopSink {
    fn count(&self, _event: &StatsEvent) {}
}

/// Per-type counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounters {
    /// Records stored
    pub records: u64,
    /// Bytes stored
    pub bytes: u64,
}

/// Point-in-time copy of [`LogStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Counters indexed by type value
    pub by_type: [TypeCounters; LOG_TYPE_MAX as usize],
    /// Record count per level value
    pub by_level: BTreeMap<u8, u64>,
}

impl StatsSnapshot {
    /// Counters of one type.
    #[must_use]
    pub fn for_type(&self, log_type: LogType) -> TypeCounters {
        self.by_type
            .get(log_type.index())
            .copied()
            .unwrap_or_default()
    }

    /// Records counted at one level.
    #[must_use]
    pub fn for_level(&self, level: LogLevel) -> u64 {
        self.by_level.get(&level.0).copied().unwrap_or(0)
    }

    /// Records counted across every type.
    #[must_use]
    pub fn total_records(&self) -> u64 {
        self.by_type.iter().map(|c| c.records).sum()
    }
}

/// Counting statistics sink.
#[derive(Debug, Default)]
pub struct LogStats {
    inner: Mutex<StatsSnapshot>,
}

impl LogStats {
    /// Creates an empty counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner.lock().clone()
    }
}

impl StatsSink for LogStats {
    fn count(&self, event: &StatsEvent) {
        let mut stats = self.inner.lock();
        if let Some(counters) = stats.by_type.get_mut(event.log_type.index()) {
            counters.records += 1;
            counters.bytes += event.bytes as u64;
        }
        *stats.by_level.entry(event.level.0).or_insert(0) += 1;
    }

    fn reset(&self) {
        *self.inner.lock() = StatsSnapshot::default();
    }
}
