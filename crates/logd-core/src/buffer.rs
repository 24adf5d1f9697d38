//! The log buffer: category stores, quotas and readers.
//!
//! [`LogBuffer`] is the only component that changes stores and reader
//! cursors together. It holds two locks:
//!
//! 1. the store lock, over both [`CategoryStore`]s and the quota table;
//!    exclusive for insert, delete and quota changes, shared for queries;
//! 2. the reader registry's own map lock (see [`ReaderRegistry`]).
//!
//! The store lock is always taken first. Notification callbacks run after
//! both are released.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::BufferConfig;
use crate::error::{LogError, Result};
use crate::filter::LogFilter;
use crate::registry::{NotifyCallback, ReaderRegistry, RemoveReason};
use crate::stats::{LogStats, StatsEvent, StatsSink};
use crate::store::{CategoryStore, StoreKind};
use crate::types::{LOG_TYPE_MAX, LogRecord, LogType, ReaderId};

/// State guarded by the store lock.
struct Stores {
    general: CategoryStore,
    kernel: CategoryStore,
    quotas: [usize; LOG_TYPE_MAX as usize],
    aggregate_quota: usize,
}

impl Stores {
    const fn store(&self, kind: StoreKind) -> &CategoryStore {
        match kind {
            StoreKind::General => &self.general,
            StoreKind::Kernel => &self.kernel,
        }
    }

    const fn store_mut(&mut self, kind: StoreKind) -> &mut CategoryStore {
        match kind {
            StoreKind::General => &mut self.general,
            StoreKind::Kernel => &mut self.kernel,
        }
    }
}

/// Lifetime counters of a buffer.
#[derive(Debug, Default)]
struct Counters {
    rejected: AtomicU64,
    evicted: AtomicU64,
    eviction_shortfalls: AtomicU64,
    gaps: AtomicU64,
}

/// Point-in-time view of a buffer's occupancy and counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BufferStats {
    /// Records in the general store
    pub general_records: usize,
    /// Records in the kernel store
    pub kernel_records: usize,
    /// Bytes held per type value
    pub size_by_type: [usize; LOG_TYPE_MAX as usize],
    /// Registered readers
    pub readers: usize,
    /// Records refused at insert
    pub rejected: u64,
    /// Records removed by capacity eviction
    pub evicted: u64,
    /// Inserts that left a type at or over its quota
    pub eviction_shortfalls: u64,
    /// Gap records handed to readers
    pub gaps_emitted: u64,
}

/// Bounded in-memory log buffer serving many concurrent readers.
pub struct LogBuffer {
    config: BufferConfig,
    stores: RwLock<Stores>,
    readers: ReaderRegistry,
    sink: Arc<dyn StatsSink>,
    counters: Counters,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBuffer {
    /// Creates a buffer with the default configuration and a [`LogStats`] sink.
    #[must_use]
    pub fn new() -> Self {
        Self::build(BufferConfig::default(), Arc::new(LogStats::new()))
    }

    /// Creates a buffer with the given configuration and a [`LogStats`] sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_config(config: BufferConfig) -> Result<Self> {
        Self::with_sink(config, Arc::new(LogStats::new()))
    }

    /// Creates a buffer reporting stored records to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_sink(config: BufferConfig, sink: Arc<dyn StatsSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, sink))
    }

    fn build(config: BufferConfig, sink: Arc<dyn StatsSink>) -> Self {
        let stores = Stores {
            general: CategoryStore::new(),
            kernel: CategoryStore::new(),
            quotas: config.initial_quotas(),
            aggregate_quota: config.default_quota,
        };
        let buffer = Self {
            config,
            stores: RwLock::new(stores),
            readers: ReaderRegistry::new(),
            sink,
            counters: Counters::default(),
        };
        if buffer.config.head_records {
            buffer.insert_head_records();
        }
        buffer
    }

    /// Stores the zeroth record of every named type.
    fn insert_head_records(&self) {
        for log_type in LogType::all().filter(|t| t.as_str() != "invalid") {
            self.insert(LogRecord::internal(
                log_type,
                format!("========Zeroth log of type: {log_type}"),
            ));
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &BufferConfig {
        &self.config
    }

    fn rejection(&self, record: &LogRecord) -> Option<&'static str> {
        if !record.log_type.is_valid() {
            Some("log type out of range")
        } else if record.tag.is_empty() {
            Some("empty tag")
        } else if record.tag.len() > self.config.max_tag_len {
            Some("tag too long")
        } else if record.byte_len() > self.config.max_record_len {
            Some("record too large")
        } else {
            None
        }
    }

    /// Stores a record, evicting old records of its type when over quota.
    ///
    /// Returns the bytes accounted for the record, or `0` if it was rejected
    /// (empty or oversized tag, oversized record, unknown type).
    pub fn insert(&self, record: LogRecord) -> usize {
        let bytes = record.byte_len();
        if let Some(reason) = self.rejection(&record) {
            debug!(log_type = record.log_type.0, bytes, reason, "rejected log record");
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return 0;
        }

        let log_type = record.log_type;
        let level = record.level;
        let kind = StoreKind::of(log_type);

        let waiting = {
            let mut stores = self.stores.write();
            let quota = stores.quotas[log_type.index()];
            if stores.store(kind).size_of(log_type) + bytes >= quota {
                self.evict(&mut stores, kind, log_type, bytes, quota);
            }

            let store = stores.store_mut(kind);
            let seq = store.push(record);
            let size = store.size_of(log_type);
            if size >= quota {
                warn!(
                    log_type = %log_type,
                    size,
                    quota,
                    "failed to bring log type under quota"
                );
                self.counters
                    .eviction_shortfalls
                    .fetch_add(1, Ordering::Relaxed);
            }

            self.sink.count(&StatsEvent {
                log_type,
                level,
                bytes,
            });
            self.readers.waiting_at_end(kind, seq)
        };

        for notify in waiting {
            notify();
        }
        bytes
    }

    /// Drops the oldest records of `log_type` so that the incoming record
    /// lands within the quota minus the drop cushion.
    fn evict(
        &self,
        stores: &mut Stores,
        kind: StoreKind,
        log_type: LogType,
        incoming: usize,
        quota: usize,
    ) {
        let cushioned = (quota as f64 * (1.0 - self.config.drop_ratio)) as usize;
        let keep_at_most = cushioned.min(quota.saturating_sub(1)).saturating_sub(incoming);

        let store = stores.store_mut(kind);
        let victims = store.eviction_candidates(log_type, keep_at_most);
        self.readers.on_remove(kind, &victims, RemoveReason::Overflow);
        for &seq in &victims {
            store.remove(seq);
        }

        trace!(
            log_type = %log_type,
            evicted = victims.len(),
            remaining = store.size_of(log_type),
            "evicted old log records"
        );
        self.counters
            .evicted
            .fetch_add(victims.len() as u64, Ordering::Relaxed);
    }

    /// Returns the next record matching `filter` for the reader.
    ///
    /// The first query, or a query aimed at a different store than the
    /// reader's current one, positions the reader: at the head of the store
    /// when `tail_count` is zero, otherwise at the `tail_count`-th last
    /// matching record. Records lost to eviction are reported once as a gap
    /// record before reading continues. `Ok(None)` means nothing is
    /// available now; the reader stays at the end and is notified on the
    /// next insert.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::ReaderNotRegistered`] for an unknown reader.
    pub fn query(
        &self,
        filter: &LogFilter,
        id: ReaderId,
        tail_count: usize,
    ) -> Result<Option<LogRecord>> {
        let reader = self
            .readers
            .get(id)
            .ok_or(LogError::ReaderNotRegistered(id))?;
        let kind = filter.target_store();

        let stores = self.stores.read();
        let store = stores.store(kind);
        let mut reader = reader.lock();

        if reader.store() != Some(kind) {
            reader.reposition(kind, store.tail_start(filter, tail_count));
        }

        let missed = reader.take_missed();
        if missed > 0 {
            self.counters.gaps.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(LogRecord::gap(missed)));
        }

        let next = store
            .iter_from(reader.cursor())
            .find(|(_, record)| filter.matches(record))
            .map(|(seq, record)| (seq, record.clone()));
        match next {
            Some((seq, record)) => {
                reader.advance_to(seq + 1);
                Ok(Some(record))
            }
            None => {
                reader.advance_to(store.end_seq());
                Ok(None)
            }
        }
    }

    /// Removes every record of `log_type` and returns the bytes freed.
    ///
    /// Readers are not told about cleared records.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidCategory`] for an out-of-range type.
    pub fn delete(&self, log_type: LogType) -> Result<usize> {
        if !log_type.is_valid() {
            return Err(LogError::InvalidCategory(log_type.0));
        }
        let kind = StoreKind::of(log_type);

        let mut stores = self.stores.write();
        let store = stores.store_mut(kind);
        let victims = store.seqs_of_type(log_type);
        self.readers.on_remove(kind, &victims, RemoveReason::Cleared);
        let freed: usize = victims
            .iter()
            .filter_map(|&seq| store.remove(seq))
            .map(|record| record.byte_len())
            .sum();

        debug!(log_type = %log_type, records = victims.len(), freed, "cleared log type");
        Ok(freed)
    }

    /// Registers a reader and returns its identifier.
    ///
    /// `notify` is called whenever a record is appended to the store the
    /// reader is waiting at the end of. It runs on the inserting thread
    /// after the buffer's locks are released.
    pub fn open_reader(&self, notify: Option<NotifyCallback>) -> ReaderId {
        let id = self.readers.open(notify);
        debug!(reader = %id, "opened reader");
        id
    }

    /// Unregisters a reader.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::ReaderNotRegistered`] for an unknown reader.
    pub fn close_reader(&self, id: ReaderId) -> Result<()> {
        if !self.readers.close(id) {
            return Err(LogError::ReaderNotRegistered(id));
        }
        debug!(reader = %id, "closed reader");
        Ok(())
    }

    /// Returns the quota of a type, or the aggregate quota for [`LogType::ALL`].
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidCategory`] for an out-of-range type.
    pub fn get_quota(&self, log_type: LogType) -> Result<usize> {
        let stores = self.stores.read();
        if log_type == LogType::ALL {
            return Ok(stores.aggregate_quota);
        }
        stores
            .quotas
            .get(log_type.index())
            .copied()
            .ok_or(LogError::InvalidCategory(log_type.0))
    }

    /// Sets the quota of a type; [`LogType::ALL`] sets every type.
    ///
    /// A lowered quota takes effect at the next insert of that type.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidCategory`] for an out-of-range type and
    /// [`LogError::InvalidQuota`] for a size outside the configured bounds.
    pub fn set_quota(&self, log_type: LogType, size: usize) -> Result<()> {
        if !log_type.is_valid() && log_type != LogType::ALL {
            return Err(LogError::InvalidCategory(log_type.0));
        }
        self.config.check_quota(size)?;

        let mut stores = self.stores.write();
        if log_type == LogType::ALL {
            stores.quotas = [size; LOG_TYPE_MAX as usize];
            stores.aggregate_quota = size;
        } else {
            stores.quotas[log_type.index()] = size;
        }
        debug!(log_type = log_type.0, size, "quota updated");
        Ok(())
    }

    /// Bytes currently held by records of `log_type`.
    #[must_use]
    pub fn size_of(&self, log_type: LogType) -> usize {
        self.stores
            .read()
            .store(StoreKind::of(log_type))
            .size_of(log_type)
    }

    /// Number of records in one store.
    #[must_use]
    pub fn len(&self, kind: StoreKind) -> usize {
        self.stores.read().store(kind).len()
    }

    /// Returns true if both stores are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let stores = self.stores.read();
        stores.general.is_empty() && stores.kernel.is_empty()
    }

    /// Returns occupancy and lifetime counters.
    #[must_use]
    pub fn stats(&self) -> BufferStats {
        let stores = self.stores.read();
        let mut size_by_type = [0; LOG_TYPE_MAX as usize];
        for log_type in LogType::all() {
            size_by_type[log_type.index()] = stores.store(StoreKind::of(log_type)).size_of(log_type);
        }
        BufferStats {
            general_records: stores.general.len(),
            kernel_records: stores.kernel.len(),
            size_by_type,
            readers: self.readers.len(),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            evicted: self.counters.evicted.load(Ordering::Relaxed),
            eviction_shortfalls: self.counters.eviction_shortfalls.load(Ordering::Relaxed),
            gaps_emitted: self.counters.gaps.load(Ordering::Relaxed),
        }
    }

    /// Clears the statistics sink.
    pub fn reset_stats(&self) {
        self.sink.reset();
    }
}

/// Shared log buffer handle.
pub type SharedLogBuffer = Arc<LogBuffer>;

/// Creates a new shared buffer with the default configuration.
#[must_use]
pub fn shared_buffer() -> SharedLogBuffer {
    Arc::new(LogBuffer::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogLevel;
    use std::sync::atomic::AtomicUsize;

    /// 100-byte record: 4-byte tag plus 96 bytes of content.
    fn make_record(log_type: LogType, level: LogLevel, n: usize) -> LogRecord {
        LogRecord::builder()
            .log_type(log_type)
            .level(level)
            .tag("test")
            .content(format!("{n:096}"))
            .build()
            .expect("valid record")
    }

    fn small_config(quota: usize) -> BufferConfig {
        BufferConfig {
            default_quota: quota,
            min_quota: 100,
            head_records: false,
            ..Default::default()
        }
    }

    fn buffer(quota: usize) -> LogBuffer {
        LogBuffer::with_config(small_config(quota)).expect("valid config")
    }

    fn drain(buffer: &LogBuffer, filter: &LogFilter, id: ReaderId) -> Vec<LogRecord> {
        std::iter::from_fn(|| buffer.query(filter, id, 0).expect("registered"))
            .collect()
    }

    #[test]
    fn insert_returns_bytes() {
        let buffer = buffer(10_000);
        assert_eq!(buffer.insert(make_record(LogType::APP, LogLevel::INFO, 1)), 100);
        assert_eq!(buffer.size_of(LogType::APP), 100);
        assert_eq!(buffer.len(StoreKind::General), 1);
    }

    #[test]
    fn insert_rejects_bad_records() {
        let buffer = buffer(10_000);
        let mut no_tag = make_record(LogType::APP, LogLevel::INFO, 1);
        no_tag.tag.clear();
        assert_eq!(buffer.insert(no_tag), 0);

        let mut long_tag = make_record(LogType::APP, LogLevel::INFO, 1);
        long_tag.tag = "t".repeat(buffer.config().max_tag_len + 1);
        assert_eq!(buffer.insert(long_tag), 0);

        let mut huge = make_record(LogType::APP, LogLevel::INFO, 1);
        huge.content = "x".repeat(buffer.config().max_record_len);
        assert_eq!(buffer.insert(huge), 0);

        assert_eq!(buffer.insert(make_record(LogType(7), LogLevel::INFO, 1)), 0);

        assert!(buffer.is_empty());
        assert_eq!(buffer.stats().rejected, 4);
    }

    #[test]
    fn kernel_records_use_their_own_store() {
        let buffer = buffer(10_000);
        buffer.insert(make_record(LogType::KMSG, LogLevel::INFO, 1));
        buffer.insert(make_record(LogType::APP, LogLevel::INFO, 2));
        assert_eq!(buffer.len(StoreKind::Kernel), 1);
        assert_eq!(buffer.len(StoreKind::General), 1);
    }

    #[test]
    fn eviction_keeps_size_under_quota() {
        let buffer = buffer(1_250);
        for n in 0..50 {
            buffer.insert(make_record(LogType::APP, LogLevel::INFO, n));
            assert!(buffer.size_of(LogType::APP) < 1_250);
        }
        let stats = buffer.stats();
        assert!(stats.evicted > 0);
        assert_eq!(stats.eviction_shortfalls, 0);
    }

    #[test]
    fn eviction_leaves_other_types_alone() {
        let buffer = buffer(1_000);
        buffer.insert(make_record(LogType::CORE, LogLevel::INFO, 0));
        for n in 0..30 {
            buffer.insert(make_record(LogType::APP, LogLevel::INFO, n));
        }
        assert_eq!(buffer.size_of(LogType::CORE), 100);

        let id = buffer.open_reader(None);
        let core = LogFilter::new().with_types([LogType::CORE]);
        let records = drain(&buffer, &core, id);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn record_larger_than_quota_is_kept_and_reported() {
        let buffer = LogBuffer::with_config(BufferConfig {
            default_quota: 100,
            min_quota: 100,
            head_records: false,
            ..Default::default()
        })
        .expect("valid config");
        assert_eq!(buffer.insert(make_record(LogType::APP, LogLevel::INFO, 0)), 100);
        assert_eq!(buffer.stats().eviction_shortfalls, 1);
        assert_eq!(buffer.len(StoreKind::General), 1);
    }

    #[test]
    fn query_unknown_reader() {
        let buffer = buffer(10_000);
        let err = buffer
            .query(&LogFilter::new(), ReaderId(42), 0)
            .expect_err("must fail");
        assert!(matches!(err, LogError::ReaderNotRegistered(ReaderId(42))));
    }

    #[test]
    fn closed_reader_is_gone() {
        let buffer = buffer(10_000);
        let id = buffer.open_reader(None);
        assert!(buffer.close_reader(id).is_ok());
        assert!(buffer.close_reader(id).is_err());
        assert!(buffer.query(&LogFilter::new(), id, 0).is_err());
    }

    #[test]
    fn query_filters_and_keeps_order() {
        let buffer = buffer(10_000);
        for n in 0..6 {
            let level = if n % 2 == 0 { LogLevel::INFO } else { LogLevel::ERROR };
            buffer.insert(make_record(LogType::APP, level, n));
        }
        let id = buffer.open_reader(None);
        let errors = LogFilter::new().with_levels([LogLevel::ERROR]);
        let contents: Vec<String> = drain(&buffer, &errors, id)
            .into_iter()
            .map(|r| r.content)
            .collect();
        assert_eq!(contents, vec![format!("{:096}", 1), format!("{:096}", 3), format!("{:096}", 5)]);
    }

    #[test]
    fn tail_count_applies_once_per_store() {
        let buffer = buffer(10_000);
        for n in 0..5 {
            buffer.insert(make_record(LogType::APP, LogLevel::INFO, n));
        }
        let id = buffer.open_reader(None);
        let filter = LogFilter::new();
        let first = buffer.query(&filter, id, 2).expect("registered").expect("record");
        assert_eq!(first.content, format!("{:096}", 3));
        // A later tail_count does not reposition the reader.
        let second = buffer.query(&filter, id, 5).expect("registered").expect("record");
        assert_eq!(second.content, format!("{:096}", 4));
        assert!(buffer.query(&filter, id, 5).expect("registered").is_none());
    }

    #[test]
    fn switching_store_repositions_reader() {
        let buffer = buffer(10_000);
        buffer.insert(make_record(LogType::APP, LogLevel::INFO, 1));
        buffer.insert(make_record(LogType::KMSG, LogLevel::INFO, 2));
        let id = buffer.open_reader(None);

        let general = LogFilter::new();
        let kernel = LogFilter::new().with_types([LogType::KMSG]);
        assert!(buffer.query(&general, id, 0).expect("registered").is_some());
        let k = buffer.query(&kernel, id, 0).expect("registered").expect("record");
        assert_eq!(k.log_type, LogType::KMSG);
        // Back to general: repositioned at the head again.
        let g = buffer.query(&general, id, 0).expect("registered").expect("record");
        assert_eq!(g.log_type, LogType::APP);
    }

    #[test]
    fn eviction_ahead_of_reader_yields_gap_once() {
        let buffer = buffer(1_250);
        for n in 0..12 {
            buffer.insert(make_record(LogType::APP, LogLevel::INFO, n));
        }
        let id = buffer.open_reader(None);
        let filter = LogFilter::new();
        let first = buffer.query(&filter, id, 0).expect("registered").expect("record");
        assert_eq!(first.content, format!("{:096}", 0));

        // Evicts records 0 and 1; the reader was about to read record 1.
        buffer.insert(make_record(LogType::APP, LogLevel::INFO, 12));

        let gap = buffer.query(&filter, id, 0).expect("registered").expect("gap");
        assert!(gap.is_gap());
        assert!(gap.content.ends_with(": 1"));
        let next = buffer.query(&filter, id, 0).expect("registered").expect("record");
        assert_eq!(next.content, format!("{:096}", 2));
        assert_eq!(buffer.stats().gaps_emitted, 1);
    }

    #[test]
    fn delete_clears_type_without_gap() {
        let buffer = buffer(10_000);
        buffer.insert(make_record(LogType::CORE, LogLevel::INFO, 0));
        for n in 0..3 {
            buffer.insert(make_record(LogType::APP, LogLevel::INFO, n));
        }
        let id = buffer.open_reader(None);
        let filter = LogFilter::new();
        assert!(buffer.query(&filter, id, 0).expect("registered").is_some());

        assert_eq!(buffer.delete(LogType::APP).expect("valid type"), 300);
        assert_eq!(buffer.size_of(LogType::APP), 0);
        assert_eq!(buffer.size_of(LogType::CORE), 100);
        assert!(buffer.query(&filter, id, 0).expect("registered").is_none());
        assert_eq!(buffer.stats().gaps_emitted, 0);
    }

    #[test]
    fn delete_invalid_type() {
        let buffer = buffer(10_000);
        assert!(matches!(
            buffer.delete(LogType(LOG_TYPE_MAX)),
            Err(LogError::InvalidCategory(5))
        ));
    }

    #[test]
    fn quota_get_and_set() {
        let buffer = buffer(10_000);
        assert_eq!(buffer.get_quota(LogType::APP).expect("valid"), 10_000);
        buffer.set_quota(LogType::KMSG, 20_000).expect("in range");
        assert_eq!(buffer.get_quota(LogType::KMSG).expect("valid"), 20_000);
        assert_eq!(buffer.get_quota(LogType::APP).expect("valid"), 10_000);

        buffer.set_quota(LogType::ALL, 30_000).expect("in range");
        assert_eq!(buffer.get_quota(LogType::ALL).expect("valid"), 30_000);
        assert_eq!(buffer.get_quota(LogType::KMSG).expect("valid"), 30_000);

        assert!(matches!(
            buffer.set_quota(LogType::APP, 1),
            Err(LogError::InvalidQuota { .. })
        ));
        assert!(matches!(
            buffer.set_quota(LogType(9), 10_000),
            Err(LogError::InvalidCategory(9))
        ));
        assert!(matches!(
            buffer.get_quota(LogType(9)),
            Err(LogError::InvalidCategory(9))
        ));
    }

    #[test]
    fn lowered_quota_applies_on_next_insert() {
        let buffer = buffer(10_000);
        for n in 0..20 {
            buffer.insert(make_record(LogType::APP, LogLevel::INFO, n));
        }
        buffer.set_quota(LogType::APP, 500).expect("in range");
        assert_eq!(buffer.size_of(LogType::APP), 2_000);
        buffer.insert(make_record(LogType::APP, LogLevel::INFO, 20));
        assert!(buffer.size_of(LogType::APP) < 500);
    }

    #[test]
    fn head_records_seed_each_named_type() {
        let buffer = LogBuffer::new();
        assert_eq!(buffer.len(StoreKind::General), 3);
        assert_eq!(buffer.len(StoreKind::Kernel), 1);
        let id = buffer.open_reader(None);
        let first = buffer
            .query(&LogFilter::new(), id, 0)
            .expect("registered")
            .expect("record");
        assert_eq!(first.content, "========Zeroth log of type: app");
    }

    #[test]
    fn sink_sees_each_stored_record() {
        let stats = Arc::new(LogStats::new());
        let sink: Arc<dyn StatsSink> = Arc::clone(&stats) as Arc<dyn StatsSink>;
        let buffer = LogBuffer::with_sink(small_config(10_000), sink).expect("valid config");
        buffer.insert(make_record(LogType::APP, LogLevel::ERROR, 0));
        buffer.insert(make_record(LogType::KMSG, LogLevel::INFO, 1));
        let mut rejected = make_record(LogType::APP, LogLevel::INFO, 2);
        rejected.tag.clear();
        buffer.insert(rejected);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_records(), 2);
        assert_eq!(snapshot.for_level(LogLevel::ERROR), 1);
        assert_eq!(snapshot.for_type(LogType::KMSG).bytes, 100);

        buffer.reset_stats();
        assert_eq!(stats.snapshot().total_records(), 0);
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = BufferConfig {
            drop_ratio: -0.5,
            ..Default::default()
        };
        assert!(LogBuffer::with_config(config).is_err());
    }

    #[test]
    fn notify_fires_for_reader_at_end() {
        let buffer = buffer(10_000);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = buffer.open_reader(Some(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        // Unpositioned readers are not woken.
        buffer.insert(make_record(LogType::APP, LogLevel::INFO, 0));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        let filter = LogFilter::new();
        assert!(buffer.query(&filter, id, 0).expect("registered").is_some());
        assert!(buffer.query(&filter, id, 0).expect("registered").is_none());

        buffer.insert(make_record(LogType::APP, LogLevel::INFO, 1));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        // Kernel inserts do not wake a general reader.
        buffer.insert(make_record(LogType::KMSG, LogLevel::INFO, 2));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shared_buffer_works() {
        let buffer = shared_buffer();
        let other = Arc::clone(&buffer);
        other.insert(make_record(LogType::APP, LogLevel::INFO, 0));
        assert_eq!(buffer.len(StoreKind::General), 4);
    }
}
