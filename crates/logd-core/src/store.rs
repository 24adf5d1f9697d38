//! Ordered per-category record storage.
//!
//! A [`CategoryStore`] keeps records in insertion order, keyed by a
//! store-local sequence number. Readers hold sequence numbers rather than
//! references, so removing a record never invalidates a cursor: the next
//! lookup simply lands on the first surviving successor.

use std::collections::BTreeMap;

use crate::filter::LogFilter;
use crate::types::{LOG_TYPE_MAX, LogRecord, LogType};

/// Which of the two physical stores a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Every non-kernel type
    General,
    /// Kernel logs
    Kernel,
}

impl StoreKind {
    /// Store holding records of the given type.
    #[must_use]
    pub const fn of(log_type: LogType) -> Self {
        if log_type.is_kernel() {
            Self::Kernel
        } else {
            Self::General
        }
    }

    /// Returns the name of this store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Kernel => "kernel",
        }
    }
}

/// Insertion-ordered records of one store with per-type size accounting.
#[derive(Debug, Default)]
pub struct CategoryStore {
    records: BTreeMap<u64, LogRecord>,
    size_by_type: [usize; LOG_TYPE_MAX as usize],
    next_seq: u64,
}

impl CategoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record at the tail and returns its sequence number.
    pub fn push(&mut self, record: LogRecord) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.size_by_type[record.log_type.index()] += record.byte_len();
        self.records.insert(seq, record);
        seq
    }

    /// Removes one record, keeping the order of the rest.
    pub fn remove(&mut self, seq: u64) -> Option<LogRecord> {
        let record = self.records.remove(&seq)?;
        self.size_by_type[record.log_type.index()] -= record.byte_len();
        Some(record)
    }

    /// Bytes held by records of the given type.
    #[must_use]
    pub fn size_of(&self, log_type: LogType) -> usize {
        self.size_by_type.get(log_type.index()).copied().unwrap_or(0)
    }

    /// Bytes held by all records.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.size_by_type.iter().sum()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sequence number the next appended record will get ("end").
    #[must_use]
    pub const fn end_seq(&self) -> u64 {
        self.next_seq
    }

    /// Sequence number of the oldest record, or end if empty.
    #[must_use]
    pub fn head_seq(&self) -> u64 {
        self.records
            .keys()
            .next()
            .copied()
            .unwrap_or(self.next_seq)
    }

    /// Records with sequence number at or after `from`, oldest first.
    pub fn iter_from(&self, from: u64) -> impl Iterator<Item = (u64, &LogRecord)> {
        self.records.range(from..).map(|(&seq, record)| (seq, record))
    }

    /// Sequence numbers of every record of the given type, oldest first.
    #[must_use]
    pub fn seqs_of_type(&self, log_type: LogType) -> Vec<u64> {
        self.records
            .iter()
            .filter(|(_, record)| record.log_type == log_type)
            .map(|(&seq, _)| seq)
            .collect()
    }

    /// Oldest records of `log_type` to drop so its size falls to `keep_at_most`.
    ///
    /// Records of other types are skipped. The result may fall short when
    /// the type cannot shrink that far.
    #[must_use]
    pub fn eviction_candidates(&self, log_type: LogType, keep_at_most: usize) -> Vec<u64> {
        let mut remaining = self.size_of(log_type);
        let mut victims = Vec::new();
        for (&seq, record) in &self.records {
            if remaining <= keep_at_most {
                break;
            }
            if record.log_type != log_type {
                continue;
            }
            remaining -= record.byte_len();
            victims.push(seq);
        }
        victims
    }

    /// Start position for a reader wanting the last `count` matches.
    ///
    /// Walks backward from the tail; returns the head when `count` is zero
    /// or fewer than `count` records match.
    #[must_use]
    pub fn tail_start(&self, filter: &LogFilter, count: usize) -> u64 {
        if count == 0 {
            return self.head_seq();
        }
        self.records
            .iter()
            .rev()
            .filter(|(_, record)| filter.matches(record))
            .nth(count - 1)
            .map_or_else(|| self.head_seq(), |(&seq, _)| seq)
    }
}
