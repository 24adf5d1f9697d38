//! Core types for the log buffer.
//!
//! This module provides:
//! - [`LogType`] — Retention category of a record (app, init, core, kmsg)
//! - [`LogLevel`] — Severity of a record
//! - [`LogRecord`] — One stored log line with its metadata
//! - [`ReaderId`] — Opaque identifier of a registered reader

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Number of log type slots. Valid types are `0..LOG_TYPE_MAX`.
pub const LOG_TYPE_MAX: u16 = 5;

/// Tag used for records synthesized by the buffer itself.
pub const INTERNAL_TAG: &str = "logd";

/// Origin of the monotonic clock used for [`LogRecord::mono`].
static MONO_ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

/// Returns the time elapsed on the monotonic clock since the process-wide origin.
#[must_use]
pub fn monotonic_now() -> Duration {
    MONO_ORIGIN.elapsed()
}

/// Retention category of a record.
///
/// The values are opaque to the buffer except for [`LogType::KMSG`], which
/// routes records to the kernel store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogType(pub u16);

impl LogType {
    /// Application logs.
    pub const APP: Self = Self(0);
    /// Logs from the init process.
    pub const INIT: Self = Self(1);
    /// Core system service logs.
    pub const CORE: Self = Self(3);
    /// Kernel logs.
    pub const KMSG: Self = Self(4);
    /// Aggregate quota target covering every type.
    pub const ALL: Self = Self(LOG_TYPE_MAX);

    /// Returns true if this is a storable type.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 < LOG_TYPE_MAX
    }

    /// Returns true if records of this type go to the kernel store.
    #[must_use]
    pub const fn is_kernel(self) -> bool {
        self.0 == Self::KMSG.0
    }

    /// Returns the bit of this type in a filter type mask, if representable.
    #[must_use]
    pub const fn bit(self) -> Option<u16> {
        if self.0 < 16 { Some(1 << self.0) } else { None }
    }

    /// Index of this type in per-type tables.
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the name of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self.0 {
            0 => "app",
            1 => "init",
            3 => "core",
            4 => "kmsg",
            _ => "invalid",
        }
    }

    /// Iterates over every storable type.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..LOG_TYPE_MAX).map(Self)
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogLevel(pub u8);

impl LogLevel {
    /// Debugging information
    pub const DEBUG: Self = Self(3);
    /// General information
    pub const INFO: Self = Self(4);
    /// Warning conditions
    pub const WARN: Self = Self(5);
    /// Error conditions
    pub const ERROR: Self = Self(6);
    /// Unrecoverable conditions
    pub const FATAL: Self = Self(7);

    /// Returns the bit of this level in a filter level mask, if representable.
    #[must_use]
    pub const fn bit(self) -> Option<u16> {
        if self.0 < 16 { Some(1 << self.0) } else { None }
    }

    /// Returns the string representation of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self.0 {
            3 => "debug",
            4 => "info",
            5 => "warn",
            6 => "error",
            7 => "fatal",
            _ => "unknown",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier of a registered reader.
///
/// Identifiers are handed out by a monotonic counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReaderId(pub u64);

impl fmt::Display for ReaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reader-{}", self.0)
    }
}

/// One log line plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Retention category
    pub log_type: LogType,
    /// Severity level
    pub level: LogLevel,
    /// Subsystem domain id
    pub domain: u32,
    /// Producing process
    pub pid: u32,
    /// Producing thread
    pub tid: u32,
    /// Short tag naming the producer
    pub tag: String,
    /// Free-text content
    pub content: String,
    /// Wall-clock time of the record
    pub timestamp: DateTime<Utc>,
    /// Monotonic time of the record
    pub mono: Duration,
}

impl LogRecord {
    /// Creates a new record builder.
    #[must_use]
    pub fn builder() -> LogRecordBuilder {
        LogRecordBuilder::default()
    }

    /// Bytes accounted against the quota for this record.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.tag.len() + self.content.len()
    }

    /// Builds a record emitted by the buffer itself.
    pub(crate) fn internal(log_type: LogType, content: String) -> Self {
        Self {
            log_type,
            level: LogLevel::INFO,
            domain: 0,
            pid: 0,
            tid: 0,
            tag: INTERNAL_TAG.to_string(),
            content,
            timestamp: Utc::now(),
            mono: monotonic_now(),
        }
    }

    /// Builds the gap record reporting `missed` records lost to eviction.
    pub(crate) fn gap(missed: u64) -> Self {
        Self::internal(
            LogType::CORE,
            format!("========Slow reader missed log lines: {missed}"),
        )
    }

    /// Returns true if this is a gap record synthesized by a query.
    #[must_use]
    pub fn is_gap(&self) -> bool {
        self.tag == INTERNAL_TAG && self.content.starts_with("========Slow reader missed")
    }
}

/// Builder for constructing log records.
#[derive(Debug, Default)]
pub struct LogRecordBuilder {
    log_type: Option<LogType>,
    level: Option<LogLevel>,
    domain: u32,
    pid: u32,
    tid: u32,
    tag: Option<String>,
    content: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    mono: Option<Duration>,
}

impl LogRecordBuilder {
    /// Sets the log type.
    #[must_use]
    pub const fn log_type(mut self, log_type: LogType) -> Self {
        self.log_type = Some(log_type);
        self
    }

    /// Sets the level.
    #[must_use]
    pub const fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Sets the domain id.
    #[must_use]
    pub const fn domain(mut self, domain: u32) -> Self {
        self.domain = domain;
        self
    }

    /// Sets the process id.
    #[must_use]
    pub const fn pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    /// Sets the thread id.
    #[must_use]
    pub const fn tid(mut self, tid: u32) -> Self {
        self.tid = tid;
        self
    }

    /// Sets the tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the content.
    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Sets the wall-clock timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the monotonic timestamp.
    #[must_use]
    pub const fn mono(mut self, mono: Duration) -> Self {
        self.mono = Some(mono);
        self
    }

    /// Builds the record. Timestamps default to now.
    ///
    /// # Errors
    ///
    /// Returns an error if the type, level, tag or content is not set.
    pub fn build(self) -> Result<LogRecord, crate::error::LogError> {
        use crate::error::LogError;

        let log_type = self.log_type.ok_or(LogError::MissingField("log_type"))?;
        let level = self.level.ok_or(LogError::MissingField("level"))?;
        let tag = self.tag.ok_or(LogError::MissingField("tag"))?;
        let content = self.content.ok_or(LogError::MissingField("content"))?;

        Ok(LogRecord {
            log_type,
            level,
            domain: self.domain,
            pid: self.pid,
            tid: self.tid,
            tag,
            content,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            mono: self.mono.unwrap_or_else(monotonic_now),
        })
    }
}
