//! # logd-core
//!
//! In-memory log retention and query core of the logd logging daemon.
//!
//! This crate provides:
//!
//! - [`LogRecord`] — One log line with type, level, domain, pid/tid and tag
//! - [`LogFilter`] — Per-query filter (type, level, domain, tag, pid, regex)
//! - [`LogBuffer`] — Bounded per-type storage with eviction and many readers
//! - [`BufferConfig`] — Quotas, limits and the eviction cushion
//! - [`StatsSink`] — Receiver of per-record statistics
//! - [`LogTail`] — Async `tail -f` on top of a reader
//!
//! Readers hold sequence-number cursors, so eviction and clearing running
//! on other threads never invalidate them. Records a reader lost to
//! eviction are reported once as a gap record.
//!
//! ## Example
//!
//! ```rust
//! use logd_core::{LogBuffer, LogFilter, LogLevel, LogRecord, LogType};
//!
//! let buffer = LogBuffer::new();
//! let record = LogRecord::builder()
//!     .log_type(LogType::APP)
//!     .level(LogLevel::ERROR)
//!     .domain(0xD00_2B01)
//!     .pid(1200)
//!     .tag("netd")
//!     .content("link down on eth0")
//!     .build()?;
//! assert!(buffer.insert(record) > 0);
//!
//! let reader = buffer.open_reader(None);
//! let filter = LogFilter::new()
//!     .with_levels([LogLevel::ERROR])
//!     .with_domain(0xD00_2BFF);
//! let found = buffer.query(&filter, reader, 0)?;
//! assert_eq!(found.map(|r| r.tag), Some("netd".to_string()));
//! buffer.close_reader(reader)?;
//! # Ok::<(), logd_core::LogError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod config;
pub mod error;
pub mod filter;
pub mod registry;
pub mod stats;
pub mod store;
pub mod stream;
pub mod types;

// Re-export main types
pub use buffer::{shared_buffer, BufferStats, LogBuffer, SharedLogBuffer};
pub use config::BufferConfig;
pub use error::{LogError, Result};
pub use filter::{domain_matches, LogFilter, DOMAIN_WILDCARD};
pub use registry::{NotifyCallback, ReaderRegistry, RemoveReason};
pub use stats::{LogStats, NoopSink, StatsEvent, StatsSink, StatsSnapshot};
pub use store::{CategoryStore, StoreKind};
pub use stream::LogTail;
pub use types::{LogLevel, LogRecord, LogRecordBuilder, LogType, ReaderId, LOG_TYPE_MAX};
