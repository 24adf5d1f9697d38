//! Query filters evaluated on the read path.
//!
//! A [`LogFilter`] is a stateless request parameter. Matching short-circuits
//! from the cheapest test to the most expensive one: type bit, level bit,
//! domain, tag, pid, then the content regex.

use regex::Regex;

use crate::error::{LogError, Result};
use crate::store::StoreKind;
use crate::types::{LogLevel, LogRecord, LogType};

/// Low byte of a domain pattern that matches any sub-domain.
pub const DOMAIN_WILDCARD: u32 = 0xFF;

/// Filter criteria for reading logs.
#[derive(Debug, Clone)]
pub struct LogFilter {
    /// Accepted types, one bit per [`LogType`] value
    pub types: u16,
    /// Accepted levels, one bit per [`LogLevel`] value
    pub levels: u16,
    /// Domain patterns (empty means all domains)
    pub domains: Vec<u32>,
    /// Reject matching domains instead of accepting them
    pub black_domain: bool,
    /// Tags (empty means all tags)
    pub tags: Vec<String>,
    /// Reject matching tags instead of accepting them
    pub black_tag: bool,
    /// Process ids (empty means all processes)
    pub pids: Vec<u32>,
    /// Reject matching pids instead of accepting them
    pub black_pid: bool,
    /// Content pattern, searched anywhere in the content
    pub regex: Option<Regex>,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            types: u16::MAX,
            levels: u16::MAX,
            domains: Vec::new(),
            black_domain: false,
            tags: Vec::new(),
            black_tag: false,
            pids: Vec::new(),
            black_pid: false,
            regex: None,
        }
    }
}

/// Returns true if `domain` is selected by `pattern`.
///
/// A pattern matches exactly, or, when its low byte is [`DOMAIN_WILDCARD`],
/// matches every domain sharing its upper 24 bits.
#[must_use]
pub const fn domain_matches(pattern: u32, domain: u32) -> bool {
    pattern == domain
        || ((pattern & DOMAIN_WILDCARD) == DOMAIN_WILDCARD
            && (pattern & !DOMAIN_WILDCARD) == (domain & !DOMAIN_WILDCARD))
}

/// Allow/deny rule shared by the domain, tag and pid lists.
const fn list_allows(configured: bool, found: bool, blacklist: bool) -> bool {
    !configured || found != blacklist
}

fn mask_of(bits: impl IntoIterator<Item = Option<u16>>) -> u16 {
    bits.into_iter().flatten().fold(0, |mask, bit| mask | bit)
}

impl LogFilter {
    /// Creates a new filter that matches every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the filter to exactly the given types.
    #[must_use]
    pub fn with_types(mut self, types: impl IntoIterator<Item = LogType>) -> Self {
        self.types = mask_of(types.into_iter().map(LogType::bit));
        self
    }

    /// Sets the raw type mask.
    #[must_use]
    pub const fn with_type_mask(mut self, mask: u16) -> Self {
        self.types = mask;
        self
    }

    /// Restricts the filter to exactly the given levels.
    #[must_use]
    pub fn with_levels(mut self, levels: impl IntoIterator<Item = LogLevel>) -> Self {
        self.levels = mask_of(levels.into_iter().map(LogLevel::bit));
        self
    }

    /// Sets the raw level mask.
    #[must_use]
    pub const fn with_level_mask(mut self, mask: u16) -> Self {
        self.levels = mask;
        self
    }

    /// Adds a domain pattern.
    #[must_use]
    pub fn with_domain(mut self, pattern: u32) -> Self {
        self.domains.push(pattern);
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Adds a process id.
    #[must_use]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pids.push(pid);
        self
    }

    /// Treats the domain list as a blacklist.
    #[must_use]
    pub const fn blacklist_domains(mut self) -> Self {
        self.black_domain = true;
        self
    }

    /// Treats the tag list as a blacklist.
    #[must_use]
    pub const fn blacklist_tags(mut self) -> Self {
        self.black_tag = true;
        self
    }

    /// Treats the pid list as a blacklist.
    #[must_use]
    pub const fn blacklist_pids(mut self) -> Self {
        self.black_pid = true;
        self
    }

    /// Adds a content pattern. An empty pattern clears it.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidFilter`] if the pattern does not compile.
    pub fn with_regex(mut self, pattern: &str) -> Result<Self> {
        self.regex = if pattern.is_empty() {
            None
        } else {
            Some(Regex::new(pattern).map_err(|e| LogError::InvalidFilter(e.to_string()))?)
        };
        Ok(self)
    }

    /// Store a reader using this filter is positioned in.
    ///
    /// Only a filter asking for kernel logs alone reads the kernel store.
    #[must_use]
    pub fn target_store(&self) -> StoreKind {
        if Some(self.types) == LogType::KMSG.bit() {
            StoreKind::Kernel
        } else {
            StoreKind::General
        }
    }

    /// Checks if the record passes this filter.
    #[must_use]
    pub fn matches(&self, record: &LogRecord) -> bool {
        if record.log_type.bit().is_none_or(|bit| self.types & bit == 0) {
            return false;
        }
        if record.level.bit().is_none_or(|bit| self.levels & bit == 0) {
            return false;
        }

        let found = self
            .domains
            .iter()
            .any(|&pattern| domain_matches(pattern, record.domain));
        if !list_allows(!self.domains.is_empty(), found, self.black_domain) {
            return false;
        }

        let found = self.tags.iter().any(|tag| *tag == record.tag);
        if !list_allows(!self.tags.is_empty(), found, self.black_tag) {
            return false;
        }

        let found = self.pids.contains(&record.pid);
        if !list_allows(!self.pids.is_empty(), found, self.black_pid) {
            return false;
        }

        self.regex
            .as_ref()
            .is_none_or(|regex| regex.is_match(&record.content))
    }
}
