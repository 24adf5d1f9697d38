//! Async tailing on top of the reader notification callback.
//!
//! The buffer itself never blocks: a query either returns a record or says
//! nothing is available now. [`LogTail`] turns that into an awaitable
//! `tail -f` by parking on a [`Notify`] that the reader's callback signals.

use std::sync::Arc;

use futures::Stream;
use tokio::sync::Notify;

use crate::buffer::SharedLogBuffer;
use crate::error::Result;
use crate::filter::LogFilter;
use crate::types::{LogRecord, ReaderId};

/// A reader that can wait for new records.
///
/// Dropping the tail closes its reader.
pub struct LogTail {
    buffer: SharedLogBuffer,
    id: ReaderId,
    filter: LogFilter,
    tail_count: usize,
    notify: Arc<Notify>,
}

impl LogTail {
    /// Opens a reader on `buffer` that starts with the last `tail_count`
    /// matching records (all records when zero).
    #[must_use]
    pub fn open(buffer: SharedLogBuffer, filter: LogFilter, tail_count: usize) -> Self {
        let notify = Arc::new(Notify::new());
        let signal = Arc::clone(&notify);
        let id = buffer.open_reader(Some(Arc::new(move || signal.notify_one())));
        Self {
            buffer,
            id,
            filter,
            tail_count,
            notify,
        }
    }

    /// Identifier of the underlying reader.
    #[must_use]
    pub const fn id(&self) -> ReaderId {
        self.id
    }

    /// Returns the next record if one is available now.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader was closed behind this tail's back.
    pub fn try_next(&self) -> Result<Option<LogRecord>> {
        self.buffer.query(&self.filter, self.id, self.tail_count)
    }

    /// Waits for the next record.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader was closed behind this tail's back.
    pub async fn next(&self) -> Result<LogRecord> {
        loop {
            if let Some(record) = self.try_next()? {
                return Ok(record);
            }
            // A notification that raced the empty query left a permit, so
            // this returns immediately instead of missing the record.
            self.notify.notified().await;
        }
    }

    /// Converts the tail into a stream of records. The stream ends after
    /// the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<LogRecord>> {
        futures::stream::unfold(Some(self), |state| async move {
            let tail = state?;
            let item = tail.next().await;
            match item {
                Ok(record) => Some((Ok(record), Some(tail))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

impl Drop for LogTail {
    fn drop(&mut self) {
        let _ = self.buffer.close_reader(self.id);
    }
}
