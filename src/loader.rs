//! Batched delivery of parsed records to a [`Sink`].
//!
//! Batches are sent one at a time. A batch rejected as a duplicate is
//! retried row by row, where a per-row duplicate counts as success. Any
//! other failure is counted against the whole batch and the run moves on;
//! there is no retry and no rollback.

use crate::record::Record;
use crate::sink::{InsertOutcome, Sink};
use std::num::NonZeroUsize;
use std::ops::AddAssign;

pub const DEFAULT_BATCH_SIZE: usize = 50;

const MAX_BODY_LOG_LEN: usize = 200;
const MAX_ERROR_LOG_LEN: usize = 100;

/// Aggregate counts for one or more loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl LoadSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl AddAssign for LoadSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.succeeded += rhs.succeeded;
        self.failed += rhs.failed;
    }
}

pub struct Loader {
    batch_size: NonZeroUsize,
    on_batch: Option<Box<dyn Fn(usize, usize)>>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    pub fn new() -> Self {
        Self {
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            on_batch: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Called after each batch with (records done, records total).
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize) + 'static,
    {
        self.on_batch = Some(Box::new(callback));
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    /// Deliver `records` to `table`, returning aggregate counts.
    pub fn load<S: Sink + ?Sized>(
        &self,
        sink: &mut S,
        table: &str,
        records: &[Record],
    ) -> LoadSummary {
        let mut summary = LoadSummary::default();
        let mut done = 0;

        for (idx, batch) in records.chunks(self.batch_size.get()).enumerate() {
            summary += self.send_batch(sink, table, batch, idx);
            done += batch.len();
            if let Some(ref cb) = self.on_batch {
                cb(done, records.len());
            }
        }

        summary
    }

    fn send_batch<S: Sink + ?Sized>(
        &self,
        sink: &mut S,
        table: &str,
        batch: &[Record],
        idx: usize,
    ) -> LoadSummary {
        match sink.insert_many(table, batch) {
            Ok(InsertOutcome::Inserted) => LoadSummary {
                succeeded: batch.len(),
                failed: 0,
            },
            Ok(InsertOutcome::Conflict) => {
                tracing::info!(
                    table,
                    batch = idx,
                    rows = batch.len(),
                    "Batch conflicted, inserting rows individually"
                );
                send_individually(sink, table, batch)
            }
            Ok(InsertOutcome::Rejected { status, body }) => {
                tracing::warn!(
                    table,
                    batch = idx,
                    status,
                    body = %truncate(&body, MAX_BODY_LOG_LEN),
                    "Batch rejected"
                );
                LoadSummary {
                    succeeded: 0,
                    failed: batch.len(),
                }
            }
            Err(e) => {
                tracing::warn!(
                    table,
                    batch = idx,
                    error = %truncate(&e.to_string(), MAX_ERROR_LOG_LEN),
                    "Batch failed"
                );
                LoadSummary {
                    succeeded: 0,
                    failed: batch.len(),
                }
            }
        }
    }
}

fn send_individually<S: Sink + ?Sized>(sink: &mut S, table: &str, batch: &[Record]) -> LoadSummary {
    let mut summary = LoadSummary::default();
    for record in batch {
        match sink.insert_one(table, record) {
            Ok(outcome) if outcome.is_settled() => summary.succeeded += 1,
            _ => summary.failed += 1,
        }
    }
    summary
}

/// Cut `s` to at most `max` characters.
pub fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 2), "he");
        assert_eq!(truncate("ドラゴン", 2), "ドラ");
    }

    #[test]
    fn test_summary_add_assign() {
        let mut total = LoadSummary::default();
        total += LoadSummary {
            succeeded: 3,
            failed: 1,
        };
        total += LoadSummary {
            succeeded: 2,
            failed: 0,
        };
        assert_eq!(total.succeeded, 5);
        assert_eq!(total.failed, 1);
        assert_eq!(total.total(), 6);
    }

    #[test]
    fn test_default_batch_size() {
        assert_eq!(Loader::new().batch_size(), 50);
    }
}
