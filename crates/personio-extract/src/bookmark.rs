//! Replication-key bookmark tracking for incremental reads.
//!
//! `BookmarkTracker` decides when a stream's bookmark moves. With sorted data
//! every record's key value is a safe resume point, so it is returned after
//! each record. With unsorted data only the maximum over the whole stream is
//! safe, so it is held back until [`BookmarkTracker::finish`].

use std::cmp::Ordering;

use serde_json::Value;
use tracing::warn;

/// Whether records arrive ordered ascending on the replication key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkOrdering {
    Sorted,
    Unsorted,
}

impl BookmarkOrdering {
    #[must_use]
    pub fn from_sorted(sorted: bool) -> Self {
        if sorted {
            Self::Sorted
        } else {
            Self::Unsorted
        }
    }
}

/// Tracks the bookmark of one stream during one sync.
#[derive(Debug)]
pub struct BookmarkTracker {
    stream: String,
    replication_key: Option<String>,
    ordering: BookmarkOrdering,
    prior: Option<Value>,
    max_seen: Option<Value>,
}

impl BookmarkTracker {
    /// Create a tracker. Without a replication key the tracker is inert.
    pub fn new(
        stream: impl Into<String>,
        replication_key: Option<String>,
        ordering: BookmarkOrdering,
        prior: Option<Value>,
    ) -> Self {
        Self {
            stream: stream.into(),
            replication_key,
            ordering,
            prior,
            max_seen: None,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.replication_key.is_some()
    }

    #[must_use]
    pub fn replication_key(&self) -> Option<&str> {
        self.replication_key.as_deref()
    }

    /// Bookmark left by the previous run.
    #[must_use]
    pub fn prior(&self) -> Option<&Value> {
        self.prior.as_ref()
    }

    /// Record one emitted record. Returns the bookmark to persist now, if any.
    pub fn observe(&mut self, record: &Value) -> Option<Value> {
        let key = self.replication_key.as_deref()?;
        let value = match lookup(record, key) {
            Some(v) if !v.is_null() => v,
            _ => {
                warn!(stream = %self.stream, replication_key = %key, "Record has no replication key value");
                return None;
            }
        };

        match self.ordering {
            BookmarkOrdering::Sorted => Some(value.clone()),
            BookmarkOrdering::Unsorted => {
                let replace = match &self.max_seen {
                    None => true,
                    Some(current) => match compare_values(value, current) {
                        Some(ord) => ord == Ordering::Greater,
                        None => {
                            warn!(
                                stream = %self.stream,
                                value = %value,
                                current = %current,
                                "Incomparable replication key values, keeping current maximum"
                            );
                            false
                        }
                    },
                };
                if replace {
                    self.max_seen = Some(value.clone());
                }
                None
            }
        }
    }

    /// Consume the tracker, returning the deferred maximum for unsorted streams.
    pub fn finish(self) -> Option<Value> {
        match self.ordering {
            BookmarkOrdering::Sorted => None,
            BookmarkOrdering::Unsorted => self.max_seen,
        }
    }
}

/// Resolves a replication key; dotted keys walk into nested objects.
fn lookup<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    if let Some(v) = record.get(key) {
        return Some(v);
    }
    key.split('.').try_fold(record, |v, part| v.get(part))
}

/// Numbers compare numerically, strings lexicographically, anything else is incomparable.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
