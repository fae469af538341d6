use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Result of a previously completed broadcast, kept for the dedup window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DedupEntry {
    pub recipient_count: usize,
    pub seen_at: DateTime<Utc>,
}

/// Outcome of a dedup lookup-or-record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recorded {
    /// The initializer ran and its result was stored.
    Fresh(DedupEntry),
    /// The message id was already known; the initializer did not run.
    Duplicate(DedupEntry),
}

impl Recorded {
    pub fn entry(&self) -> &DedupEntry {
        match self {
            Recorded::Fresh(entry) | Recorded::Duplicate(entry) => entry,
        }
    }

    pub fn recipient_count(&self) -> usize {
        self.entry().recipient_count
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Recorded::Duplicate(_))
    }
}

/// Time-windowed record of message ids that were already broadcast.
///
/// Entries expire `window` after insertion and the cache never holds more
/// than `max_entries`; eviction is handled by moka's background maintenance.
#[derive(Clone)]
pub struct DedupCache {
    cache: Cache<String, DedupEntry>,
}

impl DedupCache {
    pub fn new(window: Duration, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(window)
            .build();
        info!("Dedup cache initialized (window {:?}, capacity {})", window, max_entries);
        Self { cache }
    }

    #[cfg(test)]
    pub async fn lookup(&self, message_id: &str) -> Option<DedupEntry> {
        self.cache.get(message_id).await
    }

    /// Return the stored entry for `message_id`, or run `init` and store its
    /// recipient count.
    ///
    /// Concurrent callers for the same id are coalesced: exactly one `init`
    /// runs and the others wait for its result. A failed `init` is not stored,
    /// so a later retry runs again.
    pub async fn get_or_try_record<F, E>(&self, message_id: &str, init: F) -> Result<Recorded, Arc<E>>
    where
        F: Future<Output = Result<usize, E>>,
        E: Send + Sync + 'static,
    {
        let entry = self
            .cache
            .entry(message_id.to_string())
            .or_try_insert_with(async move {
                let recipient_count = init.await?;
                Ok(DedupEntry { recipient_count, seen_at: Utc::now() })
            })
            .await?;

        Ok(if entry.is_fresh() {
            Recorded::Fresh(entry.into_value())
        } else {
            Recorded::Duplicate(entry.into_value())
        })
    }

    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}
