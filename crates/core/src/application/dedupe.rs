// Deduper - expiring fingerprint membership scoped to one adapter

use crate::error::{AppError, Result};
use crate::port::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default marker lifetime (24h)
pub const DEFAULT_DEDUPE_TTL_SECONDS: u64 = 60 * 60 * 24;

const MARKER_VALUE: &str = "1";

/// Store-backed deduper.
///
/// Membership is decided by a single atomic set-if-absent, so two runs of the
/// same adapter racing on one fingerprint admit it exactly once.
pub struct Deduper {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
    ttl: Duration,
}

impl Deduper {
    /// # Errors
    /// `AppError::Config` for a zero TTL: the marker would expire as it is
    /// written and every fingerprint would read as novel.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        namespace: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self> {
        let namespace = namespace.into();
        if ttl.is_zero() {
            return Err(AppError::Config(format!(
                "dedupe TTL for {} must be greater than zero",
                namespace
            )));
        }
        Ok(Self {
            store,
            namespace,
            ttl,
        })
    }

    /// Deduper for `scrape:dedupe:<adapter>`
    pub fn for_adapter(
        store: Arc<dyn KeyValueStore>,
        adapter: &str,
        ttl_seconds: u64,
    ) -> Result<Self> {
        Self::new(
            store,
            format!("scrape:dedupe:{}", adapter),
            Duration::from_secs(ttl_seconds),
        )
    }

    fn key(&self, fingerprint: &str) -> String {
        format!("{}:{}", self.namespace, fingerprint)
    }

    /// `true` if the fingerprint was already seen; otherwise marks it and returns `false`
    pub async fn is_duplicate(&self, fingerprint: &str) -> Result<bool> {
        let added = self
            .store
            .set_if_absent(&self.key(fingerprint), MARKER_VALUE, self.ttl)
            .await?;

        if !added {
            debug!(namespace = %self.namespace, fingerprint = %fingerprint, "Duplicate fingerprint");
        }
        Ok(!added)
    }

    /// Refresh the marker's expiry without changing membership
    pub async fn reset(&self, fingerprint: &str) -> Result<()> {
        self.store.expire(&self.key(fingerprint), self.ttl).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::key_value_store::MockKeyValueStore;
    use crate::testing::{InMemoryStore, ManualClock};
    use chrono::{TimeZone, Utc};

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()))
    }

    #[tokio::test]
    async fn test_first_seen_is_novel_then_duplicate() {
        let store = Arc::new(InMemoryStore::new(clock()));
        let deduper = Deduper::for_adapter(store, "demo-board", 3600).unwrap();

        assert!(!deduper.is_duplicate("a").await.unwrap());
        assert!(deduper.is_duplicate("a").await.unwrap());
        assert!(!deduper.is_duplicate("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_marker_expires_after_ttl() {
        let clock = clock();
        let store = Arc::new(InMemoryStore::new(clock.clone()));
        let deduper = Deduper::for_adapter(store, "demo-board", 100).unwrap();

        assert!(!deduper.is_duplicate("a").await.unwrap());

        clock.advance(chrono::Duration::seconds(99));
        assert!(deduper.is_duplicate("a").await.unwrap());

        clock.advance(chrono::Duration::seconds(2));
        assert!(!deduper.is_duplicate("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_reset_extends_expiry() {
        let clock = clock();
        let store = Arc::new(InMemoryStore::new(clock.clone()));
        let deduper = Deduper::for_adapter(store, "demo-board", 100).unwrap();

        deduper.is_duplicate("a").await.unwrap();
        clock.advance(chrono::Duration::seconds(90));
        deduper.reset("a").await.unwrap();
        clock.advance(chrono::Duration::seconds(90));

        assert!(deduper.is_duplicate("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_reset_absent_does_not_create_marker() {
        let store = Arc::new(InMemoryStore::new(clock()));
        let deduper = Deduper::for_adapter(store, "demo-board", 100).unwrap();

        deduper.reset("ghost").await.unwrap();
        assert!(!deduper.is_duplicate("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_uses_single_atomic_write_with_namespaced_key() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_set_if_absent()
            .withf(|key, value, ttl| {
                key == "scrape:dedupe:demo-board:abc" && value == "1" && *ttl == Duration::from_secs(60)
            })
            .times(1)
            .returning(|_, _, _| Ok(false));
        store.expect_get().never();

        let deduper = Deduper::for_adapter(Arc::new(store), "demo-board", 60).unwrap();
        assert!(deduper.is_duplicate("abc").await.unwrap());
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let mut store = MockKeyValueStore::new();
        store.expect_set_if_absent().never();

        let err = Deduper::for_adapter(Arc::new(store), "demo-board", 0)
            .err()
            .unwrap();

        assert!(err.is_configuration());
    }
}
