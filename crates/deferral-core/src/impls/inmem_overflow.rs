//! InMemoryOverflowStore - 開発・テスト用の overflow 退避先
//!
//! # 実装詳細
//! - HashMap<OverflowId, OverflowRecord> を RwLock で保護
//! - ロックを保持したまま await しない
//! - `set_available(false)` で障害を模擬できる

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::OverflowId;
use crate::ports::{Clock, IdGenerator, OverflowRecord, OverflowStore, StoreError};

/// Call counters, for observing side effects in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub puts: usize,
    pub gets: usize,
    pub deletes: usize,
}

pub struct InMemoryOverflowStore {
    records: RwLock<HashMap<OverflowId, OverflowRecord>>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    available: AtomicBool,
    puts: AtomicUsize,
    gets: AtomicUsize,
    deletes: AtomicUsize,
}

impl InMemoryOverflowStore {
    pub fn new(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            ids,
            clock,
            available: AtomicBool::new(true),
            puts: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            puts: self.puts.load(Ordering::SeqCst),
            gets: self.gets.load(Ordering::SeqCst),
            deletes: self.deletes.load(Ordering::SeqCst),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: OverflowId) -> bool {
        self.records
            .read()
            .map(|r| r.contains_key(&id))
            .unwrap_or(false)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store switched off".into()))
        }
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("overflow store lock poisoned".into())
}

#[async_trait]
impl OverflowStore for InMemoryOverflowStore {
    async fn put(&self, payload: Vec<u8>) -> Result<OverflowId, StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let record = OverflowRecord {
            id: self.ids.generate_overflow_id(),
            payload,
            created_at: self.clock.now(),
        };
        let id = record.id;
        self.records.write().map_err(poisoned)?.insert(id, record);
        Ok(id)
    }

    async fn get(&self, id: OverflowId) -> Result<Vec<u8>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let records = self.records.read().map_err(poisoned)?;
        records
            .get(&id)
            .map(|r| r.payload.clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: OverflowId) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        self.records.write().map_err(poisoned)?.remove(&id);
        Ok(())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        self.check_available()?;

        let mut records = self.records.write().map_err(poisoned)?;
        let before = records.len();
        records.retain(|_, r| r.created_at >= cutoff);
        Ok(before - records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock, UlidGenerator};
    use chrono::{Duration, TimeZone};

    fn store_with_clock(clock: Arc<FixedClock>) -> InMemoryOverflowStore {
        InMemoryOverflowStore::new(Arc::new(UlidGenerator::new(clock.clone())), clock)
    }

    fn store() -> InMemoryOverflowStore {
        InMemoryOverflowStore::new(Arc::new(UlidGenerator::new(SystemClock)), Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn put_get_delete() {
        let store = store();
        let id = store.put(b"payload".to_vec()).await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), b"payload".to_vec());

        store.delete(id).await.unwrap();
        assert_eq!(store.get(id).await.unwrap_err(), StoreError::NotFound(id));
        assert_eq!(store.stats(), StoreStats { puts: 1, gets: 2, deletes: 1 });
    }

    #[tokio::test]
    async fn handles_are_unique() {
        let store = store();
        let a = store.put(b"same".to_vec()).await.unwrap();
        let b = store.put(b"same".to_vec()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = store();
        let id = store.put(b"x".to_vec()).await.unwrap();
        store.delete(id).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = store();
        let id = store.put(b"x".to_vec()).await.unwrap();
        store.set_available(false);

        assert!(matches!(store.put(b"y".to_vec()).await, Err(StoreError::Unavailable(_))));
        assert!(matches!(store.get(id).await, Err(StoreError::Unavailable(_))));
        assert!(matches!(store.delete(id).await, Err(StoreError::Unavailable(_))));
        assert!(store.contains(id));
    }

    #[tokio::test]
    async fn purge_before_drops_only_old_records() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start));
        let store = store_with_clock(clock.clone());

        let old = store.put(b"old".to_vec()).await.unwrap();
        clock.advance(Duration::hours(2));
        let fresh = store.put(b"fresh".to_vec()).await.unwrap();

        let purged = store.purge_before(start + Duration::hours(1)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(!store.contains(old));
        assert!(store.contains(fresh));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn get_racing_delete_is_whole_or_not_found() {
        let store = Arc::new(store());
        let payload = vec![7u8; 64 * 1024];

        for _ in 0..50 {
            let id = store.put(payload.clone()).await.unwrap();
            let reader = tokio::spawn({
                let store = store.clone();
                async move { store.get(id).await }
            });
            let deleter = tokio::spawn({
                let store = store.clone();
                async move { store.delete(id).await }
            });
            let (read, deleted) = tokio::join!(reader, deleter);

            deleted.unwrap().unwrap();
            match read.unwrap() {
                Ok(bytes) => assert_eq!(bytes, payload),
                Err(err) => assert_eq!(err, StoreError::NotFound(id)),
            }
            assert!(!store.contains(id));
        }
    }
}
