//! OverflowSweeper - 取り残された overflow レコードの回収
//!
//! クリーンアップに失敗したレコードや、キューが最終的に諦めたタスクの
//! レコードは誰も削除しません。一定時間より古いものをまとめて消します。
//!
//! `max_age` はキューの最大再試行期間より長くしてください。
//! 再配送待ちのレコードを消すと、そのタスクは NotFound で失敗します。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::domain::DeferError;
use crate::ports::{Clock, OverflowStore};

pub struct OverflowSweeper {
    store: Arc<dyn OverflowStore>,
    clock: Arc<dyn Clock>,
    max_age: Duration,
}

impl OverflowSweeper {
    pub fn new(store: Arc<dyn OverflowStore>, clock: Arc<dyn Clock>, max_age: Duration) -> Self {
        Self {
            store,
            clock,
            max_age,
        }
    }

    /// Deletes every record older than `max_age`; returns how many.
    pub async fn sweep_once(&self) -> Result<usize, DeferError> {
        let age = chrono::Duration::from_std(self.max_age)
            .map_err(|e| DeferError::configuration(format!("sweep max_age out of range: {e}")))?;
        let cutoff = self.clock.now() - age;
        let purged = self.store.purge_before(cutoff).await?;
        if purged > 0 {
            tracing::info!(purged, %cutoff, "swept stale overflow records");
        }
        Ok(purged)
    }

    /// Sweeps every `interval` until `shutdown` flips to true.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(error) = self.sweep_once().await {
                        tracing::warn!(%error, "overflow sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("overflow sweeper stopping");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::impls::InMemoryOverflowStore;
    use crate::ports::{FixedClock, IdGenerator, UlidGenerator};
    use chrono::{TimeZone, Utc};

    fn setup() -> (Arc<FixedClock>, Arc<InMemoryOverflowStore>, OverflowSweeper) {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(clock.clone()));
        let store = Arc::new(InMemoryOverflowStore::new(ids, clock.clone()));
        let sweeper = OverflowSweeper::new(store.clone(), clock.clone(), Duration::from_secs(3600));
        (clock, store, sweeper)
    }

    #[tokio::test]
    async fn sweeps_only_records_older_than_max_age() {
        let (clock, store, sweeper) = setup();
        let old = store.put(b"old".to_vec()).await.unwrap();
        clock.advance(chrono::Duration::minutes(90));
        let fresh = store.put(b"fresh".to_vec()).await.unwrap();

        assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
        assert!(!store.contains(old));
        assert!(store.contains(fresh));
        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn store_outage_is_transient() {
        let (_clock, store, sweeper) = setup();
        store.set_available(false);
        assert_eq!(sweeper.sweep_once().await.unwrap_err().kind(), ErrorKind::Transient);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (clock, store, sweeper) = setup();
        store.put(b"old".to_vec()).await.unwrap();
        clock.advance(chrono::Duration::hours(2));

        let (tx, rx) = watch::channel(false);
        let sweeper = Arc::new(sweeper);
        let task = tokio::spawn({
            let sweeper = sweeper.clone();
            async move { sweeper.run(Duration::from_millis(5), rx).await }
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert!(store.is_empty());
    }
}
