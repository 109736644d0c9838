use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use common::store::RecordStore;

use crate::gateway::Gateway;

/// Purge expired objects every `period` until shutdown.
///
/// Expired objects already read as not found; the sweep reclaims their rows
/// and closes any event streams still open on them.
pub async fn run<S: RecordStore>(
    gateway: Gateway<S>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick fires immediately
    ticker.tick().await;

    tracing::info!(period_secs = period.as_secs(), "expiry sweeper started");
    loop {
        tokio::select! {
            _ = ticker.tick() => sweep(&gateway).await,
            _ = shutdown_rx.changed() => break,
        }
    }
    tracing::info!("expiry sweeper stopped");
}

async fn sweep<S: RecordStore>(gateway: &Gateway<S>) {
    match gateway.purge_expired().await {
        Ok(purged) if purged.is_empty() => {}
        Ok(purged) => tracing::info!(count = purged.len(), "purged expired objects"),
        Err(e) => tracing::error!(error = %e, "expiry sweep failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::clock::ManualClock;
    use common::model::{Lifetime, ObjectKind};
    use common::store::MemoryRecordStore;

    use super::*;
    use crate::distributor::ChangeDistributor;
    use crate::gateway::{CreateObject, DEFAULT_MAX_BLOB_BYTES};

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_and_stops() {
        let clock = ManualClock::default();
        let store = MemoryRecordStore::with_clock(Arc::new(clock.clone()));
        let gateway = Gateway::new(store, ChangeDistributor::default(), DEFAULT_MAX_BLOB_BYTES);

        let id = gateway
            .create(CreateObject {
                kind: ObjectKind::Group,
                encrypted_structure: b"sealed".to_vec(),
                lifetime_secs: Lifetime::FiveMinutes.as_secs(),
                password_proof: None,
            })
            .await
            .unwrap()
            .record
            .id;
        let mut subscription = gateway.distributor().subscribe(&id);

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let task = tokio::spawn(run(gateway.clone(), Duration::from_secs(60), shutdown_rx));

        clock.advance(Lifetime::FiveMinutes.duration());
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(
            subscription.recv().await,
            crate::distributor::Signal::Changed(crate::distributor::DESTROYED)
        );
        assert!(gateway.purge_expired().await.unwrap().is_empty());

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }
}
