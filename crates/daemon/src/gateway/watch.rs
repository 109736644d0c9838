use futures::stream::{self, BoxStream, StreamExt};

use common::model::Snapshot;
use common::store::{RecordStore, StoreError};

use crate::distributor::{Signal, Subscription};

/// Full-state snapshots of one object, in acceptance order.
///
/// Ends when the object is deleted, expires, or is consumed. Dropping the
/// stream drops its subscription.
pub type SnapshotStream = BoxStream<'static, Snapshot>;

struct WatchState<S> {
    store: S,
    subscription: Subscription,
    pending: Option<Snapshot>,
    last_version: u64,
}

pub(super) fn snapshot_stream<S: RecordStore>(
    store: S,
    subscription: Subscription,
    initial: Snapshot,
) -> SnapshotStream {
    let state = WatchState {
        store,
        subscription,
        pending: Some(initial),
        last_version: 0,
    };

    stream::unfold(state, |mut state| async move {
        if let Some(snapshot) = state.pending.take() {
            state.last_version = snapshot.version();
            return Some((snapshot, state));
        }

        loop {
            match state.subscription.recv().await {
                // already covered by something we emitted
                Signal::Changed(version) if version <= state.last_version => continue,
                Signal::Changed(_) | Signal::Lagged => {}
                Signal::Closed => return None,
            }

            let id = state.subscription.object_id().clone();
            match state.store.snapshot(&id).await {
                Ok(snapshot) if snapshot.version() > state.last_version => {
                    state.last_version = snapshot.version();
                    return Some((snapshot, state));
                }
                Ok(_) => continue,
                Err(StoreError::NotFound) => {
                    tracing::debug!(object_id = %id, "watched object is gone, closing stream");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(object_id = %id, error = %e, "failed to refetch watched object");
                    return None;
                }
            }
        }
    })
    .boxed()
}
