use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};

use super::{parse_id, password_proof, SnapshotResponse};
use crate::gateway::GatewayError;
use crate::ServiceState;

pub const SNAPSHOT_EVENT: &str = "snapshot";
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Server-sent full-state snapshots. The first event is the current state.
///
/// The stream, and with it the subscription, is dropped when the client
/// disconnects.
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, GatewayError> {
    let id = parse_id(&id)?;
    let snapshots = state
        .gateway()
        .watch(&id, password_proof(&headers).as_ref())
        .await?;
    tracing::debug!(object_id = %id, "event stream opened");

    let events = snapshots.map(|snapshot| {
        Event::default()
            .event(SNAPSHOT_EVENT)
            .json_data(SnapshotResponse::new(snapshot, false))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}
