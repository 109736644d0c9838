use axum::Router;

pub mod objects;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/objects", objects::router(state.clone()))
        .with_state(state)
}
