use crate::{server::SharedState, session::SessionView};
use axum::{extract::State, Json};
use tracing::instrument;

#[instrument(skip(state))]
pub async fn clear(State(state): State<SharedState>) -> Json<SessionView> {
    state.metrics.record_request("/clear");

    let mut session = state.session.lock().await;
    session.clear();
    Json(session.view())
}
