use crate::{server::SharedState, session::SessionView};
use axum::{extract::State, Json};

pub async fn session_view(State(state): State<SharedState>) -> Json<SessionView> {
    Json(state.session.lock().await.view())
}
