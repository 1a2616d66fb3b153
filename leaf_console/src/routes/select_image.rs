use crate::{
    server::SharedState,
    session::{RenderError, SelectImageError, SelectedImage, SessionView},
};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::instrument;

const UPLOAD_NAME: &str = "upload";

impl IntoResponse for SelectImageError {
    fn into_response(self) -> Response {
        let status = match self {
            SelectImageError::Read(_) => StatusCode::NOT_FOUND,
            SelectImageError::UnsupportedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            SelectImageError::Decode(_) => StatusCode::BAD_REQUEST,
        };
        (status, format!("Could not select image: {}", self)).into_response()
    }
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        match self {
            RenderError::NothingSelected => (StatusCode::NOT_FOUND, self.to_string()),
            RenderError::Encode(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Something went wrong: {}", self),
            ),
        }
        .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectPath {
    pub path: PathBuf,
}

/// Selects the uploaded body. An empty body is a cancelled dialog.
#[instrument(skip(state, image_data))]
pub async fn select_image(
    State(state): State<SharedState>,
    image_data: Bytes,
) -> Result<Json<SessionView>, SelectImageError> {
    state.metrics.record_request("/image");

    if image_data.is_empty() {
        return Ok(Json(state.session.lock().await.view()));
    }

    let selected = SelectedImage::from_bytes(UPLOAD_NAME, image_data.to_vec())?;
    let mut session = state.session.lock().await;
    session.select(selected);
    Ok(Json(session.view()))
}

#[instrument(skip(state))]
pub async fn select_image_path(
    State(state): State<SharedState>,
    Json(request): Json<SelectPath>,
) -> Result<Json<SessionView>, SelectImageError> {
    state.metrics.record_request("/image/path");

    if request.path.as_os_str().is_empty() {
        return Ok(Json(state.session.lock().await.view()));
    }

    let selected = SelectedImage::from_path(&request.path)?;
    tracing::debug!("Selected {}", selected.name);
    let mut session = state.session.lock().await;
    session.select(selected);
    Ok(Json(session.view()))
}

pub async fn image_thumbnail(State(state): State<SharedState>) -> Result<Response, RenderError> {
    render_selected(&state, state.display.thumbnail_size).await
}

pub async fn image_preview(State(state): State<SharedState>) -> Result<Response, RenderError> {
    render_selected(&state, state.display.preview_size).await
}

async fn render_selected(state: &SharedState, size: u32) -> Result<Response, RenderError> {
    let session = state.session.lock().await;
    let selected = session.selected().ok_or(RenderError::NothingSelected)?;
    let png = selected.render_png(size)?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}
