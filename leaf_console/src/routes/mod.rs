mod classify;
mod clear;
mod health;
mod metrics;
mod select_image;
mod session;

pub use classify::classify;
pub use clear::clear;
pub use health::healthcheck;
pub use metrics::metrics_handler;
pub use select_image::{image_preview, image_thumbnail, select_image, select_image_path};
pub use session::session_view;

use crate::server::SharedState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

pub fn api_routes(max_upload_bytes: usize) -> Router<SharedState> {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/metrics", get(metrics_handler))
        .route("/session", get(session_view))
        .route(
            "/image",
            post(select_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/image/path", post(select_image_path))
        .route("/image/thumbnail", get(image_thumbnail))
        .route("/image/preview", get(image_preview))
        .route("/classify", post(classify))
        .route("/clear", post(clear))
}
