use axum::response::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Health {
    status: String,
    service: String,
}

pub async fn healthcheck() -> Json<Health> {
    Json(Health {
        status: "Available".into(),
        service: env!("CARGO_PKG_NAME").into(),
    })
}
