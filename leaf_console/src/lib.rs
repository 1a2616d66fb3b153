mod prediction;
mod routes;
mod server;
mod session;
mod telemetry;
mod verdict;

pub mod app;
pub mod config;

pub use app::start_app;
