/*!
SSH_EXPORTER SERVICE - HTTP surface, flags and self telemetry around the core engine

ARCHITECTURE : `cli` (flags) + `http` (router, probe handler) + `telemetry` (own /metrics registry).
*/

pub mod cli;
pub mod http;
pub mod telemetry;

pub use cli::Cli;
pub use http::{build_router, AppState};
pub use telemetry::Telemetry;
