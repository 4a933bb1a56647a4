/*!
HTTP SURFACE - axum router of the exporter

ROLE :
- `GET /`        navigation page
- `GET /probe`   `?pattern=<regex>` selects scripts by name, runs them, returns Prometheus text
- `GET /metrics` the exporter's own telemetry

OPERATION : every probe loads the configuration file again, so edits apply
on the next scrape without a restart, and no request ever sees another
one's results.
*/

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use ssh_exporter_core::{render, BatchDispatcher, Config, ConfigError, InvalidPattern, Matcher};

use crate::telemetry::{self, Telemetry};

pub const PATTERN_HELP: &str = "<p>Please include a valid <code>?pattern=[regex]</code>
query parameter in your URL. This should match the <bold>name</bold> of the
scripts you want to run (e.g., <code>?pattern=.*logs</code> matches
<code>chef_logs</code> and not <code>proc_status</code>)</p>.";

const INDEX: &str = "<h1>ssh exporter</h1>
<p><a href='/probe'>probe</a></p>
<p><a href='/metrics'>metrics</a></p>";

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    pub config_path: Arc<PathBuf>,
    pub dispatcher: Arc<BatchDispatcher>,
    pub telemetry: Telemetry,
}

#[derive(Debug, Deserialize)]
struct ProbeParams {
    pattern: Option<String>,
}

/// Reasons a probe request ends without running anything.
#[derive(Debug, thiserror::Error)]
enum ProbeError {
    #[error("probe endpoint was hit without a pattern parameter")]
    NoPattern,
    #[error(transparent)]
    InvalidPattern(#[from] InvalidPattern),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ProbeError {
    fn telemetry_label(&self) -> &'static str {
        match self {
            ProbeError::NoPattern => telemetry::PROBE_NO_PATTERN,
            ProbeError::InvalidPattern(_) => telemetry::PROBE_INVALID_PATTERN,
            ProbeError::Config(_) => telemetry::PROBE_CONFIG_ERROR,
        }
    }
}

impl IntoResponse for ProbeError {
    fn into_response(self) -> Response {
        match self {
            ProbeError::NoPattern => (StatusCode::OK, Html(PATTERN_HELP.to_string())).into_response(),
            ProbeError::InvalidPattern(err) => (
                StatusCode::BAD_REQUEST,
                Html(format!("<p>{}</p>\n{PATTERN_HELP}", escape_html(&err.to_string()))),
            )
                .into_response(),
            ProbeError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration unavailable, see exporter logs\n",
            )
                .into_response(),
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/probe", get(probe))
        .route("/metrics", get(metrics))
        .with_state(app_state)
}

// GET /
async fn index() -> Html<&'static str> {
    Html(INDEX)
}

// GET /probe?pattern=<regex>
async fn probe(State(app): State<AppState>, Query(params): Query<ProbeParams>) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("probe", %request_id);

    async move {
        let started = Instant::now();
        match run_probe(&app, params.pattern.as_deref()).await {
            Ok(config) => {
                let body = render(&config);
                app.telemetry.record_batch(&config, started.elapsed());
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    bytes = body.len(),
                    "probe served"
                );
                ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body).into_response()
            }
            Err(err) => {
                match &err {
                    ProbeError::Config(e) => error!(error = %e, "failed to load configuration"),
                    other => warn!(error = %other, "probe rejected"),
                }
                app.telemetry.record_probe(err.telemetry_label());
                err.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn run_probe(app: &AppState, pattern: Option<&str>) -> Result<Config, ProbeError> {
    let pattern = pattern.filter(|p| !p.is_empty()).ok_or(ProbeError::NoPattern)?;
    let name_filter = Matcher::compile(pattern)?;
    let config = Config::load(app.config_path.as_path()).await?;
    Ok(app.dispatcher.run(config, &name_filter).await)
}

// GET /metrics
async fn metrics(State(app): State<AppState>) -> Response {
    match app.telemetry.render() {
        Ok(body) => ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode telemetry");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
