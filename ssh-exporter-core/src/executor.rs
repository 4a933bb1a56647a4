/*!
Per-host execution: one runner call folded into a `HostResult`.
*/

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::{HostCredential, HostResult, Outcome};
use crate::error::RemoteError;
use crate::matcher::Matcher;
use crate::runner::RemoteRunner;

/// Runs `command` on `target` and always returns a result.
///
/// The runner call is cancelled once `timeout` elapses. Output is only
/// available for successful runs; a non-zero exit keeps its code but reports
/// empty output, which is what scrapers of this exporter have always seen.
pub async fn execute(
    runner: &dyn RemoteRunner,
    target: &HostCredential,
    command: &str,
    matcher: &Matcher,
    timeout: Duration,
) -> HostResult {
    let started = Instant::now();
    debug!(host = %target.host, port = %target.port, user = %target.user, "executing");

    let outcome = match tokio::time::timeout(timeout, runner.run(target, command)).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(timeout)),
    };

    let result = match outcome {
        Ok(raw) => {
            let output = escape_newlines(&raw);
            let matched = matcher.is_match(&output);
            HostResult {
                output,
                exit_status: 0,
                error_text: String::new(),
                matched,
                outcome: Outcome::Success,
            }
        }
        Err(err @ RemoteError::Exited { .. }) => {
            warn!(host = %target.host, error = %err, "remote command failed");
            HostResult {
                output: String::new(),
                exit_status: err.exit_status(),
                error_text: err.to_string(),
                matched: matcher.is_match(""),
                outcome: Outcome::NonZeroExit,
            }
        }
        Err(err) => {
            warn!(host = %target.host, port = %target.port, error = %err, "remote execution failed");
            HostResult::unreachable(&err)
        }
    };

    debug!(
        host = %target.host,
        exit_status = result.exit_status,
        matched = result.matched,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "execution finished"
    );
    result
}

/// Escapes newlines so the output fits on one line of the exposition document.
pub fn escape_newlines(input: &str) -> String {
    input.replace('\n', "\\n")
}
