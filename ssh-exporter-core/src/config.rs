/*!
Configuration document and its per-request normalization.

```yaml
version: v0
scripts:
  - name: echo_output
    script: echo "hi"
    timeout: 5s
    pattern: ".*hi"
    credentials:
      - host: 10.0.0.5
        port: "2222"
        user: probe
        keyfile: /etc/ssh_exporter/id_rsa
```

Besides the user supplied keys, scripts and credentials carry runtime
fields (`parsed_timeout`, `selected`, `result`) that are never read from or
written to the document.
*/

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::warn;

use crate::error::{ConfigError, RemoteError};

/// Fallback when a script's `timeout` is missing, zero or unparsable.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// SSH port used when a credential omits `port`.
pub const DEFAULT_PORT: &str = "22";
/// The only document version this exporter knows.
pub const CONFIG_VERSION: &str = "v0";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub scripts: Vec<ScriptSpec>,
}

/// A named script and the hosts it runs on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSpec {
    /// Metric identifier and target of the `/probe?pattern=` filter.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "script", default)]
    pub command: String,
    #[serde(rename = "timeout", default)]
    pub timeout_spec: String,
    #[serde(rename = "pattern", default)]
    pub match_pattern: String,
    #[serde(rename = "credentials", default)]
    pub targets: Vec<HostCredential>,
    #[serde(skip, default = "default_timeout")]
    pub parsed_timeout: Duration,
    #[serde(skip)]
    pub selected: bool,
}

/// One execution target. `result` is the slot the per-host task owns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostCredential {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub user: String,
    #[serde(rename = "keyfile", default)]
    pub key_path: PathBuf,
    #[serde(skip)]
    pub result: HostResult,
}

/// How a host execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    Pending,
    Success,
    NonZeroExit,
    ConnectionFailed,
    TimedOut,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Success => "success",
            Outcome::NonZeroExit => "non_zero_exit",
            Outcome::ConnectionFailed => "connection_failed",
            Outcome::TimedOut => "timed_out",
        }
    }
}

/// Result of running a script on one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResult {
    /// Combined output with newlines escaped as `\n`.
    pub output: String,
    /// `0` on success, the remote exit code, or `-1` when unknown.
    pub exit_status: i32,
    /// Empty when the execution succeeded.
    pub error_text: String,
    pub matched: bool,
    pub outcome: Outcome,
}

impl Default for HostResult {
    fn default() -> Self {
        Self::pending()
    }
}

impl HostResult {
    /// Placeholder written into a slot before its task runs.
    pub fn pending() -> Self {
        Self {
            output: String::new(),
            exit_status: -1,
            error_text: String::new(),
            matched: false,
            outcome: Outcome::Pending,
        }
    }

    /// Result for a host where no output could be captured at all.
    pub fn unreachable(err: &RemoteError) -> Self {
        let outcome = match err {
            RemoteError::Timeout(_) => Outcome::TimedOut,
            _ => Outcome::ConnectionFailed,
        };
        Self {
            output: String::new(),
            exit_status: -1,
            error_text: err.to_string(),
            matched: false,
            outcome,
        }
    }
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl Config {
    /// Reads and normalizes the document at `path`.
    ///
    /// An unreadable file is an error. A malformed document is logged and
    /// replaced by an empty configuration so the request still completes.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let txt = fs::read_to_string(path).await.map_err(|source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::parse(&txt).unwrap_or_else(|e| {
            let err = ConfigError::Parse { path: path.to_path_buf(), source: e };
            warn!(error = %err, "config invalid, using empty configuration");
            Config::default()
        });
        config.normalize();
        Ok(config)
    }

    /// Parses a document without normalizing it. Blank text yields an empty config.
    pub fn parse(txt: &str) -> Result<Self, serde_yaml::Error> {
        if txt.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(txt)
    }

    /// Applies defaults and resets every runtime field.
    ///
    /// Never fails: suspicious values are logged and replaced.
    pub fn normalize(&mut self) {
        if !self.version.is_empty() && self.version != CONFIG_VERSION {
            warn!(version = %self.version, "unknown config version, reading it as {CONFIG_VERSION}");
        }

        let mut seen = HashSet::new();
        for script in &mut self.scripts {
            if !seen.insert(script.name.clone()) {
                warn!(script = %script.name, "duplicate script name, metrics will collide");
            }
            if script.command.trim().is_empty() {
                warn!(script = %script.name, "script has no `script` to run");
            }
            if !is_metric_fragment(&script.name) {
                warn!(script = %script.name, "script name is not a valid metric name fragment");
            }

            script.parsed_timeout = match parse_timeout(&script.timeout_spec) {
                Ok(timeout) => timeout,
                Err(reason) => {
                    warn!(
                        script = %script.name,
                        timeout = %script.timeout_spec,
                        reason = %reason,
                        "failed to parse `timeout`, defaulting to {:?}",
                        DEFAULT_TIMEOUT
                    );
                    DEFAULT_TIMEOUT
                }
            };
            script.selected = false;

            for target in &mut script.targets {
                if target.host.trim().is_empty() {
                    warn!(script = %script.name, "credential without `host`");
                }
                if target.port.trim().is_empty() {
                    target.port = DEFAULT_PORT.to_string();
                }
                target.result = HostResult::pending();
            }
        }
    }

    /// Scripts marked by the last name filter, in configuration order.
    pub fn selected_scripts(&self) -> impl Iterator<Item = &ScriptSpec> {
        self.scripts.iter().filter(|s| s.selected)
    }
}

/// Parses a human readable duration ("5s", "1m30s", "250ms").
pub fn parse_timeout(spec: &str) -> Result<Duration, String> {
    let timeout = humantime::parse_duration(spec.trim()).map_err(|e| e.to_string())?;
    if timeout.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(timeout)
}

fn is_metric_fragment(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
