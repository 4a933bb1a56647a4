use std::path::PathBuf;
use std::time::Duration;

/// Errors raised while reading the configuration document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A name filter or a per-script match pattern that is not a valid regex.
#[derive(Debug, thiserror::Error)]
#[error("invalid pattern `{pattern}`: {source}")]
pub struct InvalidPattern {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Failures of a single remote execution.
///
/// None of these ever leave the per-host executor: they are recorded in the
/// host's result slot.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("failed to read key file {}: {source}", path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start ssh client: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("connection to {target} failed: {detail}")]
    Connection { target: String, detail: String },
    #[error("authentication to {target} failed: {detail}")]
    Auth { target: String, detail: String },
    #[error("Process exited with status {code}")]
    Exited { code: i32 },
    #[error("ssh client terminated by signal")]
    Terminated,
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl RemoteError {
    /// Exit status reported for this failure; `-1` unless the remote process
    /// itself exited with a code.
    pub fn exit_status(&self) -> i32 {
        match self {
            RemoteError::Exited { code } => *code,
            _ => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_extraction() {
        assert_eq!(RemoteError::Exited { code: 3 }.exit_status(), 3);
        assert_eq!(RemoteError::Terminated.exit_status(), -1);
        assert_eq!(
            RemoteError::Connection { target: "h:22".into(), detail: "refused".into() }.exit_status(),
            -1
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            RemoteError::Exited { code: 2 }.to_string(),
            "Process exited with status 2"
        );
        assert_eq!(
            RemoteError::Timeout(Duration::from_secs(5)).to_string(),
            "timed out after 5s"
        );
    }
}
