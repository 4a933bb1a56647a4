/*!
Remote command execution over SSH

`RemoteRunner` is the only seam between the engine and the transport: run
one command on one host and hand back its combined output. `SshRunner`
implements it with the system OpenSSH client (`ssh`), one process per
execution, so that authentication, multiplexing and cipher negotiation stay
the client's business.

The child is spawned with `kill_on_drop`, which makes dropping the returned
future (timeout, aborted task) tear down the connection and the remote
session with it.
*/

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

use crate::config::HostCredential;
use crate::error::RemoteError;

/// Exit code the OpenSSH client uses for its own failures.
const SSH_CLIENT_FAILURE: i32 = 255;

#[async_trait]
pub trait RemoteRunner: Send + Sync {
    /// Runs `command` on `target`, returning stdout and stderr combined.
    async fn run(&self, target: &HostCredential, command: &str) -> Result<String, RemoteError>;
}

#[derive(Debug, Clone)]
pub struct SshOptions {
    /// Path or name of the OpenSSH client binary.
    pub binary: PathBuf,
    pub connect_timeout: Duration,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ssh"),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SshRunner {
    options: SshOptions,
}

impl SshRunner {
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    /// Builds the client invocation. Host keys are not verified and only the
    /// configured key is offered; `BatchMode` turns any prompt (passphrase,
    /// password) into a failure.
    pub fn build_command(&self, target: &HostCredential, command: &str) -> Command {
        let connect_timeout = self.options.connect_timeout.as_secs().max(1);

        let mut cmd = Command::new(&self.options.binary);
        cmd.arg("-o").arg("BatchMode=yes")
            .arg("-o").arg("StrictHostKeyChecking=no")
            .arg("-o").arg("UserKnownHostsFile=/dev/null")
            .arg("-o").arg("IdentitiesOnly=yes")
            .arg("-o").arg("LogLevel=ERROR")
            .arg("-o").arg(format!("ConnectTimeout={connect_timeout}"))
            .arg("-p").arg(&target.port)
            .arg("-i").arg(&target.key_path);
        if !target.user.is_empty() {
            cmd.arg("-l").arg(&target.user);
        }
        cmd.arg("--").arg(&target.host).arg(command);

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl RemoteRunner for SshRunner {
    async fn run(&self, target: &HostCredential, command: &str) -> Result<String, RemoteError> {
        check_key_file(target).await?;

        debug!(host = %target.host, port = %target.port, user = %target.user, "spawning ssh client");
        let output = self.build_command(target, command).output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        match output.status.code() {
            Some(0) => Ok(format!("{stdout}{stderr}")),
            Some(SSH_CLIENT_FAILURE) => Err(classify_client_failure(target, stderr.trim())),
            Some(code) => Err(RemoteError::Exited { code }),
            None => Err(RemoteError::Terminated),
        }
    }
}

/// The client would fail later with a bare exit 255 on an unreadable key.
async fn check_key_file(target: &HostCredential) -> Result<(), RemoteError> {
    let key_error = |source: std::io::Error| RemoteError::KeyFile { path: target.key_path.clone(), source };

    let file = fs::File::open(&target.key_path).await.map_err(key_error)?;
    let metadata = file.metadata().await.map_err(key_error)?;
    if !metadata.is_file() {
        return Err(key_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    Ok(())
}

/// Maps an exit status of 255 to a connection or authentication error.
///
/// A remote command that itself exits with 255 is indistinguishable from a
/// client failure and lands here too.
fn classify_client_failure(target: &HostCredential, stderr: &str) -> RemoteError {
    let target_name = format!("{}:{}", target.host, target.port);
    let detail = if stderr.is_empty() {
        format!("ssh exited with status {SSH_CLIENT_FAILURE}")
    } else {
        stderr.to_string()
    };

    if stderr.contains("Permission denied") || stderr.contains("Load key") {
        RemoteError::Auth { target: target_name, detail }
    } else {
        RemoteError::Connection { target: target_name, detail }
    }
}
