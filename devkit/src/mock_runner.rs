/*!
Mock runner for developing without remote hosts

Replies are scripted per host; every call is recorded so tests can assert
which hosts were contacted, with what, and how many calls overlapped.
*/

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ssh_exporter_core::{HostCredential, RemoteError, RemoteRunner};

/// What the mock answers for a host.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Command succeeded with this combined output.
    Output(String),
    /// Remote process exited with this non-zero code.
    Exit(i32),
    /// Connection could not be established.
    Refuse(String),
    /// Authentication was rejected.
    Deny,
    /// Never answers.
    Hang,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub host: String,
    pub port: String,
    pub user: String,
    pub command: String,
}

#[derive(Default)]
struct Inner {
    replies: Mutex<HashMap<String, (MockReply, Duration)>>,
    calls: Mutex<Vec<MockCall>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Scripted `RemoteRunner`. Hosts without a reply echo the command back.
#[derive(Clone, Default)]
pub struct MockRunner {
    inner: Arc<Inner>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, host: &str, reply: MockReply) -> Self {
        self.set_reply(host, reply, Duration::ZERO);
        self
    }

    pub fn with_delayed_reply(self, host: &str, reply: MockReply, delay: Duration) -> Self {
        self.set_reply(host, reply, delay);
        self
    }

    pub fn set_reply(&self, host: &str, reply: MockReply, delay: Duration) {
        self.inner.replies.lock().insert(host.to_string(), (reply, delay));
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.inner.calls.lock().clone()
    }

    pub fn contacted_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.calls().into_iter().map(|c| c.host).collect();
        hosts.sort();
        hosts
    }

    /// Highest number of calls that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.inner.calls.lock().clear();
        self.inner.peak.store(0, Ordering::SeqCst);
    }
}

/// Decrements the in-flight counter even when the call is cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteRunner for MockRunner {
    async fn run(&self, target: &HostCredential, command: &str) -> Result<String, RemoteError> {
        self.inner.calls.lock().push(MockCall {
            host: target.host.clone(),
            port: target.port.clone(),
            user: target.user.clone(),
            command: command.to_string(),
        });

        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.inner.in_flight);

        let scripted = self.inner.replies.lock().get(&target.host).cloned();
        let (reply, delay) = scripted.unwrap_or((MockReply::Output(command.to_string()), Duration::ZERO));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let address = format!("{}:{}", target.host, target.port);
        tracing::debug!(host = %target.host, ?reply, "[mock] run");
        match reply {
            MockReply::Output(out) => Ok(out),
            MockReply::Exit(code) => Err(RemoteError::Exited { code }),
            MockReply::Refuse(detail) => Err(RemoteError::Connection { target: address, detail }),
            MockReply::Deny => Err(RemoteError::Auth {
                target: address,
                detail: "Permission denied (publickey).".into(),
            }),
            MockReply::Hang => std::future::pending().await,
        }
    }
}
