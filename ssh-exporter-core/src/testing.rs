/*!
In-crate stub runner for unit tests.
*/

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::HostCredential;
use crate::error::RemoteError;
use crate::runner::RemoteRunner;

#[derive(Debug, Clone)]
pub enum Reply {
    Output(String),
    Exit(i32),
    Refuse,
    Hang,
}

#[derive(Default)]
pub struct StubRunner {
    replies: HashMap<String, (Reply, Duration)>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl StubRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, host: &str, reply: Reply) -> Self {
        self.delayed(host, reply, Duration::ZERO)
    }

    pub fn delayed(mut self, host: &str, reply: Reply, delay: Duration) -> Self {
        self.replies.insert(host.to_string(), (reply, delay));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteRunner for StubRunner {
    async fn run(&self, target: &HostCredential, command: &str) -> Result<String, RemoteError> {
        self.calls.lock().unwrap().push(target.host.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let (reply, delay) = self
            .replies
            .get(&target.host)
            .cloned()
            .unwrap_or((Reply::Output(command.to_string()), Duration::ZERO));
        tokio::time::sleep(delay).await;

        let result = match reply {
            Reply::Output(out) => Ok(out),
            Reply::Exit(code) => Err(RemoteError::Exited { code }),
            Reply::Refuse => Err(RemoteError::Connection {
                target: format!("{}:{}", target.host, target.port),
                detail: "Connection refused".into(),
            }),
            Reply::Hang => std::future::pending().await,
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub fn target(host: &str) -> HostCredential {
    HostCredential {
        host: host.to_string(),
        port: "22".into(),
        user: "probe".into(),
        key_path: PathBuf::from("/dev/null"),
        ..Default::default()
    }
}
