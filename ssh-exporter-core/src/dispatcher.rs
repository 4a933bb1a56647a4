/*!
Batch dispatcher - the scheduler behind every probe request

For each script whose name matches the request's filter, one task is
spawned per target host. Tasks run on a `JoinSet` (draining it is the
completion barrier) and are admitted through a semaphore shared by all
requests of the process, so a large host list never opens more than
`max_concurrency` SSH connections at once.

Each task returns `(script_index, host_index, result)` and the dispatcher
writes the result into that slot. Slots are addressed by index and owned
by exactly one task, so no lock guards them and the rendered order is the
configuration order whatever the completion order.
*/

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn, Instrument};

use crate::config::{Config, HostResult};
use crate::error::InvalidPattern;
use crate::executor::execute;
use crate::matcher::Matcher;
use crate::runner::RemoteRunner;

pub const DEFAULT_MAX_CONCURRENCY: usize = 32;

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Upper bound on simultaneous remote executions, across requests.
    pub max_concurrency: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self { max_concurrency: DEFAULT_MAX_CONCURRENCY }
    }
}

pub struct BatchDispatcher {
    runner: Arc<dyn RemoteRunner>,
    permits: Arc<Semaphore>,
}

impl BatchDispatcher {
    pub fn new(runner: Arc<dyn RemoteRunner>, options: DispatchOptions) -> Self {
        Self {
            runner,
            permits: Arc::new(Semaphore::new(options.max_concurrency.max(1))),
        }
    }

    /// Compiles `pattern` and runs the batch. An invalid pattern fails the
    /// request before any host is contacted.
    pub async fn run_filtered(&self, config: Config, pattern: &str) -> Result<Config, InvalidPattern> {
        let name_filter = Matcher::compile(pattern)?;
        Ok(self.run(config, &name_filter).await)
    }

    /// Runs every selected script on all of its hosts and returns the
    /// configuration with `selected` and every selected host's result filled in.
    pub async fn run(&self, mut config: Config, name_filter: &Matcher) -> Config {
        let started = Instant::now();
        let mut tasks = JoinSet::new();

        for (script_idx, script) in config.scripts.iter_mut().enumerate() {
            script.selected = name_filter.is_match(&script.name);
            if !script.selected {
                debug!(script = %script.name, "ignored by name filter");
                continue;
            }

            let matcher = Arc::new(Matcher::compile_or_never(&script.match_pattern));
            let command: Arc<str> = Arc::from(script.command.as_str());
            let timeout = script.parsed_timeout;

            for (host_idx, target) in script.targets.iter_mut().enumerate() {
                target.result = HostResult::pending();

                let runner = Arc::clone(&self.runner);
                let permits = Arc::clone(&self.permits);
                let matcher = Arc::clone(&matcher);
                let command = Arc::clone(&command);
                let target = target.clone();
                let span = tracing::debug_span!("host", script = %script.name, host = %target.host);

                tasks.spawn(
                    async move {
                        // The semaphore is never closed; a failed acquire just runs unthrottled.
                        let _permit = permits.acquire_owned().await.ok();
                        let result = execute(runner.as_ref(), &target, &command, &matcher, timeout).await;
                        (script_idx, host_idx, result)
                    }
                    .instrument(span),
                );
            }
        }

        let launched = tasks.len();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((script_idx, host_idx, result)) => {
                    config.scripts[script_idx].targets[host_idx].result = result;
                }
                Err(err) => warn!(error = %err, "host task did not complete"),
            }
        }

        info!(
            selected = config.selected_scripts().count(),
            executions = launched,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        config
    }
}
