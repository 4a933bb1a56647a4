/*!
ssh_exporter core - fans shell scripts out to remote hosts and aggregates the results

Data flow of one probe request:
- `Config::load` reads and normalizes the YAML document (defaults, timeouts)
- `BatchDispatcher` selects scripts by name and runs every (script, host) pair concurrently
- `executor::execute` drives one `RemoteRunner` call and folds every failure into a `HostResult`
- `exposition::render` turns the populated configuration into Prometheus text

A `Config` value is owned by exactly one request; nothing here keeps probe state
between requests.
*/

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod exposition;
pub mod matcher;
pub mod runner;

#[cfg(test)]
mod testing;

pub use config::{Config, HostCredential, HostResult, Outcome, ScriptSpec, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use dispatcher::{BatchDispatcher, DispatchOptions};
pub use error::{ConfigError, InvalidPattern, RemoteError};
pub use exposition::render;
pub use matcher::Matcher;
pub use runner::{RemoteRunner, SshOptions, SshRunner};
