/*!
Builders for exporter configuration documents

Tests describe scripts and hosts in a few chained calls instead of
hand-writing YAML; `ConfigBuilder::to_yaml` produces the same document shape
the exporter reads from disk.
*/

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use ssh_exporter_core::config::CONFIG_VERSION;
use ssh_exporter_core::{Config, HostCredential, ScriptSpec, DEFAULT_TIMEOUT};

#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    spec: ScriptSpec,
}

impl ScriptBuilder {
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            spec: ScriptSpec {
                name: name.to_string(),
                command: command.to_string(),
                timeout_spec: "5s".to_string(),
                match_pattern: String::new(),
                targets: Vec::new(),
                parsed_timeout: DEFAULT_TIMEOUT,
                selected: false,
            },
        }
    }

    pub fn timeout(mut self, spec: &str) -> Self {
        self.spec.timeout_spec = spec.to_string();
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.spec.match_pattern = pattern.to_string();
        self
    }

    /// Adds a target on the default port.
    pub fn host(self, host: &str, user: &str, key_path: impl Into<PathBuf>) -> Self {
        self.host_on_port(host, "", user, key_path)
    }

    pub fn host_on_port(mut self, host: &str, port: &str, user: &str, key_path: impl Into<PathBuf>) -> Self {
        self.spec.targets.push(HostCredential {
            host: host.to_string(),
            port: port.to_string(),
            user: user.to_string(),
            key_path: key_path.into(),
            ..Default::default()
        });
        self
    }

    pub fn build(self) -> ScriptSpec {
        self.spec
    }
}

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    version: String,
    scripts: Vec<ScriptSpec>,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            scripts: Vec::new(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn script(mut self, script: ScriptBuilder) -> Self {
        self.scripts.push(script.build());
        self
    }

    /// Raw document, exactly as written by the user (not normalized).
    pub fn build(self) -> Config {
        Config {
            version: self.version,
            scripts: self.scripts,
        }
    }

    /// Normalized document, as the dispatcher receives it after a load.
    pub fn build_normalized(self) -> Config {
        let mut config = self.build();
        config.normalize();
        config
    }

    pub fn to_yaml(self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.build())?)
    }
}

/// Timeout the normalized configuration will carry for `spec`.
pub fn effective_timeout(spec: &str) -> Duration {
    ssh_exporter_core::config::parse_timeout(spec).unwrap_or(DEFAULT_TIMEOUT)
}
