/*!
Self telemetry served on `/metrics`

Counts probe requests by result, times successful probes and tallies host
executions by outcome. The registry is owned by the application state, so
tests can build as many independent instances as they like.
*/

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

use ssh_exporter_core::Config;

/// Probe result labels.
pub const PROBE_OK: &str = "ok";
pub const PROBE_NO_PATTERN: &str = "no_pattern";
pub const PROBE_INVALID_PATTERN: &str = "invalid_pattern";
pub const PROBE_CONFIG_ERROR: &str = "config_error";

#[derive(Clone)]
pub struct Telemetry {
    registry: Registry,
    probes: IntCounterVec,
    probe_duration: Histogram,
    host_executions: IntCounterVec,
}

impl Telemetry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let probes = IntCounterVec::new(
            Opts::new("ssh_exporter_probe_requests_total", "Probe requests received, by result."),
            &["result"],
        )?;
        let probe_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ssh_exporter_probe_duration_seconds",
                "Wall time of successful probe requests.",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )?;
        let host_executions = IntCounterVec::new(
            Opts::new(
                "ssh_exporter_host_executions_total",
                "Remote script executions, by outcome.",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(probes.clone()))?;
        registry.register(Box::new(probe_duration.clone()))?;
        registry.register(Box::new(host_executions.clone()))?;

        Ok(Self { registry, probes, probe_duration, host_executions })
    }

    pub fn record_probe(&self, result: &str) {
        self.probes.with_label_values(&[result]).inc();
    }

    /// Records a completed probe: its duration and the outcome of every host it ran on.
    pub fn record_batch(&self, config: &Config, elapsed: Duration) {
        self.record_probe(PROBE_OK);
        self.probe_duration.observe(elapsed.as_secs_f64());
        for script in config.selected_scripts() {
            for target in &script.targets {
                self.host_executions
                    .with_label_values(&[target.result.outcome.as_str()])
                    .inc();
            }
        }
    }

    /// Text exposition of the registry.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssh_exporter_core::{HostCredential, HostResult, Outcome, ScriptSpec};

    #[test]
    fn test_counts_probes_and_outcomes() {
        let telemetry = Telemetry::new().unwrap();
        let config = Config {
            version: "v0".into(),
            scripts: vec![ScriptSpec {
                name: "uptime".into(),
                command: "uptime".into(),
                timeout_spec: "5s".into(),
                match_pattern: "load".into(),
                targets: vec![
                    HostCredential {
                        host: "a".into(),
                        result: HostResult { outcome: Outcome::Success, ..HostResult::pending() },
                        ..Default::default()
                    },
                    HostCredential {
                        host: "b".into(),
                        result: HostResult { outcome: Outcome::TimedOut, ..HostResult::pending() },
                        ..Default::default()
                    },
                ],
                parsed_timeout: Duration::from_secs(5),
                selected: true,
            }],
        };

        telemetry.record_probe(PROBE_NO_PATTERN);
        telemetry.record_batch(&config, Duration::from_millis(300));

        let text = telemetry.render().unwrap();
        assert!(text.contains("ssh_exporter_probe_requests_total{result=\"ok\"} 1"));
        assert!(text.contains("ssh_exporter_probe_requests_total{result=\"no_pattern\"} 1"));
        assert!(text.contains("ssh_exporter_host_executions_total{outcome=\"success\"} 1"));
        assert!(text.contains("ssh_exporter_host_executions_total{outcome=\"timed_out\"} 1"));
        assert!(text.contains("ssh_exporter_probe_duration_seconds_count 1"));
    }
}
