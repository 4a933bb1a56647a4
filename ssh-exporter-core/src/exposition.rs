/*!
Prometheus text rendering of a populated configuration.

The layout is what existing scrape configs were written against, including
the non-standard `# TYPE ssh_exporter gauge` line. Per selected script:

```text
# HELP ssh_exporter_<name>_exit_status Integer exit status of commands and metadata about the command's execution.
# TYPE ssh_exporter gauge
ssh_exporter_<name>_exit_status{name="..",host="..",user="..",script="..",exit_status="<code>"} <code>
# HELP ssh_exporter_<name>_pattern_match Boolean match of regex on output of script of commands and metadata about the command's execution.
# TYPE ssh_exporter gauge
ssh_exporter_<name>_pattern_match{name="..",host="..",user="..",script="..",regex=".."} <0|1>
```
*/

use std::fmt::Write;

use crate::config::{Config, ScriptSpec};

const EXIT_STATUS_HELP: &str =
    "Integer exit status of commands and metadata about the command's execution.";
const PATTERN_MATCH_HELP: &str =
    "Boolean match of regex on output of script of commands and metadata about the command's execution.";

/// Renders every selected script, in configuration order.
pub fn render(config: &Config) -> String {
    let mut out = String::new();
    for script in config.selected_scripts() {
        render_script(&mut out, script);
    }
    out
}

fn render_script(out: &mut String, script: &ScriptSpec) {
    let name = &script.name;
    let labels_name = escape_label(name);
    let labels_script = escape_label(&script.command);
    let labels_regex = escape_label(&script.match_pattern);

    // Writing into a String cannot fail.
    let _ = writeln!(out, "# HELP ssh_exporter_{name}_exit_status {EXIT_STATUS_HELP}");
    let _ = writeln!(out, "# TYPE ssh_exporter gauge");
    for target in &script.targets {
        let code = target.result.exit_status;
        let _ = writeln!(
            out,
            "ssh_exporter_{name}_exit_status{{name=\"{labels_name}\",host=\"{}\",user=\"{}\",script=\"{labels_script}\",exit_status=\"{code}\"}} {code}",
            escape_label(&target.host),
            escape_label(&target.user),
        );
    }

    let _ = writeln!(out, "# HELP ssh_exporter_{name}_pattern_match {PATTERN_MATCH_HELP}");
    let _ = writeln!(out, "# TYPE ssh_exporter gauge");
    for target in &script.targets {
        let _ = writeln!(
            out,
            "ssh_exporter_{name}_pattern_match{{name=\"{labels_name}\",host=\"{}\",user=\"{}\",script=\"{labels_script}\",regex=\"{labels_regex}\"}} {}",
            escape_label(&target.host),
            escape_label(&target.user),
            u8::from(target.result.matched),
        );
    }
}

/// Escapes a label value per the text exposition format.
fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HostCredential, HostResult, Outcome};
    use std::path::PathBuf;
    use std::time::Duration;

    fn host(host: &str, exit_status: i32, matched: bool) -> HostCredential {
        HostCredential {
            host: host.into(),
            port: "2222".into(),
            user: "username".into(),
            key_path: PathBuf::from("/noop"),
            result: HostResult {
                output: "foo".into(),
                exit_status,
                error_text: String::new(),
                matched,
                outcome: Outcome::Success,
            },
        }
    }

    fn script(name: &str, command: &str, selected: bool, targets: Vec<HostCredential>) -> ScriptSpec {
        ScriptSpec {
            name: name.into(),
            command: command.into(),
            timeout_spec: "1s".into(),
            match_pattern: "foo".into(),
            targets,
            parsed_timeout: Duration::from_secs(1),
            selected,
        }
    }

    #[test]
    fn test_single_script_layout() {
        let config = Config {
            version: "v0".into(),
            scripts: vec![script("scriptName", "echo foo", true, vec![host("localhost", 0, true)])],
        };

        let expected = "\
# HELP ssh_exporter_scriptName_exit_status Integer exit status of commands and metadata about the command's execution.
# TYPE ssh_exporter gauge
ssh_exporter_scriptName_exit_status{name=\"scriptName\",host=\"localhost\",user=\"username\",script=\"echo foo\",exit_status=\"0\"} 0
# HELP ssh_exporter_scriptName_pattern_match Boolean match of regex on output of script of commands and metadata about the command's execution.
# TYPE ssh_exporter gauge
ssh_exporter_scriptName_pattern_match{name=\"scriptName\",host=\"localhost\",user=\"username\",script=\"echo foo\",regex=\"foo\"} 1
";
        assert_eq!(render(&config), expected);
    }

    #[test]
    fn test_hosts_grouped_per_series() {
        let config = Config {
            version: "v0".into(),
            scripts: vec![script(
                "disk",
                "df -h",
                true,
                vec![host("a", 0, true), host("b", -1, false)],
            )],
        };
        let rendered = render(&config);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 8);
        assert!(lines[2].starts_with("ssh_exporter_disk_exit_status{name=\"disk\",host=\"a\""));
        assert!(lines[3].ends_with("exit_status=\"-1\"} -1"));
        assert!(lines[6].ends_with("} 1"));
        assert!(lines[7].starts_with("ssh_exporter_disk_pattern_match{name=\"disk\",host=\"b\""));
        assert!(lines[7].ends_with("} 0"));
    }

    #[test]
    fn test_unselected_scripts_are_omitted() {
        let config = Config {
            version: "v0".into(),
            scripts: vec![
                script("skipped", "true", false, vec![host("a", 0, true)]),
                script("kept", "true", true, vec![host("a", 0, true)]),
            ],
        };
        let rendered = render(&config);
        assert!(!rendered.contains("skipped"));
        assert!(rendered.starts_with("# HELP ssh_exporter_kept_exit_status"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let config = Config {
            version: "v0".into(),
            scripts: vec![
                script("one", "uptime", true, vec![host("a", 0, true), host("b", 3, false)]),
                script("two", "id", true, vec![host("c", 0, false)]),
            ],
        };
        assert_eq!(render(&config), render(&config));
    }

    #[test]
    fn test_empty_config_renders_nothing() {
        assert_eq!(render(&Config::default()), "");
    }

    #[test]
    fn test_label_escaping() {
        assert_eq!(escape_label(r#"echo "hi""#), r#"echo \"hi\""#);
        assert_eq!(escape_label("a\\d+"), "a\\\\d+");
        assert_eq!(escape_label("line1\nline2"), "line1\\nline2");

        let config = Config {
            version: "v0".into(),
            scripts: vec![script("quoted", "echo \"hi\"", true, vec![host("a", 0, true)])],
        };
        assert!(render(&config).contains(r#"script="echo \"hi\"""#));
    }
}
