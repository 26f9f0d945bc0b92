//! Running a JSON-emitting tool as a subprocess

use std::path::Path;
use std::process::Stdio;

use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{AnalyzerError, RawFinding};
use crate::config::ToolConfig;

/// Longest stderr excerpt carried into an error message
const STDERR_EXCERPT: usize = 500;

/// Executable plus arguments for one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub binary: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(binary: impl Into<String>, args: &[&str]) -> Self {
        Self {
            binary: binary.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Apply configured binary and argument overrides
    pub fn with_overrides(mut self, config: &ToolConfig) -> Self {
        if let Some(binary) = config.binary.as_ref().filter(|b| !b.trim().is_empty()) {
            self.binary = binary.clone();
        }
        if let Some(args) = &config.args {
            self.args = args.clone();
        }
        self
    }

    /// Whether the binary can be found (PATH lookup for bare names)
    pub fn is_available(&self) -> bool {
        if self.binary.contains(std::path::MAIN_SEPARATOR) || self.binary.contains('/') {
            return Path::new(&self.binary).is_file();
        }
        std::process::Command::new("which")
            .arg(&self.binary)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// Run `command` inside `workspace` and pull the `results` array out of the
/// JSON document it prints.
///
/// A non-zero exit code is fine as long as stdout holds a valid document;
/// security tools commonly exit 1 when they found something.
pub(crate) async fn run_json_tool(
    tool: &str,
    command: &ToolCommand,
    workspace: &Path,
) -> Result<Vec<RawFinding>, AnalyzerError> {
    debug!(
        "[reposcan:analyzer] Running {} {} in {}",
        command.binary,
        command.args.join(" "),
        workspace.display()
    );

    let output = Command::new(&command.binary)
        .args(&command.args)
        .current_dir(workspace)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| AnalyzerError::Spawn {
            tool: tool.to_string(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Err(AnalyzerError::NoOutput {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: stderr_excerpt(&output.stderr),
        });
    }

    if !output.status.success() {
        debug!(
            "[reposcan:analyzer] {} exited with {}, parsing its output anyway",
            tool, output.status
        );
    }

    let document: Value = serde_json::from_str(stdout).map_err(|source| AnalyzerError::Parse {
        tool: tool.to_string(),
        source,
    })?;

    extract_results(tool, document)
}

/// Take the top-level `results` array of a tool report
pub(crate) fn extract_results(tool: &str, document: Value) -> Result<Vec<RawFinding>, AnalyzerError> {
    let Value::Object(mut root) = document else {
        return Err(AnalyzerError::MissingResults {
            tool: tool.to_string(),
        });
    };

    if let Some(Value::Array(errors)) = root.get("errors") {
        if !errors.is_empty() {
            warn!(
                "[reposcan:analyzer] {} reported {} error(s) while scanning",
                tool,
                errors.len()
            );
        }
    }

    match root.remove("results") {
        Some(Value::Array(results)) => Ok(results),
        _ => Err(AnalyzerError::MissingResults {
            tool: tool.to_string(),
        }),
    }
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    match text.char_indices().nth(STDERR_EXCERPT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overrides_replace_binary_and_args() {
        let base = ToolCommand::new("bandit", &["-r", "."]);
        let config = ToolConfig {
            enabled: true,
            binary: Some("/opt/bandit/bin/bandit".to_string()),
            args: Some(vec!["-f".to_string(), "json".to_string()]),
        };

        let command = base.clone().with_overrides(&config);
        assert_eq!(command.binary, "/opt/bandit/bin/bandit");
        assert_eq!(command.args, vec!["-f", "json"]);

        let unchanged = base.clone().with_overrides(&ToolConfig::default());
        assert_eq!(unchanged, base);
    }

    #[test]
    fn missing_absolute_binary_is_unavailable() {
        let command = ToolCommand::new("/definitely/not/here/bandit", &[]);
        assert!(!command.is_available());
    }

    #[test]
    fn results_array_is_extracted() {
        let results = extract_results("bandit", json!({"results": [{"a": 1}, {"b": 2}]})).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn document_without_results_is_rejected() {
        let err = extract_results("semgrep", json!({"errors": []})).unwrap_err();
        assert!(matches!(err, AnalyzerError::MissingResults { .. }));

        let err = extract_results("semgrep", json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, AnalyzerError::MissingResults { .. }));
    }

    #[test]
    fn long_stderr_is_truncated() {
        let noisy = "x".repeat(STDERR_EXCERPT * 2);
        let excerpt = stderr_excerpt(noisy.as_bytes());
        assert_eq!(excerpt.len(), STDERR_EXCERPT + 3);
        assert!(excerpt.ends_with("..."));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_with_valid_output_is_accepted() {
        let dir = tempfile::TempDir::new().unwrap();
        let command = ToolCommand::new(
            "sh",
            &["-c", r#"echo '{"results": [{"filename": "./a.py"}]}'; exit 1"#],
        );

        let results = run_json_tool("bandit", &command, dir.path()).await.unwrap();
        assert_eq!(results, vec![json!({"filename": "./a.py"})]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn garbage_output_is_a_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let command = ToolCommand::new("sh", &["-c", "echo 'Traceback (most recent call last):'"]);

        let err = run_json_tool("bandit", &command, dir.path()).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Parse { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_failure_reports_stderr() {
        let dir = tempfile::TempDir::new().unwrap();
        let command = ToolCommand::new("sh", &["-c", "echo 'no module named bandit' >&2; exit 2"]);

        let err = run_json_tool("bandit", &command, dir.path()).await.unwrap_err();
        match err {
            AnalyzerError::NoOutput { stderr, .. } => assert_eq!(stderr, "no module named bandit"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let command = ToolCommand::new("reposcan-no-such-tool", &[]);

        let err = run_json_tool("bandit", &command, dir.path()).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Spawn { .. }));
    }
}
