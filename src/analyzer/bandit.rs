//! Bandit (Python security linter) adapter

use async_trait::async_trait;

use super::process::{ToolCommand, run_json_tool};
use super::{AnalysisContext, Analyzer, AnalyzerError, RawFinding};
use crate::config::ToolConfig;
use crate::normalizer::FieldMapping;

/// Recursive scan of the workspace, JSON report on stdout, no progress chatter
const DEFAULT_ARGS: [&str; 5] = ["-r", "-f", "json", "-q", "."];

/// Bandit adapter
///
/// Runs `bandit -r -f json -q .` from the workspace root and returns the
/// entries of the report's `results` array.
#[derive(Debug, Clone)]
pub struct BanditAnalyzer {
    command: ToolCommand,
}

impl BanditAnalyzer {
    pub const NAME: &'static str = "bandit";

    pub fn new() -> Self {
        Self {
            command: ToolCommand::new(Self::NAME, &DEFAULT_ARGS),
        }
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        Self {
            command: ToolCommand::new(Self::NAME, &DEFAULT_ARGS).with_overrides(config),
        }
    }

    pub fn command(&self) -> &ToolCommand {
        &self.command
    }
}

impl Default for BanditAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Analyzer for BanditAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn field_mapping(&self) -> FieldMapping {
        FieldMapping::bandit()
    }

    async fn run(&self, ctx: &AnalysisContext) -> Result<Vec<RawFinding>, AnalyzerError> {
        run_json_tool(Self::NAME, &self.command, ctx.workspace()).await
    }

    fn is_available(&self) -> bool {
        self.command.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;
    use crate::analyzer::process::extract_results;
    use crate::normalizer::{Normalizer, ToolFindings};
    use std::path::Path;

    const SAMPLE: &str = r#"{
      "errors": [],
      "generated_at": "2024-05-01T10:00:00Z",
      "metrics": {"_totals": {"loc": 12, "nosec": 0}},
      "results": [
        {
          "code": "4 def run(cmd):\n5     subprocess.call(cmd, shell=True)\n",
          "col_offset": 4,
          "filename": "./app/tasks.py",
          "issue_confidence": "HIGH",
          "issue_cwe": {"id": 78, "link": "https://cwe.mitre.org/data/definitions/78.html"},
          "issue_severity": "HIGH",
          "issue_text": "subprocess call with shell=True identified, security issue.",
          "line_number": 5,
          "line_range": [5],
          "test_id": "B602",
          "test_name": "subprocess_popen_with_shell_equals_true"
        },
        {
          "code": "1 import pickle\n",
          "filename": "./app/cache.py",
          "issue_confidence": "HIGH",
          "issue_severity": "LOW",
          "issue_text": "Consider possible security implications associated with pickle module.",
          "line_number": 1,
          "test_id": "B403"
        }
      ]
    }"#;

    #[test]
    fn default_command_line() {
        let analyzer = BanditAnalyzer::new();
        assert_eq!(analyzer.command().binary, "bandit");
        assert_eq!(analyzer.command().args, DEFAULT_ARGS);
    }

    #[test]
    fn sample_report_normalizes() {
        let document = serde_json::from_str(SAMPLE).unwrap();
        let findings = extract_results("bandit", document).unwrap();

        let report = Normalizer::builtin()
            .normalize(
                "scan-1",
                "https://example.com/app.git",
                &[Path::new("/clones/scan-1")],
                &[ToolFindings::new("bandit", findings)],
            )
            .unwrap();

        assert_eq!(report.vulnerabilities.len(), 2);
        let first = &report.vulnerabilities[0];
        assert_eq!(first.tool, "bandit");
        assert_eq!(first.severity, Severity::High);
        assert_eq!(first.file_path, "app/tasks.py");
        assert_eq!(first.line_number, 5);
        assert!(first.description.contains("shell=True"));
        assert!(first.code.as_deref().unwrap().contains("subprocess.call"));
        assert_eq!(report.vulnerabilities[1].severity, Severity::Low);
    }
}
