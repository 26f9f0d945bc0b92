//! Semgrep adapter

use async_trait::async_trait;

use super::process::{ToolCommand, run_json_tool};
use super::{AnalysisContext, Analyzer, AnalyzerError, RawFinding};
use crate::config::ToolConfig;
use crate::normalizer::FieldMapping;

const DEFAULT_ARGS: [&str; 4] = ["--config=auto", "--json", "--quiet", "."];

/// Semgrep adapter
///
/// Uses the registry ruleset (`--config=auto`), so the first run on a machine
/// needs network access to download rules.
#[derive(Debug, Clone)]
pub struct SemgrepAnalyzer {
    command: ToolCommand,
}

impl SemgrepAnalyzer {
    pub const NAME: &'static str = "semgrep";

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

impl Default for SemgrepAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Analyzer for SemgrepAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn field_mapping(&self) -> FieldMapping {
        FieldMapping::semgrep()
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
      "version": "1.60.0",
      "results": [
        {
          "check_id": "python.lang.security.audit.eval-detected.eval-detected",
          "path": "app/views.py",
          "start": {"line": 14, "col": 12, "offset": 301},
          "end": {"line": 14, "col": 28, "offset": 317},
          "extra": {
            "message": "Detected the use of eval(). eval() can be dangerous if used to evaluate dynamic content.",
            "severity": "WARNING",
            "metadata": {"cwe": ["CWE-95"], "confidence": "LOW"},
            "lines": "        return eval(expression)",
            "fingerprint": "requires login"
          }
        },
        {
          "check_id": "generic.secrets.security.detected-private-key",
          "path": "deploy/id_rsa",
          "start": {"line": 1, "col": 1},
          "end": {"line": 1, "col": 32},
          "extra": {
            "message": "Private Key detected.",
            "severity": "ERROR",
            "lines": "requires login"
          }
        }
      ],
      "errors": [],
      "paths": {"scanned": ["app/views.py", "deploy/id_rsa"]}
    }"#;

    #[test]
    fn default_command_line() {
        let analyzer = SemgrepAnalyzer::new();
        assert_eq!(analyzer.command().binary, "semgrep");
        assert_eq!(analyzer.command().args, DEFAULT_ARGS);
    }

    #[test]
    fn disabled_flag_does_not_affect_command() {
        let config = ToolConfig {
            enabled: false,
            binary: None,
            args: None,
        };
        assert_eq!(
            SemgrepAnalyzer::from_config(&config).command(),
            SemgrepAnalyzer::new().command()
        );
    }

    #[test]
    fn sample_report_normalizes() {
        let document = serde_json::from_str(SAMPLE).unwrap();
        let findings = extract_results("semgrep", document).unwrap();

        let report = Normalizer::builtin()
            .normalize(
                "scan-1",
                "https://example.com/app.git",
                &[Path::new("/clones/scan-1")],
                &[ToolFindings::new("semgrep", findings)],
            )
            .unwrap();

        let vulns = &report.vulnerabilities;
        assert_eq!(vulns.len(), 2);
        assert_eq!(vulns[0].tool, "semgrep");
        assert_eq!(vulns[0].severity, Severity::Medium);
        assert_eq!(vulns[0].file_path, "app/views.py");
        assert_eq!(vulns[0].line_number, 14);
        assert_eq!(vulns[0].code.as_deref(), Some("        return eval(expression)"));
        assert_eq!(vulns[1].severity, Severity::High);
        assert_eq!(vulns[1].file_path, "deploy/id_rsa");
    }
}
