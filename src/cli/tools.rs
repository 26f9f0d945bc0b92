//! Tools command implementation

use anyhow::Result;

use reposcan::analyzer::AnalyzerRegistry;
use reposcan::config::Config;

/// Show configured analyzers and whether they can run here
pub fn tools_command(config: &Config) -> Result<()> {
    let registry = AnalyzerRegistry::from_config(config);

    for (name, tool) in &config.tools {
        if !tool.enabled {
            println!("  {:<8} disabled", name);
        }
    }

    if registry.is_empty() {
        println!("No analyzers enabled.");
        return Ok(());
    }

    for analyzer in registry.iter() {
        let status = if analyzer.is_available() {
            "available"
        } else {
            "NOT FOUND"
        };
        println!("  {:<8} {}", analyzer.name(), status);
    }

    Ok(())
}
