//! Registry of the analyzers a scan fans out to

use std::sync::Arc;

use tracing::{debug, warn};

use super::{Analyzer, BanditAnalyzer, SemgrepAnalyzer};
use crate::config::{BUILTIN_TOOLS, Config};
use crate::normalizer::{MappingTable, Normalizer};

/// Ordered set of analyzers.
///
/// Order matters: it is the invocation order and therefore the order of
/// findings in the merged report. Adapters are stored as `Arc<dyn Analyzer>`
/// so the registry is cheap to clone and share with scan tasks.
#[derive(Clone, Default)]
pub struct AnalyzerRegistry {
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in analyzers with their default command lines
    pub fn with_defaults() -> Self {
        Self::from_config(&Config::default())
    }

    /// Built-in analyzers as configured, skipping disabled ones
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        for name in BUILTIN_TOOLS {
            let tool = config.tool(name);
            if !tool.enabled {
                debug!("[reposcan:analyzer] {} is disabled", name);
                continue;
            }
            match name {
                BanditAnalyzer::NAME => {
                    registry.register(Arc::new(BanditAnalyzer::from_config(&tool)))
                }
                SemgrepAnalyzer::NAME => {
                    registry.register(Arc::new(SemgrepAnalyzer::from_config(&tool)))
                }
                _ => {}
            }
        }

        for name in config.tools.keys() {
            if !BUILTIN_TOOLS.contains(&name.as_str()) {
                warn!(
                    "[reposcan:analyzer] Ignoring [tools.{}]: no such analyzer",
                    name
                );
            }
        }

        registry
    }

    /// Add an analyzer, replacing any registered under the same name
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) {
        match self
            .analyzers
            .iter_mut()
            .find(|existing| existing.name() == analyzer.name())
        {
            Some(slot) => *slot = analyzer,
            None => self.analyzers.push(analyzer),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Analyzer>> {
        self.analyzers.iter().find(|a| a.name() == name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Analyzer>> {
        self.analyzers.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Mapping table built from every registered analyzer
    pub fn mapping_table(&self) -> MappingTable {
        self.analyzers
            .iter()
            .map(|a| (a.name().to_string(), a.field_mapping()))
            .collect()
    }

    /// Normalizer that understands every registered analyzer
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.mapping_table())
    }
}

impl std::fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerRegistry")
            .field("analyzers", &self.names())
            .finish()
    }
}
