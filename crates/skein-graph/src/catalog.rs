//! Node type catalog for palette rendering and creation-time defaults
//!
//! The catalog is the single source of truth for which node kinds
//! exist, how they are labelled and grouped in the palette, and what
//! configuration a freshly placed node starts with.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{NodeCategory, NodeConfig, NodeKind};

/// Catalog entry describing one node kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeEntry {
    /// The kind this entry describes
    pub kind: NodeKind,
    /// Human-readable label for the palette
    pub label: String,
    /// Palette category
    pub category: NodeCategory,
    /// Description of what the node does
    pub description: String,
    /// Config a freshly created node of this kind starts with
    pub default_config: NodeConfig,
}

/// Registry of node kinds with their metadata and default configs
#[derive(Debug, Clone, Default)]
pub struct NodeTypeCatalog {
    entries: BTreeMap<NodeKind, NodeTypeEntry>,
}

impl NodeTypeCatalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with all builtin node kinds registered
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(NodeTypeEntry {
            kind: NodeKind::Agent,
            label: NodeKind::Agent.label().to_string(),
            category: NodeCategory::Agent,
            description: "Runs an autonomous agent step against a model".to_string(),
            default_config: NodeConfig::Agent {
                model: "default".to_string(),
                system_prompt: String::new(),
                temperature: 0.7,
            },
        });
        catalog.register(NodeTypeEntry {
            kind: NodeKind::Conditional,
            label: NodeKind::Conditional.label().to_string(),
            category: NodeCategory::Control,
            description: "Branches on a context value".to_string(),
            default_config: NodeConfig::Conditional {
                condition_key: String::new(),
                expected_value: None,
            },
        });
        catalog.register(NodeTypeEntry {
            kind: NodeKind::Loop,
            label: NodeKind::Loop.label().to_string(),
            category: NodeCategory::Control,
            description: "Repeats downstream work up to a bound".to_string(),
            default_config: NodeConfig::Loop {
                max_iterations: 10,
                exit_condition_key: None,
            },
        });
        catalog.register(NodeTypeEntry {
            kind: NodeKind::HumanCheckpoint,
            label: NodeKind::HumanCheckpoint.label().to_string(),
            category: NodeCategory::Human,
            description: "Pauses for human review before continuing".to_string(),
            default_config: NodeConfig::HumanCheckpoint {
                prompt: "Approve to continue".to_string(),
                timeout_secs: None,
            },
        });
        catalog.register(NodeTypeEntry {
            kind: NodeKind::Tool,
            label: NodeKind::Tool.label().to_string(),
            category: NodeCategory::Tool,
            description: "Invokes an external tool".to_string(),
            default_config: NodeConfig::Tool {
                tool_name: String::new(),
                arguments: serde_json::json!({}),
            },
        });
        catalog.register(NodeTypeEntry {
            kind: NodeKind::Merge,
            label: NodeKind::Merge.label().to_string(),
            category: NodeCategory::Control,
            description: "Joins multiple upstream branches".to_string(),
            default_config: NodeConfig::Merge {},
        });
        catalog
    }

    /// Register an entry, replacing any existing entry for the kind
    pub fn register(&mut self, entry: NodeTypeEntry) {
        self.entries.insert(entry.kind, entry);
    }

    /// Get the entry for a kind
    pub fn get(&self, kind: NodeKind) -> Option<&NodeTypeEntry> {
        self.entries.get(&kind)
    }

    /// Check whether a kind is registered
    pub fn contains(&self, kind: NodeKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// All entries in stable kind order
    pub fn all(&self) -> Vec<&NodeTypeEntry> {
        self.entries.values().collect()
    }

    /// Entries grouped by palette category
    pub fn by_category(&self) -> BTreeMap<NodeCategory, Vec<&NodeTypeEntry>> {
        let mut grouped: BTreeMap<NodeCategory, Vec<&NodeTypeEntry>> = BTreeMap::new();
        for entry in self.entries.values() {
            grouped.entry(entry.category).or_default().push(entry);
        }
        grouped
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_all_kinds() {
        let catalog = NodeTypeCatalog::builtin();
        for kind in [
            NodeKind::Agent,
            NodeKind::Conditional,
            NodeKind::Loop,
            NodeKind::HumanCheckpoint,
            NodeKind::Tool,
            NodeKind::Merge,
        ] {
            assert!(catalog.contains(kind), "missing {:?}", kind);
        }
        assert_eq!(catalog.len(), 6);
    }

    #[test]
    fn test_default_config_matches_kind() {
        let catalog = NodeTypeCatalog::builtin();
        for entry in catalog.all() {
            assert_eq!(entry.default_config.kind(), entry.kind);
        }
    }

    #[test]
    fn test_by_category_grouping() {
        let catalog = NodeTypeCatalog::builtin();
        let grouped = catalog.by_category();
        let control = grouped.get(&NodeCategory::Control).unwrap();
        assert_eq!(control.len(), 3); // Conditional, Loop, Merge
    }
}
