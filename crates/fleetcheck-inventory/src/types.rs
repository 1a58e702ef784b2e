//! Inventory type definitions

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Variable assignments attached to a group or host
pub type Vars = BTreeMap<String, String>;

/// Name of the implicit group containing every host
pub const ALL_GROUP: &str = "all";

/// Group receiving host lines that appear before any section header
pub const UNGROUPED_GROUP: &str = "ungrouped";

// ============================================================================
// Inventory Model
// ============================================================================

/// Parsed inventory
///
/// Built fresh for every request and immutable once constructed. Groups keep
/// their declaration order, which drives variable precedence and error
/// listings. Every host that appears in any group also appears in
/// [`InventoryModel::hosts`], and the `all` group is a superset of every
/// other group.
#[derive(Debug, Clone, Default)]
pub struct InventoryModel {
    /// File the model was parsed from (if any)
    pub(crate) source: Option<PathBuf>,
    /// Every host, unique, in `all` group order
    pub(crate) hosts: Vec<String>,
    /// Group names in declaration order
    pub(crate) group_order: Vec<String>,
    /// Group membership by name
    pub(crate) groups: HashMap<String, Vec<String>>,
    /// `[group:vars]` assignments
    pub(crate) group_vars: HashMap<String, Vars>,
    /// Inline host assignments
    pub(crate) host_vars: HashMap<String, Vars>,
    /// Non-fatal parse diagnostics (unsupported constructs)
    pub(crate) warnings: Vec<String>,
}

impl InventoryModel {
    /// Path the inventory was loaded from
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// All hosts in stable order
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Number of distinct hosts
    #[must_use]
    pub fn total_hosts(&self) -> usize {
        self.hosts.len()
    }

    /// Check if a host is known
    #[must_use]
    pub fn has_host(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h == host)
    }

    /// Group names in declaration order
    #[must_use]
    pub fn group_names(&self) -> &[String] {
        &self.group_order
    }

    /// Members of a group
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Check if a group exists
    #[must_use]
    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Iterate groups and their members in declaration order
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.group_order
            .iter()
            .filter_map(|name| self.group(name).map(|hosts| (name.as_str(), hosts)))
    }

    /// Variables declared in `[group:vars]`
    #[must_use]
    pub fn group_vars(&self, group: &str) -> Option<&Vars> {
        self.group_vars.get(group)
    }

    /// Iterate group variable blocks in group declaration order
    ///
    /// Blocks for groups that were never declared come last, by name.
    pub fn all_group_vars(&self) -> impl Iterator<Item = (&str, &Vars)> {
        let position = |name: &String| {
            self.group_order
                .iter()
                .position(|g| g == name)
                .unwrap_or(usize::MAX)
        };
        let mut names: Vec<&String> = self.group_vars.keys().collect();
        names.sort_by(|a, b| position(a).cmp(&position(b)).then_with(|| a.cmp(b)));
        names
            .into_iter()
            .filter_map(|name| self.group_vars.get(name).map(|v| (name.as_str(), v)))
    }

    /// Variables declared inline on the host line(s)
    #[must_use]
    pub fn host_vars(&self, host: &str) -> Option<&Vars> {
        self.host_vars.get(host)
    }

    /// Hosts of a group, empty when the group is unknown
    #[must_use]
    pub fn group_hosts(&self, group: &str) -> GroupHosts {
        GroupHosts {
            group: group.to_string(),
            hosts: self.group(group).map(<[String]>::to_vec).unwrap_or_default(),
        }
    }

    /// Non-fatal parse diagnostics
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

// ============================================================================
// Query Results
// ============================================================================

/// Members of a single group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupHosts {
    /// Group name
    pub group: String,
    /// Member hosts
    pub hosts: Vec<String>,
}

impl GroupHosts {
    /// Number of member hosts
    #[must_use]
    pub fn count(&self) -> usize {
        self.hosts.len()
    }
}

/// Outcome of expanding a selector against an inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedHosts {
    /// Raw selector as supplied
    pub selector: String,
    /// Matched hosts, unique, in first-produced order
    pub hosts: Vec<String>,
    /// Set when some tokens matched nothing but others did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Set when nothing matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResolvedHosts {
    /// Number of matched hosts
    #[must_use]
    pub fn count(&self) -> usize {
        self.hosts.len()
    }

    /// Whether the selection can be acted on
    ///
    /// A partial-match warning does not invalidate the selection.
    #[must_use]
    pub fn validated(&self) -> bool {
        !self.hosts.is_empty() && self.error.is_none()
    }
}

/// Deduplicate while keeping the first occurrence of every item
pub(crate) fn dedupe<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_preserves_first_occurrence() {
        let items = ["b", "a", "b", "c", "a"].map(String::from);
        assert_eq!(dedupe(items), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_validated_ignores_warning() {
        let resolved = ResolvedHosts {
            selector: "web,nope".to_string(),
            hosts: vec!["a".to_string()],
            warning: Some("Some selectors didn't match: nope".to_string()),
            error: None,
        };
        assert!(resolved.validated());

        let failed = ResolvedHosts {
            selector: "nope".to_string(),
            hosts: Vec::new(),
            warning: None,
            error: Some("No hosts matched selector 'nope'".to_string()),
        };
        assert!(!failed.validated());
        assert_eq!(failed.count(), 0);
    }

    #[test]
    fn test_unknown_group_hosts_is_empty() {
        let model = InventoryModel::default();
        let group = model.group_hosts("web");
        assert_eq!(group.group, "web");
        assert_eq!(group.count(), 0);
    }
}
