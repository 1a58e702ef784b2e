//! INI-style inventory parser
//!
//! Covers host lists, `[group]`, `[group:children]` and `[group:vars]`
//! sections. Children are aggregated a single level deep in declaration
//! order; deeper hierarchies are reported as warnings instead of being
//! silently flattened.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::error::InventoryError;
use crate::types::{ALL_GROUP, InventoryModel, UNGROUPED_GROUP, Vars, dedupe};

/// Section the parser is currently reading
#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    /// Host lines before any header
    Ungrouped,
    /// `[name]`
    Hosts(String),
    /// `[name:children]`
    Children(String),
    /// `[name:vars]`
    Vars(String),
}

impl Section {
    /// Classify a section header body (the text between the brackets)
    fn from_header(header: &str) -> Self {
        let base = || header.split(':').next().unwrap_or(header).to_string();
        if header.ends_with(":vars") {
            Section::Vars(base())
        } else if header.ends_with(":children") {
            Section::Children(base())
        } else {
            Section::Hosts(header.to_string())
        }
    }
}

/// Accumulates parser state line by line
#[derive(Debug, Default)]
struct InventoryParser {
    group_order: Vec<String>,
    groups: HashMap<String, Vec<String>>,
    children: Vec<(String, Vec<String>)>,
    group_vars: HashMap<String, Vars>,
    host_vars: HashMap<String, Vars>,
    warnings: Vec<String>,
}

impl InventoryParser {
    fn declare_group(&mut self, name: &str) {
        if !self.groups.contains_key(name) {
            self.groups.insert(name.to_string(), Vec::new());
            self.group_order.push(name.to_string());
        }
    }

    fn add_member(&mut self, group: &str, host: &str) {
        self.declare_group(group);
        if let Some(members) = self.groups.get_mut(group)
            && !members.iter().any(|h| h == host)
        {
            members.push(host.to_string());
        }
    }

    fn children_of(&mut self, parent: &str) -> &mut Vec<String> {
        let idx = match self.children.iter().position(|(p, _)| p == parent) {
            Some(idx) => idx,
            None => {
                self.children.push((parent.to_string(), Vec::new()));
                self.children.len() - 1
            }
        };
        &mut self.children[idx].1
    }

    fn enter(&mut self, section: &Section) {
        match section {
            Section::Hosts(name) => self.declare_group(name),
            Section::Children(parent) => {
                self.declare_group(parent);
                self.children_of(parent);
            }
            Section::Vars(group) => {
                self.group_vars.entry(group.clone()).or_default();
            }
            Section::Ungrouped => {}
        }
    }

    fn line(&mut self, section: &Section, line: &str) {
        match section {
            Section::Children(parent) => {
                if let Some(child) = line.split_whitespace().next() {
                    self.children_of(parent).push(child.to_string());
                }
            }
            Section::Vars(group) => {
                if let Some((key, value)) = line.split_once('=') {
                    self.group_vars
                        .entry(group.clone())
                        .or_default()
                        .insert(key.trim().to_string(), value.trim().to_string());
                }
            }
            Section::Hosts(group) => self.host_line(group, line),
            Section::Ungrouped => self.host_line(UNGROUPED_GROUP, line),
        }
    }

    fn host_line(&mut self, group: &str, line: &str) {
        let mut parts = line.split_whitespace();
        let Some(host) = parts.next() else {
            return;
        };
        self.add_member(group, host);

        let assignments: Vars = parts
            .filter_map(|part| part.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        if !assignments.is_empty() {
            self.host_vars
                .entry(host.to_string())
                .or_default()
                .extend(assignments);
        }
    }

    /// Aggregate `:children` membership onto parent groups
    fn resolve_children(&mut self) {
        let parents: HashSet<String> = self.children.iter().map(|(p, _)| p.clone()).collect();
        let mut resolved: HashSet<String> = HashSet::new();

        for (parent, kids) in &self.children {
            let mut aggregated = self.groups.get(parent).cloned().unwrap_or_default();
            for kid in kids {
                if parents.contains(kid) && !resolved.contains(kid) {
                    let message = format!(
                        "nested children group '{kid}' under '{parent}' is not supported; \
                         membership of '{parent}' may be incomplete"
                    );
                    warn!(parent = %parent, child = %kid, "unsupported nested children group");
                    self.warnings.push(message);
                }
                match self.groups.get(kid) {
                    Some(members) => aggregated.extend(members.iter().cloned()),
                    None => debug!(parent = %parent, child = %kid, "children entry names unknown group"),
                }
            }
            self.groups.insert(parent.clone(), dedupe(aggregated));
            resolved.insert(parent.clone());
        }
    }

    /// Make `all` a superset of every group
    fn resolve_all(&mut self) {
        let mut aggregated = self.groups.get(ALL_GROUP).cloned().unwrap_or_default();
        for name in &self.group_order {
            if name == ALL_GROUP {
                continue;
            }
            if let Some(members) = self.groups.get(name) {
                aggregated.extend(members.iter().cloned());
            }
        }
        self.declare_group(ALL_GROUP);
        self.groups.insert(ALL_GROUP.to_string(), dedupe(aggregated));
    }

    fn finish(mut self) -> InventoryModel {
        self.resolve_children();
        self.resolve_all();

        let hosts = self.groups.get(ALL_GROUP).cloned().unwrap_or_default();

        InventoryModel {
            source: None,
            hosts,
            group_order: self.group_order,
            groups: self.groups,
            group_vars: self.group_vars,
            host_vars: self.host_vars,
            warnings: self.warnings,
        }
    }
}

/// Extract the body of a `[section]` header line
fn section_header(line: &str) -> Option<&str> {
    let body = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    if body.is_empty() || body.contains(']') {
        return None;
    }
    Some(body)
}

impl InventoryModel {
    /// Parse inventory text
    ///
    /// Never fails: malformed assignments are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut parser = InventoryParser::default();
        let mut section = Section::Ungrouped;

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(header) = section_header(line) {
                section = Section::from_header(header);
                parser.enter(&section);
                continue;
            }

            parser.line(&section, line);
        }

        parser.finish()
    }

    /// Load and parse an inventory file
    ///
    /// # Errors
    /// Returns `InventoryError::NotFound` if the path does not exist and
    /// `InventoryError::Io` if it cannot be read as UTF-8 text.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        if !path.exists() {
            return Err(InventoryError::NotFound(path.to_path_buf()));
        }

        let text = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut model = Self::parse(&text);
        model.source = Some(path.to_path_buf());

        debug!(
            hosts = model.total_hosts(),
            groups = model.group_order.len(),
            "inventory loaded"
        );

        Ok(model)
    }
}
