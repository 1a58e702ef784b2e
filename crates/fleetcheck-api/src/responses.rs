//! Response types

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use fleetcheck_diag::{DiagnosticsRun, RunStatus, format_report};
use fleetcheck_inventory::{InventoryModel, ResolvedHosts, Vars};

/// Variables never echoed back to callers
pub const SENSITIVE_KEYS: &[&str] = &[
    "ansible_ssh_private_key_file",
    "ansible_ssh_pass",
    "ansible_password",
    "ansible_become_password",
    "ansible_vault_password",
    "ansible_ssh_common_args",
];

/// Hosts whose effective variables are included in an inventory view
pub const HOST_VARS_PREVIEW: usize = 10;

/// Copy of `vars` without credentials or connection secrets
#[must_use]
pub fn sanitize_vars(vars: &Vars) -> Vars {
    vars.iter()
        .filter(|(key, _)| !SENSITIVE_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Serialize a list of pairs as a JSON object, keeping list order
fn ordered_map<S, V>(entries: &[(String, V)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (key, value) in entries {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

// ============================================================================
// Inventory
// ============================================================================

/// Inventory summary safe to hand to callers
///
/// Group maps keep declaration order; host variables cover only the first
/// [`HOST_VARS_PREVIEW`] hosts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryView {
    pub inventory_path: String,
    pub total_hosts: usize,
    pub hosts: Vec<String>,
    #[serde(serialize_with = "ordered_map")]
    pub groups: Vec<(String, Vec<String>)>,
    #[serde(serialize_with = "ordered_map")]
    pub group_vars: Vec<(String, Vars)>,
    #[serde(serialize_with = "ordered_map")]
    pub host_vars: Vec<(String, Vars)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl InventoryView {
    #[must_use]
    pub fn from_model(model: &InventoryModel) -> Self {
        Self {
            inventory_path: model
                .source()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            total_hosts: model.total_hosts(),
            hosts: model.hosts().to_vec(),
            groups: model
                .groups()
                .map(|(name, hosts)| (name.to_string(), hosts.to_vec()))
                .collect(),
            group_vars: model
                .all_group_vars()
                .map(|(name, vars)| (name.to_string(), sanitize_vars(vars)))
                .collect(),
            host_vars: model
                .hosts()
                .iter()
                .take(HOST_VARS_PREVIEW)
                .map(|host| (host.clone(), sanitize_vars(&model.variables_for(host))))
                .collect(),
            warnings: model.warnings().to_vec(),
        }
    }
}

/// Effective variables of a single host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostVarsView {
    pub host: String,
    /// Whether the host appears in the inventory
    pub known: bool,
    pub vars: Vars,
}

impl HostVarsView {
    #[must_use]
    pub fn from_model(model: &InventoryModel, host: &str) -> Self {
        Self {
            host: host.to_string(),
            known: model.has_host(host),
            vars: sanitize_vars(&model.variables_for(host)),
        }
    }
}

/// Selector resolution outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedHostsView {
    pub selector: String,
    pub count: usize,
    pub hosts: Vec<String>,
    pub validated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ResolvedHosts> for ResolvedHostsView {
    fn from(resolved: ResolvedHosts) -> Self {
        Self {
            count: resolved.count(),
            validated: resolved.validated(),
            selector: resolved.selector,
            hosts: resolved.hosts,
            warning: resolved.warning,
            error: resolved.error,
        }
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Structured run plus its text rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsResponse {
    pub status: RunStatus,
    pub hosts: Vec<String>,
    pub report: DiagnosticsRun,
    pub summary: String,
}

impl From<DiagnosticsRun> for DiagnosticsResponse {
    fn from(run: DiagnosticsRun) -> Self {
        Self {
            status: run.status,
            hosts: run.hosts().into_iter().map(str::to_string).collect(),
            summary: format_report(&run),
            report: run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = "\
[web]
web1 ansible_host=10.0.0.1 ansible_ssh_pass=hunter2
web2

[db]
db1

[web:vars]
ansible_ssh_common_args=-o ProxyJump=bastion
http_port=8080

[all:vars]
ansible_user=ops
ansible_become_password=secret
";

    #[test]
    fn test_sanitize_vars() {
        let vars: Vars = [
            ("ansible_password", "x"),
            ("ansible_user", "ops"),
            ("ansible_vault_password", "y"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let clean = sanitize_vars(&vars);
        assert_eq!(clean.len(), 1);
        assert_eq!(clean["ansible_user"], "ops");
    }

    #[test]
    fn test_inventory_view() {
        let model = InventoryModel::parse(INVENTORY);
        let view = InventoryView::from_model(&model);

        assert_eq!(view.total_hosts, 3);
        assert_eq!(view.inventory_path, "");
        assert_eq!(view.host_vars.len(), 3);

        let (host, vars) = &view.host_vars[0];
        assert_eq!(host, "web1");
        assert_eq!(vars["ansible_host"], "10.0.0.1");
        assert_eq!(vars["http_port"], "8080");
        assert_eq!(vars["ansible_user"], "ops");
        assert!(!vars.contains_key("ansible_ssh_pass"));
        assert!(!vars.contains_key("ansible_ssh_common_args"));
        assert!(!vars.contains_key("ansible_become_password"));

        for (_, vars) in &view.group_vars {
            assert!(vars.keys().all(|k| !SENSITIVE_KEYS.contains(&k.as_str())));
        }
    }

    #[test]
    fn test_inventory_view_keeps_group_order() {
        let model = InventoryModel::parse("[zeta]\nz1\n\n[alpha]\na1\n");
        let json = serde_json::to_string(&InventoryView::from_model(&model)).unwrap();

        let zeta = json.find("\"zeta\"").unwrap();
        let alpha = json.find("\"alpha\"").unwrap();
        assert!(zeta < alpha);
        assert!(json.contains("\"groups\":{"));
    }

    #[test]
    fn test_host_vars_preview_limit() {
        let text: String = (0..15).map(|i| format!("host{i:02}\n")).collect();
        let model = InventoryModel::parse(&text);
        let view = InventoryView::from_model(&model);

        assert_eq!(view.total_hosts, 15);
        assert_eq!(view.host_vars.len(), HOST_VARS_PREVIEW);
        assert_eq!(view.host_vars[9].0, "host09");
    }

    #[test]
    fn test_resolved_view() {
        let model = InventoryModel::parse(INVENTORY);

        let view = ResolvedHostsView::from(model.resolve("web,cache"));
        assert_eq!(view.count, 2);
        assert!(view.validated);
        assert!(view.warning.is_some());

        let view = ResolvedHostsView::from(model.resolve("cache"));
        assert_eq!(view.count, 0);
        assert!(!view.validated);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("warning").is_none());
        assert!(json["error"].is_string());
    }

    #[test]
    fn test_host_vars_view() {
        let model = InventoryModel::parse(INVENTORY);

        let view = HostVarsView::from_model(&model, "db1");
        assert!(view.known);
        assert_eq!(view.vars.len(), 1);

        let view = HostVarsView::from_model(&model, "ghost");
        assert!(!view.known);
        assert_eq!(view.vars["ansible_user"], "ops");
    }
}
