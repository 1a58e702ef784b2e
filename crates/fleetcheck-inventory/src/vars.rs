//! Effective variable resolution
//!
//! Precedence, lowest to highest: `[all:vars]`, then every other group the
//! host belongs to in declaration order, then the host's inline assignments.

use crate::types::{ALL_GROUP, InventoryModel, Vars};

impl InventoryModel {
    /// Compute the effective variables for a host
    ///
    /// Later sources overwrite same-key values; nothing is ever removed.
    /// Unknown hosts still receive the `all` group variables.
    #[must_use]
    pub fn variables_for(&self, host: &str) -> Vars {
        let mut combined = self.group_vars(ALL_GROUP).cloned().unwrap_or_default();

        for (group, members) in self.groups() {
            if group == ALL_GROUP || !members.iter().any(|h| h == host) {
                continue;
            }
            if let Some(vars) = self.group_vars(group) {
                combined.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }

        if let Some(vars) = self.host_vars(host) {
            combined.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        combined
    }
}
