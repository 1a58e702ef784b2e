//! Selector expansion
//!
//! A selector is a list of tokens separated by `,` or `:`. Tokens prefixed
//! with `!` exclude hosts; all others include them. Inclusions are expanded
//! in selector order and exclusions never reorder the survivors.

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use crate::pattern::wildcard_match;
use crate::types::{ALL_GROUP, InventoryModel, ResolvedHosts, dedupe};

/// Number of sample hosts listed in a no-match error
const SAMPLE_HOST_LIMIT: usize = 5;

/// Selector split into inclusion and exclusion tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Tokens selecting hosts, in selector order
    pub include: Vec<String>,
    /// Tokens removing hosts (without the leading `!`)
    pub exclude: Vec<String>,
}

impl Selector {
    /// Tokenize a selector string
    ///
    /// Without any inclusion tokens (an empty selector, or only exclusions),
    /// inclusion defaults to `all`.
    #[must_use]
    pub fn parse(selector: &str) -> Self {
        let mut include = Vec::new();
        let mut exclude = Vec::new();

        for token in selector.split([',', ':']).map(str::trim) {
            if token.is_empty() {
                continue;
            }
            match token.strip_prefix('!') {
                Some(excluded) => {
                    let excluded = excluded.trim();
                    if !excluded.is_empty() {
                        exclude.push(excluded.to_string());
                    }
                }
                None => include.push(token.to_string()),
            }
        }

        if include.is_empty() {
            include.push(ALL_GROUP.to_string());
        }

        Self { include, exclude }
    }
}

impl InventoryModel {
    /// Expand a single selector token into hosts
    ///
    /// Resolution order: `all` (or empty), exact group, exact host, then a
    /// wildcard match against every known host.
    #[must_use]
    pub fn expand_token(&self, token: &str) -> Vec<String> {
        let token = token.trim();
        if token.is_empty() || token == ALL_GROUP {
            return self.hosts().to_vec();
        }
        if let Some(members) = self.group(token) {
            return members.to_vec();
        }
        if self.has_host(token) {
            return vec![token.to_string()];
        }

        let matched: Vec<String> = self
            .hosts()
            .iter()
            .filter(|host| wildcard_match(token, host))
            .cloned()
            .collect();

        if matched.is_empty() && token.contains(' ') {
            // Spaces mean the caller wrote prose, not a pattern
            debug!(token = %token, "token with spaces matched nothing");
        }
        matched
    }

    /// Resolve a selector into a concrete host list
    ///
    /// Never fails outright: an empty result carries an explanatory `error`,
    /// and a partial match carries a `warning`.
    #[instrument(skip(self), fields(hosts = self.total_hosts()))]
    pub fn resolve(&self, selector: &str) -> ResolvedHosts {
        let parsed = Selector::parse(selector);

        let mut included = Vec::new();
        let mut unmatched = Vec::new();
        for token in &parsed.include {
            let hosts = self.expand_token(token);
            if hosts.is_empty() {
                unmatched.push(token.clone());
            } else {
                included.extend(hosts);
            }
        }

        let excluded: HashSet<String> = parsed
            .exclude
            .iter()
            .flat_map(|token| self.expand_token(token))
            .collect();

        let hosts = dedupe(included.into_iter().filter(|host| !excluded.contains(host)));

        if hosts.is_empty() {
            let error = self.no_match_message(selector, &unmatched);
            warn!(selector = %selector, "selector matched no hosts");
            return ResolvedHosts {
                selector: selector.to_string(),
                hosts,
                warning: None,
                error: Some(error),
            };
        }

        let warning = if unmatched.is_empty() {
            None
        } else {
            warn!(selector = %selector, unmatched = ?unmatched, "some selector tokens matched nothing");
            Some(format!(
                "Some selectors didn't match: {}. Only matched hosts will be processed.",
                unmatched.join(", ")
            ))
        };

        debug!(count = hosts.len(), "selector resolved");

        ResolvedHosts {
            selector: selector.to_string(),
            hosts,
            warning,
            error: None,
        }
    }

    /// Build the diagnostic message for a selector that matched nothing
    fn no_match_message(&self, selector: &str, unmatched: &[String]) -> String {
        let mut message = format!("No hosts matched selector '{selector}'");

        if !unmatched.is_empty() {
            message.push_str(&format!(". Unmatched tokens: {}", unmatched.join(", ")));
            for token in unmatched {
                if let Some(suggested) = self.suggest_group(token) {
                    message.push_str(&format!(
                        ". Did you mean '{suggested}' instead of '{token}'?"
                    ));
                }
            }
        }

        if selector.contains(' ') && !selector.contains(',') {
            message.push_str(
                ". Note: Selectors with spaces are split. Use comma-separated groups \
                 like 'web,db' or just the group name 'web'",
            );
        }

        let groups = self.group_names();
        if !groups.is_empty() {
            message.push_str(&format!(". Available groups: {}", groups.join(", ")));
        }

        let sample: Vec<&str> = self
            .hosts()
            .iter()
            .take(SAMPLE_HOST_LIMIT)
            .map(String::as_str)
            .collect();
        if !sample.is_empty() {
            message.push_str(&format!(". Sample hosts: {}", sample.join(", ")));
        }

        message
    }

    /// Suggest a group for tokens like "web servers" or "dbhosts"
    fn suggest_group(&self, token: &str) -> Option<String> {
        if !token.contains("hosts") && !token.contains("servers") {
            return None;
        }
        let stripped = token
            .replace(" hosts", "")
            .replace(" servers", "")
            .replace("hosts", "")
            .replace("servers", "");
        let stripped = stripped.trim();

        (!stripped.is_empty() && stripped != token && self.has_group(stripped))
            .then(|| stripped.to_string())
    }
}
