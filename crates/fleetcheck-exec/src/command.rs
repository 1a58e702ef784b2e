//! Diagnostic command construction

/// Quote a single shell word
///
/// Words made only of safe characters are returned as is; anything else is
/// single-quoted with embedded quotes written as `'"'"'`.
#[must_use]
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\"'\"'"))
    }
}

/// Shell command running RISU and printing its JSON report on stdout
///
/// RISU writes its report to a temporary file which is printed and removed.
/// RISU's own console output goes to stderr so stdout carries only the
/// report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticCommand {
    risu_binary: String,
    plugin_filter: Option<String>,
    become_method: Option<String>,
}

impl DiagnosticCommand {
    pub fn new(risu_binary: impl Into<String>) -> Self {
        Self {
            risu_binary: risu_binary.into(),
            plugin_filter: None,
            become_method: None,
        }
    }

    /// Restrict RISU to plugins matching `filter` (ignored when blank)
    #[must_use]
    pub fn with_plugin_filter(mut self, filter: Option<&str>) -> Self {
        self.plugin_filter = filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);
        self
    }

    /// Run through a privilege escalation command such as `sudo`
    #[must_use]
    pub fn with_become(mut self, method: Option<&str>) -> Self {
        self.become_method = method
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        self
    }

    /// RISU argument vector, without the output flag
    #[must_use]
    pub fn risu_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [self.risu_binary.as_str(), "-l", "--numproc", "1"]
            .into_iter()
            .map(str::to_string)
            .collect();
        if let Some(filter) = &self.plugin_filter {
            args.push("-i".to_string());
            args.push(filter.clone());
        }
        args
    }

    /// Bash script body
    #[must_use]
    pub fn script(&self) -> String {
        let risu = self
            .risu_args()
            .iter()
            .map(|arg| shell_quote(arg))
            .collect::<Vec<_>>()
            .join(" ");
        format!(
            "set -euo pipefail; tmp=\"$(mktemp /tmp/risu-XXXXXX)\"; trap 'rm -f \"$tmp\"' EXIT; \
             {risu} --output \"$tmp\" >&2; cat \"$tmp\""
        )
    }

    /// Full command line, ready for `sh -c` locally or as an SSH remote command
    #[must_use]
    pub fn build(&self) -> String {
        let bash = format!("bash -lc {}", shell_quote(&self.script()));
        match &self.become_method {
            Some(method) => format!("{} -n {bash}", shell_quote(method)),
            None => bash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("risu"), "risu");
        assert_eq!(shell_quote("/usr/bin/risu"), "/usr/bin/risu");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), "'it'\"'\"'s'");
        assert_eq!(shell_quote("$HOME"), "'$HOME'");
    }

    #[test]
    fn test_risu_args() {
        let cmd = DiagnosticCommand::new("risu").with_plugin_filter(Some(" openstack "));
        assert_eq!(cmd.risu_args(), vec!["risu", "-l", "--numproc", "1", "-i", "openstack"]);

        let cmd = DiagnosticCommand::new("risu").with_plugin_filter(Some(""));
        assert_eq!(cmd.risu_args(), vec!["risu", "-l", "--numproc", "1"]);
    }

    #[test]
    fn test_script_quotes_filter() {
        let cmd = DiagnosticCommand::new("risu").with_plugin_filter(Some("core; rm -rf /"));
        let script = cmd.script();
        assert!(script.starts_with("set -euo pipefail;"));
        assert!(script.contains("risu -l --numproc 1 -i 'core; rm -rf /' --output \"$tmp\" >&2"));
        assert!(script.ends_with("cat \"$tmp\""));
    }

    #[test]
    fn test_build_with_become() {
        let plain = DiagnosticCommand::new("risu").build();
        assert!(plain.starts_with("bash -lc 'set -euo pipefail;"));

        let elevated = DiagnosticCommand::new("risu").with_become(Some("sudo")).build();
        assert!(elevated.starts_with("sudo -n bash -lc '"));
    }
}
