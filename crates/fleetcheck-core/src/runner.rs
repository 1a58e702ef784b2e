//! Diagnostic run orchestration
//!
//! Resolves a selector against the inventory, runs the diagnostic command on
//! every target in concurrent batches and folds the outcomes into a
//! [`DiagnosticsRun`]. Each host task owns its output; nothing is shared
//! between tasks except the executor factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use fleetcheck_diag::{
    DiagnosticsError, DiagnosticsRun, ExecutionSummary, HostDiagnosticResult, RunAggregator,
    extract_from_candidates, normalize, output_candidates,
};
use fleetcheck_exec::{
    ConnectionInfo, DiagnosticCommand, LocalExecutor, RemoteExecutor, SshExecutor,
};
use fleetcheck_inventory::{InventoryModel, Vars};

use crate::config::Settings;
use crate::error::CoreError;

/// Factory for per-host executors
///
/// Allows tests to inject mock executors.
#[async_trait]
pub trait ExecutorFactory: Send + Sync {
    /// Create an executor for the given connection
    async fn create_executor(&self, conn: &ConnectionInfo) -> Arc<dyn RemoteExecutor>;
}

/// Local process for local hosts, system `ssh` for everything else
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExecutorFactory;

#[async_trait]
impl ExecutorFactory for DefaultExecutorFactory {
    async fn create_executor(&self, conn: &ConnectionInfo) -> Arc<dyn RemoteExecutor> {
        if conn.local {
            Arc::new(LocalExecutor::new())
        } else {
            Arc::new(SshExecutor::new(conn.clone()))
        }
    }
}

/// A single diagnostic run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Selector expression; empty means every host
    pub selector: String,
    /// RISU plugin filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_filter: Option<String>,
    /// Inventory to use instead of the configured one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<PathBuf>,
}

impl RunRequest {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_plugin_filter(mut self, filter: impl Into<String>) -> Self {
        self.plugin_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_inventory(mut self, path: impl Into<PathBuf>) -> Self {
        self.inventory = Some(path.into());
        self
    }
}

/// What one host task hands back to the runner
#[derive(Debug)]
struct HostOutcome {
    result: Result<HostDiagnosticResult, DiagnosticsError>,
    /// Exit status, when the command ran to completion
    exit_code: Option<i32>,
}

impl HostOutcome {
    fn failed(error: DiagnosticsError) -> Self {
        Self {
            result: Err(error),
            exit_code: None,
        }
    }
}

/// Runs diagnostics across the fleet
pub struct DiagnosticsRunner {
    settings: Arc<Settings>,
    factory: Arc<dyn ExecutorFactory>,
}

impl DiagnosticsRunner {
    /// Create a runner using local and `ssh` executors
    #[must_use]
    pub fn new(settings: Arc<Settings>) -> Self {
        Self::with_factory(settings, Arc::new(DefaultExecutorFactory))
    }

    #[must_use]
    pub fn with_factory(settings: Arc<Settings>, factory: Arc<dyn ExecutorFactory>) -> Self {
        Self { settings, factory }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load the override inventory, or the configured one
    ///
    /// # Errors
    /// Returns `CoreError::Inventory` if the file is missing or unreadable
    pub fn load_inventory(&self, inventory: Option<&Path>) -> Result<InventoryModel, CoreError> {
        let path = inventory.map_or_else(|| self.settings.inventory_path(), Path::to_path_buf);
        Ok(InventoryModel::load(&path)?)
    }

    /// Hosts a run against `selector` would target
    ///
    /// # Errors
    /// Returns `CoreError::Selector` when nothing matches
    pub fn target_hosts(
        &self,
        model: &InventoryModel,
        selector: &str,
    ) -> Result<Vec<String>, CoreError> {
        let selector = selector.trim();
        if matches!(selector, "" | "all" | "*") && model.total_hosts() > 0 {
            return Ok(model.hosts().to_vec());
        }

        let resolved = model.resolve(selector);
        if !resolved.validated() {
            let message = resolved
                .error
                .unwrap_or_else(|| format!("No hosts matched selector '{selector}'"));
            return Err(CoreError::Selector(message));
        }
        if let Some(warning) = &resolved.warning {
            warn!(selector, warning = %warning, "continuing with partial selection");
        }
        Ok(resolved.hosts)
    }

    /// Run diagnostics on every host the request selects
    ///
    /// Host failures end up in the report's `errors`; only problems that
    /// prevent the run from starting are returned as `Err`.
    ///
    /// # Errors
    /// Returns `CoreError::Inventory` or `CoreError::Selector`
    #[instrument(skip(self, request), fields(selector = %request.selector))]
    pub async fn run(&self, request: &RunRequest) -> Result<DiagnosticsRun, CoreError> {
        let model = self.load_inventory(request.inventory.as_deref())?;
        let targets = self.target_hosts(&model, &request.selector)?;

        let command = DiagnosticCommand::new(self.settings.diagnostics.risu_binary.clone())
            .with_plugin_filter(request.plugin_filter.as_deref());
        let timeout = self.settings.command_timeout();
        let batch_size = self.settings.batch_size();

        info!(
            total_hosts = targets.len(),
            batch_size,
            "starting diagnostics run"
        );

        let mut aggregator = RunAggregator::new();
        let mut all_ok = true;
        let mut first_failure: Option<i32> = None;

        for batch in targets.chunks(batch_size) {
            let mut handles = Vec::new();

            for host in batch {
                let factory = Arc::clone(&self.factory);
                let vars = model.variables_for(host);
                let command = command.clone();
                let host_name = host.clone();

                let handle = tokio::spawn(async move {
                    diagnose_host(factory, host_name, vars, command, timeout).await
                });

                handles.push((host.clone(), handle));
            }

            for (name, handle) in handles {
                match handle.await {
                    Ok(outcome) => {
                        match outcome.exit_code {
                            Some(0) => {}
                            Some(code) => {
                                all_ok = false;
                                first_failure.get_or_insert(code);
                            }
                            None => all_ok = false,
                        }
                        if let Err(e) = &outcome.result {
                            error!(host = %name, error = %e, "diagnostics failed");
                        }
                        aggregator.record(outcome.result);
                    }
                    Err(e) => {
                        all_ok = false;
                        error!(host = %name, error = %e, "task panicked");
                        aggregator
                            .add_error(CoreError::TaskFailed(format!("{name}: {e}")).to_string());
                    }
                }
            }
        }

        let execution = ExecutionSummary::new(
            if all_ok { "ok" } else { "failed" },
            Some(first_failure.unwrap_or(0)),
        );
        Ok(aggregator.finish(&request.selector, execution))
    }
}

/// Execute and parse diagnostics for one host
#[instrument(skip(factory, vars, command, timeout), fields(host = %host))]
async fn diagnose_host(
    factory: Arc<dyn ExecutorFactory>,
    host: String,
    vars: Vars,
    command: DiagnosticCommand,
    timeout: Duration,
) -> HostOutcome {
    let conn = match ConnectionInfo::from_host_vars(&host, &vars) {
        Ok(conn) => conn,
        Err(e) => {
            return HostOutcome::failed(DiagnosticsError::Execution {
                host,
                message: e.to_string(),
            });
        }
    };

    let cmd = command.with_become(conn.become_method.as_deref()).build();
    let executor = factory.create_executor(&conn).await;
    debug!(executor = executor.executor_type(), "running diagnostics");

    let output = match executor.run_with_timeout(&cmd, timeout).await {
        Ok(output) => output,
        Err(e) => {
            return HostOutcome::failed(DiagnosticsError::Execution {
                host,
                message: e.to_string(),
            });
        }
    };

    let exit_code = Some(output.status);
    if !output.success() {
        let message = match output.failure_output() {
            "" => "no output".to_string(),
            text => text.to_string(),
        };
        return HostOutcome {
            result: Err(DiagnosticsError::ExecutionFailed {
                host,
                status: output.status,
                message,
            }),
            exit_code,
        };
    }

    let result = match extract_from_candidates(output_candidates(&output.stdout, &output.stderr)) {
        Some(payload) => {
            let mut result = normalize(&host, &payload);
            result
                .metadata
                .entry("execution")
                .or_insert_with(|| Value::String(executor.executor_type().to_string()));
            info!(
                checks = result.total_checks,
                failed = result.failed,
                "diagnostics collected"
            );
            Ok(result)
        }
        None => Err(DiagnosticsError::NoPayload { host }),
    };

    HostOutcome { result, exit_code }
}
