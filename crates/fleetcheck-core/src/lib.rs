//! fleetcheck-core: settings and run orchestration
//!
//! Holds the explicit [`Settings`] value and the [`DiagnosticsRunner`] that
//! ties inventory resolution, command execution and payload processing
//! together.

pub mod config;
pub mod error;
pub mod runner;

pub use config::{DiagnosticsConfig, PathsConfig, Settings};
pub use error::CoreError;
pub use runner::{DefaultExecutorFactory, DiagnosticsRunner, ExecutorFactory, RunRequest};
