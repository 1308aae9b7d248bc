//! # Orchestrator configuration.
//!
//! [`OrchestratorConfig`] collects the process-wide settings of the core:
//! where the external executable lives, where job output lands, and the
//! defaults applied when a tenant's quota leaves a limit unset.
//!
//! # Example
//! ```
//! use std::path::PathBuf;
//! use fetchvisor::OrchestratorConfig;
//!
//! let mut cfg = OrchestratorConfig::default();
//! cfg.executable = PathBuf::from("/usr/local/bin/fetch-client");
//! cfg.downloads_dir = PathBuf::from("/var/lib/fetchvisor/downloads");
//! cfg.default_max_concurrent = 2;
//!
//! assert_eq!(cfg.default_max_concurrent, 2);
//! ```

use std::path::PathBuf;

/// Global configuration for the job orchestration core.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Path to the external download executable.
    pub executable: PathBuf,
    /// Root directory under which per-job output directories are created.
    pub downloads_dir: PathBuf,
    /// Concurrency ceiling applied when a tenant quota leaves `max_concurrent` unset.
    pub default_max_concurrent: usize,
    /// Pass the verify-all flag to the executable.
    pub verify_all: bool,
    /// Per-stream log ring buffer capacity (lines), shared by a stream's subscribers.
    pub log_capacity: usize,
}

impl Default for OrchestratorConfig {
    /// Provides a default configuration:
    /// - `executable = "fetch-client"` (deployments set an absolute path)
    /// - `downloads_dir = "./downloads"`
    /// - `default_max_concurrent = 1`
    /// - `verify_all = true`
    /// - `log_capacity = 1024`
    fn default() -> Self {
        Self {
            executable: PathBuf::from("fetch-client"),
            downloads_dir: PathBuf::from("./downloads"),
            default_max_concurrent: 1,
            verify_all: true,
            log_capacity: 1024,
        }
    }
}
