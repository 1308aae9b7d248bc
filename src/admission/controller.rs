//! # Admission controller: per-tenant concurrency accounting.
//!
//! Tracks how many jobs each tenant has live and admits or rejects new runs
//! against the ceiling resolved for that submission. Admission happens after
//! the job record exists but **before** the process spawns, so the limit
//! bounds actual resource consumption (OS process + disk), not API intake.
//!
//! ## Rules
//! - check + increment are atomic under one lock (no admit/admit race).
//! - [`release`](AdmissionController::release) must run exactly once per
//!   **admitted** job, on every terminal path; a denied or never-admitted job
//!   must not release.
//! - Counters at zero are dropped from the table so idle tenants cost nothing.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

/// Reasons a tenant's job was not admitted.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    /// The tenant is already at or above its concurrency ceiling.
    #[error("tenant at concurrency limit: {active}/{ceiling}")]
    LimitExceeded {
        /// Live jobs at the time of the check.
        active: usize,
        /// Ceiling the check was made against.
        ceiling: usize,
    },
}

/// Per-tenant active-job counters.
pub struct AdmissionController {
    active: Mutex<HashMap<String, usize>>,
}

impl AdmissionController {
    /// Creates an empty controller.
    pub fn new() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Attempts to take a slot for `tenant_id` against `ceiling`.
    ///
    /// The ceiling is resolved by the caller per submission (quota lookup with
    /// config fallback) and is not cached here.
    pub async fn try_admit(&self, tenant_id: &str, ceiling: usize) -> Result<(), AdmissionError> {
        let mut active = self.active.lock().await;
        let count = active.entry(tenant_id.to_string()).or_insert(0);
        if *count >= ceiling {
            let observed = *count;
            // Drop the zero entry we may have just created.
            if observed == 0 {
                active.remove(tenant_id);
            }
            return Err(AdmissionError::LimitExceeded {
                active: observed,
                ceiling,
            });
        }
        *count += 1;
        Ok(())
    }

    /// Returns a previously admitted slot.
    ///
    /// A release with no matching admit is logged and ignored; the counter
    /// never underflows.
    pub async fn release(&self, tenant_id: &str) {
        let mut active = self.active.lock().await;
        match active.get_mut(tenant_id) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                active.remove(tenant_id);
            }
            None => {
                warn!(tenant = tenant_id, "release without matching admission");
            }
        }
    }

    /// Current live-job count for a tenant (0 when unknown).
    pub async fn active_count(&self, tenant_id: &str) -> usize {
        self.active.lock().await.get(tenant_id).copied().unwrap_or(0)
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn admits_up_to_ceiling_then_denies() {
        let ctl = AdmissionController::new();
        assert!(ctl.try_admit("k", 2).await.is_ok());
        assert!(ctl.try_admit("k", 2).await.is_ok());
        assert_eq!(
            ctl.try_admit("k", 2).await,
            Err(AdmissionError::LimitExceeded {
                active: 2,
                ceiling: 2
            })
        );
        assert_eq!(ctl.active_count("k").await, 2);
    }

    #[tokio::test]
    async fn release_frees_a_slot() {
        let ctl = AdmissionController::new();
        ctl.try_admit("k", 1).await.unwrap();
        assert!(ctl.try_admit("k", 1).await.is_err());

        ctl.release("k").await;
        assert_eq!(ctl.active_count("k").await, 0);
        assert!(ctl.try_admit("k", 1).await.is_ok());
    }

    #[tokio::test]
    async fn zero_ceiling_denies_without_leaking_an_entry() {
        let ctl = AdmissionController::new();
        assert!(ctl.try_admit("k", 0).await.is_err());
        assert_eq!(ctl.active_count("k").await, 0);
    }

    #[tokio::test]
    async fn tenants_are_independent() {
        let ctl = AdmissionController::new();
        ctl.try_admit("a", 1).await.unwrap();
        assert!(ctl.try_admit("b", 1).await.is_ok());
        assert!(ctl.try_admit("a", 1).await.is_err());
    }

    #[tokio::test]
    async fn unmatched_release_is_ignored() {
        let ctl = AdmissionController::new();
        ctl.release("ghost").await;
        assert_eq!(ctl.active_count("ghost").await, 0);
    }

    #[tokio::test]
    async fn concurrent_admissions_never_exceed_ceiling() {
        let ctl = Arc::new(AdmissionController::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let ctl = ctl.clone();
            handles.push(tokio::spawn(
                async move { ctl.try_admit("k", 5).await.is_ok() },
            ));
        }
        let mut admitted = 0;
        for h in handles {
            if h.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
        assert_eq!(ctl.active_count("k").await, 5);
    }
}
