//! Per-tenant admission control: active-job accounting against quota ceilings.

mod controller;
mod quota;

pub use controller::{AdmissionController, AdmissionError};
pub use quota::{QuotaSource, StaticQuotas, TenantQuota};
