//! # Account resolution for the external executable.
//!
//! The downloader authenticates against the upstream service with a stored
//! account. Credential storage and decryption belong to the surrounding
//! system; this core only consumes the already-decrypted result through the
//! [`AccountProvider`] seam.
//!
//! The secret is held as a [`SecretString`] and is exposed exactly once, at
//! the argv boundary of the process supervisor. It never reaches logs, job
//! errors, or audit payloads.

use async_trait::async_trait;
use secrecy::SecretString;

/// Resolved downloader account: username plus decrypted secret.
pub struct Account {
    /// Username passed to the external executable.
    pub username: String,
    /// Decrypted secret; redacted everywhere except the spawned argv.
    pub secret: SecretString,
}

impl Account {
    /// Creates an account from plaintext parts.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: SecretString::from(secret.into()),
        }
    }
}

/// Lookup of the account a tenant's jobs run under.
#[async_trait]
pub trait AccountProvider: Send + Sync + 'static {
    /// Returns the account for the tenant, or `None` when no usable account
    /// exists (the job fails with `account_not_found`).
    async fn account_for(&self, tenant_id: &str) -> Option<Account>;
}

/// Single fixed account shared by every tenant.
///
/// Suitable for single-account deployments and tests.
pub struct StaticAccount {
    username: String,
    secret: SecretString,
}

impl StaticAccount {
    /// Creates the provider from plaintext parts.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: SecretString::from(secret.into()),
        }
    }
}

#[async_trait]
impl AccountProvider for StaticAccount {
    async fn account_for(&self, _tenant_id: &str) -> Option<Account> {
        Some(Account {
            username: self.username.clone(),
            secret: self.secret.clone(),
        })
    }
}
