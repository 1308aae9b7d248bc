//! # Fixed argument contract of the external executable.
//!
//! The downloader is always invoked the same way: fixed flags, the content
//! id, the optional verify-all flag, the resolved account username, the
//! decrypted secret, and the target directory as the final argument.
//!
//! The secret is the only sensitive element. [`FetchCommand::args`] is the
//! single place it is exposed, and that output goes straight into the
//! spawned argv. Everything that gets logged or audited uses
//! [`FetchCommand::redacted_args`].

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use crate::content::ContentId;

const REDACTED: &str = "****";

/// One fully resolved invocation of the external downloader.
pub struct FetchCommand {
    executable: PathBuf,
    content_id: ContentId,
    verify_all: bool,
    username: String,
    secret: SecretString,
    target_dir: PathBuf,
}

impl FetchCommand {
    /// Builds the invocation for one job.
    pub fn new(
        executable: PathBuf,
        content_id: ContentId,
        verify_all: bool,
        username: String,
        secret: SecretString,
        target_dir: PathBuf,
    ) -> Self {
        Self {
            executable,
            content_id,
            verify_all,
            username,
            secret,
            target_dir,
        }
    }

    /// Path of the executable to spawn.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Directory the process writes into (also its working directory).
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    fn build_args(&self, secret: &str) -> Vec<String> {
        let mut args = vec![
            "--batch".to_string(),
            "--content".to_string(),
            self.content_id.as_str().to_string(),
        ];
        if self.verify_all {
            args.push("--verify-all".to_string());
        }
        args.push("--user".to_string());
        args.push(self.username.clone());
        args.push("--pass".to_string());
        args.push(secret.to_string());
        args.push(self.target_dir.display().to_string());
        args
    }

    /// Full argument list, secret included. Feed this to the spawned argv only.
    pub fn args(&self) -> Vec<String> {
        self.build_args(self.secret.expose_secret())
    }

    /// Argument list with the secret replaced; safe for logs and audit payloads.
    pub fn redacted_args(&self) -> Vec<String> {
        self.build_args(REDACTED)
    }

    /// One-line redacted rendering for the job's log stream.
    pub fn redacted_display(&self) -> String {
        format!(
            "{} {}",
            self.executable.display(),
            self.redacted_args().join(" ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(verify_all: bool) -> FetchCommand {
        FetchCommand::new(
            PathBuf::from("/usr/local/bin/fetch-client"),
            ContentId::extract("2234989491").unwrap(),
            verify_all,
            "dl-user".to_string(),
            SecretString::from("hunter2".to_string()),
            PathBuf::from("/var/downloads/2234989491"),
        )
    }

    #[test]
    fn argv_carries_the_secret_and_ends_with_target_dir() {
        let cmd = command(true);
        let args = cmd.args();
        assert!(args.contains(&"hunter2".to_string()));
        assert_eq!(args.last().unwrap(), "/var/downloads/2234989491");
        assert_eq!(args[0], "--batch");
        assert!(args.contains(&"--verify-all".to_string()));
    }

    #[test]
    fn redacted_args_never_contain_the_secret() {
        let cmd = command(true);
        let redacted = cmd.redacted_args();
        assert!(!redacted.iter().any(|a| a.contains("hunter2")));
        assert!(redacted.contains(&REDACTED.to_string()));
        // Same shape as the real argv, secret aside.
        assert_eq!(redacted.len(), cmd.args().len());
    }

    #[test]
    fn verify_all_flag_is_optional() {
        let with = command(true);
        let without = command(false);
        assert_eq!(with.args().len(), without.args().len() + 1);
        assert!(!without.args().contains(&"--verify-all".to_string()));
    }

    #[test]
    fn redacted_display_is_log_safe() {
        let display = command(true).redacted_display();
        assert!(display.starts_with("/usr/local/bin/fetch-client"));
        assert!(!display.contains("hunter2"));
    }
}
