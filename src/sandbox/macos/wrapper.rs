//! Command wrapping for macOS sandbox-exec.

use std::path::Path;

use crate::error::SandboxError;
use crate::sandbox::macos::monitor::{LogMonitor, ViolationFilter, DEFAULT_LOG_BINARY};
use crate::sandbox::macos::profile::SeatbeltProfileBuilder;
use crate::sandbox::{EffectivePolicy, PlatformSandbox};
use crate::utils::{quote, Platform};
use crate::violation::ViolationSender;

/// Location of the Seatbelt launcher.
pub const SANDBOX_EXEC_PATH: &str = "/usr/bin/sandbox-exec";

/// Seatbelt backend.
#[derive(Debug, Clone)]
pub struct SeatbeltSandbox {
    sandbox_exec: String,
    log_binary: String,
}

impl Default for SeatbeltSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl SeatbeltSandbox {
    /// Create a backend using the system `sandbox-exec` and `log` binaries.
    pub fn new() -> Self {
        Self {
            sandbox_exec: SANDBOX_EXEC_PATH.to_string(),
            log_binary: DEFAULT_LOG_BINARY.to_string(),
        }
    }

    /// Use a different `sandbox-exec` binary.
    pub fn with_sandbox_exec(mut self, path: impl Into<String>) -> Self {
        self.sandbox_exec = path.into();
        self
    }

    /// Use a different binary for `log stream`.
    pub fn with_log_binary(mut self, binary: impl Into<String>) -> Self {
        self.log_binary = binary.into();
        self
    }
}

impl PlatformSandbox for SeatbeltSandbox {
    fn platform(&self) -> Platform {
        Platform::MacOS
    }

    fn check_dependencies(&self) -> bool {
        Path::new(&self.sandbox_exec).is_file()
    }

    fn policy_extension(&self) -> &'static str {
        "sb"
    }

    fn generate_policy(&self, policy: &EffectivePolicy, log_tag: &str) -> String {
        SeatbeltProfileBuilder::from_policy(policy, log_tag).build()
    }

    fn wrap_command(&self, policy_path: &Path, shell: &str, inner_command: &str) -> String {
        format!(
            "{} -f {} {} -c {}",
            quote(&self.sandbox_exec),
            quote(&policy_path.display().to_string()),
            quote(shell),
            quote(inner_command)
        )
    }

    fn start_monitor(
        &self,
        session_id: &str,
        filter: ViolationFilter,
        tx: ViolationSender,
    ) -> Result<LogMonitor, SandboxError> {
        LogMonitor::start(&self.log_binary, session_id, filter, tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::NetworkMode;

    #[test]
    fn test_wrap_command_shape() {
        let sandbox = SeatbeltSandbox::new();
        let wrapped = sandbox.wrap_command(
            Path::new("/tmp/policy.sb"),
            "/bin/zsh",
            "export SANDBOX_RUNTIME=1; echo 'hi'",
        );

        assert!(wrapped.starts_with("/usr/bin/sandbox-exec -f /tmp/policy.sb /bin/zsh -c "));
        let argv = shell_words::split(&wrapped).unwrap();
        assert_eq!(
            argv,
            vec![
                "/usr/bin/sandbox-exec",
                "-f",
                "/tmp/policy.sb",
                "/bin/zsh",
                "-c",
                "export SANDBOX_RUNTIME=1; echo 'hi'",
            ]
        );
    }

    #[test]
    fn test_check_dependencies_never_panics() {
        let missing = SeatbeltSandbox::new().with_sandbox_exec("/nonexistent/sandbox-exec");
        assert!(!missing.check_dependencies());

        #[cfg(target_os = "macos")]
        assert!(SeatbeltSandbox::new().check_dependencies());
    }

    #[test]
    fn test_generate_policy_from_effective_policy() {
        let policy = EffectivePolicy {
            allow_write: vec!["/work/out".to_string()],
            deny_write: vec!["/work/out/keep".to_string()],
            deny_read: vec!["/home/u/.ssh".to_string()],
            network: NetworkMode::Allowed,
            allow_local_binding: false,
            allow_pty: false,
        };

        let profile = SeatbeltSandbox::new().generate_policy(&policy, "CMD64_eA==_END_00000001");
        assert!(profile.contains("(allow file-write* (subpath \"/work/out\")"));
        assert!(profile.contains("(deny file-write* (subpath \"/work/out/keep\")"));
        assert!(profile.contains("(deny file-read* (subpath \"/home/u/.ssh\")"));
        assert!(profile.contains("(allow network*"));
        assert!(profile.contains("_END_00000001"));
    }
}
