//! Platform-specific sandbox implementations.
//!
//! Each operating system provides one [`PlatformSandbox`]. The backend is picked
//! once from [`Platform::current`] and the rest of the crate talks only to the trait.

pub mod macos;

use std::path::Path;

use crate::error::SandboxError;
use crate::utils::Platform;
use crate::violation::ViolationSender;

use self::macos::{LogMonitor, SeatbeltSandbox, ViolationFilter};

/// How a policy treats network access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    /// Unrestricted network access.
    Allowed,
    /// No network access at all.
    Denied,
    /// Outbound traffic only to the local filtering proxies.
    Proxied {
        http_port: Option<u16>,
        socks_port: Option<u16>,
    },
}

/// The rule set a single wrap call compiles: caller configuration merged with the
/// built-in protections, with every path already normalized.
#[derive(Debug, Clone)]
pub struct EffectivePolicy {
    pub allow_write: Vec<String>,
    pub deny_write: Vec<String>,
    pub deny_read: Vec<String>,
    pub network: NetworkMode,
    pub allow_local_binding: bool,
    pub allow_pty: bool,
}

/// An OS-native sandbox backend.
pub trait PlatformSandbox: Send + Sync {
    /// The platform this backend targets.
    fn platform(&self) -> Platform;

    /// Whether the sandbox binary is available. Never fails.
    fn check_dependencies(&self) -> bool;

    /// Extension used for policy files.
    fn policy_extension(&self) -> &'static str;

    /// Compile a policy document tagged with `log_tag`.
    fn generate_policy(&self, policy: &EffectivePolicy, log_tag: &str) -> String;

    /// Build the command string that runs `inner_command` under `shell`,
    /// confined by the policy stored at `policy_path`.
    fn wrap_command(&self, policy_path: &Path, shell: &str, inner_command: &str) -> String;

    /// Start tailing denials for `session_id`. Must be called inside a tokio runtime.
    fn start_monitor(
        &self,
        session_id: &str,
        filter: ViolationFilter,
        tx: ViolationSender,
    ) -> Result<LogMonitor, SandboxError>;
}

/// Select the backend for a platform.
pub fn platform_sandbox(platform: Platform) -> Result<Box<dyn PlatformSandbox>, SandboxError> {
    match platform {
        Platform::MacOS => Ok(Box::new(SeatbeltSandbox::new())),
        other => Err(SandboxError::UnsupportedPlatform(format!(
            "no sandbox backend for {}",
            other.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_sandbox_selection() {
        let backend = platform_sandbox(Platform::MacOS).unwrap();
        assert_eq!(backend.platform(), Platform::MacOS);
        assert_eq!(backend.policy_extension(), "sb");

        assert!(matches!(
            platform_sandbox(Platform::Linux),
            Err(SandboxError::UnsupportedPlatform(_))
        ));
    }
}
