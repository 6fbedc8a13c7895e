//! Sandbox Guard - confine shell commands with the operating system's native sandbox.
//!
//! The crate compiles a deny-by-default policy from a [`SandboxRuntimeConfig`],
//! writes it to disk and hands back a wrapped command string. It never runs the
//! command itself.
//! - macOS: Uses Seatbelt/sandbox-exec, with denials tailed from `log stream`

pub mod config;
pub mod error;
pub mod manager;
pub mod sandbox;
pub mod utils;
pub mod violation;

pub use config::{FilesystemConfig, NetworkConfig, SandboxRuntimeConfig};
pub use error::{ConfigError, Result, SandboxError};
pub use manager::SandboxManager;
pub use sandbox::{EffectivePolicy, NetworkMode, PlatformSandbox};
pub use violation::{
    annotate_stderr_with_sandbox_failures, SandboxViolation, ViolationKind, ViolationStream,
};

/// Re-export commonly used items.
pub mod prelude {
    pub use crate::config::SandboxRuntimeConfig;
    pub use crate::error::{Result, SandboxError};
    pub use crate::manager::SandboxManager;
    pub use crate::violation::{SandboxViolation, ViolationKind, ViolationStream};
}
