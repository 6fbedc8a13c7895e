//! Sandbox manager - main orchestration module.

pub mod filesystem;
pub mod network;
pub mod state;

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::config::SandboxRuntimeConfig;
use crate::debug_log;
use crate::error::SandboxError;
use crate::sandbox::macos::{generate_log_tag, generate_session_id, ViolationFilter};
use crate::sandbox::{platform_sandbox, EffectivePolicy, PlatformSandbox};
use crate::utils::{resolve_shell, Platform};
use crate::violation::ViolationStream;

use self::state::{ManagerState, MonitorState};

pub use filesystem::{build_effective_policy, mandatory_deny_write_patterns, network_mode};
pub use network::{build_env_prefix, generate_proxy_env, generate_sandbox_env};

/// The sandbox manager - main entry point for sandbox operations.
///
/// One manager is one session: every policy it writes carries the same
/// session id, and one violation stream collects the denials of all commands
/// it wrapped.
pub struct SandboxManager {
    config: SandboxRuntimeConfig,
    backend: Box<dyn PlatformSandbox>,
    session_id: String,
    cwd: Option<PathBuf>,
    state: Mutex<ManagerState>,
}

impl SandboxManager {
    /// Create a manager using the backend for the current platform.
    pub fn new(config: SandboxRuntimeConfig) -> Result<Self, SandboxError> {
        let platform = Platform::current().ok_or_else(|| {
            SandboxError::UnsupportedPlatform(std::env::consts::OS.to_string())
        })?;
        Self::with_platform(config, platform_sandbox(platform)?)
    }

    /// Create a manager with an explicit backend.
    pub fn with_platform(
        config: SandboxRuntimeConfig,
        backend: Box<dyn PlatformSandbox>,
    ) -> Result<Self, SandboxError> {
        config.validate()?;

        let session_id = generate_session_id();
        tracing::info!(
            "Sandbox manager created for {} (session {})",
            backend.platform().name(),
            session_id
        );

        Ok(Self {
            config,
            backend,
            session_id,
            cwd: None,
            state: Mutex::new(ManagerState::new()),
        })
    }

    /// Resolve relative paths against `cwd` instead of the process directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Whether the sandbox binary is available.
    pub fn check_dependencies(&self) -> bool {
        self.backend.check_dependencies()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &SandboxRuntimeConfig {
        &self.config
    }

    pub fn platform(&self) -> Platform {
        self.backend.platform()
    }

    /// Take the violation stream. Returns `None` after the first call.
    pub fn take_violation_stream(&self) -> Option<ViolationStream> {
        self.state.lock().violation_stream.take()
    }

    /// Whether the violation monitor is currently running.
    pub fn is_monitoring(&self) -> bool {
        self.state.lock().monitor.is_running()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// The policy a wrap call would compile right now.
    pub fn effective_policy(&self) -> Result<EffectivePolicy, SandboxError> {
        let cwd = self.working_directory()?;
        Ok(build_effective_policy(&self.config, &cwd))
    }

    /// Wrap a command with sandbox restrictions.
    ///
    /// Writes a fresh policy file and returns the command string that runs
    /// `command` confined by it. Nothing is executed. The first call also
    /// starts violation monitoring when it is enabled.
    pub async fn wrap_with_sandbox(
        &self,
        command: &str,
        shell: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, SandboxError> {
        if self.is_disposed() {
            return Err(SandboxError::Disposed);
        }
        if cancel.map(|token| token.is_cancelled()).unwrap_or(false) {
            return Err(SandboxError::Cancelled);
        }

        let cwd = self.working_directory()?;
        let log_tag = generate_log_tag(command, &self.session_id);
        let policy = build_effective_policy(&self.config, &cwd);
        let document = self.backend.generate_policy(&policy, &log_tag);

        let policy_path = std::env::temp_dir().join(format!(
            "sandbox-guard-{}-{:016x}.{}",
            self.session_id,
            rand::random::<u64>(),
            self.backend.policy_extension()
        ));

        {
            let mut state = self.state.lock();
            if state.disposed {
                return Err(SandboxError::Disposed);
            }
            state.policy_files.push(policy_path.clone());
        }

        write_policy_file(&policy_path, &document, cancel).await?;
        self.discard_if_disposed(&policy_path).await?;
        debug_log!("Wrote sandbox policy to {}", policy_path.display());

        let env_prefix = build_env_prefix(&generate_sandbox_env(policy.network));
        let shell = resolve_shell(shell);
        let wrapped = self.backend.wrap_command(
            &policy_path,
            &shell,
            &format!("{}{}", env_prefix, command),
        );

        if self.config.monitoring_enabled() {
            self.ensure_monitor();
        }

        debug_log!("Wrapped command: {}", wrapped);
        Ok(wrapped)
    }

    /// Stop monitoring, close the violation stream and delete the policy
    /// files written so far. Safe to call more than once.
    pub async fn dispose(&self) {
        let Some((monitor, policy_files)) = self.state.lock().begin_dispose() else {
            return;
        };

        if let MonitorState::Running(mut monitor) = monitor {
            monitor.stop().await;
        }

        for path in policy_files {
            remove_policy_file(&path).await;
        }

        tracing::info!("Sandbox manager disposed (session {})", self.session_id);
    }

    /// Dispose may have run while the policy was being written, in which case
    /// its cleanup missed the file.
    async fn discard_if_disposed(&self, policy_path: &Path) -> Result<(), SandboxError> {
        if !self.is_disposed() {
            return Ok(());
        }

        remove_policy_file(policy_path).await;
        Err(SandboxError::Disposed)
    }

    /// Start the monitor on first use. Failure disables monitoring for the
    /// rest of the session.
    fn ensure_monitor(&self) {
        let mut state = self.state.lock();
        if !matches!(state.monitor, MonitorState::Idle) {
            return;
        }

        let Some(tx) = state.violation_tx.clone() else {
            state.monitor = MonitorState::Unavailable;
            return;
        };

        let filter = ViolationFilter::new(self.config.ignore_patterns());
        state.monitor = match self.backend.start_monitor(&self.session_id, filter, tx) {
            Ok(monitor) => MonitorState::Running(monitor),
            Err(e) => {
                tracing::warn!("Violation monitoring unavailable: {}", e);
                MonitorState::Unavailable
            }
        };
    }

    fn working_directory(&self) -> Result<PathBuf, SandboxError> {
        match self.cwd {
            Some(ref cwd) => Ok(cwd.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

async fn remove_policy_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove policy file {}: {}", path.display(), e);
        }
    }
}

/// Create `path` exclusively and write the policy, giving up if `cancel` fires first.
async fn write_policy_file(
    path: &Path,
    contents: &str,
    cancel: Option<&CancellationToken>,
) -> Result<(), SandboxError> {
    let write = async {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(contents.as_bytes()).await?;
        file.flush().await?;
        Ok::<(), std::io::Error>(())
    };

    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(SandboxError::Cancelled),
            result = write => result.map_err(SandboxError::from),
        },
        None => write.await.map_err(SandboxError::from),
    }
}
