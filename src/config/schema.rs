//! Configuration schema types.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SandboxError};

/// Network restriction configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Domains reachable through the filtering proxy (e.g., "github.com", "*.npmjs.org").
    /// `None` or an empty list leaves the network unrestricted.
    #[serde(default)]
    pub allowed_domains: Option<Vec<String>>,

    /// Allow binding to and accepting connections on localhost.
    #[serde(default)]
    pub allow_local_binding: Option<bool>,

    /// External HTTP proxy port.
    #[serde(default)]
    pub http_proxy_port: Option<u16>,

    /// External SOCKS proxy port.
    #[serde(default)]
    pub socks_proxy_port: Option<u16>,
}

impl NetworkConfig {
    /// Whether egress must be funnelled through the proxies.
    pub fn is_restricted(&self) -> bool {
        self.allowed_domains
            .as_ref()
            .map(|domains| !domains.is_empty())
            .unwrap_or(false)
    }
}

/// Filesystem restriction configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemConfig {
    /// Paths/patterns denied for reading.
    #[serde(default)]
    pub deny_read: Vec<String>,

    /// Paths allowed for writing.
    #[serde(default)]
    pub allow_write: Vec<String>,

    /// Paths denied for writing (overrides allow_write).
    #[serde(default)]
    pub deny_write: Vec<String>,

    /// Allow writes to .git/config.
    #[serde(default)]
    pub allow_git_config: Option<bool>,
}

/// Main sandbox configuration. Immutable once handed to a manager.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SandboxRuntimeConfig {
    /// Network restriction configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Filesystem restriction configuration.
    #[serde(default)]
    pub filesystem: FilesystemConfig,

    /// Substrings that suppress matching violations from reporting.
    #[serde(default)]
    pub ignore_violations: Option<Vec<String>>,

    /// Allow pseudo-terminal access.
    #[serde(default)]
    pub allow_pty: Option<bool>,

    /// Tail the system log for policy violations (default: true).
    #[serde(default)]
    pub enable_violation_monitoring: Option<bool>,
}

/// Files that are never writable, wherever they appear under the working tree.
pub const DANGEROUS_FILES: &[&str] = &[
    ".gitconfig",
    ".gitmodules",
    ".bashrc",
    ".bash_profile",
    ".bash_login",
    ".profile",
    ".zshrc",
    ".zprofile",
    ".zshenv",
    ".zlogin",
    ".ripgreprc",
    ".mcp.json",
    ".npmrc",
    ".yarnrc",
    ".yarnrc.yml",
];

/// Directories that are never writable, wherever they appear under the working tree.
pub const DANGEROUS_DIRECTORIES: &[&str] = &[".vscode", ".idea", ".claude/commands", ".claude/agents"];

/// Version-control hook directory. Always protected.
pub const GIT_HOOKS_DIR: &str = ".git/hooks";

/// Version-control config file. Protected unless `allowGitConfig` is set.
pub const GIT_CONFIG_FILE: &str = ".git/config";

impl SandboxRuntimeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), SandboxError> {
        if let Some(ref domains) = self.network.allowed_domains {
            for domain in domains {
                validate_domain_pattern(domain)?;
            }
        }

        for port in [self.network.http_proxy_port, self.network.socks_proxy_port]
            .into_iter()
            .flatten()
        {
            if port == 0 {
                return Err(ConfigError::ValidationError(
                    "proxy port must be non-zero".to_string(),
                )
                .into());
            }
        }

        let fs = &self.filesystem;
        for path in fs.allow_write.iter().chain(&fs.deny_write).chain(&fs.deny_read) {
            validate_path_pattern(path)?;
        }

        Ok(())
    }

    /// Whether violation monitoring should run.
    pub fn monitoring_enabled(&self) -> bool {
        self.enable_violation_monitoring.unwrap_or(true)
    }

    /// Caller-supplied ignore substrings.
    pub fn ignore_patterns(&self) -> Vec<String> {
        self.ignore_violations.clone().unwrap_or_default()
    }
}

/// Validate a filesystem path pattern.
fn validate_path_pattern(pattern: &str) -> Result<(), SandboxError> {
    if pattern.trim().is_empty() {
        return Err(ConfigError::InvalidPathPattern {
            pattern: pattern.to_string(),
            reason: "path pattern cannot be empty".to_string(),
        }
        .into());
    }

    if pattern.contains('\0') || pattern.contains('\n') {
        return Err(ConfigError::InvalidPathPattern {
            pattern: pattern.escape_debug().to_string(),
            reason: "path pattern contains a control character".to_string(),
        }
        .into());
    }

    Ok(())
}

/// Validate a domain pattern.
fn validate_domain_pattern(pattern: &str) -> Result<(), SandboxError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidDomainPattern {
            pattern: pattern.to_string(),
            reason: "domain pattern cannot be empty".to_string(),
        }
        .into());
    }

    if pattern == "*" {
        return Err(ConfigError::InvalidDomainPattern {
            pattern: pattern.to_string(),
            reason: "wildcard-only patterns are not allowed".to_string(),
        }
        .into());
    }

    let check_part = pattern.strip_prefix("*.").unwrap_or(pattern);

    // *.com and friends
    if pattern.starts_with("*.") && !check_part.contains('.') && check_part.len() <= 4 {
        return Err(ConfigError::InvalidDomainPattern {
            pattern: pattern.to_string(),
            reason: "pattern is too broad (matches entire TLD)".to_string(),
        }
        .into());
    }

    if pattern.contains(':') {
        return Err(ConfigError::InvalidDomainPattern {
            pattern: pattern.to_string(),
            reason: "domain patterns cannot include port numbers".to_string(),
        }
        .into());
    }

    for ch in check_part.chars() {
        if !ch.is_ascii_alphanumeric() && ch != '.' && ch != '-' && ch != '_' {
            return Err(ConfigError::InvalidDomainPattern {
                pattern: pattern.to_string(),
                reason: format!("invalid character '{}' in domain pattern", ch),
            }
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_pattern_validation() {
        assert!(validate_domain_pattern("example.com").is_ok());
        assert!(validate_domain_pattern("*.example.com").is_ok());
        assert!(validate_domain_pattern("localhost").is_ok());
        assert!(validate_domain_pattern("api.github.com").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*").is_err());
        assert!(validate_domain_pattern("*.com").is_err());
        assert!(validate_domain_pattern("example.com:8080").is_err());
        assert!(validate_domain_pattern("exa mple.com").is_err());
    }

    #[test]
    fn test_network_restriction() {
        let mut network = NetworkConfig::default();
        assert!(!network.is_restricted());

        network.allowed_domains = Some(vec![]);
        assert!(!network.is_restricted());

        network.allowed_domains = Some(vec!["github.com".to_string()]);
        assert!(network.is_restricted());
    }

    #[test]
    fn test_validate_rejects_empty_path() {
        let config = SandboxRuntimeConfig {
            filesystem: FilesystemConfig {
                deny_read: vec!["  ".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SandboxError::Config(ConfigError::InvalidPathPattern { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let config = SandboxRuntimeConfig {
            network: NetworkConfig {
                http_proxy_port: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SandboxError::Config(ConfigError::ValidationError(_)))
        ));
    }

    #[test]
    fn test_monitoring_defaults_on() {
        let config = SandboxRuntimeConfig::default();
        assert!(config.monitoring_enabled());
        assert!(config.ignore_patterns().is_empty());
    }
}
