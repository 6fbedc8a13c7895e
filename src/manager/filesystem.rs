//! Effective filesystem policy: caller configuration merged with the built-in
//! protections that configuration cannot switch off.

use std::path::Path;

use crate::config::{
    NetworkConfig, SandboxRuntimeConfig, DANGEROUS_DIRECTORIES, DANGEROUS_FILES, GIT_CONFIG_FILE,
    GIT_HOOKS_DIR,
};
use crate::sandbox::{EffectivePolicy, NetworkMode};
use crate::utils::normalize_path_for_sandbox;

/// Paths that are writable in every sandbox.
pub const DEFAULT_WRITE_PATHS: &[&str] = &[
    "/dev/stdout",
    "/dev/stderr",
    "/dev/null",
    "/dev/tty",
    "/dev/dtracehelper",
    "/dev/autofs_nowait",
    "~/.npm/_logs",
];

/// Credential stores that are never readable.
pub const DEFAULT_DENY_READ_PATHS: &[&str] = &[
    "~/.ssh",
    "~/.aws",
    "~/.gnupg",
    "~/.kube",
    "~/.azure",
    "~/.config/gcloud",
    "~/.docker/config.json",
    "~/.netrc",
    "~/Library/Keychains",
];

/// Write-deny patterns for dangerous files under `cwd`, each as an exact path
/// and as a pattern matching at any depth.
pub fn mandatory_deny_write_patterns(cwd: &Path, allow_git_config: bool) -> Vec<String> {
    let cwd = cwd.display().to_string();
    let cwd = cwd.trim_end_matches('/');
    let mut patterns = Vec::new();

    for file in DANGEROUS_FILES {
        patterns.push(format!("{}/{}", cwd, file));
        patterns.push(format!("**/{}", file));
    }

    for dir in DANGEROUS_DIRECTORIES.iter().chain(std::iter::once(&GIT_HOOKS_DIR)) {
        patterns.push(format!("{}/{}", cwd, dir));
        patterns.push(format!("**/{}/**", dir));
    }

    if !allow_git_config {
        patterns.push(format!("{}/{}", cwd, GIT_CONFIG_FILE));
        patterns.push(format!("**/{}", GIT_CONFIG_FILE));
    }

    patterns
}

/// Decide how the network is confined.
pub fn network_mode(config: &NetworkConfig) -> NetworkMode {
    if !config.is_restricted() {
        return NetworkMode::Allowed;
    }

    if config.http_proxy_port.is_none() && config.socks_proxy_port.is_none() {
        tracing::warn!("allowedDomains is set but no proxy port is configured; denying all network access");
        return NetworkMode::Denied;
    }

    NetworkMode::Proxied {
        http_port: config.http_proxy_port,
        socks_port: config.socks_proxy_port,
    }
}

/// Merge the configuration with the default and mandatory layers, normalizing
/// every path against `cwd`. Computed afresh for each wrap call.
pub fn build_effective_policy(config: &SandboxRuntimeConfig, cwd: &Path) -> EffectivePolicy {
    let fs = &config.filesystem;
    let normalize = |paths: Vec<&str>| -> Vec<String> {
        let mut normalized: Vec<String> = Vec::with_capacity(paths.len());
        for path in paths {
            let path = normalize_path_for_sandbox(path, cwd);
            if !normalized.contains(&path) {
                normalized.push(path);
            }
        }
        normalized
    };

    let allow_write = normalize(
        DEFAULT_WRITE_PATHS
            .iter()
            .copied()
            .chain(fs.allow_write.iter().map(String::as_str))
            .collect(),
    );

    let deny_read = normalize(
        DEFAULT_DENY_READ_PATHS
            .iter()
            .copied()
            .chain(fs.deny_read.iter().map(String::as_str))
            .collect(),
    );

    let mandatory = mandatory_deny_write_patterns(cwd, fs.allow_git_config.unwrap_or(false));
    let deny_write = normalize(
        fs.deny_write
            .iter()
            .map(String::as_str)
            .chain(mandatory.iter().map(String::as_str))
            .collect(),
    );

    EffectivePolicy {
        allow_write,
        deny_write,
        deny_read,
        network: network_mode(&config.network),
        allow_local_binding: config.network.allow_local_binding.unwrap_or(false),
        allow_pty: config.allow_pty.unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilesystemConfig;

    const CWD: &str = "/work/project";

    #[test]
    fn test_mandatory_patterns_cover_hooks_and_git_config() {
        let patterns = mandatory_deny_write_patterns(Path::new(CWD), false);
        assert!(patterns.contains(&"/work/project/.git/hooks".to_string()));
        assert!(patterns.contains(&"**/.git/hooks/**".to_string()));
        assert!(patterns.contains(&"/work/project/.git/config".to_string()));
        assert!(patterns.contains(&"**/.git/config".to_string()));
        assert!(patterns.contains(&"/work/project/.bashrc".to_string()));
        assert!(patterns.contains(&"**/.bashrc".to_string()));
        assert!(patterns.contains(&"**/.vscode/**".to_string()));
    }

    #[test]
    fn test_git_config_opt_out_keeps_hooks() {
        let patterns = mandatory_deny_write_patterns(Path::new(CWD), true);
        assert!(!patterns.iter().any(|p| p.ends_with(".git/config")));
        assert!(patterns.contains(&"/work/project/.git/hooks".to_string()));
        assert!(patterns.contains(&"**/.git/hooks/**".to_string()));
    }

    #[test]
    fn test_effective_policy_merges_layers() {
        let config = SandboxRuntimeConfig {
            filesystem: FilesystemConfig {
                allow_write: vec!["out".to_string(), "./out".to_string()],
                deny_write: vec!["out/release".to_string()],
                deny_read: vec!["secrets".to_string(), "**/.env".to_string()],
                allow_git_config: None,
            },
            ..Default::default()
        };

        let policy = build_effective_policy(&config, Path::new(CWD));
        let home = dirs::home_dir().unwrap().display().to_string();

        assert!(policy.allow_write.contains(&"/dev/null".to_string()));
        assert_eq!(
            policy.allow_write.iter().filter(|p| *p == "/work/project/out").count(),
            1
        );
        assert!(policy.deny_read.contains(&format!("{}/.ssh", home)));
        assert!(policy.deny_read.contains(&"/work/project/secrets".to_string()));
        assert!(policy.deny_read.contains(&"**/.env".to_string()));
        assert_eq!(policy.deny_write[0], "/work/project/out/release");
        assert!(policy.deny_write.contains(&"/work/project/.git/hooks".to_string()));
        assert_eq!(policy.network, NetworkMode::Allowed);
        assert!(!policy.allow_pty);
    }

    #[test]
    fn test_network_mode_mapping() {
        let mut network = NetworkConfig::default();
        assert_eq!(network_mode(&network), NetworkMode::Allowed);

        network.allowed_domains = Some(vec![]);
        assert_eq!(network_mode(&network), NetworkMode::Allowed);

        network.allowed_domains = Some(vec!["github.com".to_string()]);
        assert_eq!(network_mode(&network), NetworkMode::Denied);

        network.http_proxy_port = Some(3128);
        assert_eq!(
            network_mode(&network),
            NetworkMode::Proxied {
                http_port: Some(3128),
                socks_port: None
            }
        );
    }
}
