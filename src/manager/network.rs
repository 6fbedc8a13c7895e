//! Environment exported to the confined command.

use crate::sandbox::NetworkMode;
use crate::utils::quote;

/// Variable marking a process as running inside the sandbox.
pub const SANDBOX_MARKER_ENV: &str = "SANDBOX_RUNTIME";

/// Destinations that bypass the proxies.
pub const NO_PROXY_HOSTS: &str =
    "localhost,127.0.0.1,::1,*.local,.local,169.254.0.0/16,10.0.0.0/8,172.16.0.0/12,192.168.0.0/16";

/// Generate proxy environment variables in both cases for tool compatibility.
pub fn generate_proxy_env(http_port: Option<u16>, socks_port: Option<u16>) -> Vec<(String, String)> {
    let mut env = Vec::new();

    if let Some(port) = http_port {
        let http_proxy = format!("http://localhost:{}", port);
        for key in ["HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy"] {
            env.push((key.to_string(), http_proxy.clone()));
        }
    }

    if let Some(port) = socks_port {
        let socks_proxy = format!("socks5h://localhost:{}", port);
        for key in ["ALL_PROXY", "all_proxy"] {
            env.push((key.to_string(), socks_proxy.clone()));
        }
        // For git over SSH
        env.push((
            "GIT_SSH_COMMAND".to_string(),
            format!("ssh -o ProxyCommand='nc -X 5 -x localhost:{} %h %p'", port),
        ));
    }

    if !env.is_empty() {
        env.push(("NO_PROXY".to_string(), NO_PROXY_HOSTS.to_string()));
        env.push(("no_proxy".to_string(), NO_PROXY_HOSTS.to_string()));
    }

    env
}

/// All variables exported to the confined command for a given network mode.
pub fn generate_sandbox_env(network: NetworkMode) -> Vec<(String, String)> {
    let mut env = vec![(SANDBOX_MARKER_ENV.to_string(), "1".to_string())];
    if let NetworkMode::Proxied {
        http_port,
        socks_port,
    } = network
    {
        env.extend(generate_proxy_env(http_port, socks_port));
    }
    env
}

/// Render variables as a shell prefix (`export K=V ...; `).
pub fn build_env_prefix(env: &[(String, String)]) -> String {
    if env.is_empty() {
        return String::new();
    }

    let assignments: Vec<String> = env
        .iter()
        .map(|(key, value)| format!("{}={}", key, quote(value)))
        .collect();
    format!("export {}; ", assignments.join(" "))
}
