//! Seatbelt profile generation for macOS sandbox.

use crate::sandbox::macos::glob::{glob_static_prefix, glob_to_seatbelt_regex};
use crate::sandbox::{EffectivePolicy, NetworkMode};
use crate::utils::{contains_glob_chars, get_ancestor_directories};

/// Maximum length of the encoded command embedded in a log tag.
const MAX_ENCODED_COMMAND_LEN: usize = 100;

/// Temp directories that are always writable, with their /private aliases.
const TEMP_WRITE_PATHS: &[&str] = &["/tmp", "/private/tmp", "/var/folders", "/private/var/folders"];

/// Permissions every process needs just to start, as (operation, filter) pairs.
const ESSENTIAL_RULES: &[(&str, &str)] = &[
    ("process-exec", ""),
    ("process-fork", ""),
    ("process-info*", "(target same-sandbox)"),
    ("signal", "(target same-sandbox)"),
    ("mach-priv-task-port", "(target same-sandbox)"),
    ("user-preference-read", ""),
    (
        "mach-lookup",
        "(global-name \"com.apple.audio.systemsoundserver\") \
         (global-name \"com.apple.distributed_notifications@Uv3\") \
         (global-name \"com.apple.FontObjectsServer\") \
         (global-name \"com.apple.fonts\") \
         (global-name \"com.apple.logd\") \
         (global-name \"com.apple.lsd.mapdb\") \
         (global-name \"com.apple.PowerManagement.control\") \
         (global-name \"com.apple.system.logger\") \
         (global-name \"com.apple.system.notification_center\") \
         (global-name \"com.apple.trustd.agent\") \
         (global-name \"com.apple.system.opendirectoryd.libinfo\") \
         (global-name \"com.apple.system.opendirectoryd.membership\") \
         (global-name \"com.apple.bsd.dirhelper\") \
         (global-name \"com.apple.securityd.xpc\") \
         (global-name \"com.apple.coreservices.launchservicesd\")",
    ),
    ("ipc-posix-shm", ""),
    ("ipc-posix-sem", ""),
    ("sysctl-read", ""),
    (
        "file-ioctl",
        "(literal \"/dev/null\") (literal \"/dev/zero\") (literal \"/dev/random\") \
         (literal \"/dev/urandom\") (literal \"/dev/dtracehelper\") (literal \"/dev/tty\")",
    ),
    (
        "file-ioctl file-read-data file-write-data",
        "(require-all (literal \"/dev/null\") (vnode-type CHARACTER-DEVICE))",
    ),
];

/// Generate a random session identifier (8 hex characters).
pub fn generate_session_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    format!("{:08x}", rng.gen::<u32>())
}

/// Generate the diagnostic tag for a command within a session.
///
/// Format: `CMD64_<base64 of the command, truncated>_END_<session>`.
pub fn generate_log_tag(command: &str, session_id: &str) -> String {
    use base64::Engine;
    let encoded = base64::engine::general_purpose::STANDARD.encode(command);
    let truncated = &encoded[..encoded.len().min(MAX_ENCODED_COMMAND_LEN)];
    format!("CMD64_{}_END_{}", truncated, session_id)
}

/// Fluent builder for a Seatbelt profile.
///
/// Paths are expected to be normalized already; duplicates are dropped while
/// keeping first-seen order.
#[derive(Debug, Clone)]
pub struct SeatbeltProfileBuilder {
    log_tag: String,
    allow_write: Vec<String>,
    deny_write: Vec<String>,
    deny_read: Vec<String>,
    network: NetworkMode,
    allow_pty: bool,
    allow_local_binding: bool,
}

impl SeatbeltProfileBuilder {
    /// Start a profile whose rules all carry `log_tag`.
    pub fn new(log_tag: impl Into<String>) -> Self {
        Self {
            log_tag: log_tag.into(),
            allow_write: Vec::new(),
            deny_write: Vec::new(),
            deny_read: Vec::new(),
            network: NetworkMode::Denied,
            allow_pty: false,
            allow_local_binding: false,
        }
    }

    /// Start a profile from a merged policy.
    pub fn from_policy(policy: &EffectivePolicy, log_tag: impl Into<String>) -> Self {
        Self::new(log_tag)
            .allow_write(policy.allow_write.iter().cloned())
            .deny_write(policy.deny_write.iter().cloned())
            .deny_read(policy.deny_read.iter().cloned())
            .network(policy.network)
            .allow_local_binding(policy.allow_local_binding)
            .allow_pty(policy.allow_pty)
    }

    /// Add paths the sandboxed process may write.
    pub fn allow_write<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_unique(&mut self.allow_write, paths);
        self
    }

    /// Add paths the sandboxed process may never write.
    pub fn deny_write<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_unique(&mut self.deny_write, paths);
        self
    }

    /// Add paths the sandboxed process may never read.
    pub fn deny_read<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend_unique(&mut self.deny_read, paths);
        self
    }

    /// Set the network mode.
    pub fn network(mut self, mode: NetworkMode) -> Self {
        self.network = mode;
        self
    }

    /// Enable pseudo-terminal support.
    pub fn allow_pty(mut self, allow: bool) -> Self {
        self.allow_pty = allow;
        self
    }

    /// Allow binding and accepting connections on localhost.
    pub fn allow_local_binding(mut self, allow: bool) -> Self {
        self.allow_local_binding = allow;
        self
    }

    /// Assemble the profile.
    pub fn build(&self) -> String {
        let mut profile = String::new();

        // Version and deny default
        profile.push_str("(version 1)\n");
        profile.push_str(&format!(
            "(deny default (with message \"{}\"))\n",
            escape_seatbelt_string(&self.log_tag)
        ));
        profile.push_str(&format!("; LogTag: {}\n\n", self.log_tag));

        profile.push_str("; Essential permissions\n");
        for (operation, filter) in ESSENTIAL_RULES {
            self.push_rule(&mut profile, "allow", operation, filter);
        }
        profile.push('\n');

        profile.push_str("; Network\n");
        self.push_network_rules(&mut profile);
        profile.push('\n');

        profile.push_str("; File read\n");
        self.push_read_rules(&mut profile);
        profile.push('\n');

        profile.push_str("; File write\n");
        self.push_write_rules(&mut profile);

        if self.allow_pty {
            profile.push_str("\n; PTY\n");
            self.push_rule(&mut profile, "allow", "pseudo-tty", "");
            self.push_rule(
                &mut profile,
                "allow",
                "file-ioctl",
                "(literal \"/dev/ptmx\") (regex #\"^/dev/ttys\")",
            );
            self.push_rule(
                &mut profile,
                "allow",
                "file-read* file-write*",
                "(literal \"/dev/ptmx\") (regex #\"^/dev/ttys\")",
            );
        }

        profile
    }

    fn push_network_rules(&self, profile: &mut String) {
        let (http_port, socks_port) = match self.network {
            NetworkMode::Denied | NetworkMode::Proxied { http_port: None, socks_port: None } => {
                self.push_rule(profile, "deny", "network*", "");
                return;
            }
            NetworkMode::Allowed => (None, None),
            NetworkMode::Proxied {
                http_port,
                socks_port,
            } => (http_port, socks_port),
        };

        self.push_rule(profile, "allow", "network*", "");

        if self.allow_local_binding {
            self.push_rule(profile, "allow", "network-bind", "(local ip \"localhost:*\")");
            self.push_rule(profile, "allow", "network-inbound", "(local ip \"localhost:*\")");
        }

        if self.network == NetworkMode::Allowed {
            return;
        }

        // Domain filtering happens in the proxies; they are the only egress.
        self.push_rule(profile, "deny", "network-outbound", "(remote ip \"*:*\")");
        for port in [http_port, socks_port].into_iter().flatten() {
            self.push_rule(
                profile,
                "allow",
                "network-outbound",
                &format!("(remote ip \"localhost:{}\")", port),
            );
        }
        if self.allow_local_binding {
            self.push_rule(profile, "allow", "network-outbound", "(remote ip \"localhost:*\")");
        }
    }

    fn push_read_rules(&self, profile: &mut String) {
        self.push_rule(profile, "allow", "file-read*", "");
        for path in &self.deny_read {
            self.push_rule(profile, "deny", "file-read*", &path_filter(path));
        }
    }

    fn push_write_rules(&self, profile: &mut String) {
        for path in &self.allow_write {
            self.push_rule(profile, "allow", "file-write*", &path_filter(path));
        }

        let mut temp_paths: Vec<String> = TEMP_WRITE_PATHS.iter().map(|p| p.to_string()).collect();
        let process_temp = std::env::temp_dir().display().to_string();
        let process_temp = process_temp.trim_end_matches('/');
        if !process_temp.is_empty()
            && !temp_paths
                .iter()
                .any(|p| process_temp == p || process_temp.starts_with(&format!("{}/", p)))
        {
            temp_paths.push(process_temp.to_string());
        }
        for path in &temp_paths {
            self.push_rule(
                profile,
                "allow",
                "file-write*",
                &format!("(subpath \"{}\")", escape_seatbelt_string(path)),
            );
        }

        for path in &self.deny_write {
            self.push_rule(profile, "deny", "file-write*", &path_filter(path));
        }

        // Renaming a protected path, or any directory above it, would sidestep
        // the rules above.
        let mut protected: Vec<String> = Vec::new();
        extend_unique(&mut protected, self.deny_write.iter().cloned());
        extend_unique(&mut protected, self.deny_read.iter().cloned());
        if protected.is_empty() {
            return;
        }

        profile.push_str("\n; Block moves of protected paths and their ancestors\n");
        let mut ancestors: Vec<String> = Vec::new();
        for path in &protected {
            self.push_rule(profile, "deny", "file-write-unlink", &path_filter(path));

            if contains_glob_chars(path) {
                if let Some(base) = glob_static_prefix(path) {
                    let base_ancestors = get_ancestor_directories(&base);
                    extend_unique(&mut ancestors, std::iter::once(base));
                    extend_unique(&mut ancestors, base_ancestors);
                }
            } else {
                extend_unique(&mut ancestors, get_ancestor_directories(path));
            }
        }
        for ancestor in &ancestors {
            self.push_rule(
                profile,
                "deny",
                "file-write-unlink",
                &format!("(literal \"{}\")", escape_seatbelt_string(ancestor)),
            );
        }
    }

    fn push_rule(&self, profile: &mut String, action: &str, operation: &str, filter: &str) {
        profile.push('(');
        profile.push_str(action);
        profile.push(' ');
        profile.push_str(operation);
        if !filter.is_empty() {
            profile.push(' ');
            profile.push_str(filter);
        }
        profile.push_str(&format!(
            " (with message \"{}\"))\n",
            escape_seatbelt_string(&self.log_tag)
        ));
    }
}

/// Subpath filter for plain paths, regex filter for globs.
fn path_filter(path: &str) -> String {
    if contains_glob_chars(path) {
        format!("(regex #\"{}\")", glob_to_seatbelt_regex(path))
    } else {
        format!("(subpath \"{}\")", escape_seatbelt_string(path))
    }
}

fn extend_unique<I, S>(target: &mut Vec<String>, items: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for item in items {
        let item = item.into();
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

/// Escape a string for use in a Seatbelt profile.
fn escape_seatbelt_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
