//! Violation monitoring via macOS log stream.

use std::process::Stdio;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::debug_log;
use crate::error::SandboxError;
use crate::violation::{SandboxViolation, ViolationKind, ViolationSender};

/// Binary used to tail the unified log.
pub const DEFAULT_LOG_BINARY: &str = "log";

/// System services whose denials are routine and never reported.
const NOISY_SERVICES: &[&str] = &[
    "mDNSResponder",
    "com.apple.diagnosticd",
    "com.apple.analyticsd",
];

static DENY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bdeny\b").expect("valid regex"));

static OPERATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdeny(?:\(\d+\))?\s+([A-Za-z*-]+)").expect("valid regex"));

static FILTER_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:subpath|literal|regex)\s+#?"([^"]+)""#).expect("valid regex")
});

static OPERAND_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bdeny(?:\(\d+\))?\s+[A-Za-z*-]+\s+(/\S+)").expect("valid regex")
});

static LOG_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CMD64_[A-Za-z0-9+/=]*_END_[0-9a-f]+").expect("valid regex"));

/// Decides which parsed violations are reported.
#[derive(Debug, Clone, Default)]
pub struct ViolationFilter {
    ignore: Vec<String>,
}

impl ViolationFilter {
    /// Create a filter that also drops violations containing any of `ignore`.
    pub fn new(ignore: Vec<String>) -> Self {
        Self {
            ignore: ignore.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    /// Whether a violation should be published.
    pub fn accepts(&self, violation: &SandboxViolation) -> bool {
        if NOISY_SERVICES
            .iter()
            .any(|service| violation.message.contains(service))
        {
            return false;
        }

        !self.ignore.iter().any(|pattern| {
            violation.message.contains(pattern.as_str())
                || violation
                    .path
                    .as_deref()
                    .map(|path| path.contains(pattern.as_str()))
                    .unwrap_or(false)
        })
    }
}

/// Parse a violation from a log line. Lines that are not denials, or whose
/// operation is not a filesystem or network one, yield `None`.
pub fn parse_violation_line(line: &str) -> Option<SandboxViolation> {
    if !DENY_RE.is_match(line) {
        return None;
    }

    let classify = |text: &str| {
        if text.contains("file-write") {
            Some(ViolationKind::FilesystemWrite)
        } else if text.contains("file-read") {
            Some(ViolationKind::FilesystemRead)
        } else if text.contains("network") {
            Some(ViolationKind::NetworkAccess)
        } else {
            None
        }
    };

    let kind = match OPERATION_RE.captures(line) {
        Some(caps) => classify(&caps[1]),
        None => classify(line),
    }?;

    let message = line
        .split_once("Sandbox:")
        .map(|(_, rest)| rest.trim())
        .unwrap_or_else(|| line.trim());
    if message.is_empty() {
        return None;
    }

    let path = FILTER_PATH_RE
        .captures(line)
        .or_else(|| OPERAND_PATH_RE.captures(line))
        .map(|caps| caps[1].to_string());

    let log_tag = LOG_TAG_RE.find(line).map(|m| m.as_str().to_string());

    Some(SandboxViolation::new(kind, message, path).with_log_tag(log_tag))
}

/// Decode the original command from the log tag.
///
/// Tags carry a truncated encoding, so long commands come back shortened.
pub fn decode_command_from_tag(tag: &str) -> Option<String> {
    use base64::Engine;

    // Format: CMD64_<base64>_END_<session>
    let start = tag.find("CMD64_")?;
    let rest = &tag[start + 6..];
    let end = rest.find("_END_")?;
    let encoded = &rest[..end];
    let usable = encoded.len() - encoded.len() % 4;

    base64::engine::general_purpose::STANDARD
        .decode(&encoded[..usable])
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Read log lines, publishing accepted violations until the input ends or the
/// receiving side is gone.
pub async fn forward_violations<R>(reader: R, filter: ViolationFilter, tx: ViolationSender)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(violation) = parse_violation_line(&line) else {
                    continue;
                };
                if !filter.accepts(&violation) {
                    continue;
                }
                if tx.send(violation).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                debug_log!("Skipping unreadable log line: {}", e);
            }
            Err(e) => {
                debug_log!("Log stream read failed: {}", e);
                break;
            }
        }
    }
}

/// Log monitor for sandbox violations of one session.
pub struct LogMonitor {
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
}

impl LogMonitor {
    /// Start `log stream` filtered to the given session and forward its
    /// violations to `tx`. Must be called from within a tokio runtime.
    pub fn start(
        log_binary: &str,
        session_id: &str,
        filter: ViolationFilter,
        tx: ViolationSender,
    ) -> Result<Self, SandboxError> {
        let predicate = format!("(eventMessage CONTAINS \"_END_{}\")", session_id);

        let mut child = Command::new(log_binary)
            .args(["stream", "--predicate", &predicate, "--style", "compact"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SandboxError::MonitorStart(format!("{}: {}", log_binary, e)))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            SandboxError::MonitorStart(format!("{}: stdout not captured", log_binary))
        })?;

        let reader = tokio::spawn(forward_violations(BufReader::new(stdout), filter, tx));

        tracing::debug!("Violation monitor started for session {}", session_id);

        Ok(Self {
            child: Some(child),
            reader: Some(reader),
        })
    }

    /// Whether the monitor still owns a subprocess.
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Stop the log monitor. Safe to call repeatedly and after the
    /// subprocess has already exited.
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                debug_log!("Failed to kill log stream: {}", e);
            }
        }

        if let Some(reader) = self.reader.take() {
            reader.abort();
            let _ = reader.await;
        }
    }
}

impl Drop for LogMonitor {
    fn drop(&mut self) {
        if let Some(ref mut child) = self.child {
            let _ = child.start_kill();
        }
        if let Some(ref reader) = self.reader {
            reader.abort();
        }
    }
}
