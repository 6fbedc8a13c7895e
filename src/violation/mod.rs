//! Sandbox violation events and the stream that delivers them.
//!
//! Violations are observability only. Delivery is best-effort, carries no ordering
//! guarantee relative to the confined command, and is scoped to a sandbox session.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::SystemTime;

use futures::Stream;
use tokio::sync::mpsc;

/// Category of a denied operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    FilesystemRead,
    FilesystemWrite,
    NetworkAccess,
}

impl ViolationKind {
    /// Short human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ViolationKind::FilesystemRead => "file-read",
            ViolationKind::FilesystemWrite => "file-write",
            ViolationKind::NetworkAccess => "network",
        }
    }
}

/// A sandbox violation observed in the system log.
#[derive(Debug, Clone)]
pub struct SandboxViolation {
    /// What kind of operation was denied.
    pub kind: ViolationKind,
    /// The denial message from the log.
    pub message: String,
    /// The affected path, when the message names one.
    pub path: Option<String>,
    /// Diagnostic tag found in the line, if any.
    pub log_tag: Option<String>,
    /// When the violation was observed.
    pub timestamp: SystemTime,
}

impl SandboxViolation {
    /// Create a new violation stamped with the current time.
    pub fn new(kind: ViolationKind, message: impl Into<String>, path: Option<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path,
            log_tag: None,
            timestamp: SystemTime::now(),
        }
    }

    /// Attach the diagnostic tag the violation was reported under.
    pub fn with_log_tag(mut self, tag: Option<String>) -> Self {
        self.log_tag = tag;
        self
    }
}

/// Sending half of the violation channel. Sends never block.
pub type ViolationSender = mpsc::UnboundedSender<SandboxViolation>;

/// Create an unbounded violation channel.
pub fn violation_channel() -> (ViolationSender, ViolationStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, ViolationStream { rx })
}

/// Read-only stream of violations for one sandbox session.
///
/// The stream ends once the owning manager is disposed.
#[derive(Debug)]
pub struct ViolationStream {
    rx: mpsc::UnboundedReceiver<SandboxViolation>,
}

impl ViolationStream {
    /// Wait for the next violation. Returns `None` once the session is closed.
    pub async fn recv(&mut self) -> Option<SandboxViolation> {
        self.rx.recv().await
    }

    /// Take a violation if one is already queued.
    pub fn try_recv(&mut self) -> Option<SandboxViolation> {
        self.rx.try_recv().ok()
    }

    /// Drain every violation that is already queued.
    pub fn drain(&mut self) -> Vec<SandboxViolation> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl Stream for ViolationStream {
    type Item = SandboxViolation;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Append a summary of violations to a command's stderr.
pub fn annotate_stderr_with_sandbox_failures(
    stderr: &str,
    violations: &[SandboxViolation],
) -> String {
    if violations.is_empty() {
        return stderr.to_string();
    }

    let mut annotated = stderr.to_string();
    annotated.push_str("\n\n--- Sandbox Violations ---\n");
    for violation in violations {
        match violation.path {
            Some(ref path) => annotated.push_str(&format!(
                "  [{}] {} ({})\n",
                violation.kind.label(),
                violation.message,
                path
            )),
            None => annotated.push_str(&format!(
                "  [{}] {}\n",
                violation.kind.label(),
                violation.message
            )),
        }
    }

    annotated
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_ends_when_senders_drop() {
        let (tx, mut stream) = violation_channel();
        tx.send(SandboxViolation::new(
            ViolationKind::FilesystemRead,
            "deny(1) file-read-data /secret",
            Some("/secret".to_string()),
        ))
        .unwrap();
        drop(tx);

        let first = stream.next().await.unwrap();
        assert_eq!(first.kind, ViolationKind::FilesystemRead);
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_drain() {
        let (tx, mut stream) = violation_channel();
        for i in 0..3 {
            tx.send(SandboxViolation::new(
                ViolationKind::NetworkAccess,
                format!("deny network {}", i),
                None,
            ))
            .unwrap();
        }
        assert_eq!(stream.drain().len(), 3);
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_annotate_stderr() {
        assert_eq!(annotate_stderr_with_sandbox_failures("boom", &[]), "boom");

        let violations = vec![SandboxViolation::new(
            ViolationKind::FilesystemWrite,
            "deny(1) file-write-create /etc/hosts",
            Some("/etc/hosts".to_string()),
        )];
        let annotated = annotate_stderr_with_sandbox_failures("boom", &violations);
        assert!(annotated.starts_with("boom"));
        assert!(annotated.contains("--- Sandbox Violations ---"));
        assert!(annotated.contains("[file-write]"));
        assert!(annotated.contains("(/etc/hosts)"));
    }
}
