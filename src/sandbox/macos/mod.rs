//! macOS sandbox implementation using Seatbelt/sandbox-exec.

pub mod glob;
pub mod monitor;
pub mod profile;
pub mod wrapper;

pub use monitor::{decode_command_from_tag, parse_violation_line, LogMonitor, ViolationFilter};
pub use profile::{generate_log_tag, generate_session_id, SeatbeltProfileBuilder};
pub use wrapper::{SeatbeltSandbox, SANDBOX_EXEC_PATH};
