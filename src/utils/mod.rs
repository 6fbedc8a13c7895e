//! Utility modules.

pub mod debug;
pub mod path;
pub mod platform;
pub mod shell;

pub use debug::{init_debug_logging, is_debug_enabled, SANDBOX_GUARD_DEBUG_ENV};
pub use path::{
    contains_glob_chars, expand_home, get_ancestor_directories, normalize_path_for_sandbox,
};
pub use platform::Platform;
pub use shell::{quote, resolve_shell, DEFAULT_SHELL};
