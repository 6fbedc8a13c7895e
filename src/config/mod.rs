//! Configuration module.

pub mod loader;
pub mod schema;

pub use loader::{
    default_settings_path, load_config, load_config_from_string, load_default_config,
    parse_config, SETTINGS_PATH_ENV,
};
pub use schema::{
    FilesystemConfig, NetworkConfig, SandboxRuntimeConfig, DANGEROUS_DIRECTORIES, DANGEROUS_FILES,
    GIT_CONFIG_FILE, GIT_HOOKS_DIR,
};
