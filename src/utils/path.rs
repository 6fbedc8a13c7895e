//! Path normalization utilities.

use std::path::Path;

/// Normalize a path for sandbox use.
/// - Expands ~ to the home directory
/// - Resolves relative paths against `cwd`
/// - Collapses `.`, `..` and repeated separators without touching the filesystem
///
/// Patterns starting with `**/` are returned unchanged so they keep matching at any depth.
pub fn normalize_path_for_sandbox(path: &str, cwd: &Path) -> String {
    if path == "**" || path.starts_with("**/") {
        return path.to_string();
    }

    let expanded = expand_home(path);
    if expanded.starts_with('/') {
        clean_absolute(&expanded)
    } else {
        clean_absolute(&format!("{}/{}", cwd.display(), expanded))
    }
}

/// Lexically clean an absolute path.
fn clean_absolute(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Expand ~ to the home directory.
pub fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home.display().to_string();
        }
    }
    path.to_string()
}

/// Every directory strictly above `path`, nearest first, excluding the root.
pub fn get_ancestor_directories(path: &str) -> Vec<String> {
    let mut ancestors = Vec::new();
    let mut current = Path::new(path).parent();

    while let Some(dir) = current {
        if dir.as_os_str().is_empty() || dir == Path::new("/") {
            break;
        }
        ancestors.push(dir.display().to_string());
        current = dir.parent();
    }

    ancestors
}

/// Check if a path contains glob characters.
pub fn contains_glob_chars(path: &str) -> bool {
    path.contains(['*', '?', '[', ']'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();

        assert_eq!(expand_home("~"), home.display().to_string());
        assert_eq!(
            expand_home("~/Documents"),
            format!("{}/Documents", home.display())
        );
        assert_eq!(expand_home("/absolute/path"), "/absolute/path");
        assert_eq!(expand_home("relative/path"), "relative/path");
    }

    #[test]
    fn test_normalize_relative_and_absolute() {
        let cwd = Path::new("/work/project");

        assert_eq!(normalize_path_for_sandbox("src", cwd), "/work/project/src");
        assert_eq!(normalize_path_for_sandbox("./out/", cwd), "/work/project/out");
        assert_eq!(normalize_path_for_sandbox("../other", cwd), "/work/other");
        assert_eq!(normalize_path_for_sandbox("/etc//hosts", cwd), "/etc/hosts");
        assert_eq!(normalize_path_for_sandbox("/a/b/../../..", cwd), "/");
        assert_eq!(normalize_path_for_sandbox(".", cwd), "/work/project");
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let cwd = Path::new("/work/project");
        let first = normalize_path_for_sandbox("docs/../secrets/*.pem", cwd);
        let second = normalize_path_for_sandbox("docs/../secrets/*.pem", cwd);
        assert_eq!(first, "/work/project/secrets/*.pem");
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_keeps_unanchored_globstar() {
        let cwd = Path::new("/work/project");
        assert_eq!(normalize_path_for_sandbox("**/.env", cwd), "**/.env");
        assert_eq!(
            normalize_path_for_sandbox("secrets/**", cwd),
            "/work/project/secrets/**"
        );
    }

    #[test]
    fn test_normalize_expands_home() {
        let home = dirs::home_dir().unwrap();
        let cwd = Path::new("/work/project");
        assert_eq!(
            normalize_path_for_sandbox("~/.ssh", cwd),
            format!("{}/.ssh", home.display())
        );
    }

    #[test]
    fn test_get_ancestor_directories() {
        assert_eq!(
            get_ancestor_directories("/a/b/c"),
            vec!["/a/b".to_string(), "/a".to_string()]
        );
        assert_eq!(get_ancestor_directories("/a"), Vec::<String>::new());
        assert_eq!(get_ancestor_directories("/"), Vec::<String>::new());
    }

    #[test]
    fn test_contains_glob_chars() {
        assert!(contains_glob_chars("*.txt"));
        assert!(contains_glob_chars("src/**/*.rs"));
        assert!(contains_glob_chars("file?.txt"));
        assert!(contains_glob_chars("file[0-9].txt"));
        assert!(contains_glob_chars("odd]name"));
        assert!(!contains_glob_chars("file{a,b}.txt"));
        assert!(!contains_glob_chars("/plain/path"));
    }
}
