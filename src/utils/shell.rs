//! Shell quoting and shell resolution utilities.

/// Shell used when neither the caller nor the environment names one.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Quote a string for use in a shell command.
/// This wraps the string in single quotes and escapes any existing single quotes.
pub fn quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }

    if !needs_quoting(s) {
        return s.to_string();
    }

    // abc's -> 'abc'"'"'s'
    format!("'{}'", s.replace('\'', "'\"'\"'"))
}

/// Check if a string needs quoting.
fn needs_quoting(s: &str) -> bool {
    s.chars().any(|c| {
        matches!(
            c,
            ' ' | '\t'
                | '\n'
                | '\r'
                | '"'
                | '\''
                | '\\'
                | '$'
                | '`'
                | '!'
                | '*'
                | '?'
                | '['
                | ']'
                | '{'
                | '}'
                | '('
                | ')'
                | '<'
                | '>'
                | '|'
                | '&'
                | ';'
                | '#'
                | '~'
        )
    })
}

/// Resolve the shell that runs the confined command.
/// Order: explicit argument, `$SHELL`, then [`DEFAULT_SHELL`].
pub fn resolve_shell(explicit: Option<&str>) -> String {
    if let Some(shell) = explicit.filter(|s| !s.trim().is_empty()) {
        return shell.to_string();
    }

    match std::env::var("SHELL") {
        Ok(shell) if !shell.trim().is_empty() => shell,
        _ => DEFAULT_SHELL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("simple"), "simple");
        assert_eq!(quote("with space"), "'with space'");
        assert_eq!(quote("it's"), "'it'\"'\"'s'");
        assert_eq!(quote(""), "''");
        assert_eq!(quote("$var"), "'$var'");
    }

    #[test]
    fn test_quote_round_trips_through_shell_words() {
        let original = "echo \"it's\" $HOME; ls | wc -l";
        let parsed = shell_words::split(&quote(original)).unwrap();
        assert_eq!(parsed, vec![original.to_string()]);
    }

    #[test]
    fn test_resolve_shell_prefers_explicit() {
        assert_eq!(resolve_shell(Some("/bin/zsh")), "/bin/zsh");
        let fallback = resolve_shell(Some("  "));
        assert!(!fallback.is_empty());
        assert!(!resolve_shell(None).is_empty());
    }
}
