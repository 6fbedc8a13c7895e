//! Glob pattern to regex conversion for Seatbelt profiles.

/// Convert a glob pattern to a Seatbelt-compatible regex.
///
/// Conversion rules:
/// - `**/` at the start of a segment matches zero or more directories
/// - a trailing `/**` matches the directory itself and its whole subtree
/// - any other `**` matches any characters including `/`
/// - `*` matches any characters except `/`
/// - `?` matches any single character except `/`
/// - `[...]` character classes are kept (`[!...]` becomes `[^...]`)
/// - everything else is literal; regex metacharacters and `"` are escaped so the
///   result can sit inside a `#"..."` literal
pub fn glob_to_seatbelt_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut result = String::with_capacity(pattern.len() * 2);
    result.push('^');

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        match c {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let at_segment_start = i == 0 || chars[i - 1] == '/';
                let followed_by_slash = chars.get(i + 2) == Some(&'/');
                let at_end = i + 2 == chars.len();

                if at_segment_start && followed_by_slash {
                    // `**/**` at the end is the same as a trailing `/**`
                    if chars[i + 3..] == ['*', '*'] {
                        if result.ends_with('/') {
                            result.pop();
                            result.push_str("(/.*)?");
                        } else {
                            result.push_str(".*");
                        }
                        i = chars.len();
                        continue;
                    }
                    result.push_str("(.*/)?");
                    i += 3;
                    continue;
                }
                if at_end && i > 0 && chars[i - 1] == '/' && result.ends_with('/') {
                    // The separator was already emitted as a literal
                    result.pop();
                    result.push_str("(/.*)?");
                    i += 2;
                    continue;
                }
                result.push_str(".*");
                i += 2;
                continue;
            }
            '*' => result.push_str("[^/]*"),
            '?' => result.push_str("[^/]"),
            '[' => {
                let mut start = i + 1;
                let negated = chars.get(start) == Some(&'!');
                if negated {
                    start += 1;
                }
                // A `]` right after the opening bracket is a member, not the terminator
                let search_from = if chars.get(start) == Some(&']') {
                    start + 1
                } else {
                    start
                };

                match chars
                    .get(search_from..)
                    .and_then(|rest| rest.iter().position(|&cc| cc == ']'))
                {
                    Some(offset) => {
                        let end = search_from + offset;
                        result.push('[');
                        if negated {
                            result.push('^');
                        }
                        for &cc in &chars[start..end] {
                            if matches!(cc, '\\' | '[' | '"') {
                                result.push('\\');
                            }
                            result.push(cc);
                        }
                        result.push(']');
                        i = end + 1;
                        continue;
                    }
                    None => result.push_str("\\["),
                }
            }
            '.' | '^' | '$' | '+' | '|' | '\\' | '(' | ')' | '{' | '}' | ']' | '"' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }

        i += 1;
    }

    result.push('$');
    result
}

/// The literal directory a glob pattern is rooted at, if any.
///
/// `/w/secrets/*.pem` is rooted at `/w/secrets`; `**/.env` has no static root.
pub fn glob_static_prefix(pattern: &str) -> Option<String> {
    let end = pattern.find(['*', '?', '[', ']']).unwrap_or(pattern.len());
    let prefix = &pattern[..end];

    let base = match prefix.rfind('/') {
        Some(idx) => &prefix[..idx],
        None => return None,
    };

    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}
