//! # Search Module
//!
//! Implements the three non-trivial search strategies a named cache supports
//! beyond an arbitrary predicate: glob/regex key-pattern matching, dotted
//! JSON-path matching, and recursive value-template matching.

use crate::value::Value;
use regex::Regex;

/// Compiles `pattern` into a matcher. `regex == true` treats the pattern as
/// a regular expression; otherwise it is a Unix shell glob (`*`, `?`,
/// `[...]`), translated to an anchored regex under the hood.
pub fn compile_pattern(pattern: &str, regex: bool) -> Result<Regex, regex::Error> {
    if regex {
        Regex::new(pattern)
    } else {
        Regex::new(&glob_to_regex(pattern))
    }
}

/// Translates a Unix shell glob into an anchored regular expression. Supports
/// `*` (any run of characters), `?` (exactly one character), and `[...]`
/// character classes, the same subset `fnmatch` covers.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push('^');
                }
                for c in chars.by_ref() {
                    out.push(c);
                    if c == ']' {
                        break;
                    }
                }
            }
            _ if regex_syntax_chars().contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('$');
    out
}

fn regex_syntax_chars() -> &'static [char] {
    &['.', '+', '(', ')', '|', '^', '$', '\\', '{', '}']
}

/// Walks `value` along `path_parts`, a dotted JSON path already split on
/// `.`. A `*` component matches any key at that level (fanning out into
/// every child); the walk matches if any resulting leaf path is fully
/// consumed. Non-map intermediate nodes are a non-match.
pub fn matches_json_path(value: &Value, path_parts: &[&str]) -> bool {
    match path_parts.split_first() {
        None => true,
        Some((part, rest)) => match value.as_map() {
            None => false,
            Some(map) => {
                if *part == "*" {
                    map.values().any(|v| matches_json_path(v, rest))
                } else {
                    map.get(*part)
                        .map(|v| matches_json_path(v, rest))
                        .unwrap_or(false)
                }
            }
        },
    }
}

/// Recursively compares `pattern` against `value`: every key in a map
/// pattern must exist in the corresponding map value and match recursively;
/// scalars compare by equality.
pub fn matches_value_template(pattern: &Value, value: &Value) -> bool {
    match (pattern, value) {
        (Value::Map(pattern_map), Value::Map(value_map)) => pattern_map.iter().all(|(k, pv)| {
            value_map
                .get(k)
                .map(|vv| matches_value_template(pv, vv))
                .unwrap_or(false)
        }),
        _ => pattern == value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::parse_wire_value;

    #[test]
    fn glob_star_matches_prefix() {
        let re = compile_pattern("user_*", false).unwrap();
        assert!(re.is_match("user_1"));
        assert!(re.is_match("user_"));
        assert!(!re.is_match("other_1"));
    }

    #[test]
    fn glob_question_mark_matches_one_char() {
        let re = compile_pattern("k?y", false).unwrap();
        assert!(re.is_match("key"));
        assert!(!re.is_match("ky"));
        assert!(!re.is_match("keey"));
    }

    #[test]
    fn regex_mode_uses_pattern_verbatim() {
        let re = compile_pattern(r"^user_\d+$", true).unwrap();
        assert!(re.is_match("user_42"));
        assert!(!re.is_match("user_x"));
    }

    #[test]
    fn json_path_wildcard_matches_any_child() {
        let value = parse_wire_value(r#"{"u1":{"name":"alice"},"u2":{"name":"bob"}}"#);
        assert!(matches_json_path(&value, &["*", "name"]));
        assert!(!matches_json_path(&value, &["*", "missing"]));
    }

    #[test]
    fn json_path_non_map_intermediate_is_no_match() {
        let value = parse_wire_value(r#"{"u1":"alice"}"#);
        assert!(!matches_json_path(&value, &["u1", "name"]));
    }

    #[test]
    fn value_template_matches_partial_map() {
        let pattern = parse_wire_value(r#"{"active":true}"#);
        let value = parse_wire_value(r#"{"active":true,"name":"alice"}"#);
        assert!(matches_value_template(&pattern, &value));

        let pattern2 = parse_wire_value(r#"{"active":false}"#);
        assert!(!matches_value_template(&pattern2, &value));
    }
}
