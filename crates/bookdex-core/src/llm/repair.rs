use serde_json::Value;

/// Strip a Markdown code fence wrapper (```json ... ```) from a reply.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse JSON, tolerating the near-miss syntax the completion service
/// produces: trailing commas, single-quoted strings, and unquoted object
/// keys. Strict parsing is tried first; the repaired text only gets one
/// shot, and the original error is reported if both fail.
pub fn parse_lenient(text: &str) -> Result<Value, serde_json::Error> {
    match serde_json::from_str(text) {
        Ok(v) => Ok(v),
        Err(strict_err) => serde_json::from_str(&repair(text)).map_err(|_| strict_err),
    }
}

fn repair(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '"' => {
                // Copy a proper string span verbatim.
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let c = chars[i];
                    out.push(c);
                    i += 1;
                    if c == '\\' {
                        if i < chars.len() {
                            out.push(chars[i]);
                            i += 1;
                        }
                    } else if c == '"' {
                        break;
                    }
                }
            }
            '\'' => {
                // Single-quoted string becomes double-quoted.
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let c = chars[i];
                    i += 1;
                    match c {
                        '\\' => {
                            out.push('\\');
                            if i < chars.len() {
                                out.push(chars[i]);
                                i += 1;
                            }
                        }
                        '\'' => break,
                        '"' => out.push_str("\\\""),
                        c => out.push(c),
                    }
                }
                out.push('"');
            }
            ',' => {
                // A comma directly before a closing bracket is dropped.
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                    i += 1;
                } else {
                    out.push(',');
                    i += 1;
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                // A bare identifier followed by a colon in key position gets
                // quoted; anything else (true, false, null) passes through.
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                let colon_follows = j < chars.len() && chars[j] == ':';
                if colon_follows && in_key_position(&out) {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

fn in_key_position(out: &str) -> bool {
    matches!(out.trim_end().chars().last(), Some('{') | Some(','))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_fenced_json() {
        let reply = "```json\n[{\"t\": \"Cats\"}]\n```";
        assert_eq!(strip_code_fences(reply), "[{\"t\": \"Cats\"}]");
    }

    #[test]
    fn test_strip_plain_fence() {
        let reply = "```\n[1, 2]\n```";
        assert_eq!(strip_code_fences(reply), "[1, 2]");
    }

    #[test]
    fn test_unfenced_reply_untouched() {
        assert_eq!(strip_code_fences(" [1, 2] "), "[1, 2]");
    }

    #[test]
    fn test_strict_json_passes_through() {
        let v = parse_lenient(r#"[{"t": "Cats", "o": [[1, 1]]}]"#).unwrap();
        assert_eq!(v, json!([{"t": "Cats", "o": [[1, 1]]}]));
    }

    #[test]
    fn test_trailing_commas_repaired() {
        let v = parse_lenient(r#"[{"t": "Cats", "o": [[1, 2],],},]"#).unwrap();
        assert_eq!(v, json!([{"t": "Cats", "o": [[1, 2]]}]));
    }

    #[test]
    fn test_unquoted_keys_repaired() {
        let v = parse_lenient(r#"[{t: "Cats", o: [[3, 4]]}]"#).unwrap();
        assert_eq!(v, json!([{"t": "Cats", "o": [[3, 4]]}]));
    }

    #[test]
    fn test_single_quotes_repaired() {
        let v = parse_lenient(r#"[{'t': 'Cats', 'o': [[1, 1]]}]"#).unwrap();
        assert_eq!(v, json!([{"t": "Cats", "o": [[1, 1]]}]));
    }

    #[test]
    fn test_literals_not_quoted() {
        let v = parse_lenient(r#"{"a": true, "b": null,}"#).unwrap();
        assert_eq!(v, json!({"a": true, "b": null}));
    }

    #[test]
    fn test_hopeless_input_reports_original_error() {
        assert!(parse_lenient("not json at all").is_err());
    }
}
