//! Deferred-binding token substitution for `String` values encoded with the
//! `deferred_binding` value flag (e.g. `%L3`, `%M`).

use std::collections::HashMap;

/// Scans `value` for deferred-binding tokens (`%M`, or `%[LTPI]` followed by
/// one or more digits) and replaces every occurrence found in `bindings`
/// with its resolved text. Tokens with no entry in `bindings` are left
/// untouched.
#[must_use]
pub fn resolve(value: &str, bindings: &HashMap<String, String>) -> String {
    let mut out = value.to_string();
    for token in find_tokens(value) {
        if let Some(resolved) = bindings.get(&token) {
            out = out.replace(&token, resolved);
        }
    }
    out
}

fn find_tokens(value: &str) -> Vec<String> {
    let bytes = value.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        if value[i..].starts_with("%M") {
            tokens.push("%M".to_string());
            i += 2;
            continue;
        }
        if i + 1 < bytes.len() && matches!(bytes[i + 1], b'L' | b'T' | b'P' | b'I') {
            let start = i;
            let mut j = i + 2;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > i + 2 {
                tokens.push(value[start..j].to_string());
                i = j;
                continue;
            }
        }
        i += 1;
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_known_tokens() {
        let mut bindings = HashMap::new();
        bindings.insert("%L3".to_string(), "/redfish/v1/Chassis/1".to_string());
        let resolved = resolve("%L3#/Status", &bindings);
        assert_eq!(resolved, "/redfish/v1/Chassis/1#/Status");
    }

    #[test]
    fn leaves_unknown_tokens_untouched() {
        let bindings = HashMap::new();
        assert_eq!(resolve("%L7", &bindings), "%L7");
    }

    #[test]
    fn self_link_token() {
        let mut bindings = HashMap::new();
        bindings.insert("%M".to_string(), "/redfish/v1/Chassis/1".to_string());
        assert_eq!(resolve("%M", &bindings), "/redfish/v1/Chassis/1");
    }
}
