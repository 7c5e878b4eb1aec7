/// Normalize whitespace by:
/// - mapping all Unicode whitespace (incl. tabs/newlines) to a single ASCII space
/// - collapsing runs of spaces to a single space
/// - trimming leading/trailing spaces
pub fn normalize_ws(input: impl Into<String>) -> String {
    let mut out = String::new();
    let mut last_space = true;
    for ch in input.into().chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim_end().to_string()
}

/// Normalize an optional string:
/// - apply whitespace normalization to Some
/// - convert empty result to None
pub fn normalize_opt(input: Option<impl Into<String>>) -> Option<String> {
    match input {
        None => None,
        Some(s) => {
            let n = normalize_ws(s);
            if n.is_empty() { None } else { Some(n) }
        }
    }
}

/// Normalize a group / course name: drop ALL whitespace. Course names arrive
/// from course-setting software with stray inner spaces ("Ч21 Е") while the
/// competitor list carries the compact form; both must compare equal.
pub fn normalize_group(input: impl Into<String>) -> String {
    input.into().chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_trims_and_collapses() {
        assert_eq!(normalize_ws("  hello  "), "hello");
        assert_eq!(normalize_ws("a   b\t\tc"), "a b c");
        assert_eq!(normalize_ws("a\n\nb\nc"), "a b c");
    }

    #[test]
    fn ws_maps_unicode_whitespace_to_ascii_space() {
        let input = "\u{00A0}foo\u{2002}\u{2003}bar\u{2009}baz\u{00A0}";
        assert_eq!(normalize_ws(input), "foo bar baz");
    }

    #[test]
    fn ws_is_idempotent() {
        let once = normalize_ws("  a   \n  b\t\tc  ");
        let twice = normalize_ws(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn ws_empty_and_whitespace_only_become_empty_string() {
        assert_eq!(normalize_ws(""), "");
        assert_eq!(normalize_ws("   "), "");
        assert_eq!(normalize_ws("\n\t\u{00A0}"), "");
    }

    #[test]
    fn opt_some_whitespace_only_becomes_none() {
        assert_eq!(normalize_opt(Some(" \t ")), None);
        assert_eq!(normalize_opt(Some("  Main   Campus  ")).as_deref(), Some("Main Campus"));
        assert_eq!(normalize_opt(None::<String>), None);
    }

    #[test]
    fn group_drops_all_whitespace() {
        assert_eq!(normalize_group("Ч21 Е"), "Ч21Е");
        assert_eq!(normalize_group(" M 16 "), "M16");
        assert_eq!(normalize_group("W10"), "W10");
    }
}
