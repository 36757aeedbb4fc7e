//! Column-name templates.
//!
//! `*` matches any run of characters, `?` exactly one character, and `#` a
//! run of one or more decimal digits. Everything else matches itself.

/// How a template matched a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// Character-for-character, no wildcard involved.
    Exact,
    /// Matched through at least one wildcard.
    Wildcard,
}

pub fn has_wildcards(template: &str) -> bool {
    template.contains(['*', '?', '#'])
}

/// Compare `name` against `template`. Trailing blanks on both sides are
/// ignored.
pub fn compare(template: &str, name: &str, case_sensitive: bool) -> Option<Match> {
    let template = template.trim_end();
    let name = name.trim_end();
    let eq = |a: u8, b: u8| {
        if case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(&b)
        }
    };

    let t = template.as_bytes();
    let n = name.as_bytes();
    if t.len() == n.len() && t.iter().zip(n).all(|(&a, &b)| eq(a, b)) {
        return Some(Match::Exact);
    }
    if has_wildcards(template) && wild(t, n, &eq) {
        Some(Match::Wildcard)
    } else {
        None
    }
}

fn wild(t: &[u8], n: &[u8], eq: &impl Fn(u8, u8) -> bool) -> bool {
    match t.split_first() {
        None => n.is_empty(),
        Some((b'*', rest)) => (0..=n.len()).any(|skip| wild(rest, &n[skip..], eq)),
        Some((b'?', rest)) => !n.is_empty() && wild(rest, &n[1..], eq),
        Some((b'#', rest)) => {
            let digits = n.iter().take_while(|b| b.is_ascii_digit()).count();
            (1..=digits).any(|used| wild(rest, &n[used..], eq))
        }
        Some((&c, rest)) => n.first().is_some_and(|&b| eq(c, b)) && wild(rest, &n[1..], eq),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_ignores_case_when_asked() {
        assert_eq!(compare("time", "TIME", false), Some(Match::Exact));
        assert_eq!(compare("time", "TIME", true), None);
        assert_eq!(compare("TIME  ", "TIME", true), Some(Match::Exact));
    }

    #[test]
    fn star_and_question() {
        assert_eq!(compare("PI*", "PI", false), Some(Match::Wildcard));
        assert_eq!(compare("PI*", "PIXEL", false), Some(Match::Wildcard));
        assert_eq!(compare("*X", "DETX", false), Some(Match::Wildcard));
        assert_eq!(compare("DET?", "DETX", false), Some(Match::Wildcard));
        assert_eq!(compare("DET?", "DET", false), None);
    }

    #[test]
    fn hash_needs_a_digit() {
        assert_eq!(compare("COL#", "COL12", false), Some(Match::Wildcard));
        assert_eq!(compare("COL#", "COL", false), None);
        assert_eq!(compare("COL#", "COLA", false), None);
        assert_eq!(compare("R#_X", "R3_X", false), Some(Match::Wildcard));
    }

    #[test]
    fn literal_mismatch() {
        assert_eq!(compare("ENERGY", "PHA", false), None);
        assert!(!has_wildcards("ENERGY"));
        assert!(has_wildcards("EN*"));
    }
}
