//! Shell-style wildcard matching for host selectors
//!
//! `*` matches any run of characters, `?` a single character and `[...]` a
//! character class (`[!...]` negates, `a-z` ranges, a leading `]` is
//! literal). An unterminated `[` matches itself. Matching is case-sensitive.

/// Check whether `text` matches the wildcard `pattern`
#[must_use]
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let mut pi = 0usize;
    let mut ti = 0usize;
    // (pattern index after the last `*`, text index it is currently absorbing up to)
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        let advanced = match p.get(pi) {
            Some('*') => {
                backtrack = Some((pi + 1, ti));
                pi += 1;
                continue;
            }
            Some('?') => Some(pi + 1),
            Some('[') => match match_class(&p, pi, t[ti]) {
                Some((true, next)) => Some(next),
                Some((false, _)) => None,
                None if t[ti] == '[' => Some(pi + 1),
                None => None,
            },
            Some(&c) if c == t[ti] => Some(pi + 1),
            _ => None,
        };

        if let Some(next) = advanced {
            pi = next;
            ti += 1;
            continue;
        }

        match backtrack {
            Some((star_pi, star_ti)) => {
                pi = star_pi;
                ti = star_ti + 1;
                backtrack = Some((star_pi, star_ti + 1));
            }
            None => return false,
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

/// Match `c` against the class starting at `p[start] == '['`
///
/// Returns whether it matched and the index just past the closing `]`, or
/// `None` when the class is unterminated.
fn match_class(p: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = p.get(i) == Some(&'!');
    if negate {
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    while i < p.len() {
        let ch = p[i];
        if ch == ']' && !first {
            return Some((matched != negate, i + 1));
        }
        first = false;

        if i + 2 < p.len() && p[i + 1] == '-' && p[i + 2] != ']' {
            if ch <= c && c <= p[i + 2] {
                matched = true;
            }
            i += 3;
        } else {
            if ch == c {
                matched = true;
            }
            i += 1;
        }
    }

    None
}
