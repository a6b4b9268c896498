//! Helpers for hierarchical names.
//!
//! A name reads leaf-first, components separated by unescaped commas,
//! as in `cn=a,ou=b,o=x`. The canonical form, used as the dn2id key,
//! is the trimmed, case-folded rendering of each component.

/// Return the canonical form of `dn`.
pub fn to_canonical(dn: &str) -> String {
    let parts: Vec<String> = components(dn)
        .into_iter()
        .map(|c| c.trim().to_lowercase())
        .collect();
    parts.join(",")
}

/// Return the parent name of `name`, stripping the leaf component.
/// Parent of a single-component name is the empty string.
pub fn parent(name: &str) -> &str {
    match split_comma(name) {
        Some(n) => name[n + 1..].trim_start(),
        None => "",
    }
}

/// Return whether canonical `ndn` sits strictly below canonical `suffix`.
pub fn is_child_of(ndn: &str, suffix: &str) -> bool {
    match ndn.len() > suffix.len() {
        true => {
            let n = ndn.len() - suffix.len();
            ndn.ends_with(suffix) && ndn[..n].ends_with(',')
        }
        false => false,
    }
}

// offset of the first unescaped comma, if any.
fn split_comma(s: &str) -> Option<usize> {
    let mut escape = false;
    for (i, ch) in s.char_indices() {
        match ch {
            _ if escape => escape = false,
            '\\' => escape = true,
            ',' => return Some(i),
            _ => (),
        }
    }
    None
}

fn components(s: &str) -> Vec<&str> {
    let mut parts = vec![];
    let mut rem = s;
    loop {
        match split_comma(rem) {
            Some(n) => {
                parts.push(&rem[..n]);
                rem = &rem[n + 1..];
            }
            None => {
                parts.push(rem);
                break parts;
            }
        }
    }
}

#[cfg(test)]
#[path = "dn_test.rs"]
mod dn_test;
