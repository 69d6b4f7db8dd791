//! Dotted qualifier paths.
//!
//! A nested field `b` under parent `a` is stored at qualifier `a.b`. Encode
//! and decode both build paths through [`join`], so they visit identical
//! qualifiers for identical field trees.

/// Hierarchy separator. Not allowed inside field names.
pub const SEPARATOR: char = '.';

/// Append `name` to an optional parent path.
#[inline]
pub fn join(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => {
            let mut path = String::with_capacity(prefix.len() + 1 + name.len());
            path.push_str(prefix);
            path.push(SEPARATOR);
            path.push_str(name);
            path
        }
        _ => name.to_string(),
    }
}

/// The prefix every descendant of `qualifier` starts with: `qualifier.`.
#[inline]
pub fn descendant_prefix(qualifier: &[u8]) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(qualifier.len() + 1);
    prefix.extend_from_slice(qualifier);
    prefix.push(SEPARATOR as u8);
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_without_prefix() {
        assert_eq!(join(None, "x"), "x");
        assert_eq!(join(Some(""), "x"), "x");
    }

    #[test]
    fn test_join_nested() {
        let a = join(None, "a");
        let ab = join(Some(&a), "b");
        assert_eq!(ab, "a.b");
        assert_eq!(join(Some(&ab), "c"), "a.b.c");
    }

    #[test]
    fn test_descendant_prefix() {
        assert_eq!(descendant_prefix(b"opt"), b"opt.".to_vec());
    }
}
