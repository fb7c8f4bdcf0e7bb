//! Cleanup applied to extracted text before chunking.

/// Strip carriage returns and trim surrounding whitespace.
///
/// An empty result means there is nothing to index.
pub fn normalize(raw: &str) -> String {
    raw.replace('\r', "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_carriage_returns() {
        assert_eq!(normalize("line one\r\nline two\r\n"), "line one\nline two");
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  \r\n\t "), "");
    }

    #[test]
    fn test_interior_whitespace_kept() {
        assert_eq!(normalize("  a\n\n  b  "), "a\n\n  b");
    }
}
