/// Accept a candidate only when it looks like a plausible DNS name:
/// total length at most 253, dot-delimited labels of 1..=63 characters drawn
/// from letters, digits and hyphen, no consecutive hyphens, and at least one
/// dot. Pure function, no side effects.
pub fn is_valid_domain(candidate: &str) -> bool {
    if candidate.len() > 253 || !candidate.contains('.') {
        return false;
    }
    if candidate.contains("--") {
        return false;
    }
    // Empty labels also cover `..` and leading/trailing dots.
    candidate.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_hosts() {
        assert!(is_valid_domain("www1.example.com"));
        assert!(is_valid_domain("us-east.example.com"));
        assert!(is_valid_domain("a.b.c.example.com"));
    }

    #[test]
    fn test_rejects_overlong_name() {
        // Four valid labels summing to 254 characters including dots.
        let name = format!(
            "{}.{}.{}.{}",
            "a".repeat(62),
            "a".repeat(63),
            "a".repeat(63),
            "a".repeat(63)
        );
        assert_eq!(name.len(), 254);
        assert!(!is_valid_domain(&name));

        let max = format!(
            "{}.{}.{}.{}",
            "a".repeat(61),
            "a".repeat(63),
            "a".repeat(63),
            "a".repeat(63)
        );
        assert_eq!(max.len(), 253);
        assert!(is_valid_domain(&max));
    }

    #[test]
    fn test_rejects_overlong_label() {
        assert!(!is_valid_domain(&format!("{}.com", "a".repeat(64))));
        assert!(is_valid_domain(&format!("{}.com", "a".repeat(63))));
    }

    #[test]
    fn test_rejects_empty_labels() {
        assert!(!is_valid_domain("a..example.com"));
        assert!(!is_valid_domain(".example.com"));
        assert!(!is_valid_domain("example.com."));
    }

    #[test]
    fn test_rejects_consecutive_hyphens() {
        assert!(!is_valid_domain("xn--test.example.com"));
        assert!(is_valid_domain("x-n-test.example.com"));
    }

    #[test]
    fn test_rejects_dotless_name() {
        assert!(!is_valid_domain("localhost"));
        assert!(!is_valid_domain(""));
    }

    #[test]
    fn test_rejects_bad_characters() {
        assert!(!is_valid_domain("under_score.example.com"));
        assert!(!is_valid_domain("spa ce.example.com"));
        assert!(!is_valid_domain("host{fuzz_all}.example.com"));
        assert!(!is_valid_domain("sub*.example.com"));
    }
}
