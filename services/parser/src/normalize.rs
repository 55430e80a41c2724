/// Cell values the agency uses for suppressed or unavailable counts.
pub const SUPPRESSION_TOKENS: &[&str] = &["*", ".", "-", "-1", "<5", "N/A", "NA", "", "n/a", "N<10"];

/// Convert raw cell text into a count.
///
/// Total: suppression markers and anything unparseable come back as `None`,
/// never as an error. Thousands separators and surrounding whitespace are
/// ignored.
pub fn normalize_count(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    let cleaned = cleaned.trim();

    if SUPPRESSION_TOKENS.contains(&cleaned) {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppression_tokens_are_missing() {
        for token in SUPPRESSION_TOKENS {
            assert_eq!(normalize_count(token), None, "token {:?}", token);
        }
        assert_eq!(normalize_count("  *  "), None);
        assert_eq!(normalize_count(" N<10"), None);
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(normalize_count("1,234"), Some(1234.0));
        assert_eq!(normalize_count("12,345,678"), Some(12345678.0));
    }

    #[test]
    fn test_surrounding_whitespace() {
        assert_eq!(normalize_count("  100  "), Some(100.0));
        assert_eq!(normalize_count("\t42\n"), Some(42.0));
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(normalize_count("0"), Some(0.0));
        assert_eq!(normalize_count("500"), Some(500.0));
        assert_eq!(normalize_count("12.5"), Some(12.5));
    }

    #[test]
    fn test_garbage_is_missing_not_error() {
        assert_eq!(normalize_count("Total"), None);
        assert_eq!(normalize_count("12 students"), None);
        assert_eq!(normalize_count("NaN"), None);
        assert_eq!(normalize_count("inf"), None);
        assert_eq!(normalize_count(",,,"), None);
    }
}
