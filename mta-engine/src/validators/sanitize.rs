//! Text sanitization shared by request validation and fingerprinting

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("input cannot be empty after sanitization")]
    EmptyInput,

    #[error("input exceeds maximum length of {max} characters ({actual} given)")]
    TooLong { max: usize, actual: usize },
}

/// HTML-significant characters and ASCII control characters
fn is_stripped(c: char) -> bool {
    matches!(c, '<' | '>' | '"' | '\'' | '&') || c.is_ascii_control()
}

/// Strip HTML-significant and control characters, then trim whitespace.
///
/// Stripping before trimming makes the result a fixed point:
/// `normalize_text(&normalize_text(s)) == normalize_text(s)`.
pub fn normalize_text(input: &str) -> String {
    let stripped: String = input.chars().filter(|c| !is_stripped(*c)).collect();
    stripped.trim().to_string()
}

/// [`normalize_text`] plus emptiness and length bounds (length in characters)
pub fn sanitize(input: &str, max_len: usize) -> Result<String, SanitizeError> {
    let sanitized = normalize_text(input);
    if sanitized.is_empty() {
        return Err(SanitizeError::EmptyInput);
    }
    let len = sanitized.chars().count();
    if len > max_len {
        return Err(SanitizeError::TooLong {
            max: max_len,
            actual: len,
        });
    }
    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(sanitize("  Label design \n", 100).unwrap(), "Label design");
    }

    #[test]
    fn test_strips_html_characters() {
        assert_eq!(
            sanitize("<b>Tom's</b> \"quote\" & more", 100).unwrap(),
            "bToms/b quote  more"
        );
    }

    #[test]
    fn test_strips_control_characters() {
        assert_eq!(sanitize("a\u{0}b\u{7f}c\u{1b}", 100).unwrap(), "abc");
    }

    #[test]
    fn test_empty_after_sanitization() {
        assert_eq!(sanitize("   ", 10), Err(SanitizeError::EmptyInput));
        assert_eq!(sanitize("<>&\"'", 10), Err(SanitizeError::EmptyInput));
        assert_eq!(sanitize("", 10), Err(SanitizeError::EmptyInput));
    }

    #[test]
    fn test_too_long_counts_characters() {
        assert_eq!(sanitize("ééé", 3).unwrap(), "ééé");
        assert_eq!(
            sanitize("éééé", 3),
            Err(SanitizeError::TooLong { max: 3, actual: 4 })
        );
    }

    #[test]
    fn test_length_checked_after_stripping() {
        assert_eq!(sanitize("  <abc>  ", 3).unwrap(), "abc");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = ["\u{1} a", " \u{1}b ", "x\t\ty", "  &  z  "];
        for input in inputs {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_keeps_unicode_text() {
        assert_eq!(sanitize("Étiquette – design 🎨", 100).unwrap(), "Étiquette – design 🎨");
    }
}
