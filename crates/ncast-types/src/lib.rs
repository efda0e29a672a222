//! Validated text primitives for NeuroCast packet content.
//!
//! Packet fields that end up inside a hashed transfer packet must be well-formed
//! before the packet is assembled: identifiers must not be blank, and evidence
//! quotes must respect the redaction length cap. This crate provides the small
//! text types that carry those guarantees in the type system rather than as
//! ad-hoc checks at every call site.

/// Errors that can occur when constructing validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace.
    #[error("text cannot be empty")]
    Empty,
    /// The input text exceeded the permitted length in characters.
    #[error("text exceeds maximum length of {max} characters (got {got})")]
    TooLong { max: usize, got: usize },
}

/// A string that is guaranteed to contain at least one non-whitespace character.
///
/// Input is trimmed of leading and trailing whitespace during construction;
/// the trimmed form is what is stored and compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Creates a new `NonEmptyText` that must also fit within `max` characters.
    ///
    /// The length check counts characters, not bytes, so multi-byte text is not
    /// penalised for its encoding.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] for blank input and [`TextError::TooLong`]
    /// when the trimmed input exceeds `max` characters.
    pub fn with_max_chars(input: impl AsRef<str>, max: usize) -> Result<Self, TextError> {
        let text = Self::new(input)?;
        let got = text.0.chars().count();
        if got > max {
            return Err(TextError::TooLong { max, got });
        }
        Ok(text)
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Truncates `input` to at most `max` characters, reporting whether anything
/// was dropped.
///
/// Truncation operates on character boundaries, so the returned string is
/// always valid UTF-8 and never splits a multi-byte character. Used by the
/// packet redaction step to cap evidence quotes.
pub fn truncate_chars(input: &str, max: usize) -> (String, bool) {
    match input.char_indices().nth(max) {
        Some((byte_idx, _)) => (input[..byte_idx].to_owned(), true),
        None => (input.to_owned(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_whitespace() {
        assert!(matches!(NonEmptyText::new(""), Err(TextError::Empty)));
        assert!(matches!(NonEmptyText::new("   \t"), Err(TextError::Empty)));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let text = NonEmptyText::new("  case-042  ").unwrap();
        assert_eq!(text.as_str(), "case-042");
    }

    #[test]
    fn enforces_character_limit() {
        assert!(NonEmptyText::with_max_chars("abcd", 4).is_ok());
        let err = NonEmptyText::with_max_chars("abcde", 4).unwrap_err();
        assert!(matches!(err, TextError::TooLong { max: 4, got: 5 }));
    }

    #[test]
    fn character_limit_counts_chars_not_bytes() {
        // Four characters, more than four bytes.
        assert!(NonEmptyText::with_max_chars("médic", 5).is_ok());
    }

    #[test]
    fn truncate_chars_preserves_short_input() {
        let (out, truncated) = truncate_chars("short", 120);
        assert_eq!(out, "short");
        assert!(!truncated);
    }

    #[test]
    fn truncate_chars_cuts_on_char_boundary() {
        let (out, truncated) = truncate_chars("éléphant", 3);
        assert_eq!(out, "élé");
        assert!(truncated);
    }

    #[test]
    fn serde_round_trip() {
        let text = NonEmptyText::new("spoke-ED").unwrap();
        let json = serde_json::to_string(&text).unwrap();
        assert_eq!(json, "\"spoke-ED\"");
        let back: NonEmptyText = serde_json::from_str(&json).unwrap();
        assert_eq!(back, text);
    }

    #[test]
    fn serde_rejects_blank_string() {
        let parsed: Result<NonEmptyText, _> = serde_json::from_str("\"  \"");
        assert!(parsed.is_err());
    }
}
