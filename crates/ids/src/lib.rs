//! Canonical identifier types for NeuroCast.
//!
//! Everything that crosses a packet or ledger boundary is addressed by one of
//! two identifier forms, and both are kept in a single canonical textual
//! representation so that path derivation, ledger keys, and hash comparison
//! are deterministic across the codebase:
//!
//! - [`RunId`]: **32 lowercase hexadecimal characters** (no hyphens), the same
//!   value `Uuid::new_v4().simple()` produces. Used for pipeline run ids,
//!   packet ids, and ledger transaction ids.
//! - [`HexDigest`]: a SHA-256 digest as **`0x` + 64 lowercase hexadecimal
//!   characters**. Digests are stored and compared *including* the prefix;
//!   [`HexDigest::parse`] accepts bare hex and normalises it, so call sites
//!   that strip the prefix and call sites that keep it read back the same
//!   value.
//!
//! Non-canonical inputs (uppercase, hyphenated, wrong length, non-hex) are
//! rejected rather than normalised, with the single exception of the optional
//! `0x` digest prefix described above.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Error type for identifier parsing and construction.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// The supplied run id was not 32 lowercase hex characters.
    #[error("run id must be 32 lowercase hex characters without hyphens, got: '{0}'")]
    InvalidRunId(String),
    /// The supplied digest was not 64 lowercase hex characters (with or
    /// without a `0x` prefix).
    #[error("digest must be 64 lowercase hex characters with optional 0x prefix, got: '{0}'")]
    InvalidDigest(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;

fn is_lower_hex(input: &str, len: usize) -> bool {
    input.len() == len
        && input
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// A pipeline run / packet / transaction identifier in canonical form.
///
/// Once constructed, the contained identifier is guaranteed to be 32 lowercase
/// hex characters. Externally supplied identifiers must already be canonical;
/// use [`RunId::parse`] to validate them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and wraps an identifier that must already be canonical.
    ///
    /// Other common UUID forms (hyphenated, uppercase) are rejected, not
    /// normalised.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidRunId`] if `input` is not canonical.
    pub fn parse(input: &str) -> IdResult<Self> {
        if is_lower_hex(input, 32) {
            // SAFETY: is_lower_hex guarantees valid hex, so parse_str will succeed
            let uuid = Uuid::parse_str(input).expect("is_lower_hex guarantees a valid UUID");
            return Ok(Self(uuid));
        }
        Err(IdError::InvalidRunId(input.to_owned()))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RunId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RunId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RunId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RunId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A SHA-256 content digest in canonical `0x`-prefixed lowercase hex form.
///
/// The canonical representation always carries the `0x` prefix; equality,
/// hashing, and ledger keying all operate on that form. Construction from raw
/// digest bytes is via [`HexDigest::from_bytes`]; construction from text is
/// via [`HexDigest::parse`], which tolerates a missing prefix but nothing
/// else.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HexDigest(String);

impl HexDigest {
    /// Byte length of a SHA-256 digest.
    pub const DIGEST_LEN: usize = 32;

    /// Wraps raw SHA-256 output in the canonical textual form.
    pub fn from_bytes(bytes: &[u8; Self::DIGEST_LEN]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Validates and normalises a textual digest.
    ///
    /// Accepts `0x`-prefixed or bare 64-character lowercase hex; the stored
    /// form always carries the prefix. Uppercase hex is rejected so that a
    /// digest never has two canonical spellings.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidDigest`] for anything else.
    pub fn parse(input: &str) -> IdResult<Self> {
        let bare = input.strip_prefix("0x").unwrap_or(input);
        if is_lower_hex(bare, Self::DIGEST_LEN * 2) {
            return Ok(Self(format!("0x{bare}")));
        }
        Err(IdError::InvalidDigest(input.to_owned()))
    }

    /// Returns the canonical `0x`-prefixed form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the raw digest bytes.
    pub fn digest_bytes(&self) -> [u8; Self::DIGEST_LEN] {
        let mut out = [0u8; Self::DIGEST_LEN];
        // SAFETY: construction guarantees exactly 64 valid hex characters after the prefix
        hex::decode_to_slice(&self.0[2..], &mut out)
            .expect("canonical digest is always valid hex");
        out
    }
}

impl fmt::Display for HexDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HexDigest {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for HexDigest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for HexDigest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        HexDigest::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_displays_canonical_form() {
        let id = RunId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 32);
        assert!(text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }

    #[test]
    fn run_id_parse_round_trips() {
        let id = RunId::new();
        let parsed = RunId::parse(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn run_id_rejects_hyphenated_and_uppercase() {
        assert!(RunId::parse("550e8400-e29b-41d4-a716-446655440000").is_err());
        assert!(RunId::parse("550E8400E29B41D4A716446655440000").is_err());
        assert!(RunId::parse("short").is_err());
    }

    #[test]
    fn digest_from_bytes_is_prefixed_lowercase() {
        let digest = HexDigest::from_bytes(&[0xab; 32]);
        assert!(digest.as_str().starts_with("0x"));
        assert_eq!(digest.as_str().len(), 66);
        assert_eq!(&digest.as_str()[2..4], "ab");
    }

    #[test]
    fn digest_parse_accepts_bare_and_prefixed() {
        let bare = "ab".repeat(32);
        let prefixed = format!("0x{bare}");
        let from_bare = HexDigest::parse(&bare).unwrap();
        let from_prefixed = HexDigest::parse(&prefixed).unwrap();
        assert_eq!(from_bare, from_prefixed);
        assert_eq!(from_bare.as_str(), prefixed);
    }

    #[test]
    fn digest_rejects_uppercase_and_wrong_length() {
        assert!(HexDigest::parse(&"AB".repeat(32)).is_err());
        assert!(HexDigest::parse("0xabcd").is_err());
        assert!(HexDigest::parse("").is_err());
    }

    #[test]
    fn digest_bytes_round_trip() {
        let bytes = [0x5a; 32];
        let digest = HexDigest::from_bytes(&bytes);
        assert_eq!(digest.digest_bytes(), bytes);
    }

    #[test]
    fn serde_round_trip() {
        let digest = HexDigest::from_bytes(&[1; 32]);
        let json = serde_json::to_string(&digest).unwrap();
        let back: HexDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);

        let id = RunId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
