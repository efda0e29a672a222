//! Content hashing and packet signing.
//!
//! ## Hash format
//!
//! Packet hashes are SHA-256 over the UTF-8 bytes of the canonical string,
//! rendered as `0x` + 64 lowercase hex characters ([`HexDigest`]). Digests
//! are stored and compared including the prefix, uniformly.
//!
//! ## Signature scheme
//!
//! Signing uses ECDSA P-256 over the **raw 32 digest bytes** (not the hex
//! string). Signature bytes are the raw 64-byte `r || s` form (not DER),
//! stored base64-encoded.
//!
//! ## Key scope
//!
//! A [`SignerContext`] holds one keypair and is constructed explicitly at
//! startup, then passed to whatever needs it; there is no hidden
//! module-level key cache, so tests can inject deterministic keys without
//! process-wide side effects. The default demo context generates an
//! ephemeral keypair, which means signatures verify only within the process
//! that produced them; deployments that need durable verification load a
//! PKCS#8 PEM key instead ([`SignerContext::from_pkcs8_pem`]).

use base64::{engine::general_purpose, Engine as _};
use ncast_ids::HexDigest;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::DecodePrivateKey;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::{CaseError, CaseResult};

/// Computes the SHA-256 content hash of a canonical string.
pub fn content_hash(canonical: &str) -> HexDigest {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    HexDigest::from_bytes(&digest)
}

/// Recomputes the content hash and compares canonical forms.
///
/// Integrity mismatch is an answer, not an error: this always runs to
/// completion and reports equality.
pub fn verify_content_hash(canonical: &str, expected: &HexDigest) -> bool {
    content_hash(canonical) == *expected
}

/// An ECDSA P-256 keypair used to sign and verify packet hashes.
pub struct SignerContext {
    signing_key: SigningKey,
}

impl SignerContext {
    /// Generates a fresh ephemeral keypair from OS entropy.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Loads a signing key from PKCS#8 PEM.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::SigningKeyParse`] if the PEM cannot be parsed.
    /// No signing can proceed without a key, so callers should treat this as
    /// fatal at startup.
    pub fn from_pkcs8_pem(pem: &str) -> CaseResult<Self> {
        let signing_key = SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| CaseError::SigningKeyParse(Box::new(e)))?;
        Ok(Self { signing_key })
    }

    /// Signs the raw bytes of a content digest.
    ///
    /// Returns base64 of the raw 64-byte `r || s` signature.
    pub fn sign(&self, digest: &HexDigest) -> CaseResult<String> {
        let signature: Signature = self
            .signing_key
            .try_sign(&digest.digest_bytes())
            .map_err(|e| CaseError::Sign(Box::new(e)))?;
        Ok(general_purpose::STANDARD.encode(signature.to_bytes()))
    }

    /// Verifies a base64 `r || s` signature against a content digest.
    ///
    /// Malformed base64 or signature bytes are simply invalid; this never
    /// fails exceptionally.
    pub fn verify(&self, digest: &HexDigest, signature_b64: &str) -> bool {
        let Ok(bytes) = general_purpose::STANDARD.decode(signature_b64) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&bytes) else {
            return false;
        };
        self.verifying_key()
            .verify(&digest.digest_bytes(), &signature)
            .is_ok()
    }

    fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Base64 of the SEC1-encoded (uncompressed) public key bytes.
    pub fn public_key_b64(&self) -> String {
        let point = self.verifying_key().to_encoded_point(false);
        general_purpose::STANDARD.encode(point.as_bytes())
    }
}

impl std::fmt::Debug for SignerContext {
    // Key material stays out of logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerContext")
            .field("public_key", &self.public_key_b64())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let canonical = r#"{"a":1,"b":[2,3]}"#;
        assert_eq!(content_hash(canonical), content_hash(canonical));
    }

    #[test]
    fn hash_has_canonical_format() {
        let digest = content_hash("{}");
        assert!(digest.as_str().starts_with("0x"));
        assert_eq!(digest.as_str().len(), 66);
    }

    #[test]
    fn hash_known_vector() {
        // SHA-256 of the empty string.
        let digest = content_hash("");
        assert_eq!(
            digest.as_str(),
            "0xe3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hash_is_sensitive_to_single_field_changes() {
        let a = content_hash(r#"{"score":60}"#);
        let b = content_hash(r#"{"score":61}"#);
        assert_ne!(a, b);
    }

    #[test]
    fn verify_content_hash_accepts_bare_hex_spelling() {
        let canonical = r#"{"state":"HOLD"}"#;
        let digest = content_hash(canonical);
        let bare = HexDigest::parse(&digest.as_str()[2..]).unwrap();
        assert!(verify_content_hash(canonical, &bare));
    }

    #[test]
    fn signature_round_trip() {
        let signer = SignerContext::generate();
        let digest = content_hash(r#"{"case":"001"}"#);
        let signature = signer.sign(&digest).unwrap();
        assert!(signer.verify(&digest, &signature));
    }

    #[test]
    fn signature_fails_for_different_digest() {
        let signer = SignerContext::generate();
        let signed = content_hash(r#"{"case":"001"}"#);
        let other = content_hash(r#"{"case":"002"}"#);
        let signature = signer.sign(&signed).unwrap();
        assert!(!signer.verify(&other, &signature));
    }

    #[test]
    fn signature_fails_across_contexts() {
        // Ephemeral keys are process-local by design; a different context
        // must reject the signature.
        let signer_a = SignerContext::generate();
        let signer_b = SignerContext::generate();
        let digest = content_hash(r#"{"case":"001"}"#);
        let signature = signer_a.sign(&digest).unwrap();
        assert!(!signer_b.verify(&digest, &signature));
    }

    #[test]
    fn malformed_signatures_are_invalid_not_fatal() {
        let signer = SignerContext::generate();
        let digest = content_hash("{}");
        assert!(!signer.verify(&digest, "not-base64!!"));
        assert!(!signer.verify(&digest, &general_purpose::STANDARD.encode([1u8; 7])));
    }
}
