//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into core
//! services. The core never reads environment variables during request
//! handling; binaries resolve their environment at the edge and construct a
//! `CoreConfig` from it.

use crate::constants::{GATE_BLOCK_AT, GATE_WARN_AT};
use crate::error::{CaseError, CaseResult};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    environment: String,
    synthetic: bool,
    signing_key_pem: Option<String>,
    gate_warn_at: u8,
    gate_block_at: u8,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `signing_key_pem` is the PKCS#8 PEM content of an externally held
    /// signing key; `None` means an ephemeral keypair is generated at
    /// startup.
    pub fn new(
        environment: String,
        synthetic: bool,
        signing_key_pem: Option<String>,
        gate_warn_at: u8,
        gate_block_at: u8,
    ) -> CaseResult<Self> {
        if environment.trim().is_empty() {
            return Err(CaseError::InvalidInput("environment cannot be empty".into()));
        }
        if gate_warn_at > gate_block_at || gate_block_at > 100 {
            return Err(CaseError::InvalidInput(format!(
                "gate thresholds must satisfy warn_at <= block_at <= 100, got warn_at={gate_warn_at} block_at={gate_block_at}"
            )));
        }

        Ok(Self {
            environment,
            synthetic,
            signing_key_pem,
            gate_warn_at,
            gate_block_at,
        })
    }

    /// The demo configuration: synthetic data, ephemeral key, default gate
    /// thresholds.
    pub fn demo() -> Self {
        Self {
            environment: "demo".into(),
            synthetic: true,
            signing_key_pem: None,
            gate_warn_at: GATE_WARN_AT,
            gate_block_at: GATE_BLOCK_AT,
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn synthetic(&self) -> bool {
        self.synthetic
    }

    pub fn signing_key_pem(&self) -> Option<&str> {
        self.signing_key_pem.as_deref()
    }

    pub fn gate_warn_at(&self) -> u8 {
        self.gate_warn_at
    }

    pub fn gate_block_at(&self) -> u8 {
        self.gate_block_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_environment() {
        assert!(CoreConfig::new("  ".into(), true, None, 40, 75).is_err());
    }

    #[test]
    fn rejects_inverted_gate_thresholds() {
        assert!(CoreConfig::new("demo".into(), true, None, 80, 75).is_err());
        assert!(CoreConfig::new("demo".into(), true, None, 40, 101).is_err());
    }

    #[test]
    fn demo_config_is_valid() {
        let cfg = CoreConfig::demo();
        assert_eq!(cfg.environment(), "demo");
        assert!(cfg.synthetic());
        assert!(cfg.signing_key_pem().is_none());
    }
}
