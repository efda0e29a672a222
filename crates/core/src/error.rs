#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to serialize packet content: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize packet content: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to parse ECDSA signing key: {0}")]
    SigningKeyParse(Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to sign content digest: {0}")]
    Sign(Box<dyn std::error::Error + Send + Sync>),
    #[error("security gate failed to produce a decision: {0}")]
    Gate(String),
    #[error("ledger store mutex poisoned")]
    LedgerLock,
    #[error("failed to read ledger file: {0}")]
    LedgerRead(std::io::Error),
    #[error("failed to append to ledger file: {0}")]
    LedgerAppend(std::io::Error),
    #[error("failed to parse ledger entry: {0}")]
    LedgerEntryParse(serde_json::Error),

    #[error("identifier error: {0}")]
    Id(#[from] ncast_ids::IdError),
    #[error("text error: {0}")]
    Text(#[from] ncast_types::TextError),
}

pub type CaseResult<T> = std::result::Result<T, CaseError>;
