//! Append-only commit ledger.
//!
//! Committed packets are recorded in a ledger keyed by content hash. Nothing
//! is ever deleted or rewritten: append is the only mutation, and the backing
//! store must make insert-and-read atomic (a single mutex suffices; there is
//! no contention pattern beyond key insertion).
//!
//! The store is an injectable interface ([`LedgerStore`]) so a deployment can
//! swap the in-memory demo map for a persistent backing without touching the
//! commit semantics. [`FileLedger`] is the simplest persistent form: one JSON
//! line per commit, index rebuilt at open.
//!
//! Commits are idempotent per hash: committing a hash that is already present
//! returns the original record rather than minting a second transaction id.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use ncast_ids::{HexDigest, RunId};
use serde::{Deserialize, Serialize};

use crate::error::{CaseError, CaseResult};
use crate::gate::{GateAction, GateDecision};
use crate::routing::WorkflowState;

/// Identifying metadata stored alongside a committed hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMetadata {
    pub vtp_id: RunId,
    pub case_id: String,
    pub run_id: RunId,
    pub workflow_state: WorkflowState,
    pub created_at: DateTime<Utc>,
}

/// One ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: HexDigest,
    pub metadata: CommitMetadata,
    pub transaction_id: RunId,
    pub committed_at: DateTime<Utc>,
    pub success: bool,
    /// Present when the security gate allowed the commit with a warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Result of a gated commit attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitOutcome {
    /// The packet was appended to the ledger.
    Committed(CommitRecord),
    /// The hash was already present; the original record is returned and no
    /// new transaction id is minted.
    AlreadyCommitted(CommitRecord),
    /// The security gate vetoed the commit. The ledger was not touched.
    Rejected { reason: String, risk_score: u8 },
}

/// Backing store for the ledger. Append-only, keyed by content hash.
///
/// `put` must be atomic with respect to concurrent `get`/`has`; the caller
/// holds no lock of its own.
pub trait LedgerStore: Send + Sync {
    fn put(&self, record: CommitRecord) -> CaseResult<()>;
    fn get(&self, hash: &HexDigest) -> CaseResult<Option<CommitRecord>>;
    fn has(&self, hash: &HexDigest) -> CaseResult<bool>;
}

/// The demo store: a mutex-guarded in-process map. Contents do not survive
/// the process.
#[derive(Default)]
pub struct InMemoryLedger {
    entries: Mutex<HashMap<String, CommitRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedger {
    fn put(&self, record: CommitRecord) -> CaseResult<()> {
        let mut entries = self.entries.lock().map_err(|_| CaseError::LedgerLock)?;
        entries.insert(record.hash.as_str().to_owned(), record);
        Ok(())
    }

    fn get(&self, hash: &HexDigest) -> CaseResult<Option<CommitRecord>> {
        let entries = self.entries.lock().map_err(|_| CaseError::LedgerLock)?;
        Ok(entries.get(hash.as_str()).cloned())
    }

    fn has(&self, hash: &HexDigest) -> CaseResult<bool> {
        let entries = self.entries.lock().map_err(|_| CaseError::LedgerLock)?;
        Ok(entries.contains_key(hash.as_str()))
    }
}

/// File-backed store: one JSON line per commit, appended and never rewritten.
///
/// The full index is loaded at open; at demo scale (thousands of commits)
/// that is cheap, and it keeps reads lock-cheap afterwards.
pub struct FileLedger {
    path: PathBuf,
    index: Mutex<HashMap<String, CommitRecord>>,
}

impl FileLedger {
    /// Opens (or creates) a ledger file and rebuilds the index from it.
    ///
    /// # Errors
    ///
    /// Returns [`CaseError::LedgerRead`] on I/O failure and
    /// [`CaseError::LedgerEntryParse`] when an existing line is not a valid
    /// commit record.
    pub fn open(path: &Path) -> CaseResult<Self> {
        let mut index = HashMap::new();
        match std::fs::File::open(path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    let line = line.map_err(CaseError::LedgerRead)?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let record: CommitRecord =
                        serde_json::from_str(&line).map_err(CaseError::LedgerEntryParse)?;
                    index.insert(record.hash.as_str().to_owned(), record);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CaseError::LedgerRead(e)),
        }
        Ok(Self {
            path: path.to_path_buf(),
            index: Mutex::new(index),
        })
    }
}

impl LedgerStore for FileLedger {
    fn put(&self, record: CommitRecord) -> CaseResult<()> {
        // Index and file are updated under one lock so readers never observe
        // a record that is not on disk.
        let mut index = self.index.lock().map_err(|_| CaseError::LedgerLock)?;
        let mut line = serde_json::to_string(&record).map_err(CaseError::Serialization)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(CaseError::LedgerAppend)?;
        file.write_all(line.as_bytes())
            .map_err(CaseError::LedgerAppend)?;
        index.insert(record.hash.as_str().to_owned(), record);
        Ok(())
    }

    fn get(&self, hash: &HexDigest) -> CaseResult<Option<CommitRecord>> {
        let index = self.index.lock().map_err(|_| CaseError::LedgerLock)?;
        Ok(index.get(hash.as_str()).cloned())
    }

    fn has(&self, hash: &HexDigest) -> CaseResult<bool> {
        let index = self.index.lock().map_err(|_| CaseError::LedgerLock)?;
        Ok(index.contains_key(hash.as_str()))
    }
}

/// Gated commit operations over an injectable store.
pub struct Ledger {
    store: std::sync::Arc<dyn LedgerStore>,
}

impl Ledger {
    pub fn new(store: std::sync::Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Attempts to append a packet hash to the ledger, honouring the
    /// security-gate decision.
    ///
    /// BLOCK is a hard veto: the store is not touched and the caller receives
    /// [`CommitOutcome::Rejected`] with the gate's reason. WARN commits with
    /// the warning recorded on the entry. A failed append is reported, never
    /// retried: a retry could mint duplicate-looking transaction ids.
    pub fn commit(
        &self,
        hash: &HexDigest,
        metadata: CommitMetadata,
        gate: &GateDecision,
    ) -> CaseResult<CommitOutcome> {
        if gate.action == GateAction::Block {
            tracing::warn!(
                hash = %hash,
                risk_score = gate.risk_score,
                "security gate blocked commit"
            );
            return Ok(CommitOutcome::Rejected {
                reason: gate.reason.clone(),
                risk_score: gate.risk_score,
            });
        }

        if let Some(existing) = self.store.get(hash)? {
            return Ok(CommitOutcome::AlreadyCommitted(existing));
        }

        let record = CommitRecord {
            hash: hash.clone(),
            metadata,
            transaction_id: RunId::new(),
            committed_at: Utc::now(),
            success: true,
            warning: match gate.action {
                GateAction::Warn => Some(gate.reason.clone()),
                _ => None,
            },
        };
        self.store.put(record.clone())?;
        tracing::info!(hash = %hash, transaction_id = %record.transaction_id, "packet committed");
        Ok(CommitOutcome::Committed(record))
    }

    /// Existence check for a committed hash.
    pub fn verify(&self, hash: &HexDigest) -> CaseResult<bool> {
        self.store.has(hash)
    }

    /// Idempotent lookup by hash.
    pub fn get_commit(&self, hash: &HexDigest) -> CaseResult<Option<CommitRecord>> {
        self.store.get(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn metadata() -> CommitMetadata {
        CommitMetadata {
            vtp_id: RunId::new(),
            case_id: "case-001".into(),
            run_id: RunId::new(),
            workflow_state: WorkflowState::Proceed,
            created_at: Utc::now(),
        }
    }

    fn allow() -> GateDecision {
        GateDecision {
            action: GateAction::Allow,
            risk_score: 5,
            reason: "risk score 5 below thresholds".into(),
        }
    }

    fn digest(byte: u8) -> HexDigest {
        HexDigest::from_bytes(&[byte; 32])
    }

    #[test]
    fn commit_then_lookup() {
        let ledger = Ledger::new(Arc::new(InMemoryLedger::new()));
        let hash = digest(1);
        let outcome = ledger.commit(&hash, metadata(), &allow()).unwrap();
        let record = match outcome {
            CommitOutcome::Committed(r) => r,
            other => panic!("expected Committed, got {other:?}"),
        };
        assert!(record.success);
        assert!(record.warning.is_none());
        assert!(ledger.verify(&hash).unwrap());
        assert_eq!(ledger.get_commit(&hash).unwrap(), Some(record));
    }

    #[test]
    fn missing_hash_is_absent_not_error() {
        let ledger = Ledger::new(Arc::new(InMemoryLedger::new()));
        assert!(!ledger.verify(&digest(9)).unwrap());
        assert_eq!(ledger.get_commit(&digest(9)).unwrap(), None);
    }

    #[test]
    fn duplicate_commit_is_idempotent() {
        let ledger = Ledger::new(Arc::new(InMemoryLedger::new()));
        let hash = digest(2);
        let first = ledger.commit(&hash, metadata(), &allow()).unwrap();
        let second = ledger.commit(&hash, metadata(), &allow()).unwrap();
        let (CommitOutcome::Committed(a), CommitOutcome::AlreadyCommitted(b)) = (first, second)
        else {
            panic!("expected Committed then AlreadyCommitted");
        };
        assert_eq!(a.transaction_id, b.transaction_id);
    }

    #[test]
    fn block_vetoes_commit_without_touching_store() {
        let ledger = Ledger::new(Arc::new(InMemoryLedger::new()));
        let hash = digest(3);
        let block = GateDecision {
            action: GateAction::Block,
            risk_score: 90,
            reason: "risk score 90 at or above block threshold 75".into(),
        };
        let outcome = ledger.commit(&hash, metadata(), &block).unwrap();
        assert!(matches!(outcome, CommitOutcome::Rejected { risk_score: 90, .. }));
        assert!(!ledger.verify(&hash).unwrap());
    }

    #[test]
    fn warn_commits_with_annotation() {
        let ledger = Ledger::new(Arc::new(InMemoryLedger::new()));
        let hash = digest(4);
        let warn = GateDecision {
            action: GateAction::Warn,
            risk_score: 50,
            reason: "risk score 50 at or above warn threshold 40".into(),
        };
        let outcome = ledger.commit(&hash, metadata(), &warn).unwrap();
        let CommitOutcome::Committed(record) = outcome else {
            panic!("expected Committed");
        };
        assert_eq!(record.warning.as_deref(), Some("risk score 50 at or above warn threshold 40"));
    }

    #[test]
    fn file_ledger_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("commits.jsonl");
        let hash = digest(5);

        {
            let ledger = Ledger::new(Arc::new(FileLedger::open(&path).unwrap()));
            ledger.commit(&hash, metadata(), &allow()).unwrap();
        }

        let reopened = Ledger::new(Arc::new(FileLedger::open(&path).unwrap()));
        assert!(reopened.verify(&hash).unwrap());
        let record = reopened.get_commit(&hash).unwrap().unwrap();
        assert_eq!(record.hash, hash);
    }

    #[test]
    fn file_ledger_rejects_corrupt_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("commits.jsonl");
        std::fs::write(&path, "not json\n").unwrap();
        assert!(matches!(
            FileLedger::open(&path),
            Err(CaseError::LedgerEntryParse(_))
        ));
    }
}
