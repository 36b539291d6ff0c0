//! # Audit Journal
//!
//! Tamper-evident record of every [`ComplianceEvent`] the system emits.
//!
//! Each event becomes one JSONL line. The line's HMAC-SHA256 covers its own
//! data together with the previous line's HMAC, so editing, dropping or
//! reordering any historical line breaks verification from that point on.
//!
//! ```no_run
//! use regtoken::audit::{verify_chain, AuditJournal};
//! use std::path::Path;
//!
//! let key = [0x42u8; 32];
//! let journal = AuditJournal::open(Path::new("/var/log/regtoken/audit.jsonl"), &key)?;
//! // hand `journal` to the store, registry and assets as their sink
//! let result = verify_chain(journal.path(), &key)?;
//! assert!(result.valid);
//! # Ok::<(), regtoken::audit::AuditError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use hmac::{Hmac, Mac};
use regtoken_core::{ComplianceEvent, EventSink};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// `prev_hmac` of the first entry.
pub const INITIAL_HMAC: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Environment variable holding the hex-encoded journal key.
pub const AUDIT_KEY_ENV: &str = "REGTOKEN_AUDIT_KEY";

/// One line of the journal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    /// Position in the chain, starting at zero.
    pub seq: u64,

    /// RFC 3339 wall-clock time the entry was written.
    pub timestamp: String,

    /// Event name, e.g. `restriction-detected`.
    pub event: String,

    /// Event fields.
    pub fields: serde_json::Value,

    /// HMAC of the preceding entry.
    pub prev_hmac: String,

    /// HMAC over this entry and `prev_hmac`.
    pub hmac: String,
}

/// Outcome of [`verify_chain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    /// Whether every entry verified.
    pub valid: bool,

    /// Entries verified before the first failure.
    pub entries_checked: u64,

    /// Sequence number of the first bad entry.
    pub first_invalid_seq: Option<u64>,

    /// What went wrong.
    pub error_message: Option<String>,
}

impl VerifyResult {
    const fn success(entries_checked: u64) -> Self {
        Self {
            valid: true,
            entries_checked,
            first_invalid_seq: None,
            error_message: None,
        }
    }

    fn failure(entries_checked: u64, first_invalid_seq: u64, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            entries_checked,
            first_invalid_seq: Some(first_invalid_seq),
            error_message: Some(message.into()),
        }
    }
}

/// Errors raised by the journal.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Reading or appending the journal file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An entry could not be encoded or decoded.
    #[error("Failed to serialize entry: {0}")]
    Serialization(String),

    /// No key in the environment or configuration.
    #[error("No audit key: set {AUDIT_KEY_ENV} or audit.key_hex")]
    KeyNotFound,

    /// The key is not 64 hex characters.
    #[error("Invalid audit key: {0}")]
    InvalidKey(String),

    /// An existing journal does not verify under the given key.
    #[error("Chain verification failed at seq {seq}: {message}")]
    ChainBroken {
        /// First bad entry.
        seq: u64,
        /// Description of the failure.
        message: String,
    },

    /// The chain state mutex was poisoned.
    #[error("Lock error: {0}")]
    LockError(String),
}

/// Append-only, HMAC-chained event journal.
///
/// Opening an existing file verifies it and continues its chain.
pub struct AuditJournal {
    path: PathBuf,
    key: [u8; 32],
    next_seq: AtomicU64,
    last_hmac: Mutex<String>,
}

impl AuditJournal {
    /// Open (or create) the journal at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ChainBroken`] when an existing journal fails to
    /// verify, or an I/O or decoding error.
    pub fn open(path: &Path, key: &[u8; 32]) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let (next_seq, last_hmac) = restore_state(path, key)?;
        tracing::debug!(path = %path.display(), next_seq, "Audit journal opened");

        Ok(Self {
            path: path.to_path_buf(),
            key: *key,
            next_seq: AtomicU64::new(next_seq),
            last_hmac: Mutex::new(last_hmac),
        })
    }

    /// Journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence number the next entry will get.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst)
    }

    /// Append one event.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the event cannot be encoded or written.
    #[allow(clippy::significant_drop_tightening)]
    pub fn record(&self, event: &ComplianceEvent) -> Result<u64, AuditError> {
        let mut last_hmac = self
            .last_hmac
            .lock()
            .map_err(|e| AuditError::LockError(e.to_string()))?;

        let mut fields =
            serde_json::to_value(event).map_err(|e| AuditError::Serialization(e.to_string()))?;
        if let Some(map) = fields.as_object_mut() {
            map.remove("event");
        }

        let seq = self.next_seq.load(Ordering::SeqCst);
        let mut entry = AuditEntry {
            seq,
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            event: event.name().to_string(),
            fields,
            prev_hmac: last_hmac.clone(),
            hmac: String::new(),
        };
        entry.hmac = compute_hmac(&self.key, &entry);

        let json =
            serde_json::to_string(&entry).map_err(|e| AuditError::Serialization(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()?;

        self.next_seq.store(seq + 1, Ordering::SeqCst);
        *last_hmac = entry.hmac;
        Ok(seq)
    }
}

impl EventSink for AuditJournal {
    fn emit(&self, event: ComplianceEvent) {
        if let Err(e) = self.record(&event) {
            tracing::error!(error = %e, event = event.name(), "Failed to journal event");
        }
    }
}

impl std::fmt::Debug for AuditJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditJournal")
            .field("path", &self.path)
            .field("next_seq", &self.next_seq())
            .finish_non_exhaustive()
    }
}

/// Decode a 64-character hex key, with or without `0x`.
///
/// # Errors
///
/// Returns [`AuditError::InvalidKey`] for anything else.
pub fn parse_key(hex_key: &str) -> Result<[u8; 32], AuditError> {
    let trimmed = hex_key.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|e| AuditError::InvalidKey(format!("Invalid hex: {e}")))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        AuditError::InvalidKey(format!("Key must be 32 bytes, got {} bytes", bytes.len()))
    })
}

/// Pick the key from `REGTOKEN_AUDIT_KEY`, then from the configured value.
///
/// # Errors
///
/// Returns [`AuditError::KeyNotFound`] when neither is set, or
/// [`AuditError::InvalidKey`] when the chosen one does not decode.
pub fn resolve_key(configured: Option<&str>) -> Result<[u8; 32], AuditError> {
    let from_env = std::env::var(AUDIT_KEY_ENV).ok();
    from_env
        .as_deref()
        .or(configured)
        .ok_or(AuditError::KeyNotFound)
        .and_then(parse_key)
}

/// Recompute the chain in `path`.
///
/// A missing file is an empty, valid chain.
///
/// # Errors
///
/// Returns [`AuditError`] when the file cannot be read or a line is not an
/// entry. Integrity failures are reported through [`VerifyResult`].
pub fn verify_chain(path: &Path, key: &[u8; 32]) -> Result<VerifyResult, AuditError> {
    if !path.exists() {
        return Ok(VerifyResult::success(0));
    }

    let mut prev_hmac = INITIAL_HMAC.to_string();
    let mut checked: u64 = 0;

    for entry in read_entries(path)? {
        let entry = entry?;
        if let Some(message) = check_entry(key, &entry, checked, &prev_hmac) {
            return Ok(VerifyResult::failure(checked, entry.seq, message));
        }
        prev_hmac = entry.hmac;
        checked += 1;
    }

    Ok(VerifyResult::success(checked))
}

fn restore_state(path: &Path, key: &[u8; 32]) -> Result<(u64, String), AuditError> {
    if !path.exists() {
        return Ok((0, INITIAL_HMAC.to_string()));
    }

    let mut prev_hmac = INITIAL_HMAC.to_string();
    let mut next_seq: u64 = 0;

    for entry in read_entries(path)? {
        let entry = entry?;
        if let Some(message) = check_entry(key, &entry, next_seq, &prev_hmac) {
            return Err(AuditError::ChainBroken {
                seq: entry.seq,
                message,
            });
        }
        prev_hmac = entry.hmac;
        next_seq += 1;
    }

    Ok((next_seq, prev_hmac))
}

fn read_entries(
    path: &Path,
) -> Result<impl Iterator<Item = Result<AuditEntry, AuditError>>, AuditError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(reader
        .lines()
        .enumerate()
        .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .map(|(index, line)| {
            let line = line?;
            serde_json::from_str(&line)
                .map_err(|e| AuditError::Serialization(format!("Line {}: {e}", index + 1)))
        }))
}

fn check_entry(
    key: &[u8; 32],
    entry: &AuditEntry,
    expected_seq: u64,
    prev_hmac: &str,
) -> Option<String> {
    if entry.seq != expected_seq {
        return Some(format!(
            "Sequence mismatch: expected {expected_seq}, got {}",
            entry.seq
        ));
    }
    if entry.prev_hmac != prev_hmac {
        return Some("Chain link mismatch: previous entry was altered or removed".to_string());
    }
    if entry.hmac != compute_hmac(key, entry) {
        return Some("HMAC mismatch: entry may have been tampered with".to_string());
    }
    None
}

fn compute_hmac(key: &[u8; 32], entry: &AuditEntry) -> String {
    // serde_json sorts object keys, so `fields` renders the same after a round trip.
    let data = format!(
        "{}||{}||{}||{}||{}",
        entry.seq, entry.timestamp, entry.event, entry.fields, entry.prev_hmac
    );

    // HMAC-SHA256 accepts any key length.
    let mut mac = HmacSha256::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
