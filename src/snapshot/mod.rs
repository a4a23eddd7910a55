//! Encrypted, versioned backups of the whole [`AppData`].
//!
//! [`encode`] wraps the data in an envelope `{data, timestamp, version}`,
//! serializes it to JSON and seals it with a password. [`decode`] reverses
//! that, then validates the unwrapped data before handing it back.

pub mod crypto;
pub mod validate;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::app_data::AppData;

pub use validate::PasswordRule;

/// Envelope version written by this build
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// Error type for snapshot encode/decode
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("password {0}")]
    WeakPassword(PasswordRule),
    #[error("wrong password or corrupted data")]
    Crypto,
    #[error("invalid backup structure: {0}")]
    Structure(String),
    #[error("could not serialize data: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Non-fatal findings from [`decode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotWarning {
    /// The artifact was written by a different envelope version
    VersionMismatch { found: String, expected: String },
}

impl std::fmt::Display for SnapshotWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotWarning::VersionMismatch { found, expected } => write!(
                f,
                "backup version {} differs from current version {}",
                found, expected
            ),
        }
    }
}

/// Result of a successful [`decode`]
#[derive(Debug, Clone)]
pub struct Decoded {
    pub data: AppData,
    /// When the artifact was written, if the envelope carried a usable timestamp
    pub exported_at: Option<DateTime<Utc>>,
    pub warnings: Vec<SnapshotWarning>,
}

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    data: &'a AppData,
    timestamp: i64,
    version: &'a str,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    version: Option<String>,
}

/// Serialize and encrypt `data`. The password policy is checked before any
/// cipher work.
pub fn encode(data: &AppData, password: &str) -> Result<String, SnapshotError> {
    validate::check_password(password).map_err(SnapshotError::WeakPassword)?;
    let envelope = EnvelopeOut {
        data,
        timestamp: Utc::now().timestamp_millis(),
        version: SNAPSHOT_VERSION,
    };
    let json = serde_json::to_string(&envelope)?;
    crypto::seal(&json, password).map_err(|_| SnapshotError::Crypto)
}

/// Decrypt, unwrap and validate an artifact produced by [`encode`].
pub fn decode(artifact: &str, password: &str) -> Result<Decoded, SnapshotError> {
    let json = crypto::open(artifact, password).map_err(|_| SnapshotError::Crypto)?;
    let envelope: EnvelopeIn = serde_json::from_str(&json).map_err(|_| SnapshotError::Crypto)?;

    let mut warnings = Vec::new();
    let found = envelope.version.unwrap_or_default();
    if found != SNAPSHOT_VERSION {
        warnings.push(SnapshotWarning::VersionMismatch {
            found,
            expected: SNAPSHOT_VERSION.to_string(),
        });
    }

    validate::check_structure(&envelope.data).map_err(SnapshotError::Structure)?;
    let data: AppData = serde_json::from_value(envelope.data)
        .map_err(|e| SnapshotError::Structure(e.to_string()))?;

    let exported_at = envelope
        .timestamp
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

    Ok(Decoded {
        data,
        exported_at,
        warnings,
    })
}

/// Default file name for a backup written on `date`.
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("arbor-backup-{}.encrypted", date.format("%Y-%m-%d"))
}
