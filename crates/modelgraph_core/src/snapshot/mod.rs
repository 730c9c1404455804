//! Persisted snapshot loading and saving.
//!
//! # Responsibility
//! - Parse snapshot text or files, run the migration chain, then decode into
//!   a typed `Document`.
//! - Serialize documents back to text or files.
//!
//! # Invariants
//! - Every loaded document has migrations fully applied.
//! - Saving never migrates; it writes the document as it is.
//! - Snapshots newer than this binary are rejected, never downgraded.

pub mod migrations;

use crate::model::document::Document;
use crate::store::integrity;
use log::{error, info, warn};
use migrations::{latest_version, run_migrations};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use std::time::Instant;

pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    Io(std::io::Error),
    UnsupportedSchemaVersion {
        document_version: u32,
        latest_supported: u32,
    },
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                document_version,
                latest_supported,
            } => write!(
                f,
                "document schema version {document_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Document decoded from a snapshot, with its migration record.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub document: Document,
    /// Version the snapshot carried before migration.
    pub from_version: u32,
    /// One line per migration step applied.
    pub notes: Vec<String>,
}

impl LoadedDocument {
    pub fn was_migrated(&self) -> bool {
        !self.notes.is_empty()
    }
}

/// Migrates and decodes an already-parsed snapshot.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the snapshot is newer than this binary.
/// - `Json` when the migrated tree does not decode into a document.
pub fn load_document_value(value: Value) -> SnapshotResult<LoadedDocument> {
    let outcome = run_migrations(value);
    let latest = latest_version();
    if outcome.from_version > latest {
        return Err(SnapshotError::UnsupportedSchemaVersion {
            document_version: outcome.from_version,
            latest_supported: latest,
        });
    }

    let document: Document = serde_json::from_value(outcome.document)?;
    for issue in integrity::check(&document) {
        warn!("event=snapshot_integrity module=snapshot status=issue issue=\"{issue}\"");
    }
    Ok(LoadedDocument {
        document,
        from_version: outcome.from_version,
        notes: outcome.notes,
    })
}

/// Parses, migrates and decodes snapshot text.
///
/// # Side effects
/// - Emits `snapshot_load` logging events with duration and status.
pub fn load_document_str(text: &str) -> SnapshotResult<LoadedDocument> {
    let started_at = Instant::now();
    info!("event=snapshot_load module=snapshot status=start mode=text");

    let result = serde_json::from_str::<Value>(text)
        .map_err(SnapshotError::from)
        .and_then(load_document_value);
    log_load_result(&result, "text", started_at);
    result
}

/// Reads, migrates and decodes a snapshot file.
///
/// # Side effects
/// - Emits `snapshot_load` logging events with duration and status.
pub fn load_document_file(path: impl AsRef<Path>) -> SnapshotResult<LoadedDocument> {
    let started_at = Instant::now();
    info!("event=snapshot_load module=snapshot status=start mode=file");

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            error!(
                "event=snapshot_load module=snapshot status=error mode=file duration_ms={} error_code=snapshot_read_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    let result = serde_json::from_str::<Value>(&text)
        .map_err(SnapshotError::from)
        .and_then(load_document_value);
    log_load_result(&result, "file", started_at);
    result
}

/// Serializes `document` as pretty-printed JSON.
pub fn save_document_string(document: &Document) -> SnapshotResult<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Writes `document` to `path`, replacing any existing file.
///
/// # Side effects
/// - Emits `snapshot_save` logging events with duration and status.
pub fn save_document_file(document: &Document, path: impl AsRef<Path>) -> SnapshotResult<()> {
    let started_at = Instant::now();
    let result = save_document_string(document)
        .and_then(|text| fs::write(path, text).map_err(SnapshotError::from));
    match &result {
        Ok(()) => info!(
            "event=snapshot_save module=snapshot status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=snapshot_save module=snapshot status=error duration_ms={} error_code=snapshot_write_failed error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn log_load_result(result: &SnapshotResult<LoadedDocument>, mode: &str, started_at: Instant) {
    match result {
        Ok(loaded) => info!(
            "event=snapshot_load module=snapshot status=ok mode={mode} from_version={} steps={} duration_ms={}",
            loaded.from_version,
            loaded.notes.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=snapshot_load module=snapshot status=error mode={mode} duration_ms={} error_code=snapshot_decode_failed error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
}
