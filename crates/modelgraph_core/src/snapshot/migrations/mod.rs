//! Document schema migration registry and runner.
//!
//! # Responsibility
//! - Register document upgrade steps in strictly increasing order.
//! - Upgrade a parsed snapshot to the latest version before typed decode.
//!
//! # Invariants
//! - `version` values must remain monotonic; the runner never lowers a
//!   document's version.
//! - A step that meets an unexpected shape leaves the document unchanged for
//!   that step and still bumps the version, so loading never fails here.
//! - A document already at the latest version is returned untouched with no
//!   notes.

mod steps;

use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Version assumed for snapshots written before versioning existed.
pub const UNVERSIONED: u32 = 1;

/// Failure of a single step. Recovered by the runner, never surfaced from
/// `run_migrations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// The step met a shape it cannot normalize.
    MalformedLegacyDocument { version: u32, reason: String },
}

impl MigrationError {
    pub(crate) fn malformed(version: u32, reason: impl Into<String>) -> Self {
        Self::MalformedLegacyDocument {
            version,
            reason: reason.into(),
        }
    }
}

impl Display for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedLegacyDocument { version, reason } => {
                write!(f, "malformed legacy document for v{version} step: {reason}")
            }
        }
    }
}

impl Error for MigrationError {}

type StepFn = fn(&mut Value) -> Result<(), MigrationError>;

#[derive(Clone, Copy)]
struct Migration {
    /// Version the document reaches after this step.
    version: u32,
    summary: &'static str,
    apply: StepFn,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 2,
        summary: "merged legacy element/relationship/view containers into the root folder",
        apply: steps::merge_legacy_containers,
    },
    Migration {
        version: 3,
        summary: "added relationship membership lists to folders",
        apply: steps::add_relationship_lists,
    },
    Migration {
        version: 4,
        summary: "assigned stacking order to layout nodes and connections",
        apply: steps::assign_z_order,
    },
    Migration {
        version: 5,
        summary: "folded legacy descriptions into documentation",
        apply: steps::fold_descriptions,
    },
    Migration {
        version: 6,
        summary: "renamed legacy attribute keys",
        apply: steps::rename_attribute_keys,
    },
    Migration {
        version: 7,
        summary: "stripped attribute keys foreign to each type",
        apply: steps::strip_foreign_attributes,
    },
    Migration {
        version: 8,
        summary: "renamed view owner binding and enforced placement exclusivity",
        apply: steps::enforce_view_placement,
    },
];

/// Returns the latest document version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS
        .last()
        .map_or(UNVERSIONED, |migration| migration.version)
}

/// Reads a snapshot's version. Missing, zero or non-numeric versions count as
/// unversioned.
pub fn document_version(doc: &Value) -> u32 {
    doc.get("version")
        .and_then(Value::as_u64)
        .and_then(|version| u32::try_from(version).ok())
        .filter(|version| *version > 0)
        .unwrap_or(UNVERSIONED)
}

/// Result of running the migration chain.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOutcome {
    pub document: Value,
    pub from_version: u32,
    /// One human-readable line per step applied.
    pub notes: Vec<String>,
}

impl MigrationOutcome {
    pub fn to_version(&self) -> u32 {
        document_version(&self.document)
    }
}

/// Upgrades `doc` to the latest known version.
///
/// Documents newer than this binary are returned unchanged; the caller
/// decides whether to reject them.
pub fn run_migrations(doc: Value) -> MigrationOutcome {
    let from_version = document_version(&doc);
    let mut current = doc;
    let mut notes = Vec::new();

    for migration in MIGRATIONS {
        if migration.version <= from_version {
            continue;
        }
        let previous = migration.version - 1;
        let mut candidate = current.clone();
        match (migration.apply)(&mut candidate) {
            Ok(()) => {
                current = candidate;
                notes.push(format!(
                    "v{previous} -> v{}: {}",
                    migration.version, migration.summary
                ));
            }
            Err(err) => {
                warn!(
                    "event=migration_step module=snapshot status=skipped version={} error={}",
                    migration.version, err
                );
                notes.push(format!(
                    "v{previous} -> v{}: skipped ({err})",
                    migration.version
                ));
            }
        }
        set_version(&mut current, migration.version);
    }

    if !notes.is_empty() {
        info!(
            "event=migration module=snapshot status=ok from_version={} to_version={} steps={}",
            from_version,
            document_version(&current),
            notes.len()
        );
    }

    MigrationOutcome {
        document: current,
        from_version,
        notes,
    }
}

fn set_version(doc: &mut Value, version: u32) {
    if let Some(object) = doc.as_object_mut() {
        object.insert("version".to_string(), Value::from(version));
    }
}
