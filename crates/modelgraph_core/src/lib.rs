//! Core domain logic for modelgraph.
//! This crate owns the document model, its mutation store and the snapshot
//! migration pipeline.

pub mod config;
pub mod logging;
pub mod model;
pub mod notation;
pub mod query;
pub mod service;
pub mod snapshot;
pub mod store;

pub use config::{LayoutConfig, StoreConfig};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status};
pub use model::document::Document;
pub use notation::{NotationRules, PermissiveNotation, ValidationStrictness};
pub use service::modeling_service::{ModelingService, ModelingServiceError};
pub use snapshot::migrations::{latest_version, run_migrations, MigrationOutcome};
pub use snapshot::{
    load_document_file, load_document_str, save_document_file, save_document_string,
    LoadedDocument, SnapshotError,
};
pub use store::integrity::IntegrityIssue;
pub use store::mutation::Mutation;
pub use store::{ModelStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, latest_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
        assert!(latest_version() > 1);
    }
}
