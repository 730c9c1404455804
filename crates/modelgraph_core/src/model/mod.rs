//! Document graph domain model.
//!
//! # Responsibility
//! - Define the persisted shape of a model document and its five entity maps.
//! - Provide identifier and attribute-bag aliases shared by store and
//!   migrations.
//!
//! # Invariants
//! - Every entity is identified by an opaque, stable string id that is never
//!   reused for another entity.
//! - Entity maps hold `Arc` entries so unmodified entities keep their
//!   allocation across snapshots.

pub mod document;
pub mod element;
pub mod folder;
pub mod view;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a semantic element.
pub type ElementId = String;
/// Stable identifier of a relationship.
pub type RelationshipId = String;
/// Stable identifier of a junction connector.
pub type ConnectorId = String;
/// Stable identifier of a diagram view.
pub type ViewId = String;
/// Stable identifier of a folder.
pub type FolderId = String;
/// Stable identifier of a view-local decorative object.
pub type ViewObjectId = String;

/// Type-specific attribute bag attached to elements and relationships.
pub type AttributeBag = BTreeMap<String, serde_json::Value>;

/// Generates a fresh opaque id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Entity category, used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Element,
    Relationship,
    Connector,
    View,
    Folder,
    ViewObject,
    /// Any id-bearing entity (used by extension side tables).
    Entity,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Element => "element",
            Self::Relationship => "relationship",
            Self::Connector => "connector",
            Self::View => "view",
            Self::Folder => "folder",
            Self::ViewObject => "view object",
            Self::Entity => "entity",
        };
        f.write_str(label)
    }
}
