//! Document snapshot record.
//!
//! # Responsibility
//! - Hold metadata, schema version and the five entity maps.
//! - Hold optional extension side tables keyed by entity id.
//!
//! # Invariants
//! - `version` equals the highest schema migration step applied.
//! - A published `Document` is never mutated; cloning it is cheap because
//!   every collection is behind an `Arc`.

use super::element::{Connector, Element, Relationship};
use super::folder::{Folder, FolderKind};
use super::view::View;
use super::{ConnectorId, ElementId, EntityKind, FolderId, RelationshipId, ViewId};
use crate::snapshot::migrations::latest_version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type ElementMap = BTreeMap<ElementId, Arc<Element>>;
pub type RelationshipMap = BTreeMap<RelationshipId, Arc<Relationship>>;
pub type ConnectorMap = BTreeMap<ConnectorId, Arc<Connector>>;
pub type ViewMap = BTreeMap<ViewId, Arc<View>>;
pub type FolderMap = BTreeMap<FolderId, Arc<Folder>>;
/// Entity id -> external system references.
pub type ExternalIdTable = BTreeMap<String, Vec<ExternalIdRef>>;
/// Entity id -> free-form key/value pairs.
pub type TaggedValueTable = BTreeMap<String, Vec<TaggedValue>>;

/// Descriptive document metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub documentation: String,
}

/// Cross-reference to the same entity in an external system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIdRef {
    pub system: String,
    pub external_id: String,
}

/// Free-form key/value annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedValue {
    pub key: String,
    pub value: String,
}

/// Complete model snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub version: u32,
    #[serde(default)]
    pub metadata: Arc<DocumentMetadata>,
    #[serde(default)]
    pub elements: Arc<ElementMap>,
    #[serde(default)]
    pub relationships: Arc<RelationshipMap>,
    #[serde(default)]
    pub connectors: Arc<ConnectorMap>,
    #[serde(default)]
    pub views: Arc<ViewMap>,
    #[serde(default)]
    pub folders: Arc<FolderMap>,
    #[serde(default, skip_serializing_if = "is_empty_table")]
    pub external_ids: Arc<ExternalIdTable>,
    #[serde(default, skip_serializing_if = "is_empty_table")]
    pub tagged_values: Arc<TaggedValueTable>,
}

fn is_empty_table<V>(table: &Arc<BTreeMap<String, V>>) -> bool {
    table.is_empty()
}

impl Document {
    /// Creates an empty document at the latest schema version, seeded with
    /// the root folder.
    pub fn empty(name: impl Into<String>) -> Self {
        let root = Folder::root("Model");
        let mut folders = FolderMap::new();
        folders.insert(root.id.clone(), Arc::new(root));
        Self {
            version: latest_version(),
            metadata: Arc::new(DocumentMetadata {
                name: name.into(),
                documentation: String::new(),
            }),
            elements: Arc::default(),
            relationships: Arc::default(),
            connectors: Arc::default(),
            views: Arc::default(),
            folders: Arc::new(folders),
            external_ids: Arc::default(),
            tagged_values: Arc::default(),
        }
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.get(id).map(Arc::as_ref)
    }

    pub fn relationship(&self, id: &str) -> Option<&Relationship> {
        self.relationships.get(id).map(Arc::as_ref)
    }

    pub fn connector(&self, id: &str) -> Option<&Connector> {
        self.connectors.get(id).map(Arc::as_ref)
    }

    pub fn view(&self, id: &str) -> Option<&View> {
        self.views.get(id).map(Arc::as_ref)
    }

    pub fn folder(&self, id: &str) -> Option<&Folder> {
        self.folders.get(id).map(Arc::as_ref)
    }

    /// First folder tagged as root, if any.
    pub fn root_folder(&self) -> Option<&Folder> {
        self.folders
            .values()
            .map(Arc::as_ref)
            .find(|folder| folder.kind == FolderKind::Root)
    }

    /// Resolves which entity map an id belongs to.
    pub fn entity_kind(&self, id: &str) -> Option<EntityKind> {
        if self.elements.contains_key(id) {
            Some(EntityKind::Element)
        } else if self.relationships.contains_key(id) {
            Some(EntityKind::Relationship)
        } else if self.connectors.contains_key(id) {
            Some(EntityKind::Connector)
        } else if self.views.contains_key(id) {
            Some(EntityKind::View)
        } else if self.folders.contains_key(id) {
            Some(EntityKind::Folder)
        } else {
            None
        }
    }

    /// Total number of elements, relationships and views.
    pub fn content_count(&self) -> usize {
        self.elements.len() + self.relationships.len() + self.views.len()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty("Untitled model")
    }
}
