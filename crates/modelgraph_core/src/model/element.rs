//! Semantic node and edge records.
//!
//! # Responsibility
//! - Define elements, relationships and junction connectors.
//! - Provide creation requests and partial-update patches consumed by the
//!   store.
//!
//! # Invariants
//! - `Relationship::source_id`/`target_id` must resolve to existing elements
//!   in the owning document.
//! - `Element::parent_element_id`, when set, must resolve to another element
//!   and must not form a nesting cycle.

use super::{new_id, AttributeBag, ConnectorId, ElementId, FolderId, RelationshipId};
use serde::{Deserialize, Serialize};

/// Semantic node of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    #[serde(default)]
    pub name: String,
    /// Notation-specific type tag, serialized as `type`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    /// Keys allowed depend on `kind`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<AttributeBag>,
    /// Semantic nesting parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_element_id: Option<ElementId>,
}

/// Directed, typed edge between two elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    #[serde(rename = "type")]
    pub kind: String,
    pub source_id: ElementId,
    pub target_id: ElementId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<AttributeBag>,
}

impl Relationship {
    /// Returns whether `element_id` is one of this relationship's endpoints.
    pub fn touches(&self, element_id: &str) -> bool {
        self.source_id == element_id || self.target_id == element_id
    }
}

/// Junction flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    #[default]
    And,
    Or,
}

/// Routing junction used by relationship-only diagrams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub id: ConnectorId,
    #[serde(default)]
    pub kind: ConnectorKind,
}

impl Connector {
    pub fn new(kind: ConnectorKind) -> Self {
        Self { id: new_id(), kind }
    }
}

/// Creation request for one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewElement {
    /// Pre-allocated id; generated by [`NewElement::new`].
    pub id: ElementId,
    pub kind: String,
    pub name: String,
    pub documentation: String,
    pub attrs: Option<AttributeBag>,
    /// Target folder; `None` files the element into the root folder.
    pub folder_id: Option<FolderId>,
    pub parent_element_id: Option<ElementId>,
}

impl NewElement {
    /// Creates a request with a generated id.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_id(new_id(), kind, name)
    }

    /// Creates a request with a caller-provided id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(id: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            name: name.into(),
            documentation: String::new(),
            attrs: None,
            folder_id: None,
            parent_element_id: None,
        }
    }

    pub fn in_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn nested_under(mut self, parent_element_id: impl Into<String>) -> Self {
        self.parent_element_id = Some(parent_element_id.into());
        self
    }

    pub fn with_attrs(mut self, attrs: AttributeBag) -> Self {
        self.attrs = Some(attrs);
        self
    }

    pub(crate) fn into_element(self) -> Element {
        Element {
            id: self.id,
            name: self.name,
            kind: self.kind,
            documentation: self.documentation,
            attrs: self.attrs,
            parent_element_id: self.parent_element_id,
        }
    }
}

/// Partial update for one element. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementPatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub documentation: Option<String>,
    pub attrs: Option<Option<AttributeBag>>,
    /// `Some(None)` clears the semantic parent.
    pub parent_element_id: Option<Option<ElementId>>,
}

/// Creation request for one relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelationship {
    pub id: RelationshipId,
    pub kind: String,
    pub source_id: ElementId,
    pub target_id: ElementId,
    pub name: String,
    pub attrs: Option<AttributeBag>,
    /// Target folder; `None` files the relationship into the root folder.
    pub folder_id: Option<FolderId>,
}

impl NewRelationship {
    pub fn new(
        kind: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            kind: kind.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            name: String::new(),
            attrs: None,
            folder_id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn in_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub(crate) fn into_relationship(self) -> Relationship {
        Relationship {
            id: self.id,
            kind: self.kind,
            source_id: self.source_id,
            target_id: self.target_id,
            name: self.name,
            documentation: String::new(),
            attrs: self.attrs,
        }
    }
}

/// Partial update for one relationship.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipPatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub documentation: Option<String>,
    pub attrs: Option<Option<AttributeBag>>,
    /// Reconnects the source endpoint.
    pub source_id: Option<ElementId>,
    /// Reconnects the target endpoint.
    pub target_id: Option<ElementId>,
}
