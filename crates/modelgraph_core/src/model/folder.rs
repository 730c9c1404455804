//! Folder tree records.
//!
//! # Invariants
//! - Exactly one folder in a document has `FolderKind::Root`; it has no parent.
//! - An element/relationship/view id is listed by at most one folder.
//! - Parent/child pointers are plain ids and are never trusted to be acyclic.

use super::{new_id, ElementId, FolderId, RelationshipId, ViewId};
use serde::{Deserialize, Serialize};

/// Folder role in the hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderKind {
    /// Single top-level container seeded with every document.
    Root,
    /// Folder created by the user.
    #[default]
    User,
}

impl FolderKind {
    /// Protected folders cannot be renamed, moved or deleted.
    pub fn is_protected(self) -> bool {
        matches!(self, Self::Root)
    }
}

/// Membership list selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Element,
    Relationship,
    View,
}

impl std::fmt::Display for MemberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Element => "element",
            Self::Relationship => "relationship",
            Self::View => "view",
        };
        f.write_str(label)
    }
}

/// Folder record with its four membership lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: FolderKind,
    #[serde(default)]
    pub parent_id: Option<FolderId>,
    #[serde(default)]
    pub folder_ids: Vec<FolderId>,
    #[serde(default)]
    pub element_ids: Vec<ElementId>,
    #[serde(default)]
    pub relationship_ids: Vec<RelationshipId>,
    #[serde(default)]
    pub view_ids: Vec<ViewId>,
}

impl Folder {
    /// Creates the root folder of a fresh document.
    pub fn root(name: impl Into<String>) -> Self {
        Self::with_id(new_id(), FolderKind::Root, name, None)
    }

    /// Creates a user folder under `parent_id`.
    pub fn user(name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self::with_id(new_id(), FolderKind::User, name, Some(parent_id.into()))
    }

    pub fn with_id(
        id: impl Into<String>,
        kind: FolderKind,
        name: impl Into<String>,
        parent_id: Option<FolderId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            parent_id,
            folder_ids: Vec::new(),
            element_ids: Vec::new(),
            relationship_ids: Vec::new(),
            view_ids: Vec::new(),
        }
    }

    pub fn members(&self, kind: MemberKind) -> &[String] {
        match kind {
            MemberKind::Element => &self.element_ids,
            MemberKind::Relationship => &self.relationship_ids,
            MemberKind::View => &self.view_ids,
        }
    }

    pub fn members_mut(&mut self, kind: MemberKind) -> &mut Vec<String> {
        match kind {
            MemberKind::Element => &mut self.element_ids,
            MemberKind::Relationship => &mut self.relationship_ids,
            MemberKind::View => &mut self.view_ids,
        }
    }

    pub fn holds(&self, kind: MemberKind, id: &str) -> bool {
        self.members(kind).iter().any(|member| member == id)
    }

    /// Total number of entities and child folders listed by this folder.
    pub fn member_count(&self) -> usize {
        self.folder_ids.len()
            + self.element_ids.len()
            + self.relationship_ids.len()
            + self.view_ids.len()
    }
}

/// Folder delete strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderDeleteMode {
    /// Merge contents and child folders into `target`, or into the parent
    /// when no target is given or the target lies inside the deleted subtree.
    MoveContents { target: Option<FolderId> },
    /// Delete the folder subtree together with everything it contains.
    DeleteContents,
}

impl Default for FolderDeleteMode {
    fn default() -> Self {
        Self::MoveContents { target: None }
    }
}
