//! Whole-document invariant checker.
//!
//! # Responsibility
//! - Report every structural invariant a document breaks, without repairing
//!   anything.
//!
//! # Invariants
//! - `check` is read-only and terminates on cyclic folder pointers.
//! - Issues are reported in a deterministic order (folders, membership,
//!   elements, relationships, views).

use crate::model::document::Document;
use crate::model::folder::{FolderKind, MemberKind};
use crate::model::view::{LayoutNodeKind, NodeRef};
use crate::model::{ElementId, FolderId, RelationshipId, ViewId};
use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// No folder is tagged as root.
    MissingRoot,
    /// More than one folder is tagged as root.
    MultipleRoots(Vec<FolderId>),
    /// The root folder carries a parent pointer.
    RootHasParent(FolderId),
    /// A non-root folder has no parent pointer, or its parent chain never
    /// reaches the root (dangling parent or cycle).
    FolderDetached(FolderId),
    /// A folder's parent does not list it as a child.
    FolderNotListedByParent {
        folder_id: FolderId,
        parent_id: FolderId,
    },
    /// A folder lists a child folder id that does not exist.
    MissingChildFolder {
        folder_id: FolderId,
        child_id: FolderId,
    },
    /// A folder lists a member id that does not exist.
    MissingMember {
        folder_id: FolderId,
        kind: MemberKind,
        id: String,
    },
    /// An entity id is listed by more than one folder.
    MultipleContainers {
        kind: MemberKind,
        id: String,
        folders: Vec<FolderId>,
    },
    /// An element's semantic parent does not exist.
    MissingParentElement {
        element_id: ElementId,
        parent_id: ElementId,
    },
    /// A relationship endpoint does not resolve to an element.
    DanglingEndpoint {
        relationship_id: RelationshipId,
        element_id: ElementId,
    },
    /// A view is both centered and filed, or neither.
    ViewPlacement {
        view_id: ViewId,
        centered: bool,
        folders: usize,
    },
    /// A view's center binding does not resolve to an element.
    MissingCenterElement {
        view_id: ViewId,
        element_id: ElementId,
    },
    /// A layout node references a missing element, connector or object.
    DanglingNode { view_id: ViewId, target: NodeRef },
    /// A layout connection references a missing relationship.
    DanglingConnection {
        view_id: ViewId,
        relationship_id: RelationshipId,
    },
}

impl Display for IntegrityIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRoot => write!(f, "document has no root folder"),
            Self::MultipleRoots(ids) => write!(f, "multiple root folders: {}", ids.join(", ")),
            Self::RootHasParent(id) => write!(f, "root folder {id} has a parent"),
            Self::FolderDetached(id) => write!(f, "folder {id} is not reachable from root"),
            Self::FolderNotListedByParent {
                folder_id,
                parent_id,
            } => write!(f, "folder {folder_id} is not listed by its parent {parent_id}"),
            Self::MissingChildFolder {
                folder_id,
                child_id,
            } => write!(f, "folder {folder_id} lists missing child folder {child_id}"),
            Self::MissingMember {
                folder_id,
                kind,
                id,
            } => write!(f, "folder {folder_id} lists missing {kind} {id}"),
            Self::MultipleContainers { kind, id, folders } => write!(
                f,
                "{kind} {id} is listed by several folders: {}",
                folders.join(", ")
            ),
            Self::MissingParentElement {
                element_id,
                parent_id,
            } => write!(f, "element {element_id} nests under missing element {parent_id}"),
            Self::DanglingEndpoint {
                relationship_id,
                element_id,
            } => write!(
                f,
                "relationship {relationship_id} references missing element {element_id}"
            ),
            Self::ViewPlacement {
                view_id,
                centered,
                folders,
            } => write!(
                f,
                "view {view_id} has invalid placement (centered={centered}, folders={folders})"
            ),
            Self::MissingCenterElement {
                view_id,
                element_id,
            } => write!(f, "view {view_id} is centered on missing element {element_id}"),
            Self::DanglingNode { view_id, target } => write!(
                f,
                "view {view_id} has a node for missing {:?} {}",
                target.kind, target.ref_id
            ),
            Self::DanglingConnection {
                view_id,
                relationship_id,
            } => write!(
                f,
                "view {view_id} has a connection for missing relationship {relationship_id}"
            ),
        }
    }
}

/// Returns every invariant `doc` breaks. An empty list means the document is
/// consistent.
pub fn check(doc: &Document) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();
    check_folders(doc, &mut issues);
    check_membership(doc, &mut issues);
    check_elements(doc, &mut issues);
    check_relationships(doc, &mut issues);
    check_views(doc, &mut issues);
    issues
}

fn check_folders(doc: &Document, issues: &mut Vec<IntegrityIssue>) {
    let roots: Vec<FolderId> = doc
        .folders
        .values()
        .filter(|folder| folder.kind == FolderKind::Root)
        .map(|folder| folder.id.clone())
        .collect();
    match roots.len() {
        0 => issues.push(IntegrityIssue::MissingRoot),
        1 => {}
        _ => issues.push(IntegrityIssue::MultipleRoots(roots.clone())),
    }

    for folder in doc.folders.values() {
        if folder.kind == FolderKind::Root {
            if folder.parent_id.is_some() {
                issues.push(IntegrityIssue::RootHasParent(folder.id.clone()));
            }
        } else if !reaches_root(doc, &folder.id) {
            issues.push(IntegrityIssue::FolderDetached(folder.id.clone()));
        }

        if let Some(parent_id) = &folder.parent_id {
            let listed = doc
                .folder(parent_id)
                .map(|parent| parent.folder_ids.iter().any(|id| id == &folder.id))
                .unwrap_or(false);
            if !listed {
                issues.push(IntegrityIssue::FolderNotListedByParent {
                    folder_id: folder.id.clone(),
                    parent_id: parent_id.clone(),
                });
            }
        }

        for child_id in &folder.folder_ids {
            if doc.folder(child_id).is_none() {
                issues.push(IntegrityIssue::MissingChildFolder {
                    folder_id: folder.id.clone(),
                    child_id: child_id.clone(),
                });
            }
        }
    }
}

fn reaches_root(doc: &Document, folder_id: &str) -> bool {
    let mut visited = HashSet::new();
    let mut cursor = Some(folder_id.to_string());
    while let Some(current) = cursor {
        if !visited.insert(current.clone()) {
            return false;
        }
        let Some(folder) = doc.folder(&current) else {
            return false;
        };
        if folder.kind == FolderKind::Root {
            return true;
        }
        cursor = folder.parent_id.clone();
    }
    false
}

fn check_membership(doc: &Document, issues: &mut Vec<IntegrityIssue>) {
    for kind in [MemberKind::Element, MemberKind::Relationship, MemberKind::View] {
        let mut holders: BTreeMap<&str, Vec<FolderId>> = BTreeMap::new();
        for folder in doc.folders.values() {
            for id in folder.members(kind) {
                let exists = match kind {
                    MemberKind::Element => doc.elements.contains_key(id),
                    MemberKind::Relationship => doc.relationships.contains_key(id),
                    MemberKind::View => doc.views.contains_key(id),
                };
                if !exists {
                    issues.push(IntegrityIssue::MissingMember {
                        folder_id: folder.id.clone(),
                        kind,
                        id: id.clone(),
                    });
                }
                holders.entry(id.as_str()).or_default().push(folder.id.clone());
            }
        }
        for (id, folders) in holders {
            if folders.len() > 1 {
                issues.push(IntegrityIssue::MultipleContainers {
                    kind,
                    id: id.to_string(),
                    folders,
                });
            }
        }
    }
}

fn check_elements(doc: &Document, issues: &mut Vec<IntegrityIssue>) {
    for element in doc.elements.values() {
        if let Some(parent_id) = &element.parent_element_id {
            if !doc.elements.contains_key(parent_id) {
                issues.push(IntegrityIssue::MissingParentElement {
                    element_id: element.id.clone(),
                    parent_id: parent_id.clone(),
                });
            }
        }
    }
}

fn check_relationships(doc: &Document, issues: &mut Vec<IntegrityIssue>) {
    for relationship in doc.relationships.values() {
        for endpoint in [&relationship.source_id, &relationship.target_id] {
            if !doc.elements.contains_key(endpoint) {
                issues.push(IntegrityIssue::DanglingEndpoint {
                    relationship_id: relationship.id.clone(),
                    element_id: endpoint.clone(),
                });
            }
        }
    }
}

fn check_views(doc: &Document, issues: &mut Vec<IntegrityIssue>) {
    for view in doc.views.values() {
        let folders = doc
            .folders
            .values()
            .filter(|folder| folder.holds(MemberKind::View, &view.id))
            .count();
        let centered = view.center_element_id.is_some();
        if centered == (folders > 0) {
            issues.push(IntegrityIssue::ViewPlacement {
                view_id: view.id.clone(),
                centered,
                folders,
            });
        }
        if let Some(center) = &view.center_element_id {
            if !doc.elements.contains_key(center) {
                issues.push(IntegrityIssue::MissingCenterElement {
                    view_id: view.id.clone(),
                    element_id: center.clone(),
                });
            }
        }

        for node in &view.layout.nodes {
            let exists = match node.target.kind {
                LayoutNodeKind::Element => doc.elements.contains_key(&node.target.ref_id),
                LayoutNodeKind::Connector => doc.connectors.contains_key(&node.target.ref_id),
                LayoutNodeKind::Object => view.objects.contains_key(&node.target.ref_id),
            };
            if !exists {
                issues.push(IntegrityIssue::DanglingNode {
                    view_id: view.id.clone(),
                    target: node.target.clone(),
                });
            }
        }
        for connection in &view.layout.connections {
            if !doc.relationships.contains_key(&connection.relationship_id) {
                issues.push(IntegrityIssue::DanglingConnection {
                    view_id: view.id.clone(),
                    relationship_id: connection.relationship_id.clone(),
                });
            }
        }
    }
}
