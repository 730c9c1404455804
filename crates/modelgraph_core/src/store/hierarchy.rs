//! Folder hierarchy lookups and membership edits.
//!
//! # Responsibility
//! - Resolve the root folder and the container of any filed entity.
//! - Walk folder subtrees and ancestor chains without trusting pointers to be
//!   acyclic.
//! - Keep containment exclusivity when filing or unfiling an entity.
//!
//! # Invariants
//! - Every traversal is guarded by a visited set over folder ids.
//! - `attach_member` never lists an id twice in the same folder.

use super::draft::DocumentDraft;
use super::{StoreError, StoreResult};
use crate::model::document::Document;
use crate::model::folder::{Folder, MemberKind};
use crate::model::{EntityKind, FolderId};
use std::collections::{HashSet, VecDeque};

/// Returns the id of the root folder.
///
/// # Errors
/// - `InvariantViolation` when no folder is tagged as root.
pub fn root_folder_id(doc: &Document) -> StoreResult<FolderId> {
    doc.root_folder()
        .map(|folder| folder.id.clone())
        .ok_or_else(|| StoreError::InvariantViolation("document has no root folder".to_string()))
}

/// Loads one folder or fails with `NotFound`.
pub fn require_folder<'a>(doc: &'a Document, folder_id: &str) -> StoreResult<&'a Folder> {
    doc.folder(folder_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::Folder, folder_id))
}

/// Returns the folder currently listing `id` in its `kind` membership list.
pub fn container_of(doc: &Document, kind: MemberKind, id: &str) -> Option<FolderId> {
    doc.folders
        .values()
        .find(|folder| folder.holds(kind, id))
        .map(|folder| folder.id.clone())
}

/// Returns `top` and every folder reachable through child lists, in
/// breadth-first order. Missing child ids are skipped.
pub fn subtree_folder_ids(doc: &Document, top: &str) -> Vec<FolderId> {
    let mut visited = HashSet::new();
    let mut ordered = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(top.to_string());

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current.clone()) {
            continue;
        }
        let Some(folder) = doc.folder(&current) else {
            continue;
        };
        for child in &folder.folder_ids {
            if !visited.contains(child) {
                queue.push_back(child.clone());
            }
        }
        ordered.push(current);
    }
    ordered
}

/// Returns whether `candidate` is `top` itself or lies below it.
///
/// Walks `candidate`'s parent chain upward; a cycle in the chain counts as
/// "inside" so callers refuse to build on corrupted pointers.
pub fn is_within_subtree(doc: &Document, candidate: &str, top: &str) -> bool {
    let mut visited = HashSet::new();
    let mut cursor = Some(candidate.to_string());
    while let Some(current) = cursor {
        if current == top {
            return true;
        }
        if !visited.insert(current.clone()) {
            return true;
        }
        cursor = doc.folder(&current).and_then(|folder| folder.parent_id.clone());
    }
    false
}

/// Removes `id` from every folder listing it. Returns the first folder it
/// was removed from.
pub fn detach_member(draft: &mut DocumentDraft, kind: MemberKind, id: &str) -> Option<FolderId> {
    let holders: Vec<FolderId> = draft
        .doc()
        .folders
        .values()
        .filter(|folder| folder.holds(kind, id))
        .map(|folder| folder.id.clone())
        .collect();

    for folder_id in &holders {
        if let Some(folder) = draft.folder_mut(folder_id) {
            folder.members_mut(kind).retain(|member| member != id);
        }
    }
    holders.into_iter().next()
}

/// Appends `id` to `folder_id`'s `kind` list.
///
/// # Errors
/// - `NotFound` when the folder does not exist.
pub fn attach_member(
    draft: &mut DocumentDraft,
    folder_id: &str,
    kind: MemberKind,
    id: &str,
) -> StoreResult<()> {
    let folder = draft
        .folder_mut(folder_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::Folder, folder_id))?;
    let members = folder.members_mut(kind);
    if !members.iter().any(|member| member == id) {
        members.push(id.to_string());
    }
    Ok(())
}

/// Removes `child_id` from every folder's child list.
pub fn unlink_child_folder(draft: &mut DocumentDraft, child_id: &str) {
    let parents: Vec<FolderId> = draft
        .doc()
        .folders
        .values()
        .filter(|folder| folder.folder_ids.iter().any(|id| id == child_id))
        .map(|folder| folder.id.clone())
        .collect();
    for parent_id in parents {
        if let Some(parent) = draft.folder_mut(&parent_id) {
            parent.folder_ids.retain(|id| id != child_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{is_within_subtree, root_folder_id, subtree_folder_ids};
    use crate::model::document::Document;
    use crate::model::folder::{Folder, FolderKind};
    use crate::store::draft::DocumentDraft;
    use std::sync::Arc;

    fn chain_document() -> (Document, String) {
        let doc = Document::empty("tree");
        let root_id = root_folder_id(&doc).expect("root");
        let mut draft = DocumentDraft::new(&doc);
        let mut a = Folder::with_id("a", FolderKind::User, "A", Some(root_id.clone()));
        let mut b = Folder::with_id("b", FolderKind::User, "B", Some("a".to_string()));
        a.folder_ids.push("b".to_string());
        // Corrupted pointer: b lists a as its child, forming a cycle.
        b.folder_ids.push("a".to_string());
        draft.folders_mut().insert("a".to_string(), Arc::new(a));
        draft.folders_mut().insert("b".to_string(), Arc::new(b));
        draft
            .folder_mut(&root_id)
            .expect("root")
            .folder_ids
            .push("a".to_string());
        (draft.into_document(), root_id)
    }

    #[test]
    fn subtree_walk_terminates_on_cyclic_child_lists() {
        let (doc, _) = chain_document();
        let subtree = subtree_folder_ids(&doc, "a");
        assert_eq!(subtree, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn within_subtree_follows_parent_chain() {
        let (doc, root_id) = chain_document();
        assert!(is_within_subtree(&doc, "b", "a"));
        assert!(is_within_subtree(&doc, "a", "a"));
        assert!(!is_within_subtree(&doc, &root_id, "a"));
    }
}
