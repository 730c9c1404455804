//! Cascade engine: create, update, delete and move for every entity.
//!
//! # Responsibility
//! - Apply each operation together with all dependent-collection effects.
//! - Keep folder containment exclusivity and view placement exclusivity.
//!
//! # Invariants
//! - Operations validate their inputs before touching the draft; a failing
//!   operation leaves nothing published because the draft is discarded.
//! - Deleting an entity never leaves a dangling reference to it in another
//!   collection.
//! - A view is either listed by exactly one folder or bound to one element.

use super::draft::DocumentDraft;
use super::hierarchy::{
    attach_member, container_of, detach_member, is_within_subtree, require_folder,
    root_folder_id, subtree_folder_ids, unlink_child_folder,
};
use super::layout;
use super::{StoreError, StoreResult};
use crate::model::document::{DocumentMetadata, ExternalIdRef, TaggedValue};
use crate::model::element::{
    Connector, ElementPatch, NewElement, NewRelationship, RelationshipPatch,
};
use crate::model::folder::{Folder, FolderDeleteMode, FolderKind, MemberKind};
use crate::model::view::{NewView, View, ViewPatch};
use crate::model::{EntityKind, FolderId};
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

/// Creates one element and files it into its folder (root by default).
pub fn add_element(draft: &mut DocumentDraft, request: NewElement) -> StoreResult<()> {
    ensure_id_unused(draft, &request.id)?;
    let folder_id = resolve_folder(draft, request.folder_id.as_deref())?;
    if let Some(parent) = &request.parent_element_id {
        require_element(draft, parent)?;
    }

    let element = request.into_element();
    let element_id = element.id.clone();
    draft
        .elements_mut()
        .insert(element_id.clone(), Arc::new(element));
    attach_member(draft, &folder_id, MemberKind::Element, &element_id)
}

/// Applies a partial update to one element.
///
/// # Errors
/// - `NotFound` for a missing element or semantic parent.
/// - `InvariantViolation` when the new parent would create a nesting cycle.
pub fn update_element(
    draft: &mut DocumentDraft,
    element_id: &str,
    patch: ElementPatch,
) -> StoreResult<()> {
    require_element(draft, element_id)?;
    if let Some(Some(parent)) = &patch.parent_element_id {
        require_element(draft, parent)?;
        if creates_nesting_cycle(draft, element_id, parent) {
            return Err(StoreError::InvariantViolation(format!(
                "element {element_id} cannot be nested under its own descendant {parent}"
            )));
        }
    }

    let element = draft
        .element_mut(element_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::Element, element_id))?;
    if let Some(name) = patch.name {
        element.name = name;
    }
    if let Some(kind) = patch.kind {
        element.kind = kind;
    }
    if let Some(documentation) = patch.documentation {
        element.documentation = documentation;
    }
    if let Some(attrs) = patch.attrs {
        element.attrs = attrs;
    }
    if let Some(parent) = patch.parent_element_id {
        element.parent_element_id = parent;
    }
    Ok(())
}

/// Deletes one element with its full cascade.
///
/// Views centered on the element are re-filed into the root folder,
/// relationships touching it are deleted, and layout nodes showing it are
/// dropped from every view.
pub fn delete_element(draft: &mut DocumentDraft, element_id: &str) -> StoreResult<()> {
    require_element(draft, element_id)?;
    let root_id = root_folder_id(draft.doc())?;

    draft.elements_mut().remove(element_id);
    detach_member(draft, MemberKind::Element, element_id);

    let centered: Vec<String> = draft
        .doc()
        .views
        .values()
        .filter(|view| view.center_element_id.as_deref() == Some(element_id))
        .map(|view| view.id.clone())
        .collect();
    for view_id in &centered {
        if let Some(view) = draft.view_mut(view_id) {
            view.center_element_id = None;
        }
        detach_member(draft, MemberKind::View, view_id);
        attach_member(draft, &root_id, MemberKind::View, view_id)?;
    }

    let nested: Vec<String> = draft
        .doc()
        .elements
        .values()
        .filter(|element| element.parent_element_id.as_deref() == Some(element_id))
        .map(|element| element.id.clone())
        .collect();
    for child_id in &nested {
        if let Some(child) = draft.element_mut(child_id) {
            child.parent_element_id = None;
        }
    }

    let touching: Vec<String> = draft
        .doc()
        .relationships
        .values()
        .filter(|relationship| relationship.touches(element_id))
        .map(|relationship| relationship.id.clone())
        .collect();
    for relationship_id in &touching {
        if draft.doc().relationship(relationship_id).is_some() {
            delete_relationship(draft, relationship_id)?;
        }
    }

    layout::prune_element(draft, element_id);
    drop_extension_entries(draft, element_id);
    debug!(
        "event=cascade module=store op=delete_element recentered_views={} relationships={}",
        centered.len(),
        touching.len()
    );
    Ok(())
}

/// Creates one relationship between two existing elements.
pub fn add_relationship(draft: &mut DocumentDraft, request: NewRelationship) -> StoreResult<()> {
    ensure_id_unused(draft, &request.id)?;
    require_element(draft, &request.source_id)?;
    require_element(draft, &request.target_id)?;
    let folder_id = resolve_folder(draft, request.folder_id.as_deref())?;

    let relationship = request.into_relationship();
    let relationship_id = relationship.id.clone();
    draft
        .relationships_mut()
        .insert(relationship_id.clone(), Arc::new(relationship));
    attach_member(draft, &folder_id, MemberKind::Relationship, &relationship_id)
}

/// Applies a partial update to one relationship, including reconnection.
pub fn update_relationship(
    draft: &mut DocumentDraft,
    relationship_id: &str,
    patch: RelationshipPatch,
) -> StoreResult<()> {
    if draft.doc().relationship(relationship_id).is_none() {
        return Err(StoreError::not_found(EntityKind::Relationship, relationship_id));
    }
    for endpoint in [&patch.source_id, &patch.target_id].into_iter().flatten() {
        require_element(draft, endpoint)?;
    }
    let reconnected = patch.source_id.is_some() || patch.target_id.is_some();

    let relationship = draft
        .relationship_mut(relationship_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::Relationship, relationship_id))?;
    if let Some(name) = patch.name {
        relationship.name = name;
    }
    if let Some(kind) = patch.kind {
        relationship.kind = kind;
    }
    if let Some(documentation) = patch.documentation {
        relationship.documentation = documentation;
    }
    if let Some(attrs) = patch.attrs {
        relationship.attrs = attrs;
    }
    if let Some(source_id) = patch.source_id {
        relationship.source_id = source_id;
    }
    if let Some(target_id) = patch.target_id {
        relationship.target_id = target_id;
    }

    if reconnected {
        layout::prune_unanchored_connections(draft, relationship_id);
    }
    Ok(())
}

/// Deletes one relationship, its folder membership and every connection
/// drawing it.
pub fn delete_relationship(draft: &mut DocumentDraft, relationship_id: &str) -> StoreResult<()> {
    if draft.doc().relationship(relationship_id).is_none() {
        return Err(StoreError::not_found(EntityKind::Relationship, relationship_id));
    }
    draft.relationships_mut().remove(relationship_id);
    detach_member(draft, MemberKind::Relationship, relationship_id);
    layout::prune_relationship(draft, relationship_id);
    drop_extension_entries(draft, relationship_id);
    Ok(())
}

pub fn add_connector(draft: &mut DocumentDraft, connector: Connector) -> StoreResult<()> {
    ensure_id_unused(draft, &connector.id)?;
    draft
        .connectors_mut()
        .insert(connector.id.clone(), Arc::new(connector));
    Ok(())
}

/// Deletes one connector and every layout node anchored on it.
pub fn delete_connector(draft: &mut DocumentDraft, connector_id: &str) -> StoreResult<()> {
    if draft.doc().connector(connector_id).is_none() {
        return Err(StoreError::not_found(EntityKind::Connector, connector_id));
    }
    draft.connectors_mut().remove(connector_id);
    layout::prune_connector(draft, connector_id);
    drop_extension_entries(draft, connector_id);
    Ok(())
}

/// Creates one view. A centered view is bound to its element and not filed;
/// otherwise it goes to the requested folder or the root.
pub fn add_view(draft: &mut DocumentDraft, request: NewView) -> StoreResult<()> {
    ensure_id_unused(draft, &request.id)?;
    let folder_id = match &request.center_element_id {
        Some(center) => {
            require_element(draft, center)?;
            None
        }
        None => Some(resolve_folder(draft, request.folder_id.as_deref())?),
    };

    let view = request.into_view();
    let view_id = view.id.clone();
    draft.views_mut().insert(view_id.clone(), Arc::new(view));
    if let Some(folder_id) = folder_id {
        attach_member(draft, &folder_id, MemberKind::View, &view_id)?;
    }
    Ok(())
}

/// Applies a partial update to one view, re-asserting placement exclusivity
/// when the center binding changes.
pub fn update_view(draft: &mut DocumentDraft, view_id: &str, patch: ViewPatch) -> StoreResult<()> {
    require_view(draft, view_id)?;
    let root_id = root_folder_id(draft.doc())?;
    if let Some(Some(center)) = &patch.center {
        require_element(draft, center)?;
    }

    let view = draft
        .view_mut(view_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::View, view_id))?;
    if let Some(name) = patch.name {
        view.name = name;
    }
    if let Some(documentation) = patch.documentation {
        view.documentation = documentation;
    }
    if let Some(viewpoint) = patch.viewpoint {
        view.viewpoint = viewpoint;
    }
    if let Some(formatting) = patch.formatting {
        view.formatting = formatting;
    }

    match patch.center {
        Some(Some(center)) => {
            view.center_element_id = Some(center);
            detach_member(draft, MemberKind::View, view_id);
        }
        Some(None) => {
            view.center_element_id = None;
            if container_of(draft.doc(), MemberKind::View, view_id).is_none() {
                attach_member(draft, &root_id, MemberKind::View, view_id)?;
            }
        }
        None => {}
    }
    Ok(())
}

/// Deletes one view and its folder membership.
pub fn delete_view(draft: &mut DocumentDraft, view_id: &str) -> StoreResult<()> {
    require_view(draft, view_id)?;
    draft.views_mut().remove(view_id);
    detach_member(draft, MemberKind::View, view_id);
    drop_extension_entries(draft, view_id);
    Ok(())
}

/// Creates one user folder under `parent_id` (root by default).
pub fn add_folder(
    draft: &mut DocumentDraft,
    folder_id: &str,
    parent_id: Option<&str>,
    name: &str,
) -> StoreResult<()> {
    ensure_id_unused(draft, folder_id)?;
    let name = normalize_name(name)?;
    let parent_id = resolve_folder(draft, parent_id)?;

    let folder = Folder::with_id(folder_id, FolderKind::User, name, Some(parent_id.clone()));
    draft
        .folders_mut()
        .insert(folder_id.to_string(), Arc::new(folder));
    let parent = draft
        .folder_mut(&parent_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::Folder, &parent_id))?;
    parent.folder_ids.push(folder_id.to_string());
    Ok(())
}

/// Renames one folder.
///
/// # Errors
/// - `InvariantViolation` for protected folders.
/// - `InvalidName` for blank names.
pub fn rename_folder(draft: &mut DocumentDraft, folder_id: &str, name: &str) -> StoreResult<()> {
    let folder = require_folder(draft.doc(), folder_id)?;
    if folder.kind.is_protected() {
        return Err(StoreError::InvariantViolation(format!(
            "folder {folder_id} is protected and cannot be renamed"
        )));
    }
    let name = normalize_name(name)?;
    if let Some(folder) = draft.folder_mut(folder_id) {
        folder.name = name;
    }
    Ok(())
}

/// Deletes one folder using `mode`.
pub fn delete_folder(
    draft: &mut DocumentDraft,
    folder_id: &str,
    mode: FolderDeleteMode,
) -> StoreResult<()> {
    let folder = require_folder(draft.doc(), folder_id)?.clone();
    if folder.kind.is_protected() {
        return Err(StoreError::InvariantViolation(format!(
            "folder {folder_id} is protected and cannot be deleted"
        )));
    }
    let Some(parent_id) = folder.parent_id.clone() else {
        return Err(StoreError::InvariantViolation(format!(
            "folder {folder_id} has no parent"
        )));
    };
    require_folder(draft.doc(), &parent_id)?;

    match mode {
        FolderDeleteMode::MoveContents { target } => {
            let target_id = match target {
                Some(target) => {
                    require_folder(draft.doc(), &target)?;
                    if is_within_subtree(draft.doc(), &target, folder_id) {
                        parent_id.clone()
                    } else {
                        target
                    }
                }
                None => parent_id.clone(),
            };
            dissolve_folder(draft, &folder, &target_id)
        }
        FolderDeleteMode::DeleteContents => delete_folder_subtree(draft, folder_id),
    }
}

fn dissolve_folder(draft: &mut DocumentDraft, folder: &Folder, target_id: &str) -> StoreResult<()> {
    let children: Vec<FolderId> = folder
        .folder_ids
        .iter()
        .filter(|child| *child != &folder.id && draft.doc().folders.contains_key(child.as_str()))
        .cloned()
        .collect();

    unlink_child_folder(draft, &folder.id);
    draft.folders_mut().remove(&folder.id);

    for child_id in &children {
        if let Some(child) = draft.folder_mut(child_id) {
            child.parent_id = Some(target_id.to_string());
        }
    }

    let target = draft
        .folder_mut(target_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::Folder, target_id))?;
    append_unique(&mut target.folder_ids, &children);
    append_unique(&mut target.element_ids, &folder.element_ids);
    append_unique(&mut target.relationship_ids, &folder.relationship_ids);
    append_unique(&mut target.view_ids, &folder.view_ids);

    debug!(
        "event=cascade module=store op=dissolve_folder moved_folders={} moved_members={}",
        children.len(),
        folder.member_count() - folder.folder_ids.len()
    );
    Ok(())
}

fn delete_folder_subtree(draft: &mut DocumentDraft, folder_id: &str) -> StoreResult<()> {
    let subtree = subtree_folder_ids(draft.doc(), folder_id);
    if let Some(protected) = subtree
        .iter()
        .filter_map(|id| draft.doc().folder(id))
        .find(|folder| folder.kind.is_protected())
    {
        return Err(StoreError::InvariantViolation(format!(
            "folder {folder_id} subtree reaches protected folder {}",
            protected.id
        )));
    }

    let mut element_ids = Vec::new();
    let mut relationship_ids = Vec::new();
    let mut view_ids = Vec::new();
    let mut seen = HashSet::new();
    for id in &subtree {
        let Some(folder) = draft.doc().folder(id) else {
            continue;
        };
        collect_unique(&mut element_ids, &mut seen, &folder.element_ids);
        collect_unique(&mut relationship_ids, &mut seen, &folder.relationship_ids);
        collect_unique(&mut view_ids, &mut seen, &folder.view_ids);
    }

    for element_id in &element_ids {
        if draft.doc().element(element_id).is_some() {
            delete_element(draft, element_id)?;
        }
    }
    for relationship_id in &relationship_ids {
        if draft.doc().relationship(relationship_id).is_some() {
            delete_relationship(draft, relationship_id)?;
        }
    }
    for view_id in &view_ids {
        if draft.doc().view(view_id).is_some() {
            delete_view(draft, view_id)?;
        }
    }

    for id in &subtree {
        draft.folders_mut().remove(id);
    }
    unlink_child_folder(draft, folder_id);

    debug!(
        "event=cascade module=store op=delete_folder_subtree folders={} elements={} relationships={} views={}",
        subtree.len(),
        element_ids.len(),
        relationship_ids.len(),
        view_ids.len()
    );
    Ok(())
}

pub fn move_element_to_folder(
    draft: &mut DocumentDraft,
    element_id: &str,
    folder_id: &str,
) -> StoreResult<()> {
    require_element(draft, element_id)?;
    move_member(draft, MemberKind::Element, element_id, folder_id)
}

pub fn move_relationship_to_folder(
    draft: &mut DocumentDraft,
    relationship_id: &str,
    folder_id: &str,
) -> StoreResult<()> {
    if draft.doc().relationship(relationship_id).is_none() {
        return Err(StoreError::not_found(EntityKind::Relationship, relationship_id));
    }
    move_member(draft, MemberKind::Relationship, relationship_id, folder_id)
}

/// Files a view into `folder_id`, clearing any center binding.
pub fn move_view_to_folder(
    draft: &mut DocumentDraft,
    view_id: &str,
    folder_id: &str,
) -> StoreResult<()> {
    let centered = require_view(draft, view_id)?.center_element_id.is_some();
    if centered {
        require_folder(draft.doc(), folder_id)?;
        if let Some(view) = draft.view_mut(view_id) {
            view.center_element_id = None;
        }
    }
    move_member(draft, MemberKind::View, view_id, folder_id)
}

/// Binds a view to `element_id`, removing it from its folder.
pub fn move_view_to_element(
    draft: &mut DocumentDraft,
    view_id: &str,
    element_id: &str,
) -> StoreResult<()> {
    let current = require_view(draft, view_id)?.center_element_id.clone();
    require_element(draft, element_id)?;
    if current.as_deref() == Some(element_id)
        && container_of(draft.doc(), MemberKind::View, view_id).is_none()
    {
        return Ok(());
    }
    detach_member(draft, MemberKind::View, view_id);
    if let Some(view) = draft.view_mut(view_id) {
        view.center_element_id = Some(element_id.to_string());
    }
    Ok(())
}

/// Reparents one folder.
///
/// # Errors
/// - `InvariantViolation` when moving a protected folder or moving a folder
///   into its own subtree.
pub fn move_folder_to_folder(
    draft: &mut DocumentDraft,
    folder_id: &str,
    target_id: &str,
) -> StoreResult<()> {
    let folder = require_folder(draft.doc(), folder_id)?;
    if folder.kind.is_protected() {
        return Err(StoreError::InvariantViolation(format!(
            "folder {folder_id} is protected and cannot be moved"
        )));
    }
    let current_parent = folder.parent_id.clone();
    require_folder(draft.doc(), target_id)?;
    if is_within_subtree(draft.doc(), target_id, folder_id) {
        return Err(StoreError::InvariantViolation(format!(
            "folder {folder_id} cannot move into its own subtree {target_id}"
        )));
    }
    if current_parent.as_deref() == Some(target_id) {
        return Ok(());
    }

    unlink_child_folder(draft, folder_id);
    if let Some(folder) = draft.folder_mut(folder_id) {
        folder.parent_id = Some(target_id.to_string());
    }
    let target = draft
        .folder_mut(target_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::Folder, target_id))?;
    target.folder_ids.push(folder_id.to_string());
    Ok(())
}

fn move_member(
    draft: &mut DocumentDraft,
    kind: MemberKind,
    id: &str,
    folder_id: &str,
) -> StoreResult<()> {
    require_folder(draft.doc(), folder_id)?;
    if container_of(draft.doc(), kind, id).as_deref() == Some(folder_id) {
        return Ok(());
    }
    detach_member(draft, kind, id);
    attach_member(draft, folder_id, kind, id)
}

pub fn set_metadata(draft: &mut DocumentDraft, metadata: DocumentMetadata) -> StoreResult<()> {
    *draft.metadata_mut() = metadata;
    Ok(())
}

/// Replaces the tagged values of one entity; an empty list removes the entry.
pub fn set_tagged_values(
    draft: &mut DocumentDraft,
    entity_id: &str,
    values: Vec<TaggedValue>,
) -> StoreResult<()> {
    require_entity(draft, entity_id)?;
    if values.is_empty() {
        if draft.doc().tagged_values.contains_key(entity_id) {
            draft.tagged_values_mut().remove(entity_id);
        }
    } else {
        draft
            .tagged_values_mut()
            .insert(entity_id.to_string(), values);
    }
    Ok(())
}

/// Replaces the external-id cross references of one entity.
pub fn set_external_ids(
    draft: &mut DocumentDraft,
    entity_id: &str,
    refs: Vec<ExternalIdRef>,
) -> StoreResult<()> {
    require_entity(draft, entity_id)?;
    if refs.is_empty() {
        if draft.doc().external_ids.contains_key(entity_id) {
            draft.external_ids_mut().remove(entity_id);
        }
    } else {
        draft.external_ids_mut().insert(entity_id.to_string(), refs);
    }
    Ok(())
}

fn drop_extension_entries(draft: &mut DocumentDraft, entity_id: &str) {
    if draft.doc().external_ids.contains_key(entity_id) {
        draft.external_ids_mut().remove(entity_id);
    }
    if draft.doc().tagged_values.contains_key(entity_id) {
        draft.tagged_values_mut().remove(entity_id);
    }
}

fn require_element(draft: &DocumentDraft, element_id: &str) -> StoreResult<()> {
    draft
        .doc()
        .element(element_id)
        .map(|_| ())
        .ok_or_else(|| StoreError::not_found(EntityKind::Element, element_id))
}

fn require_view<'a>(
    draft: &'a DocumentDraft,
    view_id: &str,
) -> StoreResult<&'a View> {
    draft
        .doc()
        .view(view_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::View, view_id))
}

fn require_entity(draft: &DocumentDraft, entity_id: &str) -> StoreResult<()> {
    draft
        .doc()
        .entity_kind(entity_id)
        .map(|_| ())
        .ok_or_else(|| StoreError::not_found(EntityKind::Entity, entity_id))
}

fn ensure_id_unused(draft: &DocumentDraft, id: &str) -> StoreResult<()> {
    match draft.doc().entity_kind(id) {
        None => Ok(()),
        Some(kind) => Err(StoreError::InvariantViolation(format!(
            "id {id} is already used by a {kind}"
        ))),
    }
}

fn resolve_folder(draft: &DocumentDraft, folder_id: Option<&str>) -> StoreResult<FolderId> {
    match folder_id {
        Some(folder_id) => Ok(require_folder(draft.doc(), folder_id)?.id.clone()),
        None => root_folder_id(draft.doc()),
    }
}

fn creates_nesting_cycle(draft: &DocumentDraft, element_id: &str, new_parent: &str) -> bool {
    let mut visited = HashSet::new();
    let mut cursor = Some(new_parent.to_string());
    while let Some(current) = cursor {
        if current == element_id || !visited.insert(current.clone()) {
            return true;
        }
        cursor = draft
            .doc()
            .element(&current)
            .and_then(|element| element.parent_element_id.clone());
    }
    false
}

fn normalize_name(value: &str) -> StoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidName);
    }
    Ok(trimmed.to_string())
}

fn append_unique(list: &mut Vec<String>, extra: &[String]) {
    for id in extra {
        if !list.contains(id) {
            list.push(id.clone());
        }
    }
}

fn collect_unique(out: &mut Vec<String>, seen: &mut HashSet<String>, ids: &[String]) {
    for id in ids {
        if seen.insert(id.clone()) {
            out.push(id.clone());
        }
    }
}
