//! Mutation commands accepted by the store entry point.
//!
//! Every structural edit the store supports is expressed as one variant, so
//! subscribers can queue follow-ups and callers can batch edits without
//! touching a draft directly.

use super::draft::DocumentDraft;
use super::{cascade, layout, StoreResult};
use crate::config::LayoutConfig;
use crate::model::document::{DocumentMetadata, ExternalIdRef, TaggedValue};
use crate::model::element::{
    Connector, ElementPatch, NewElement, NewRelationship, RelationshipPatch,
};
use crate::model::folder::FolderDeleteMode;
use crate::model::view::{NewView, NewViewObject, NodeRef, Point, Size, ViewPatch};
use crate::model::{ConnectorId, ElementId, FolderId, RelationshipId, ViewId, ViewObjectId};

/// One structural edit against the current document.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    AddElement(NewElement),
    UpdateElement {
        element_id: ElementId,
        patch: ElementPatch,
    },
    DeleteElement {
        element_id: ElementId,
    },
    AddRelationship(NewRelationship),
    UpdateRelationship {
        relationship_id: RelationshipId,
        patch: RelationshipPatch,
    },
    DeleteRelationship {
        relationship_id: RelationshipId,
    },
    AddConnector(Connector),
    DeleteConnector {
        connector_id: ConnectorId,
    },
    AddView(NewView),
    UpdateView {
        view_id: ViewId,
        patch: ViewPatch,
    },
    DeleteView {
        view_id: ViewId,
    },
    AddFolder {
        folder_id: FolderId,
        parent_id: Option<FolderId>,
        name: String,
    },
    RenameFolder {
        folder_id: FolderId,
        name: String,
    },
    DeleteFolder {
        folder_id: FolderId,
        mode: FolderDeleteMode,
    },
    MoveElementToFolder {
        element_id: ElementId,
        folder_id: FolderId,
    },
    MoveRelationshipToFolder {
        relationship_id: RelationshipId,
        folder_id: FolderId,
    },
    MoveViewToFolder {
        view_id: ViewId,
        folder_id: FolderId,
    },
    MoveViewToElement {
        view_id: ViewId,
        element_id: ElementId,
    },
    MoveFolderToFolder {
        folder_id: FolderId,
        target_id: FolderId,
    },
    AddElementToView {
        view_id: ViewId,
        element_id: ElementId,
        position: Option<Point>,
    },
    AddConnectorToView {
        view_id: ViewId,
        connector_id: ConnectorId,
        position: Option<Point>,
    },
    AddRelationshipToView {
        view_id: ViewId,
        relationship_id: RelationshipId,
    },
    AddViewObject {
        view_id: ViewId,
        object: NewViewObject,
    },
    DeleteViewObject {
        view_id: ViewId,
        object_id: ViewObjectId,
    },
    RemoveElementFromView {
        view_id: ViewId,
        element_id: ElementId,
    },
    MoveNode {
        view_id: ViewId,
        target: NodeRef,
        position: Point,
    },
    ResizeNode {
        view_id: ViewId,
        target: NodeRef,
        size: Size,
    },
    BringNodeToFront {
        view_id: ViewId,
        target: NodeRef,
    },
    SetMetadata(DocumentMetadata),
    SetTaggedValues {
        entity_id: String,
        values: Vec<TaggedValue>,
    },
    SetExternalIds {
        entity_id: String,
        refs: Vec<ExternalIdRef>,
    },
}

impl Mutation {
    /// Stable operation name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddElement(_) => "add_element",
            Self::UpdateElement { .. } => "update_element",
            Self::DeleteElement { .. } => "delete_element",
            Self::AddRelationship(_) => "add_relationship",
            Self::UpdateRelationship { .. } => "update_relationship",
            Self::DeleteRelationship { .. } => "delete_relationship",
            Self::AddConnector(_) => "add_connector",
            Self::DeleteConnector { .. } => "delete_connector",
            Self::AddView(_) => "add_view",
            Self::UpdateView { .. } => "update_view",
            Self::DeleteView { .. } => "delete_view",
            Self::AddFolder { .. } => "add_folder",
            Self::RenameFolder { .. } => "rename_folder",
            Self::DeleteFolder { .. } => "delete_folder",
            Self::MoveElementToFolder { .. } => "move_element_to_folder",
            Self::MoveRelationshipToFolder { .. } => "move_relationship_to_folder",
            Self::MoveViewToFolder { .. } => "move_view_to_folder",
            Self::MoveViewToElement { .. } => "move_view_to_element",
            Self::MoveFolderToFolder { .. } => "move_folder_to_folder",
            Self::AddElementToView { .. } => "add_element_to_view",
            Self::AddConnectorToView { .. } => "add_connector_to_view",
            Self::AddRelationshipToView { .. } => "add_relationship_to_view",
            Self::AddViewObject { .. } => "add_view_object",
            Self::DeleteViewObject { .. } => "delete_view_object",
            Self::RemoveElementFromView { .. } => "remove_element_from_view",
            Self::MoveNode { .. } => "move_node",
            Self::ResizeNode { .. } => "resize_node",
            Self::BringNodeToFront { .. } => "bring_node_to_front",
            Self::SetMetadata(_) => "set_metadata",
            Self::SetTaggedValues { .. } => "set_tagged_values",
            Self::SetExternalIds { .. } => "set_external_ids",
        }
    }

    /// Applies the mutation to `draft`.
    pub fn apply(self, draft: &mut DocumentDraft, config: &LayoutConfig) -> StoreResult<()> {
        match self {
            Self::AddElement(request) => cascade::add_element(draft, request),
            Self::UpdateElement { element_id, patch } => {
                cascade::update_element(draft, &element_id, patch)
            }
            Self::DeleteElement { element_id } => cascade::delete_element(draft, &element_id),
            Self::AddRelationship(request) => cascade::add_relationship(draft, request),
            Self::UpdateRelationship {
                relationship_id,
                patch,
            } => cascade::update_relationship(draft, &relationship_id, patch),
            Self::DeleteRelationship { relationship_id } => {
                cascade::delete_relationship(draft, &relationship_id)
            }
            Self::AddConnector(connector) => cascade::add_connector(draft, connector),
            Self::DeleteConnector { connector_id } => {
                cascade::delete_connector(draft, &connector_id)
            }
            Self::AddView(request) => cascade::add_view(draft, request),
            Self::UpdateView { view_id, patch } => cascade::update_view(draft, &view_id, patch),
            Self::DeleteView { view_id } => cascade::delete_view(draft, &view_id),
            Self::AddFolder {
                folder_id,
                parent_id,
                name,
            } => cascade::add_folder(draft, &folder_id, parent_id.as_deref(), &name),
            Self::RenameFolder { folder_id, name } => {
                cascade::rename_folder(draft, &folder_id, &name)
            }
            Self::DeleteFolder { folder_id, mode } => {
                cascade::delete_folder(draft, &folder_id, mode)
            }
            Self::MoveElementToFolder {
                element_id,
                folder_id,
            } => cascade::move_element_to_folder(draft, &element_id, &folder_id),
            Self::MoveRelationshipToFolder {
                relationship_id,
                folder_id,
            } => cascade::move_relationship_to_folder(draft, &relationship_id, &folder_id),
            Self::MoveViewToFolder { view_id, folder_id } => {
                cascade::move_view_to_folder(draft, &view_id, &folder_id)
            }
            Self::MoveViewToElement {
                view_id,
                element_id,
            } => cascade::move_view_to_element(draft, &view_id, &element_id),
            Self::MoveFolderToFolder {
                folder_id,
                target_id,
            } => cascade::move_folder_to_folder(draft, &folder_id, &target_id),
            Self::AddElementToView {
                view_id,
                element_id,
                position,
            } => layout::add_element_to_view(draft, config, &view_id, &element_id, position),
            Self::AddConnectorToView {
                view_id,
                connector_id,
                position,
            } => layout::add_connector_to_view(draft, config, &view_id, &connector_id, position),
            Self::AddRelationshipToView {
                view_id,
                relationship_id,
            } => layout::add_relationship_to_view(draft, &view_id, &relationship_id),
            Self::AddViewObject { view_id, object } => {
                layout::add_view_object(draft, config, &view_id, object)
            }
            Self::DeleteViewObject { view_id, object_id } => {
                layout::delete_view_object(draft, &view_id, &object_id)
            }
            Self::RemoveElementFromView {
                view_id,
                element_id,
            } => layout::remove_element_from_view(draft, &view_id, &element_id),
            Self::MoveNode {
                view_id,
                target,
                position,
            } => layout::move_node(draft, &view_id, &target, position),
            Self::ResizeNode {
                view_id,
                target,
                size,
            } => layout::resize_node(draft, &view_id, &target, size),
            Self::BringNodeToFront { view_id, target } => {
                layout::bring_node_to_front(draft, &view_id, &target)
            }
            Self::SetMetadata(metadata) => cascade::set_metadata(draft, metadata),
            Self::SetTaggedValues { entity_id, values } => {
                cascade::set_tagged_values(draft, &entity_id, values)
            }
            Self::SetExternalIds { entity_id, refs } => {
                cascade::set_external_ids(draft, &entity_id, refs)
            }
        }
    }
}
