//! View layout synchronizer.
//!
//! # Responsibility
//! - Place elements, connectors, relationships and view-local objects on a
//!   view with deterministic coordinates and stacking order.
//! - Prune layout entries that no longer resolve after a cascade.
//!
//! # Invariants
//! - Adding something already shown on a view is a no-op.
//! - A view's `layout` allocation is replaced only when its content changes.
//! - New nodes stack above every existing node.

use super::draft::DocumentDraft;
use super::{StoreError, StoreResult};
use crate::config::LayoutConfig;
use crate::model::document::Document;
use crate::model::view::{
    LayoutConnection, LayoutNode, LayoutNodeKind, NewViewObject, NodeRef, Point, Size, View,
    ViewLayout, ViewObject,
};
use crate::model::{EntityKind, ViewId};
use std::sync::Arc;

/// Grid cell position for the `index`-th automatically placed node.
pub fn grid_position(config: &LayoutConfig, index: usize) -> Point {
    let columns = config.columns.max(1) as usize;
    let column = index % columns;
    let row = index / columns;
    Point {
        x: config.margin + column as f64 * config.cell_width,
        y: config.margin + row as f64 * config.cell_height,
    }
}

/// Adds a node for `element_id` to `view_id`.
///
/// Without `position` the node is placed on the next grid cell; an explicit
/// drop position is snapped according to the view formatting.
pub fn add_element_to_view(
    draft: &mut DocumentDraft,
    config: &LayoutConfig,
    view_id: &str,
    element_id: &str,
    position: Option<Point>,
) -> StoreResult<()> {
    if draft.doc().element(element_id).is_none() {
        return Err(StoreError::not_found(EntityKind::Element, element_id));
    }
    let size = Size {
        width: config.node_width,
        height: config.node_height,
    };
    place_node(draft, config, view_id, NodeRef::element(element_id), position, size)
}

/// Adds a node for a junction connector to `view_id`.
pub fn add_connector_to_view(
    draft: &mut DocumentDraft,
    config: &LayoutConfig,
    view_id: &str,
    connector_id: &str,
    position: Option<Point>,
) -> StoreResult<()> {
    if draft.doc().connector(connector_id).is_none() {
        return Err(StoreError::not_found(EntityKind::Connector, connector_id));
    }
    let size = Size {
        width: config.connector_size,
        height: config.connector_size,
    };
    place_node(draft, config, view_id, NodeRef::connector(connector_id), position, size)
}

/// Adds a connection for `relationship_id` to `view_id`.
///
/// # Errors
/// - `InvariantViolation` when either endpoint element has no node on the
///   view.
pub fn add_relationship_to_view(
    draft: &mut DocumentDraft,
    view_id: &str,
    relationship_id: &str,
) -> StoreResult<()> {
    let view = require_view(draft.doc(), view_id)?;
    let relationship = draft
        .doc()
        .relationship(relationship_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::Relationship, relationship_id))?;
    if view.layout.has_connection(relationship_id) {
        return Ok(());
    }
    for endpoint in [&relationship.source_id, &relationship.target_id] {
        if !view.layout.has_element(endpoint) {
            return Err(StoreError::InvariantViolation(format!(
                "relationship {relationship_id} endpoint {endpoint} is not shown on view {view_id}"
            )));
        }
    }

    let z_index = view.layout.next_connection_z();
    let view = draft
        .view_mut(view_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::View, view_id))?;
    Arc::make_mut(&mut view.layout)
        .connections
        .push(LayoutConnection {
            relationship_id: relationship_id.to_string(),
            bendpoints: Vec::new(),
            z_index,
        });
    Ok(())
}

/// Creates a view-local object together with its node.
pub fn add_view_object(
    draft: &mut DocumentDraft,
    config: &LayoutConfig,
    view_id: &str,
    object: NewViewObject,
) -> StoreResult<()> {
    let view = require_view(draft.doc(), view_id)?;
    if view.objects.contains_key(&object.id) {
        return Err(StoreError::InvariantViolation(format!(
            "view object id {} is already in use",
            object.id
        )));
    }
    let size = Size {
        width: config.node_width,
        height: config.node_height,
    };
    let target = NodeRef::object(object.id.clone());
    let record = ViewObject {
        id: object.id,
        kind: object.kind,
        text: object.text,
    };
    draft
        .view_mut(view_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::View, view_id))?
        .objects
        .insert(record.id.clone(), record);
    place_node(draft, config, view_id, target, object.position, size)
}

/// Deletes a view-local object and its node.
pub fn delete_view_object(
    draft: &mut DocumentDraft,
    view_id: &str,
    object_id: &str,
) -> StoreResult<()> {
    let view = require_view(draft.doc(), view_id)?;
    if !view.objects.contains_key(object_id) {
        return Err(StoreError::not_found(EntityKind::ViewObject, object_id));
    }
    let target = NodeRef::object(object_id);
    let view = draft
        .view_mut(view_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::View, view_id))?;
    view.objects.remove(object_id);
    if view.layout.has_node(&target) {
        Arc::make_mut(&mut view.layout)
            .nodes
            .retain(|node| node.target != target);
    }
    Ok(())
}

/// Drops the element's node from one view together with every connection
/// that no longer has both endpoints on the view.
pub fn remove_element_from_view(
    draft: &mut DocumentDraft,
    view_id: &str,
    element_id: &str,
) -> StoreResult<()> {
    let view = require_view(draft.doc(), view_id)?;
    if !view.layout.has_element(element_id) {
        return Ok(());
    }

    let mut layout = ViewLayout {
        nodes: view
            .layout
            .nodes
            .iter()
            .filter(|node| !node.target.is_element(element_id))
            .cloned()
            .collect(),
        connections: Vec::new(),
    };
    layout.connections = view
        .layout
        .connections
        .iter()
        .filter(|connection| connection_is_anchored(draft.doc(), &layout, connection))
        .cloned()
        .collect();

    if let Some(view) = draft.view_mut(view_id) {
        view.layout = Arc::new(layout);
    }
    Ok(())
}

/// Moves one node; the position is snapped per view formatting.
pub fn move_node(
    draft: &mut DocumentDraft,
    view_id: &str,
    target: &NodeRef,
    position: Point,
) -> StoreResult<()> {
    let position = require_view(draft.doc(), view_id)?.formatting.snap(position);
    let node = node_mut(draft, view_id, target)?;
    node.x = position.x;
    node.y = position.y;
    Ok(())
}

/// Resizes one node.
pub fn resize_node(
    draft: &mut DocumentDraft,
    view_id: &str,
    target: &NodeRef,
    size: Size,
) -> StoreResult<()> {
    if size.width <= 0.0 || size.height <= 0.0 {
        return Err(StoreError::InvariantViolation(format!(
            "node size must be positive, got {}x{}",
            size.width, size.height
        )));
    }
    let node = node_mut(draft, view_id, target)?;
    node.width = size.width;
    node.height = size.height;
    Ok(())
}

/// Raises one node above every other node of the view.
pub fn bring_node_to_front(
    draft: &mut DocumentDraft,
    view_id: &str,
    target: &NodeRef,
) -> StoreResult<()> {
    let view = require_view(draft.doc(), view_id)?;
    let Some(current) = view.layout.node(target) else {
        return Err(StoreError::not_found(entity_kind_of(target), &target.ref_id));
    };
    let top = view
        .layout
        .nodes
        .iter()
        .filter(|node| node.target != *target)
        .map(|node| node.z_index)
        .max();
    if top.map_or(true, |top| current.z_index > top) {
        return Ok(());
    }
    let z_index = view.layout.next_node_z();
    node_mut(draft, view_id, target)?.z_index = z_index;
    Ok(())
}

/// Drops nodes showing `element_id` and connections whose relationship no
/// longer exists, across every view.
pub fn prune_element(draft: &mut DocumentDraft, element_id: &str) {
    rewrite_layouts(
        draft,
        |node| !node.target.is_element(element_id),
        |doc, connection| doc.relationships.contains_key(&connection.relationship_id),
    );
}

/// Drops connections drawing `relationship_id` across every view.
pub fn prune_relationship(draft: &mut DocumentDraft, relationship_id: &str) {
    rewrite_layouts(
        draft,
        |_| true,
        |_, connection| connection.relationship_id != relationship_id,
    );
}

/// Drops nodes showing `connector_id` across every view.
pub fn prune_connector(draft: &mut DocumentDraft, connector_id: &str) {
    let target = NodeRef::connector(connector_id);
    rewrite_layouts(draft, |node| node.target != target, |_, _| true);
}

/// Drops connections of `relationship_id` from views that no longer show
/// both of its endpoints.
pub fn prune_unanchored_connections(draft: &mut DocumentDraft, relationship_id: &str) {
    let doc = draft.doc().clone();
    rewrite_layouts_with_view(
        draft,
        |_| true,
        |layout, connection| {
            connection.relationship_id != relationship_id
                || connection_is_anchored(&doc, layout, connection)
        },
    );
}

fn connection_is_anchored(doc: &Document, layout: &ViewLayout, connection: &LayoutConnection) -> bool {
    doc.relationship(&connection.relationship_id)
        .is_some_and(|relationship| {
            layout.has_element(&relationship.source_id) && layout.has_element(&relationship.target_id)
        })
}

fn rewrite_layouts<N, C>(draft: &mut DocumentDraft, keep_node: N, keep_connection: C)
where
    N: Fn(&LayoutNode) -> bool,
    C: Fn(&Document, &LayoutConnection) -> bool,
{
    let updates: Vec<(ViewId, ViewLayout)> = {
        let doc = draft.doc();
        doc.views
            .values()
            .filter_map(|view| {
                let layout = &view.layout;
                let nodes_kept = layout.nodes.iter().all(&keep_node);
                let connections_kept = layout
                    .connections
                    .iter()
                    .all(|connection| keep_connection(doc, connection));
                if nodes_kept && connections_kept {
                    return None;
                }
                let rewritten = ViewLayout {
                    nodes: layout.nodes.iter().filter(|node| keep_node(node)).cloned().collect(),
                    connections: layout
                        .connections
                        .iter()
                        .filter(|connection| keep_connection(doc, connection))
                        .cloned()
                        .collect(),
                };
                Some((view.id.clone(), rewritten))
            })
            .collect()
    };
    commit_layouts(draft, updates);
}

fn rewrite_layouts_with_view<N, C>(draft: &mut DocumentDraft, keep_node: N, keep_connection: C)
where
    N: Fn(&LayoutNode) -> bool,
    C: Fn(&ViewLayout, &LayoutConnection) -> bool,
{
    let updates: Vec<(ViewId, ViewLayout)> = draft
        .doc()
        .views
        .values()
        .filter_map(|view| {
            let layout = &view.layout;
            let changed = !layout.nodes.iter().all(&keep_node)
                || !layout
                    .connections
                    .iter()
                    .all(|connection| keep_connection(layout, connection));
            if !changed {
                return None;
            }
            let mut rewritten = ViewLayout {
                nodes: layout.nodes.iter().filter(|node| keep_node(node)).cloned().collect(),
                connections: Vec::new(),
            };
            rewritten.connections = layout
                .connections
                .iter()
                .filter(|connection| keep_connection(&rewritten, connection))
                .cloned()
                .collect();
            Some((view.id.clone(), rewritten))
        })
        .collect();
    commit_layouts(draft, updates);
}

fn commit_layouts(draft: &mut DocumentDraft, updates: Vec<(ViewId, ViewLayout)>) {
    for (view_id, layout) in updates {
        if let Some(view) = draft.view_mut(&view_id) {
            view.layout = Arc::new(layout);
        }
    }
}

fn place_node(
    draft: &mut DocumentDraft,
    config: &LayoutConfig,
    view_id: &str,
    target: NodeRef,
    position: Option<Point>,
    size: Size,
) -> StoreResult<()> {
    let view = require_view(draft.doc(), view_id)?;
    if view.layout.has_node(&target) {
        return Ok(());
    }
    let position = match position {
        Some(drop) => view.formatting.snap(drop),
        None => grid_position(config, view.layout.nodes.len()),
    };
    let z_index = view.layout.next_node_z();

    let view = draft
        .view_mut(view_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::View, view_id))?;
    Arc::make_mut(&mut view.layout).nodes.push(LayoutNode {
        target,
        x: position.x,
        y: position.y,
        width: size.width,
        height: size.height,
        z_index,
    });
    Ok(())
}

fn node_mut<'a>(
    draft: &'a mut DocumentDraft,
    view_id: &str,
    target: &NodeRef,
) -> StoreResult<&'a mut LayoutNode> {
    let view = draft
        .view_mut(view_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::View, view_id))?;
    if !view.layout.has_node(target) {
        return Err(StoreError::not_found(entity_kind_of(target), &target.ref_id));
    }
    Arc::make_mut(&mut view.layout)
        .nodes
        .iter_mut()
        .find(|node| node.target == *target)
        .ok_or_else(|| StoreError::not_found(entity_kind_of(target), &target.ref_id))
}

fn require_view<'a>(doc: &'a Document, view_id: &str) -> StoreResult<&'a View> {
    doc.view(view_id)
        .ok_or_else(|| StoreError::not_found(EntityKind::View, view_id))
}

fn entity_kind_of(target: &NodeRef) -> EntityKind {
    match target.kind {
        LayoutNodeKind::Element => EntityKind::Element,
        LayoutNodeKind::Connector => EntityKind::Connector,
        LayoutNodeKind::Object => EntityKind::ViewObject,
    }
}

#[cfg(test)]
mod tests {
    use super::grid_position;
    use crate::config::LayoutConfig;

    #[test]
    fn grid_position_wraps_after_column_count() {
        let config = LayoutConfig::default();
        let first = grid_position(&config, 0);
        let fourth = grid_position(&config, 3);
        let fifth = grid_position(&config, 4);

        assert_eq!((first.x, first.y), (20.0, 20.0));
        assert_eq!((fourth.x, fourth.y), (620.0, 20.0));
        assert_eq!((fifth.x, fifth.y), (20.0, 140.0));
    }

    #[test]
    fn zero_columns_behaves_like_single_column() {
        let config = LayoutConfig {
            columns: 0,
            ..LayoutConfig::default()
        };
        let second = grid_position(&config, 1);
        assert_eq!((second.x, second.y), (20.0, 140.0));
    }
}
