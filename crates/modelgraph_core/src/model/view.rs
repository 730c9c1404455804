//! Diagram view records and their layout.
//!
//! # Responsibility
//! - Define views, positioned layout nodes/connections and view-local
//!   decorative objects.
//!
//! # Invariants
//! - A view is either filed in exactly one folder or centered on one element,
//!   never both.
//! - Layout nodes reference existing elements, connectors or objects of the
//!   same view; layout connections reference existing relationships.
//! - `layout` is shared between snapshots until a mutation actually changes it.

use super::{new_id, ElementId, FolderId, RelationshipId, ViewId, ViewObjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// 2D position in view coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Node extent in view coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// What a layout node renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutNodeKind {
    Element,
    Connector,
    /// View-local object (note, label, group box).
    Object,
}

/// Typed reference from a layout node to its subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRef {
    pub kind: LayoutNodeKind,
    pub ref_id: String,
}

impl NodeRef {
    pub fn element(id: impl Into<String>) -> Self {
        Self {
            kind: LayoutNodeKind::Element,
            ref_id: id.into(),
        }
    }

    pub fn connector(id: impl Into<String>) -> Self {
        Self {
            kind: LayoutNodeKind::Connector,
            ref_id: id.into(),
        }
    }

    pub fn object(id: impl Into<String>) -> Self {
        Self {
            kind: LayoutNodeKind::Object,
            ref_id: id.into(),
        }
    }

    pub fn is_element(&self, element_id: &str) -> bool {
        self.kind == LayoutNodeKind::Element && self.ref_id == element_id
    }
}

/// Positioned node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    #[serde(flatten)]
    pub target: NodeRef,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Stacking order; higher renders above lower.
    #[serde(default)]
    pub z_index: i64,
}

/// Positioned connection drawing one relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConnection {
    pub relationship_id: RelationshipId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bendpoints: Vec<Point>,
    #[serde(default)]
    pub z_index: i64,
}

/// Node and connection lists of one view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewLayout {
    #[serde(default)]
    pub nodes: Vec<LayoutNode>,
    #[serde(default)]
    pub connections: Vec<LayoutConnection>,
}

impl ViewLayout {
    pub fn node(&self, target: &NodeRef) -> Option<&LayoutNode> {
        self.nodes.iter().find(|node| &node.target == target)
    }

    pub fn has_node(&self, target: &NodeRef) -> bool {
        self.node(target).is_some()
    }

    pub fn has_element(&self, element_id: &str) -> bool {
        self.nodes.iter().any(|node| node.target.is_element(element_id))
    }

    pub fn has_connection(&self, relationship_id: &str) -> bool {
        self.connections
            .iter()
            .any(|connection| connection.relationship_id == relationship_id)
    }

    /// One past the highest node z-index, or 0 for an empty layout.
    pub fn next_node_z(&self) -> i64 {
        self.nodes
            .iter()
            .map(|node| node.z_index)
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }

    /// One past the highest connection z-index, or 0 when there is none.
    pub fn next_connection_z(&self) -> i64 {
        self.connections
            .iter()
            .map(|connection| connection.z_index)
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }
}

/// View-local decorative object flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewObjectKind {
    Note,
    Label,
    Group,
}

/// Decorative object that lives only inside one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewObject {
    pub id: ViewObjectId,
    pub kind: ViewObjectKind,
    #[serde(default)]
    pub text: String,
}

/// Per-view grid settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewFormatting {
    pub snap_to_grid: bool,
    pub grid_size: f64,
}

impl Default for ViewFormatting {
    fn default() -> Self {
        Self {
            snap_to_grid: false,
            grid_size: 10.0,
        }
    }
}

impl ViewFormatting {
    /// Applies grid snapping when enabled.
    pub fn snap(&self, point: Point) -> Point {
        if !self.snap_to_grid || self.grid_size <= 0.0 {
            return point;
        }
        Point {
            x: (point.x / self.grid_size).round() * self.grid_size,
            y: (point.y / self.grid_size).round() * self.grid_size,
        }
    }
}

/// Named diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub id: ViewId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub documentation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewpoint: Option<String>,
    /// Element this view is owned by/centered on. Exclusive with folder
    /// membership.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_element_id: Option<ElementId>,
    #[serde(default)]
    pub layout: Arc<ViewLayout>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub objects: BTreeMap<ViewObjectId, ViewObject>,
    #[serde(default)]
    pub formatting: ViewFormatting,
}

/// Creation request for one view.
#[derive(Debug, Clone, PartialEq)]
pub struct NewView {
    pub id: ViewId,
    pub name: String,
    pub viewpoint: Option<String>,
    /// Ignored when `center_element_id` is set.
    pub folder_id: Option<FolderId>,
    pub center_element_id: Option<ElementId>,
    pub formatting: ViewFormatting,
}

impl NewView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            viewpoint: None,
            folder_id: None,
            center_element_id: None,
            formatting: ViewFormatting::default(),
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

    pub fn centered_on(mut self, element_id: impl Into<String>) -> Self {
        self.center_element_id = Some(element_id.into());
        self
    }

    pub(crate) fn into_view(self) -> View {
        View {
            id: self.id,
            name: self.name,
            documentation: String::new(),
            viewpoint: self.viewpoint,
            center_element_id: self.center_element_id,
            layout: Arc::new(ViewLayout::default()),
            objects: BTreeMap::new(),
            formatting: self.formatting,
        }
    }
}

/// Partial update for one view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewPatch {
    pub name: Option<String>,
    pub documentation: Option<String>,
    pub viewpoint: Option<Option<String>>,
    pub formatting: Option<ViewFormatting>,
    /// `Some(Some(e))` binds the view to `e`; `Some(None)` clears the binding.
    pub center: Option<Option<ElementId>>,
}

/// Creation request for one view-local object.
#[derive(Debug, Clone, PartialEq)]
pub struct NewViewObject {
    pub id: ViewObjectId,
    pub kind: ViewObjectKind,
    pub text: String,
    pub position: Option<Point>,
}

impl NewViewObject {
    pub fn new(kind: ViewObjectKind, text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            kind,
            text: text.into(),
            position: None,
        }
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }
}
