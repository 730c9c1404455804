//! Copy-on-write working copy of a document.
//!
//! # Invariants
//! - Only collections reached through a `*_mut` accessor are reallocated;
//!   every other collection stays pointer-identical to the base snapshot.
//! - Within a touched collection, only entries reached through an entry
//!   accessor are cloned.

use crate::model::document::{
    ConnectorMap, Document, DocumentMetadata, ElementMap, ExternalIdTable, FolderMap,
    RelationshipMap, TaggedValueTable, ViewMap,
};
use crate::model::element::{Element, Relationship};
use crate::model::folder::Folder;
use crate::model::view::View;
use std::sync::Arc;

/// Mutable working copy handed to mutators.
#[derive(Debug, Clone)]
pub struct DocumentDraft {
    doc: Document,
}

impl DocumentDraft {
    /// Starts a draft that shares every collection with `base`.
    pub fn new(base: &Document) -> Self {
        Self { doc: base.clone() }
    }

    /// Read access to the current draft state.
    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn elements_mut(&mut self) -> &mut ElementMap {
        Arc::make_mut(&mut self.doc.elements)
    }

    pub fn relationships_mut(&mut self) -> &mut RelationshipMap {
        Arc::make_mut(&mut self.doc.relationships)
    }

    pub fn connectors_mut(&mut self) -> &mut ConnectorMap {
        Arc::make_mut(&mut self.doc.connectors)
    }

    pub fn views_mut(&mut self) -> &mut ViewMap {
        Arc::make_mut(&mut self.doc.views)
    }

    pub fn folders_mut(&mut self) -> &mut FolderMap {
        Arc::make_mut(&mut self.doc.folders)
    }

    pub fn metadata_mut(&mut self) -> &mut DocumentMetadata {
        Arc::make_mut(&mut self.doc.metadata)
    }

    pub fn external_ids_mut(&mut self) -> &mut ExternalIdTable {
        Arc::make_mut(&mut self.doc.external_ids)
    }

    pub fn tagged_values_mut(&mut self) -> &mut TaggedValueTable {
        Arc::make_mut(&mut self.doc.tagged_values)
    }

    pub fn element_mut(&mut self, id: &str) -> Option<&mut Element> {
        if !self.doc.elements.contains_key(id) {
            return None;
        }
        self.elements_mut().get_mut(id).map(Arc::make_mut)
    }

    pub fn relationship_mut(&mut self, id: &str) -> Option<&mut Relationship> {
        if !self.doc.relationships.contains_key(id) {
            return None;
        }
        self.relationships_mut().get_mut(id).map(Arc::make_mut)
    }

    pub fn view_mut(&mut self, id: &str) -> Option<&mut View> {
        if !self.doc.views.contains_key(id) {
            return None;
        }
        self.views_mut().get_mut(id).map(Arc::make_mut)
    }

    pub fn folder_mut(&mut self, id: &str) -> Option<&mut Folder> {
        if !self.doc.folders.contains_key(id) {
            return None;
        }
        self.folders_mut().get_mut(id).map(Arc::make_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentDraft;
    use crate::model::document::Document;
    use std::sync::Arc;

    #[test]
    fn untouched_collections_stay_pointer_identical() {
        let base = Document::empty("draft");
        let root_id = base.root_folder().expect("root").id.clone();

        let mut draft = DocumentDraft::new(&base);
        draft
            .folder_mut(&root_id)
            .expect("root exists")
            .name = "Renamed".to_string();
        let next = draft.into_document();

        assert!(Arc::ptr_eq(&base.elements, &next.elements));
        assert!(Arc::ptr_eq(&base.views, &next.views));
        assert!(!Arc::ptr_eq(&base.folders, &next.folders));
        assert_eq!(base.folder(&root_id).expect("root").name, "Model");
        assert_eq!(next.folder(&root_id).expect("root").name, "Renamed");
    }

    #[test]
    fn missing_entry_does_not_reallocate_collection() {
        let base = Document::empty("draft");
        let mut draft = DocumentDraft::new(&base);
        assert!(draft.element_mut("missing").is_none());
        assert!(Arc::ptr_eq(&base.elements, &draft.doc().elements));
    }
}
