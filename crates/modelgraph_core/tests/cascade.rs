use modelgraph_core::model::document::{ExternalIdRef, TaggedValue};
use modelgraph_core::model::element::{ElementPatch, NewElement, NewRelationship};
use modelgraph_core::model::folder::{FolderDeleteMode, MemberKind};
use modelgraph_core::model::view::{NewView, ViewPatch};
use modelgraph_core::model::EntityKind;
use modelgraph_core::store::hierarchy::{container_of, root_folder_id};
use modelgraph_core::store::integrity;
use modelgraph_core::{ModelStore, Mutation, StoreError};
use std::sync::Arc;

fn root_of(store: &ModelStore) -> String {
    root_folder_id(store.document()).unwrap()
}

fn add_element(store: &mut ModelStore, id: &str, folder: Option<&str>) {
    let mut request = NewElement::with_id(id, "business-actor", id.to_uppercase());
    if let Some(folder) = folder {
        request = request.in_folder(folder);
    }
    store.add_element(request).unwrap();
}

fn add_folder(store: &mut ModelStore, id: &str, parent: Option<&str>) {
    store
        .apply(Mutation::AddFolder {
            folder_id: id.to_string(),
            parent_id: parent.map(str::to_string),
            name: id.to_uppercase(),
        })
        .unwrap();
}

fn add_view(store: &mut ModelStore, id: &str) {
    store
        .add_view(NewView::new(id.to_uppercase()).with_id(id))
        .unwrap();
}

fn show(store: &mut ModelStore, view: &str, element: &str) {
    store
        .apply(Mutation::AddElementToView {
            view_id: view.to_string(),
            element_id: element.to_string(),
            position: None,
        })
        .unwrap();
}

fn draw(store: &mut ModelStore, view: &str, relationship: &str) {
    store
        .apply(Mutation::AddRelationshipToView {
            view_id: view.to_string(),
            relationship_id: relationship.to_string(),
        })
        .unwrap();
}

/// F1 holds E1, F2 holds E2, R (E1 -> E2) filed under F1, both shown on V.
fn two_folder_store() -> ModelStore {
    let mut store = ModelStore::default();
    add_folder(&mut store, "f1", None);
    add_folder(&mut store, "f2", None);
    add_element(&mut store, "e1", Some("f1"));
    add_element(&mut store, "e2", Some("f2"));
    store
        .add_relationship(NewRelationship::new("serving", "e1", "e2").with_id("r").in_folder("f1"))
        .unwrap();
    add_view(&mut store, "v");
    show(&mut store, "v", "e1");
    show(&mut store, "v", "e2");
    draw(&mut store, "v", "r");
    store
}

#[test]
fn delete_element_cascades_to_relationships_and_layouts() {
    let mut store = two_folder_store();
    store.delete_element("e1").unwrap();

    let doc = store.document();
    assert!(doc.element("e1").is_none());
    assert!(doc.relationship("r").is_none());
    let f1 = doc.folder("f1").unwrap();
    assert!(f1.element_ids.is_empty());
    assert!(f1.relationship_ids.is_empty());

    let view = doc.view("v").unwrap();
    assert!(!view.layout.has_element("e1"));
    assert!(view.layout.has_element("e2"));
    assert!(view.layout.connections.is_empty());
    assert!(integrity::check(doc).is_empty());
}

#[test]
fn delete_element_keeps_untouched_view_layouts_shared() {
    let mut store = ModelStore::default();
    add_element(&mut store, "e1", None);
    add_element(&mut store, "e2", None);
    add_view(&mut store, "v1");
    add_view(&mut store, "v2");
    show(&mut store, "v1", "e1");
    show(&mut store, "v2", "e2");
    let before = Arc::clone(&store.document().views["v2"]);

    store.delete_element("e1").unwrap();

    let doc = store.document();
    let after = &doc.views["v2"];
    assert!(Arc::ptr_eq(&before, after));
    assert!(Arc::ptr_eq(&before.layout, &after.layout));
    assert!(doc.views["v1"].layout.nodes.is_empty());
}

#[test]
fn delete_element_refiles_centered_views_into_root() {
    let mut store = two_folder_store();
    store
        .add_view(NewView::new("Centered").with_id("cv").centered_on("e1"))
        .unwrap();
    assert!(container_of(store.document(), MemberKind::View, "cv").is_none());

    store.delete_element("e1").unwrap();

    let root = root_of(&store);
    let doc = store.document();
    assert!(doc.view("cv").unwrap().center_element_id.is_none());
    assert_eq!(
        container_of(doc, MemberKind::View, "cv").as_deref(),
        Some(root.as_str())
    );
    let holders = doc
        .folders
        .values()
        .filter(|folder| folder.holds(MemberKind::View, "cv"))
        .count();
    assert_eq!(holders, 1);
}

#[test]
fn delete_element_clears_nesting_and_extension_entries() {
    let mut store = ModelStore::default();
    add_element(&mut store, "parent", None);
    store
        .add_element(NewElement::with_id("child", "business-role", "Child").nested_under("parent"))
        .unwrap();
    store
        .apply(Mutation::SetTaggedValues {
            entity_id: "parent".to_string(),
            values: vec![TaggedValue {
                key: "owner".to_string(),
                value: "ops".to_string(),
            }],
        })
        .unwrap();
    store
        .apply(Mutation::SetExternalIds {
            entity_id: "parent".to_string(),
            refs: vec![ExternalIdRef {
                system: "cmdb".to_string(),
                external_id: "CI-7".to_string(),
            }],
        })
        .unwrap();

    store.delete_element("parent").unwrap();

    let doc = store.document();
    assert!(doc.element("child").unwrap().parent_element_id.is_none());
    assert!(doc.tagged_values.is_empty());
    assert!(doc.external_ids.is_empty());
}

#[test]
fn delete_missing_element_is_not_found() {
    let mut store = ModelStore::default();
    let err = store.delete_element("ghost").unwrap_err();
    assert_eq!(err, StoreError::not_found(EntityKind::Element, "ghost"));
}

#[test]
fn delete_relationship_cleans_folder_and_views() {
    let mut store = two_folder_store();
    store.delete_relationship("r").unwrap();

    let doc = store.document();
    assert!(doc.folder("f1").unwrap().relationship_ids.is_empty());
    assert!(doc.view("v").unwrap().layout.connections.is_empty());
    assert_eq!(doc.elements.len(), 2);
}

#[test]
fn move_delete_preserves_content_and_reparents_children() {
    let mut store = two_folder_store();
    add_folder(&mut store, "sub", Some("f1"));
    add_element(&mut store, "e3", Some("sub"));
    let root = root_of(&store);
    let before = store.document().content_count();
    let root_elements_before = store.document().folder(&root).unwrap().element_ids.len();

    store
        .delete_folder("f1", FolderDeleteMode::default())
        .unwrap();

    let doc = store.document();
    assert_eq!(doc.content_count(), before);
    assert!(doc.folder("f1").is_none());
    assert_eq!(doc.folder("sub").unwrap().parent_id.as_deref(), Some(root.as_str()));
    let root_folder = doc.folder(&root).unwrap();
    assert!(root_folder.folder_ids.contains(&"sub".to_string()));
    assert!(!root_folder.folder_ids.contains(&"f1".to_string()));
    assert_eq!(root_folder.element_ids.len(), root_elements_before + 1);
    assert!(root_folder.relationship_ids.contains(&"r".to_string()));
    assert!(integrity::check(doc).is_empty());
}

#[test]
fn move_delete_into_own_subtree_falls_back_to_parent() {
    let mut store = ModelStore::default();
    add_folder(&mut store, "top", None);
    add_folder(&mut store, "inner", Some("top"));
    add_element(&mut store, "e", Some("top"));
    let root = root_of(&store);

    store
        .delete_folder(
            "top",
            FolderDeleteMode::MoveContents {
                target: Some("inner".to_string()),
            },
        )
        .unwrap();

    let doc = store.document();
    assert_eq!(
        container_of(doc, MemberKind::Element, "e").as_deref(),
        Some(root.as_str())
    );
    assert_eq!(doc.folder("inner").unwrap().parent_id.as_deref(), Some(root.as_str()));
}

#[test]
fn move_delete_into_explicit_target() {
    let mut store = two_folder_store();
    store
        .delete_folder(
            "f1",
            FolderDeleteMode::MoveContents {
                target: Some("f2".to_string()),
            },
        )
        .unwrap();

    let f2 = store.document().folder("f2").unwrap().clone();
    assert_eq!(f2.element_ids, vec!["e2".to_string(), "e1".to_string()]);
    assert_eq!(f2.relationship_ids, vec!["r".to_string()]);
}

#[test]
fn delete_contents_removes_exactly_the_subtree() {
    let mut store = two_folder_store();
    add_folder(&mut store, "sub", Some("f1"));
    add_element(&mut store, "e3", Some("sub"));
    add_element(&mut store, "outside", None);
    store
        .add_relationship(NewRelationship::new("flow", "e2", "outside").with_id("kept"))
        .unwrap();
    store
        .add_relationship(
            NewRelationship::new("flow", "e2", "outside")
                .with_id("filed_inside")
                .in_folder("sub"),
        )
        .unwrap();
    store
        .add_view(NewView::new("Inside").with_id("vin").in_folder("sub"))
        .unwrap();

    store
        .delete_folder("f1", FolderDeleteMode::DeleteContents)
        .unwrap();

    let doc = store.document();
    for gone in ["e1", "e3"] {
        assert!(doc.element(gone).is_none(), "{gone} should be deleted");
    }
    assert!(doc.relationship("r").is_none());
    assert!(doc.relationship("filed_inside").is_none());
    assert!(doc.view("vin").is_none());
    assert!(doc.folder("f1").is_none());
    assert!(doc.folder("sub").is_none());

    assert!(doc.element("e2").is_some());
    assert!(doc.element("outside").is_some());
    assert!(doc.relationship("kept").is_some());
    assert!(doc.view("v").is_some());
    assert!(doc.folder("f2").is_some());
    assert!(!doc
        .folder(&root_of(&store))
        .unwrap()
        .folder_ids
        .contains(&"f1".to_string()));
    assert!(integrity::check(store.document()).is_empty());
}

#[test]
fn root_folder_is_protected() {
    let mut store = ModelStore::default();
    let root = root_of(&store);
    let before = store.snapshot();

    for mutation in [
        Mutation::DeleteFolder {
            folder_id: root.clone(),
            mode: FolderDeleteMode::DeleteContents,
        },
        Mutation::RenameFolder {
            folder_id: root.clone(),
            name: "Other".to_string(),
        },
    ] {
        let err = store.apply(mutation).unwrap_err();
        assert!(matches!(err, StoreError::InvariantViolation(_)));
    }
    assert_eq!(store.document(), before.as_ref());
}

#[test]
fn rename_folder_trims_and_rejects_blank_names() {
    let mut store = ModelStore::default();
    add_folder(&mut store, "f", None);
    store
        .apply(Mutation::RenameFolder {
            folder_id: "f".to_string(),
            name: "  Applications ".to_string(),
        })
        .unwrap();
    assert_eq!(store.document().folder("f").unwrap().name, "Applications");

    let err = store
        .apply(Mutation::RenameFolder {
            folder_id: "f".to_string(),
            name: "   ".to_string(),
        })
        .unwrap_err();
    assert_eq!(err, StoreError::InvalidName);
}

#[test]
fn moves_keep_containment_exclusive() {
    let mut store = two_folder_store();
    store
        .apply(Mutation::MoveElementToFolder {
            element_id: "e1".to_string(),
            folder_id: "f2".to_string(),
        })
        .unwrap();
    store
        .apply(Mutation::MoveRelationshipToFolder {
            relationship_id: "r".to_string(),
            folder_id: "f2".to_string(),
        })
        .unwrap();

    let doc = store.document();
    assert!(doc.folder("f1").unwrap().element_ids.is_empty());
    assert!(doc.folder("f1").unwrap().relationship_ids.is_empty());
    assert_eq!(
        container_of(doc, MemberKind::Element, "e1").as_deref(),
        Some("f2")
    );
    assert!(integrity::check(doc).is_empty());
}

#[test]
fn moving_to_current_folder_is_a_no_op() {
    let mut store = two_folder_store();
    let before = store.snapshot();
    store
        .apply(Mutation::MoveElementToFolder {
            element_id: "e1".to_string(),
            folder_id: "f1".to_string(),
        })
        .unwrap();
    assert_eq!(store.document(), before.as_ref());
}

#[test]
fn folder_cannot_move_into_its_own_subtree() {
    let mut store = ModelStore::default();
    add_folder(&mut store, "a", None);
    add_folder(&mut store, "b", Some("a"));

    let err = store
        .apply(Mutation::MoveFolderToFolder {
            folder_id: "a".to_string(),
            target_id: "b".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::InvariantViolation(_)));

    store
        .apply(Mutation::MoveFolderToFolder {
            folder_id: "b".to_string(),
            target_id: root_of(&store),
        })
        .unwrap();
    assert!(store.document().folder("a").unwrap().folder_ids.is_empty());
}

#[test]
fn centered_view_is_never_filed() {
    let mut store = two_folder_store();
    store
        .add_view(
            NewView::new("Owned")
                .with_id("ov")
                .in_folder("f1")
                .centered_on("e1"),
        )
        .unwrap();
    assert!(!store.document().folder("f1").unwrap().view_ids.contains(&"ov".to_string()));

    store
        .apply(Mutation::UpdateView {
            view_id: "ov".to_string(),
            patch: ViewPatch {
                center: Some(None),
                ..ViewPatch::default()
            },
        })
        .unwrap();

    let root = root_of(&store);
    let doc = store.document();
    assert_eq!(
        container_of(doc, MemberKind::View, "ov").as_deref(),
        Some(root.as_str())
    );
    assert!(integrity::check(doc).is_empty());
}

#[test]
fn view_moves_switch_between_folder_and_element() {
    let mut store = two_folder_store();
    store
        .apply(Mutation::MoveViewToElement {
            view_id: "v".to_string(),
            element_id: "e2".to_string(),
        })
        .unwrap();
    assert!(container_of(store.document(), MemberKind::View, "v").is_none());
    assert_eq!(
        store.document().view("v").unwrap().center_element_id.as_deref(),
        Some("e2")
    );

    store
        .apply(Mutation::MoveViewToFolder {
            view_id: "v".to_string(),
            folder_id: "f1".to_string(),
        })
        .unwrap();
    let doc = store.document();
    assert!(doc.view("v").unwrap().center_element_id.is_none());
    assert_eq!(container_of(doc, MemberKind::View, "v").as_deref(), Some("f1"));
    assert!(integrity::check(doc).is_empty());
}

#[test]
fn nesting_cycle_is_rejected() {
    let mut store = ModelStore::default();
    add_element(&mut store, "a", None);
    store
        .add_element(NewElement::with_id("b", "node", "B").nested_under("a"))
        .unwrap();

    let err = store
        .apply(Mutation::UpdateElement {
            element_id: "a".to_string(),
            patch: ElementPatch {
                parent_element_id: Some(Some("b".to_string())),
                ..ElementPatch::default()
            },
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::InvariantViolation(_)));
}

#[test]
fn duplicate_ids_are_rejected_across_kinds() {
    let mut store = ModelStore::default();
    add_element(&mut store, "shared", None);
    let err = store
        .add_view(NewView::new("Clash").with_id("shared"))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvariantViolation(_)));
}

#[test]
fn relationship_endpoints_must_exist() {
    let mut store = ModelStore::default();
    add_element(&mut store, "a", None);
    let err = store
        .add_relationship(NewRelationship::new("flow", "a", "nowhere"))
        .unwrap_err();
    assert_eq!(err, StoreError::not_found(EntityKind::Element, "nowhere"));
}
