use modelgraph_core::model::element::{NewElement, NewRelationship};
use modelgraph_core::model::view::NewView;
use modelgraph_core::{
    latest_version, load_document_file, save_document_file, ModelStore, Mutation, SnapshotError,
};
use serde_json::json;

fn populated_store() -> ModelStore {
    let mut store = ModelStore::default();
    let folder = store.add_folder(None, "Applications").unwrap();
    let crm = store
        .add_element(NewElement::new("application-component", "CRM").in_folder(folder.as_str()))
        .unwrap();
    let db = store
        .add_element(NewElement::new("node", "Database"))
        .unwrap();
    let uses = store
        .add_relationship(NewRelationship::new("serving", &db, &crm))
        .unwrap();
    let view = store.add_view(NewView::new("Landscape")).unwrap();
    for element_id in [&crm, &db] {
        store
            .apply(Mutation::AddElementToView {
                view_id: view.clone(),
                element_id: element_id.clone(),
                position: None,
            })
            .unwrap();
    }
    store
        .apply(Mutation::AddRelationshipToView {
            view_id: view,
            relationship_id: uses,
        })
        .unwrap();
    store
}

#[test]
fn saved_snapshot_loads_back_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let store = populated_store();

    save_document_file(store.document(), &path).unwrap();
    let loaded = load_document_file(&path).unwrap();

    assert_eq!(loaded.from_version, latest_version());
    assert!(!loaded.was_migrated());
    assert_eq!(&loaded.document, store.document());
}

#[test]
fn loaded_document_seeds_a_new_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    save_document_file(populated_store().document(), &path).unwrap();

    let loaded = load_document_file(&path).unwrap();
    let mut store = ModelStore::default();
    store.load(loaded.document);
    let db = store
        .document()
        .elements
        .values()
        .find(|element| element.name == "Database")
        .map(|element| element.id.clone())
        .unwrap();
    store.delete_element(&db).unwrap();

    let doc = store.document();
    assert!(doc.relationships.is_empty());
    assert!(doc.views.values().all(|view| view.layout.connections.is_empty()));
}

#[test]
fn legacy_file_is_migrated_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.json");
    let legacy = json!({
        "folders": {
            "top": { "id": "top", "name": "Model" }
        },
        "views": {
            "loose": { "id": "loose", "name": "Loose" }
        }
    });
    std::fs::write(&path, legacy.to_string()).unwrap();

    let loaded = load_document_file(&path).unwrap();

    assert_eq!(loaded.from_version, 1);
    assert!(loaded.was_migrated());
    let root = loaded.document.root_folder().unwrap();
    assert_eq!(root.id, "top");
    assert_eq!(root.view_ids, vec!["loose".to_string()]);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_document_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, SnapshotError::Io(_)));
}
