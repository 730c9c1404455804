use modelgraph_core::model::folder::FolderKind;
use modelgraph_core::model::element::NewElement;
use modelgraph_core::model::view::NewView;
use modelgraph_core::snapshot::load_document_value;
use modelgraph_core::store::integrity;
use modelgraph_core::{
    latest_version, load_document_str, run_migrations, save_document_string, ModelStore,
    SnapshotError,
};
use serde_json::{json, Value};

fn legacy_document() -> Value {
    json!({
        "metadata": { "name": "Legacy" },
        "elements": {
            "x": {
                "id": "x",
                "type": "uml-class",
                "name": "X",
                "description": "carried over",
                "attrs": { "abstract": true, "color": "red" }
            }
        },
        "views": {
            "y": {
                "id": "y",
                "name": "Y",
                "layout": {
                    "nodes": [
                        { "kind": "element", "refId": "x", "x": 0, "y": 0, "width": 120, "height": 55 }
                    ]
                }
            },
            "owned": { "id": "owned", "name": "Owned", "ownerElementId": "x" }
        },
        "folders": {
            "fr": { "id": "fr", "name": "Model", "folderIds": ["fe", "fv"] },
            "fe": {
                "id": "fe",
                "name": "Elements",
                "kind": "elements",
                "parentId": "fr",
                "elementIds": ["x"],
                "folderIds": ["sub"]
            },
            "fv": {
                "id": "fv",
                "name": "Views",
                "kind": "views",
                "parentId": "fr",
                "viewIds": ["y", "owned"]
            },
            "sub": { "id": "sub", "name": "Sub", "kind": "folder", "parentId": "fe" }
        }
    })
}

#[test]
fn legacy_containers_merge_into_root() {
    let outcome = run_migrations(legacy_document());
    let doc = &outcome.document;

    assert_eq!(outcome.from_version, 1);
    assert_eq!(outcome.to_version(), latest_version());
    assert_eq!(outcome.notes.len(), (latest_version() - 1) as usize);
    assert!(outcome.notes.iter().all(|note| !note.contains("skipped")));

    let folders = doc["folders"].as_object().unwrap();
    assert!(!folders.contains_key("fe"));
    assert!(!folders.contains_key("fv"));
    assert_eq!(doc["folders"]["fr"]["kind"], json!("root"));
    assert_eq!(doc["folders"]["fr"]["elementIds"], json!(["x"]));
    assert_eq!(doc["folders"]["fr"]["viewIds"], json!(["y"]));
    assert_eq!(doc["folders"]["fr"]["folderIds"], json!(["sub"]));
    assert_eq!(doc["folders"]["sub"]["parentId"], json!("fr"));
    assert_eq!(doc["folders"]["sub"]["kind"], json!("user"));
    assert_eq!(doc["folders"]["sub"]["relationshipIds"], json!([]));
}

#[test]
fn legacy_entity_fields_are_normalized() {
    let doc = run_migrations(legacy_document()).document;

    let x = &doc["elements"]["x"];
    assert_eq!(x["documentation"], json!("carried over"));
    assert!(x.get("description").is_none());
    assert_eq!(x["attrs"], json!({ "isAbstract": true }));

    assert_eq!(doc["views"]["y"]["layout"]["nodes"][0]["zIndex"], json!(0));
    assert_eq!(doc["views"]["owned"]["centerElementId"], json!("x"));
    assert!(doc["views"]["owned"].get("ownerElementId").is_none());
}

#[test]
fn migrated_legacy_document_decodes_consistently() {
    let loaded = load_document_value(legacy_document()).unwrap();

    assert!(loaded.was_migrated());
    let doc = &loaded.document;
    assert_eq!(doc.version, latest_version());
    assert_eq!(doc.root_folder().unwrap().id, "fr");
    assert_eq!(doc.folder("sub").unwrap().kind, FolderKind::User);
    assert_eq!(doc.view("owned").unwrap().center_element_id.as_deref(), Some("x"));
    assert!(integrity::check(doc).is_empty());
}

#[test]
fn migration_is_idempotent_at_latest_version() {
    let first = run_migrations(legacy_document());
    let second = run_migrations(first.document.clone());

    assert!(second.notes.is_empty());
    assert_eq!(second.from_version, latest_version());
    assert_eq!(second.document, first.document);
}

#[test]
fn current_snapshots_need_no_migration() {
    let mut store = ModelStore::default();
    let x = store.add_element(NewElement::new("node", "Server")).unwrap();
    store
        .add_view(NewView::new("Deployment").centered_on(x.as_str()))
        .unwrap();
    let text = save_document_string(store.document()).unwrap();

    let value: Value = serde_json::from_str(&text).unwrap();
    let outcome = run_migrations(value.clone());
    assert!(outcome.notes.is_empty());
    assert_eq!(outcome.document, value);

    let loaded = load_document_str(&text).unwrap();
    assert!(!loaded.was_migrated());
    assert_eq!(&loaded.document, store.document());
}

#[test]
fn partially_migrated_document_only_runs_later_steps() {
    let doc = json!({
        "version": 5,
        "elements": {
            "x": { "id": "x", "type": "uml-class", "description": "kept", "attrs": { "abstract": true } }
        },
        "folders": { "r": { "id": "r", "kind": "root", "elementIds": ["x"] } }
    });

    let outcome = run_migrations(doc);

    assert_eq!(outcome.from_version, 5);
    assert_eq!(outcome.notes.len(), (latest_version() - 5) as usize);
    assert!(outcome.notes[0].starts_with("v5 -> v6"));
    assert_eq!(outcome.document["elements"]["x"]["description"], json!("kept"));
    assert_eq!(
        outcome.document["elements"]["x"]["attrs"],
        json!({ "isAbstract": true })
    );
}

#[test]
fn malformed_shapes_are_skipped_but_versions_still_advance() {
    let doc = json!({ "version": 1, "folders": ["not", "a", "map"] });

    let outcome = run_migrations(doc);

    assert_eq!(outcome.to_version(), latest_version());
    assert!(outcome.notes[0].starts_with("v1 -> v2: skipped"));
    assert!(outcome.notes[1].starts_with("v2 -> v3: skipped"));
    assert_eq!(outcome.document["folders"], json!(["not", "a", "map"]));
}

#[test]
fn legacy_document_without_root_candidate_still_loads() {
    let doc = json!({
        "folders": {
            "a": { "id": "a", "name": "A", "kind": "elements", "parentId": "b" },
            "b": { "id": "b", "name": "B", "kind": "views", "parentId": "a" }
        }
    });

    let loaded = load_document_value(doc).unwrap();

    assert_eq!(loaded.from_version, 1);
    assert_eq!(loaded.document.version, latest_version());
    assert_eq!(loaded.document.folder("a").unwrap().kind, FolderKind::User);
    assert_eq!(loaded.document.folder("b").unwrap().kind, FolderKind::User);
    assert!(loaded.document.root_folder().is_none());
}

#[test]
fn missing_or_zero_version_counts_as_one() {
    for version in [json!(null), json!(0), json!("three")] {
        let outcome = run_migrations(json!({ "version": version, "folders": {} }));
        assert_eq!(outcome.from_version, 1);
    }
}

#[test]
fn newer_documents_are_left_alone_and_rejected_on_load() {
    let doc = json!({ "version": latest_version() + 1, "folders": {} });

    let outcome = run_migrations(doc.clone());
    assert!(outcome.notes.is_empty());
    assert_eq!(outcome.document, doc);

    let err = load_document_str(&doc.to_string()).unwrap_err();
    assert!(matches!(
        err,
        SnapshotError::UnsupportedSchemaVersion { document_version, .. }
            if document_version == latest_version() + 1
    ));
}
