//! Individual document upgrade steps, one per version bump.
//!
//! Each step works on the raw JSON tree so it can read shapes the typed
//! model no longer accepts. Steps never rename ids and never drop
//! user-authored content except where a step explicitly normalizes it.
//! The fallbacks below tolerate real legacy files; keep them as they are.

use super::MigrationError;
use log::warn;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

type StepResult = Result<(), MigrationError>;
type Object = Map<String, Value>;

const ROOT_KIND: &str = "root";
const USER_KIND: &str = "user";
/// Pre-v2 container kinds that were merged into the root folder.
const LEGACY_CONTAINER_KINDS: &[&str] = &["elements", "relationships", "views"];
const MEMBER_LISTS: &[&str] = &["elementIds", "relationshipIds", "viewIds"];

/// Legacy attribute key -> current key, per concrete type.
const ATTRIBUTE_RENAMES: &[(&str, &[(&str, &str)])] = &[
    ("uml-class", &[("abstract", "isAbstract")]),
    (
        "uml-association",
        &[
            ("srcRole", "sourceRole"),
            ("tgtRole", "targetRole"),
            ("srcMultiplicity", "sourceMultiplicity"),
            ("tgtMultiplicity", "targetMultiplicity"),
        ],
    ),
    (
        "erd-relationship",
        &[
            ("fromCardinality", "sourceCardinality"),
            ("toCardinality", "targetCardinality"),
        ],
    ),
    ("bpmn-sequence-flow", &[("conditionExpression", "condition")]),
];

/// Attribute keys allowed per concrete type. Types not listed keep every key.
const ATTRIBUTE_WHITELIST: &[(&str, &[&str])] = &[
    (
        "uml-class",
        &["isAbstract", "stereotype", "attributes", "operations"],
    ),
    ("uml-interface", &["stereotype", "operations"]),
    ("uml-enumeration", &["stereotype", "literals"]),
    ("erd-entity", &["attributes", "isWeak"]),
    ("bpmn-task", &["taskType", "loopType"]),
    ("bpmn-event", &["eventPosition", "eventDefinition"]),
    ("bpmn-gateway", &["gatewayType"]),
    (
        "uml-association",
        &[
            "sourceRole",
            "targetRole",
            "sourceMultiplicity",
            "targetMultiplicity",
            "navigable",
        ],
    ),
    ("uml-generalization", &[]),
    (
        "erd-relationship",
        &["sourceCardinality", "targetCardinality", "identifying"],
    ),
    ("bpmn-sequence-flow", &["condition", "isDefault"]),
    ("archimate-access", &["accessType"]),
    ("archimate-influence", &["strength"]),
    ("archimate-association", &["isDirected"]),
];

/// v1 -> v2: merge legacy typed containers below the root into the root.
pub(super) fn merge_legacy_containers(doc: &mut Value) -> StepResult {
    const VERSION: u32 = 2;
    let Some(folders) = collection_mut(doc, "folders", VERSION)? else {
        return Ok(());
    };
    let Some(root_id) = legacy_root_id(folders) else {
        warn!(
            "event=migration_step module=snapshot status=skipped version={VERSION} reason=no_root_candidate"
        );
        normalize_folder_kinds(folders);
        return Ok(());
    };
    object_entry_mut(folders, &root_id, VERSION)?
        .insert("kind".to_string(), Value::from(ROOT_KIND));

    let root_children = string_list(folders.get(&root_id), "folderIds");
    let containers: Vec<String> = folders
        .iter()
        .filter(|(id, folder)| {
            *id != &root_id
                && kind_of(folder).is_some_and(|kind| LEGACY_CONTAINER_KINDS.contains(&kind))
                && (parent_of(folder) == Some(root_id.as_str()) || root_children.contains(*id))
        })
        .map(|(id, _)| id.clone())
        .collect();

    for container_id in &containers {
        let Some(container) = folders.remove(container_id) else {
            continue;
        };
        let mut children = string_list(Some(&container), "folderIds");
        for (id, folder) in folders.iter() {
            if parent_of(folder) == Some(container_id.as_str()) && !children.contains(id) {
                children.push(id.clone());
            }
        }
        let children: Vec<String> = children
            .into_iter()
            .filter(|child| child != &root_id && folders.contains_key(child))
            .collect();
        for child_id in &children {
            object_entry_mut(folders, child_id, VERSION)?
                .insert("parentId".to_string(), Value::from(root_id.as_str()));
        }

        let root = object_entry_mut(folders, &root_id, VERSION)?;
        for list in MEMBER_LISTS {
            append_unique(root, list, &string_list(Some(&container), list), VERSION)?;
        }
        append_unique(root, "folderIds", &children, VERSION)?;
        remove_from_list(root, "folderIds", container_id);
    }

    normalize_folder_kinds(folders);
    Ok(())
}

/// Any kind other than `root` or `user` becomes `user`.
fn normalize_folder_kinds(folders: &mut Object) {
    for folder in folders.values_mut() {
        let Some(folder) = folder.as_object_mut() else {
            continue;
        };
        let known = matches!(
            folder.get("kind").and_then(Value::as_str),
            Some(ROOT_KIND) | Some(USER_KIND)
        );
        if !known {
            folder.insert("kind".to_string(), Value::from(USER_KIND));
        }
    }
}

/// v2 -> v3: every folder gets a relationship membership list.
pub(super) fn add_relationship_lists(doc: &mut Value) -> StepResult {
    const VERSION: u32 = 3;
    let Some(folders) = collection_mut(doc, "folders", VERSION)? else {
        return Ok(());
    };
    for folder in folders.values_mut().filter_map(Value::as_object_mut) {
        if !folder.contains_key("relationshipIds") {
            folder.insert("relationshipIds".to_string(), Value::Array(Vec::new()));
        }
    }
    Ok(())
}

/// v3 -> v4: layout items without a stacking index get their list position.
pub(super) fn assign_z_order(doc: &mut Value) -> StepResult {
    const VERSION: u32 = 4;
    let Some(views) = collection_mut(doc, "views", VERSION)? else {
        return Ok(());
    };
    for view in views.values_mut().filter_map(Value::as_object_mut) {
        let Some(layout) = view.get_mut("layout").and_then(Value::as_object_mut) else {
            continue;
        };
        for list in ["nodes", "connections"] {
            let Some(items) = layout.get_mut(list).and_then(Value::as_array_mut) else {
                continue;
            };
            for (index, item) in items.iter_mut().enumerate() {
                let Some(item) = item.as_object_mut() else {
                    continue;
                };
                if item.get("zIndex").map_or(true, Value::is_null) {
                    item.insert("zIndex".to_string(), Value::from(index));
                }
            }
        }
    }
    Ok(())
}

/// v4 -> v5: legacy `description` moves into an empty `documentation`.
pub(super) fn fold_descriptions(doc: &mut Value) -> StepResult {
    const VERSION: u32 = 5;
    for collection in ["elements", "relationships", "views"] {
        let Some(entities) = collection_mut(doc, collection, VERSION)? else {
            continue;
        };
        for entity in entities.values_mut().filter_map(Value::as_object_mut) {
            fold_description(entity);
        }
    }
    Ok(())
}

fn fold_description(entity: &mut Object) {
    let description = match entity.get("description") {
        None => return,
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) => String::new(),
        Some(_) => return,
    };
    if description.is_empty() {
        entity.remove("description");
        return;
    }
    let documentation_empty = entity
        .get("documentation")
        .map_or(true, |value| value.is_null() || value.as_str() == Some(""));
    if documentation_empty {
        entity.insert("documentation".to_string(), Value::String(description));
        entity.remove("description");
    }
}

/// v5 -> v6: rename legacy attribute keys, keeping values.
pub(super) fn rename_attribute_keys(doc: &mut Value) -> StepResult {
    const VERSION: u32 = 6;
    for collection in ["elements", "relationships"] {
        let Some(entities) = collection_mut(doc, collection, VERSION)? else {
            continue;
        };
        for entity in entities.values_mut().filter_map(Value::as_object_mut) {
            let Some(renames) = lookup(ATTRIBUTE_RENAMES, entity) else {
                continue;
            };
            let Some(attrs) = entity.get_mut("attrs").and_then(Value::as_object_mut) else {
                continue;
            };
            for (legacy, current) in renames {
                if attrs.contains_key(*current) {
                    continue;
                }
                if let Some(value) = attrs.remove(*legacy) {
                    attrs.insert((*current).to_string(), value);
                }
            }
        }
    }
    Ok(())
}

/// v6 -> v7: drop attribute keys that do not belong to the entity's type.
pub(super) fn strip_foreign_attributes(doc: &mut Value) -> StepResult {
    const VERSION: u32 = 7;
    for collection in ["elements", "relationships"] {
        let Some(entities) = collection_mut(doc, collection, VERSION)? else {
            continue;
        };
        for entity in entities.values_mut().filter_map(Value::as_object_mut) {
            let Some(allowed) = lookup(ATTRIBUTE_WHITELIST, entity) else {
                continue;
            };
            let Some(attrs) = entity.get_mut("attrs").and_then(Value::as_object_mut) else {
                continue;
            };
            let foreign: Vec<String> = attrs
                .keys()
                .filter(|key| !allowed.contains(&key.as_str()))
                .cloned()
                .collect();
            for key in foreign {
                attrs.remove(&key);
            }
        }
    }
    Ok(())
}

/// v7 -> v8: `ownerElementId` becomes `centerElementId`, then each view is
/// either centered or filed, never both and never neither.
pub(super) fn enforce_view_placement(doc: &mut Value) -> StepResult {
    const VERSION: u32 = 8;
    let element_ids: BTreeSet<String> = doc
        .get("elements")
        .and_then(Value::as_object)
        .map(|elements| elements.keys().cloned().collect())
        .unwrap_or_default();

    let mut centered = BTreeSet::new();
    let mut uncentered = Vec::new();
    if let Some(views) = collection_mut(doc, "views", VERSION)? {
        for (view_id, view) in views.iter_mut() {
            let Some(view) = view.as_object_mut() else {
                continue;
            };
            if let Some(owner) = view.remove("ownerElementId") {
                if view.get("centerElementId").map_or(true, Value::is_null) {
                    view.insert("centerElementId".to_string(), owner);
                }
            }
            let resolved = view
                .get("centerElementId")
                .and_then(Value::as_str)
                .is_some_and(|center| element_ids.contains(center));
            if resolved {
                centered.insert(view_id.clone());
            } else {
                view.remove("centerElementId");
                uncentered.push(view_id.clone());
            }
        }
    }
    if centered.is_empty() && uncentered.is_empty() {
        return Ok(());
    }

    let Some(folders) = collection_mut(doc, "folders", VERSION)? else {
        return Err(MigrationError::malformed(VERSION, "views exist but folders do not"));
    };
    let mut filed = BTreeSet::new();
    for folder in folders.values_mut().filter_map(Value::as_object_mut) {
        for view_id in &centered {
            remove_from_list(folder, "viewIds", view_id);
        }
        filed.extend(string_list_of(folder, "viewIds"));
    }

    let unfiled: Vec<String> = uncentered
        .into_iter()
        .filter(|view_id| !filed.contains(view_id))
        .collect();
    if unfiled.is_empty() {
        return Ok(());
    }
    let root_id = folders
        .iter()
        .find(|(_, folder)| kind_of(folder) == Some(ROOT_KIND))
        .map(|(id, _)| id.clone())
        .ok_or_else(|| MigrationError::malformed(VERSION, "no root folder for unfiled views"))?;
    let root = object_entry_mut(folders, &root_id, VERSION)?;
    append_unique(root, "viewIds", &unfiled, VERSION)
}

/// Root tagged `root`; otherwise the first folder without a parent, in id
/// order.
fn legacy_root_id(folders: &Object) -> Option<String> {
    folders
        .iter()
        .find(|(_, folder)| kind_of(folder) == Some(ROOT_KIND))
        .or_else(|| {
            folders
                .iter()
                .find(|(_, folder)| folder.is_object() && parent_of(folder).is_none())
        })
        .map(|(id, _)| id.clone())
}

fn kind_of(folder: &Value) -> Option<&str> {
    folder.get("kind").and_then(Value::as_str)
}

fn parent_of(folder: &Value) -> Option<&str> {
    folder.get("parentId").and_then(Value::as_str)
}

fn lookup<T: Copy>(table: &[(&str, T)], entity: &Object) -> Option<T> {
    let kind = entity.get("type").and_then(Value::as_str)?;
    table
        .iter()
        .find(|(candidate, _)| *candidate == kind)
        .map(|(_, value)| *value)
}

/// Top-level id-keyed collection. `Ok(None)` when absent or null.
fn collection_mut<'a>(
    doc: &'a mut Value,
    key: &str,
    version: u32,
) -> Result<Option<&'a mut Object>, MigrationError> {
    let Some(root) = doc.as_object_mut() else {
        return Err(MigrationError::malformed(version, "document is not an object"));
    };
    match root.get_mut(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(MigrationError::malformed(
            version,
            format!("`{key}` is not an id-keyed object"),
        )),
    }
}

fn object_entry_mut<'a>(
    map: &'a mut Object,
    id: &str,
    version: u32,
) -> Result<&'a mut Object, MigrationError> {
    map.get_mut(id)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| MigrationError::malformed(version, format!("folder `{id}` is not an object")))
}

fn string_list(value: Option<&Value>, key: &str) -> Vec<String> {
    value
        .and_then(Value::as_object)
        .map(|object| string_list_of(object, key))
        .unwrap_or_default()
}

fn string_list_of(object: &Object, key: &str) -> Vec<String> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn append_unique(object: &mut Object, key: &str, ids: &[String], version: u32) -> StepResult {
    let list = object
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let Some(items) = list.as_array_mut() else {
        return Err(MigrationError::malformed(
            version,
            format!("`{key}` is not a list"),
        ));
    };
    for id in ids {
        if !items.iter().any(|item| item.as_str() == Some(id)) {
            items.push(Value::from(id.as_str()));
        }
    }
    Ok(())
}

fn remove_from_list(object: &mut Object, key: &str, id: &str) {
    if let Some(items) = object.get_mut(key).and_then(Value::as_array_mut) {
        items.retain(|item| item.as_str() != Some(id));
    }
}
