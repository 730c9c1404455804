use modelgraph_core::model::element::{NewElement, NewRelationship};
use modelgraph_core::query::{
    AnalysisQueries, ElementPath, PathQueryOptions, RelatedElement, RelatedQueryOptions,
    SnapshotQueryCache, MAX_DEPTH_CEILING, MAX_PATH_COUNT_CEILING,
};
use modelgraph_core::{Document, ModelStore};
use std::cell::{Cell, RefCell};
use std::sync::Arc;

/// Direct outgoing neighbours only; records every call it receives.
#[derive(Default)]
struct CountingQueries {
    calls: Cell<usize>,
    seen_depths: RefCell<Vec<usize>>,
}

impl AnalysisQueries for CountingQueries {
    fn related_elements(
        &self,
        doc: &Document,
        start_id: &str,
        options: &RelatedQueryOptions,
    ) -> Vec<RelatedElement> {
        self.calls.set(self.calls.get() + 1);
        self.seen_depths.borrow_mut().push(options.max_depth);
        doc.relationships
            .values()
            .filter(|relationship| relationship.source_id == start_id)
            .map(|relationship| RelatedElement {
                element_id: relationship.target_id.clone(),
                depth: 1,
                via_relationship_id: Some(relationship.id.clone()),
            })
            .collect()
    }

    fn paths(
        &self,
        _doc: &Document,
        source_id: &str,
        target_id: &str,
        _options: &PathQueryOptions,
    ) -> Vec<ElementPath> {
        self.calls.set(self.calls.get() + 1);
        (0..100)
            .map(|hop| ElementPath {
                element_ids: vec![source_id.to_string(), target_id.to_string()],
                relationship_ids: vec![format!("r{hop}")],
            })
            .collect()
    }
}

fn chain_store() -> ModelStore {
    let mut store = ModelStore::default();
    for id in ["a", "b", "c"] {
        store.add_element(NewElement::with_id(id, "node", id)).unwrap();
    }
    store
        .add_relationship(NewRelationship::new("flow", "a", "b").with_id("ab"))
        .unwrap();
    store
}

#[test]
fn repeated_query_on_same_snapshot_hits_the_cache() {
    let store = chain_store();
    let mut cache = SnapshotQueryCache::new(CountingQueries::default());
    let snapshot = store.snapshot();
    let options = RelatedQueryOptions::default();

    let first = cache.related_elements(&snapshot, "a", &options);
    let second = cache.related_elements(&snapshot, "a", &options);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first[0].element_id, "b");
    assert_eq!((cache.hits(), cache.misses()), (1, 1));
    assert_eq!(cache.len(), 1);
}

#[test]
fn different_options_are_cached_separately() {
    let store = chain_store();
    let mut cache = SnapshotQueryCache::new(CountingQueries::default());
    let snapshot = store.snapshot();

    cache.related_elements(&snapshot, "a", &RelatedQueryOptions::default());
    cache.related_elements(
        &snapshot,
        "a",
        &RelatedQueryOptions {
            include_start: true,
            ..RelatedQueryOptions::default()
        },
    );

    assert_eq!(cache.misses(), 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn new_snapshot_invalidates_every_entry() {
    let mut store = chain_store();
    let mut cache = SnapshotQueryCache::new(CountingQueries::default());
    let options = RelatedQueryOptions::default();

    let before = cache.related_elements(&store.snapshot(), "a", &options);
    store
        .add_relationship(NewRelationship::new("flow", "a", "c").with_id("ac"))
        .unwrap();
    let after = cache.related_elements(&store.snapshot(), "a", &options);

    assert_eq!(before.len(), 1);
    assert_eq!(after.len(), 2);
    assert_eq!(cache.misses(), 2);
    assert_eq!(cache.hits(), 0);
    assert_eq!(cache.len(), 1);
}

#[test]
fn options_are_clamped_before_reaching_the_queries() {
    let store = chain_store();
    let queries = CountingQueries::default();
    let mut cache = SnapshotQueryCache::new(&queries);
    let snapshot = store.snapshot();

    cache.related_elements(
        &snapshot,
        "a",
        &RelatedQueryOptions {
            max_depth: 1_000,
            ..RelatedQueryOptions::default()
        },
    );
    cache.related_elements(
        &snapshot,
        "a",
        &RelatedQueryOptions {
            max_depth: MAX_DEPTH_CEILING,
            ..RelatedQueryOptions::default()
        },
    );

    assert_eq!(cache.hits(), 1);
    assert_eq!(*queries.seen_depths.borrow(), vec![MAX_DEPTH_CEILING]);
}

#[test]
fn path_results_are_truncated_to_the_requested_count() {
    let store = chain_store();
    let queries = CountingQueries::default();
    let mut cache = SnapshotQueryCache::new(&queries);
    let snapshot = store.snapshot();

    let three = cache.paths(
        &snapshot,
        "a",
        "c",
        &PathQueryOptions {
            max_path_count: 3,
            ..PathQueryOptions::default()
        },
    );
    let capped = cache.paths(
        &snapshot,
        "a",
        "c",
        &PathQueryOptions {
            max_path_count: usize::MAX,
            ..PathQueryOptions::default()
        },
    );

    assert_eq!(three.len(), 3);
    assert_eq!(capped.len(), MAX_PATH_COUNT_CEILING);
    assert_eq!(queries.calls.get(), 2);
}
