//! Analysis-query seam and snapshot-keyed result cache.
//!
//! # Responsibility
//! - Define the option records and result shapes of related-element and
//!   path queries, with hard safety ceilings.
//! - Memoize query results per document snapshot.
//!
//! # Invariants
//! - Option ceilings are applied before any query runs, whatever the caller
//!   asked for.
//! - Cached results are served only for the snapshot they were computed on;
//!   identity of the `Arc<Document>` is the only invalidation signal.

use crate::model::document::Document;
use crate::model::{ElementId, RelationshipId};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

/// Upper bound on paths returned by one path query.
pub const MAX_PATH_COUNT_CEILING: usize = 50;
/// Upper bound on hops in one returned path.
pub const MAX_PATH_LENGTH_CEILING: usize = 10;
/// Upper bound on traversal depth of a related-element query.
pub const MAX_DEPTH_CEILING: usize = 16;

/// Edge direction followed during traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TraversalDirection {
    #[default]
    Outgoing,
    Incoming,
    Both,
}

/// Options of a related-element query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelatedQueryOptions {
    pub direction: TraversalDirection,
    pub max_depth: usize,
    pub include_start: bool,
    /// Only follow relationships of these types; `None` follows all.
    pub relationship_types: Option<BTreeSet<String>>,
    /// Only report elements of these types; `None` reports all.
    pub element_types: Option<BTreeSet<String>>,
    /// Only report elements in these notation layers; `None` reports all.
    pub layers: Option<BTreeSet<String>>,
}

impl Default for RelatedQueryOptions {
    fn default() -> Self {
        Self {
            direction: TraversalDirection::default(),
            max_depth: 1,
            include_start: false,
            relationship_types: None,
            element_types: None,
            layers: None,
        }
    }
}

impl RelatedQueryOptions {
    /// Returns a copy with `max_depth` capped at [`MAX_DEPTH_CEILING`].
    pub fn clamped(&self) -> Self {
        let mut options = self.clone();
        options.max_depth = options.max_depth.min(MAX_DEPTH_CEILING);
        options
    }
}

/// Options of a path query between two elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathQueryOptions {
    pub direction: TraversalDirection,
    pub max_path_count: usize,
    pub max_path_length: usize,
    pub relationship_types: Option<BTreeSet<String>>,
    pub element_types: Option<BTreeSet<String>>,
}

impl Default for PathQueryOptions {
    fn default() -> Self {
        Self {
            direction: TraversalDirection::default(),
            max_path_count: 5,
            max_path_length: 6,
            relationship_types: None,
            element_types: None,
        }
    }
}

impl PathQueryOptions {
    /// Returns a copy with count and length capped at their ceilings.
    pub fn clamped(&self) -> Self {
        let mut options = self.clone();
        options.max_path_count = options.max_path_count.min(MAX_PATH_COUNT_CEILING);
        options.max_path_length = options.max_path_length.min(MAX_PATH_LENGTH_CEILING);
        options
    }
}

/// One element reached by a related-element query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedElement {
    pub element_id: ElementId,
    pub depth: usize,
    /// Relationship the element was reached through; `None` for the start.
    pub via_relationship_id: Option<RelationshipId>,
}

/// One path between two elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPath {
    /// Visited elements, endpoints included.
    pub element_ids: Vec<ElementId>,
    /// Traversed relationships; one fewer than `element_ids`.
    pub relationship_ids: Vec<RelationshipId>,
}

/// Read-only graph queries over one snapshot. Callers always pass clamped
/// options.
pub trait AnalysisQueries {
    fn related_elements(
        &self,
        doc: &Document,
        start_id: &str,
        options: &RelatedQueryOptions,
    ) -> Vec<RelatedElement>;

    fn paths(
        &self,
        doc: &Document,
        source_id: &str,
        target_id: &str,
        options: &PathQueryOptions,
    ) -> Vec<ElementPath>;
}

impl<Q: AnalysisQueries + ?Sized> AnalysisQueries for &Q {
    fn related_elements(
        &self,
        doc: &Document,
        start_id: &str,
        options: &RelatedQueryOptions,
    ) -> Vec<RelatedElement> {
        (**self).related_elements(doc, start_id, options)
    }

    fn paths(
        &self,
        doc: &Document,
        source_id: &str,
        target_id: &str,
        options: &PathQueryOptions,
    ) -> Vec<ElementPath> {
        (**self).paths(doc, source_id, target_id, options)
    }
}

type RelatedKey = (ElementId, RelatedQueryOptions);
type PathKey = (ElementId, ElementId, PathQueryOptions);

/// Memoizing front for an [`AnalysisQueries`] implementation.
pub struct SnapshotQueryCache<Q: AnalysisQueries> {
    queries: Q,
    snapshot: Weak<Document>,
    related: HashMap<RelatedKey, Arc<Vec<RelatedElement>>>,
    paths: HashMap<PathKey, Arc<Vec<ElementPath>>>,
    hits: u64,
    misses: u64,
}

impl<Q: AnalysisQueries> SnapshotQueryCache<Q> {
    pub fn new(queries: Q) -> Self {
        Self {
            queries,
            snapshot: Weak::new(),
            related: HashMap::new(),
            paths: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Related elements of `start_id` in `doc`, computed at most once per
    /// snapshot and option set.
    pub fn related_elements(
        &mut self,
        doc: &Arc<Document>,
        start_id: &str,
        options: &RelatedQueryOptions,
    ) -> Arc<Vec<RelatedElement>> {
        self.sync_snapshot(doc);
        let options = options.clamped();
        let key = (start_id.to_string(), options);
        if let Some(cached) = self.related.get(&key) {
            self.hits += 1;
            return Arc::clone(cached);
        }
        self.misses += 1;
        let result = Arc::new(self.queries.related_elements(doc, start_id, &key.1));
        self.related.insert(key, Arc::clone(&result));
        result
    }

    /// Paths from `source_id` to `target_id` in `doc`, computed at most once
    /// per snapshot and option set.
    pub fn paths(
        &mut self,
        doc: &Arc<Document>,
        source_id: &str,
        target_id: &str,
        options: &PathQueryOptions,
    ) -> Arc<Vec<ElementPath>> {
        self.sync_snapshot(doc);
        let options = options.clamped();
        let key = (source_id.to_string(), target_id.to_string(), options);
        if let Some(cached) = self.paths.get(&key) {
            self.hits += 1;
            return Arc::clone(cached);
        }
        self.misses += 1;
        let mut result = self.queries.paths(doc, source_id, target_id, &key.2);
        result.truncate(key.2.max_path_count);
        let result = Arc::new(result);
        self.paths.insert(key, Arc::clone(&result));
        result
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Number of memoized results for the current snapshot.
    pub fn len(&self) -> usize {
        self.related.len() + self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sync_snapshot(&mut self, doc: &Arc<Document>) {
        if Weak::ptr_eq(&self.snapshot, &Arc::downgrade(doc)) {
            return;
        }
        self.snapshot = Arc::downgrade(doc);
        self.related.clear();
        self.paths.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{
        PathQueryOptions, RelatedQueryOptions, MAX_DEPTH_CEILING, MAX_PATH_COUNT_CEILING,
        MAX_PATH_LENGTH_CEILING,
    };

    #[test]
    fn ceilings_apply_regardless_of_caller_input() {
        let related = RelatedQueryOptions {
            max_depth: 1_000,
            ..RelatedQueryOptions::default()
        };
        assert_eq!(related.clamped().max_depth, MAX_DEPTH_CEILING);

        let paths = PathQueryOptions {
            max_path_count: 500,
            max_path_length: 99,
            ..PathQueryOptions::default()
        };
        let clamped = paths.clamped();
        assert_eq!(clamped.max_path_count, MAX_PATH_COUNT_CEILING);
        assert_eq!(clamped.max_path_length, MAX_PATH_LENGTH_CEILING);
    }

    #[test]
    fn small_values_pass_through() {
        let options = PathQueryOptions::default();
        assert_eq!(options.clamped(), options);
    }
}
