//! Model store: the single writer around an immutable document snapshot.
//!
//! # Responsibility
//! - Own the current published `Document` and its revision counter.
//! - Route every write through one entry point that works on a
//!   copy-on-write draft and publishes a new snapshot on success.
//! - Notify subscribers after each publish and drain their follow-up
//!   mutations from a bounded queue.
//!
//! # Invariants
//! - A failed mutation publishes nothing: the draft is discarded and the
//!   previous snapshot stays current.
//! - Every successful mutation publishes a new top-level `Arc<Document>`,
//!   even when most of its collections are shared with the previous one.
//! - Subscribers never observe a half-applied mutation.

pub mod cascade;
pub mod draft;
pub mod hierarchy;
pub mod integrity;
pub mod layout;
pub mod mutation;
pub mod notifier;

use crate::config::{LayoutConfig, StoreConfig};
use crate::model::document::Document;
use crate::model::element::{Connector, ConnectorKind, NewElement, NewRelationship};
use crate::model::folder::FolderDeleteMode;
use crate::model::view::{NewView, NewViewObject};
use crate::model::{
    new_id, ConnectorId, ElementId, EntityKind, FolderId, RelationshipId, ViewId, ViewObjectId,
};
use draft::DocumentDraft;
use log::{debug, info, warn};
use mutation::Mutation;
use notifier::{FollowUps, Notifier, Subscriber, SubscriptionId};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Errors from store mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A referenced entity does not exist.
    NotFound { kind: EntityKind, id: String },
    /// The mutation would break a structural invariant.
    InvariantViolation(String),
    /// Folder name is blank after trim.
    InvalidName,
}

impl StoreError {
    pub fn not_found(kind: EntityKind, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvariantViolation(message) => write!(f, "invariant violation: {message}"),
            Self::InvalidName => write!(f, "name must not be blank"),
        }
    }
}

impl Error for StoreError {}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Owner of the current document snapshot.
#[derive(Debug)]
pub struct ModelStore {
    current: Arc<Document>,
    config: StoreConfig,
    revision: u64,
    notifier: Notifier,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl ModelStore {
    /// Creates a store holding an empty document.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_document(Document::default(), config)
    }

    /// Creates a store around an already-migrated document.
    pub fn with_document(document: Document, config: StoreConfig) -> Self {
        Self {
            current: Arc::new(document),
            config,
            revision: 0,
            notifier: Notifier::new(),
        }
    }

    /// Current published snapshot. The returned handle stays valid and
    /// unchanged after later mutations.
    pub fn snapshot(&self) -> Arc<Document> {
        Arc::clone(&self.current)
    }

    /// Borrowed view of the current snapshot.
    pub fn document(&self) -> &Document {
        &self.current
    }

    /// Number of snapshots published since the store was created.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) -> SubscriptionId {
        self.notifier.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Replaces the current document with `document` and notifies
    /// subscribers.
    pub fn load(&mut self, document: Document) {
        info!(
            "event=store_load module=store status=ok elements={} views={}",
            document.elements.len(),
            document.views.len()
        );
        self.publish(document);
        self.drain_notifications();
    }

    /// Discards the current document in favour of an empty one.
    pub fn reset(&mut self) {
        let name = self.current.metadata.name.clone();
        info!("event=store_reset module=store status=ok");
        self.publish(Document::empty(name));
        self.drain_notifications();
    }

    /// Applies one mutation command.
    ///
    /// # Errors
    /// - Returns the mutation error; nothing is published in that case.
    pub fn apply(&mut self, mutation: Mutation) -> StoreResult<()> {
        self.commit(mutation)?;
        self.drain_notifications();
        Ok(())
    }

    /// Applies several mutations as one publish. Either all succeed or the
    /// document is left untouched.
    ///
    /// # Errors
    /// - Returns the first failing mutation's error.
    pub fn apply_batch(&mut self, mutations: Vec<Mutation>) -> StoreResult<()> {
        self.mutate("batch", move |draft, layout| {
            for mutation in mutations {
                mutation.apply(draft, layout)?;
            }
            Ok(())
        })
    }

    /// Runs an arbitrary mutator against a draft of the current snapshot.
    ///
    /// # Errors
    /// - Returns the mutator's error; nothing is published in that case.
    pub fn mutate<T, F>(&mut self, label: &str, mutator: F) -> StoreResult<T>
    where
        F: FnOnce(&mut DocumentDraft, &LayoutConfig) -> StoreResult<T>,
    {
        let value = self.run(label, mutator)?;
        self.drain_notifications();
        Ok(value)
    }

    pub fn add_element(&mut self, request: NewElement) -> StoreResult<ElementId> {
        let id = request.id.clone();
        self.apply(Mutation::AddElement(request))?;
        Ok(id)
    }

    pub fn add_relationship(&mut self, request: NewRelationship) -> StoreResult<RelationshipId> {
        let id = request.id.clone();
        self.apply(Mutation::AddRelationship(request))?;
        Ok(id)
    }

    pub fn add_connector(&mut self, kind: ConnectorKind) -> StoreResult<ConnectorId> {
        let connector = Connector::new(kind);
        let id = connector.id.clone();
        self.apply(Mutation::AddConnector(connector))?;
        Ok(id)
    }

    pub fn add_view(&mut self, request: NewView) -> StoreResult<ViewId> {
        let id = request.id.clone();
        self.apply(Mutation::AddView(request))?;
        Ok(id)
    }

    /// Creates a user folder under `parent_id`, or under root when `None`.
    pub fn add_folder(&mut self, parent_id: Option<&str>, name: &str) -> StoreResult<FolderId> {
        let folder_id = new_id();
        self.apply(Mutation::AddFolder {
            folder_id: folder_id.clone(),
            parent_id: parent_id.map(str::to_string),
            name: name.to_string(),
        })?;
        Ok(folder_id)
    }

    pub fn add_view_object(
        &mut self,
        view_id: &str,
        object: NewViewObject,
    ) -> StoreResult<ViewObjectId> {
        let id = object.id.clone();
        self.apply(Mutation::AddViewObject {
            view_id: view_id.to_string(),
            object,
        })?;
        Ok(id)
    }

    pub fn delete_element(&mut self, element_id: &str) -> StoreResult<()> {
        self.apply(Mutation::DeleteElement {
            element_id: element_id.to_string(),
        })
    }

    pub fn delete_relationship(&mut self, relationship_id: &str) -> StoreResult<()> {
        self.apply(Mutation::DeleteRelationship {
            relationship_id: relationship_id.to_string(),
        })
    }

    pub fn delete_folder(&mut self, folder_id: &str, mode: FolderDeleteMode) -> StoreResult<()> {
        self.apply(Mutation::DeleteFolder {
            folder_id: folder_id.to_string(),
            mode,
        })
    }

    fn commit(&mut self, mutation: Mutation) -> StoreResult<()> {
        let label = mutation.name();
        self.run(label, move |draft, layout| mutation.apply(draft, layout))
    }

    fn run<T, F>(&mut self, label: &str, mutator: F) -> StoreResult<T>
    where
        F: FnOnce(&mut DocumentDraft, &LayoutConfig) -> StoreResult<T>,
    {
        let started_at = Instant::now();
        let mut draft = DocumentDraft::new(&self.current);
        match mutator(&mut draft, &self.config.layout) {
            Ok(value) => {
                self.publish(draft.into_document());
                debug!(
                    "event=mutation module=store op={label} status=ok revision={} duration_ms={}",
                    self.revision,
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                warn!(
                    "event=mutation module=store op={label} status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn publish(&mut self, document: Document) {
        self.current = Arc::new(document);
        self.revision += 1;
    }

    /// Notifies subscribers of the current snapshot, then applies queued
    /// follow-ups one by one, notifying again after each successful publish.
    fn drain_notifications(&mut self) {
        let mut follow_ups = FollowUps::new(self.config.follow_up_limit);
        let snapshot = self.snapshot();
        self.notifier.notify(&snapshot, &mut follow_ups);

        while let Some(mutation) = follow_ups.pop() {
            let label = mutation.name();
            if let Err(err) = self.commit(mutation) {
                warn!(
                    "event=follow_up module=store op={label} status=dropped error={}",
                    err
                );
                continue;
            }
            let snapshot = self.snapshot();
            self.notifier.notify(&snapshot, &mut follow_ups);
        }

        if follow_ups.dropped() > 0 {
            warn!(
                "event=follow_up module=store status=limit_reached limit={} dropped={}",
                self.config.follow_up_limit,
                follow_ups.dropped()
            );
        }
    }
}
