//! Modeling use-case service.
//!
//! # Responsibility
//! - Provide creation entry points that consult notation rules before
//!   delegating to the store.
//! - Combine "create and place in view" flows into one atomic publish.
//!
//! # Invariants
//! - Service APIs never bypass store validation; rule checks only narrow
//!   what the store would accept.
//! - A rejected request leaves the store untouched.

use crate::model::element::{NewElement, NewRelationship, RelationshipPatch};
use crate::model::view::Point;
use crate::model::{ElementId, EntityKind, RelationshipId};
use crate::notation::{NotationRules, ValidationStrictness};
use crate::store::mutation::Mutation;
use crate::store::{ModelStore, StoreError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from modeling service operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelingServiceError {
    /// Notation does not offer this element type.
    ElementTypeNotAllowed(String),
    /// Notation does not allow this relationship between these types.
    ConnectionNotAllowed {
        relationship_type: String,
        source_type: String,
        target_type: String,
    },
    /// Store-level failure.
    Store(StoreError),
}

impl Display for ModelingServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ElementTypeNotAllowed(kind) => {
                write!(f, "element type is not allowed by notation: {kind}")
            }
            Self::ConnectionNotAllowed {
                relationship_type,
                source_type,
                target_type,
            } => write!(
                f,
                "{relationship_type} cannot connect {source_type} to {target_type}"
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ModelingServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ElementTypeNotAllowed(_) => None,
            Self::ConnectionNotAllowed { .. } => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for ModelingServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

pub type ServiceResult<T> = Result<T, ModelingServiceError>;

/// Creation flows guarded by one notation.
pub struct ModelingService<N: NotationRules> {
    rules: N,
    strictness: ValidationStrictness,
}

impl<N: NotationRules> ModelingService<N> {
    /// Creates a service with strict validation.
    pub fn new(rules: N) -> Self {
        Self {
            rules,
            strictness: ValidationStrictness::default(),
        }
    }

    pub fn with_strictness(mut self, strictness: ValidationStrictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn strictness(&self) -> ValidationStrictness {
        self.strictness
    }

    pub fn set_strictness(&mut self, strictness: ValidationStrictness) {
        self.strictness = strictness;
    }

    /// Creates an element after checking its type against the palette.
    pub fn create_element(
        &self,
        store: &mut ModelStore,
        request: NewElement,
    ) -> ServiceResult<ElementId> {
        self.check_element(&request.kind)?;
        Ok(store.add_element(request)?)
    }

    /// Creates an element and places it in `view_id` in one publish.
    pub fn create_element_in_view(
        &self,
        store: &mut ModelStore,
        view_id: &str,
        request: NewElement,
        position: Option<Point>,
    ) -> ServiceResult<ElementId> {
        self.check_element(&request.kind)?;
        let element_id = request.id.clone();
        store.apply_batch(vec![
            Mutation::AddElement(request),
            Mutation::AddElementToView {
                view_id: view_id.to_string(),
                element_id: element_id.clone(),
                position,
            },
        ])?;
        info!("event=create_element_in_view module=service status=ok");
        Ok(element_id)
    }

    /// Creates a relationship after checking endpoint compatibility.
    pub fn create_relationship(
        &self,
        store: &mut ModelStore,
        request: NewRelationship,
    ) -> ServiceResult<RelationshipId> {
        self.check_connection(store, &request.kind, &request.source_id, &request.target_id)?;
        Ok(store.add_relationship(request)?)
    }

    /// Creates a relationship and draws it in `view_id` in one publish. Both
    /// endpoints must already be shown in the view.
    pub fn create_relationship_in_view(
        &self,
        store: &mut ModelStore,
        view_id: &str,
        request: NewRelationship,
    ) -> ServiceResult<RelationshipId> {
        self.check_connection(store, &request.kind, &request.source_id, &request.target_id)?;
        let relationship_id = request.id.clone();
        store.apply_batch(vec![
            Mutation::AddRelationship(request),
            Mutation::AddRelationshipToView {
                view_id: view_id.to_string(),
                relationship_id: relationship_id.clone(),
            },
        ])?;
        Ok(relationship_id)
    }

    /// Moves one or both endpoints of a relationship after re-checking
    /// compatibility with the new endpoint types.
    pub fn reconnect_relationship(
        &self,
        store: &mut ModelStore,
        relationship_id: &str,
        source_id: Option<&str>,
        target_id: Option<&str>,
    ) -> ServiceResult<()> {
        let relationship = store
            .document()
            .relationship(relationship_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityKind::Relationship, relationship_id))?;
        let source = source_id.unwrap_or(relationship.source_id.as_str());
        let target = target_id.unwrap_or(relationship.target_id.as_str());
        self.check_connection(store, &relationship.kind, source, target)?;

        store.apply(Mutation::UpdateRelationship {
            relationship_id: relationship_id.to_string(),
            patch: RelationshipPatch {
                source_id: source_id.map(str::to_string),
                target_id: target_id.map(str::to_string),
                ..RelationshipPatch::default()
            },
        })?;
        Ok(())
    }

    fn check_element(&self, kind: &str) -> ServiceResult<()> {
        if self.rules.can_create_element(kind) {
            Ok(())
        } else {
            Err(ModelingServiceError::ElementTypeNotAllowed(kind.to_string()))
        }
    }

    fn check_connection(
        &self,
        store: &ModelStore,
        relationship_type: &str,
        source_id: &str,
        target_id: &str,
    ) -> ServiceResult<()> {
        let doc = store.document();
        let source = doc
            .element(source_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Element, source_id))?;
        let target = doc
            .element(target_id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Element, target_id))?;
        if self.strictness == ValidationStrictness::Off
            || self.rules.can_connect(
                relationship_type,
                &source.kind,
                &target.kind,
                self.strictness,
            )
        {
            return Ok(());
        }
        Err(ModelingServiceError::ConnectionNotAllowed {
            relationship_type: relationship_type.to_string(),
            source_type: source.kind.clone(),
            target_type: target.kind.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ModelingService, ModelingServiceError};
    use crate::model::element::{NewElement, NewRelationship};
    use crate::notation::{NotationRules, PermissiveNotation, ValidationStrictness};
    use crate::store::ModelStore;

    struct NoActors;

    impl NotationRules for NoActors {
        fn can_create_element(&self, element_type: &str) -> bool {
            element_type != "business-actor"
        }

        fn can_connect(
            &self,
            relationship_type: &str,
            _source_type: &str,
            _target_type: &str,
            strictness: ValidationStrictness,
        ) -> bool {
            relationship_type == "association" || strictness == ValidationStrictness::Relaxed
        }
    }

    #[test]
    fn rejected_element_type_leaves_store_untouched() {
        let mut store = ModelStore::default();
        let service = ModelingService::new(NoActors);
        let err = service
            .create_element(&mut store, NewElement::new("business-actor", "Clerk"))
            .unwrap_err();
        assert!(matches!(err, ModelingServiceError::ElementTypeNotAllowed(_)));
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn strictness_is_forwarded_to_rules() {
        let mut store = ModelStore::default();
        let a = store
            .add_element(NewElement::with_id("a", "business-role", "A"))
            .unwrap();
        let b = store
            .add_element(NewElement::with_id("b", "business-role", "B"))
            .unwrap();

        let mut service = ModelingService::new(NoActors);
        let strict = service.create_relationship(&mut store, NewRelationship::new("serving", &a, &b));
        assert!(matches!(
            strict,
            Err(ModelingServiceError::ConnectionNotAllowed { .. })
        ));

        service.set_strictness(ValidationStrictness::Relaxed);
        let relaxed = service.create_relationship(&mut store, NewRelationship::new("serving", &a, &b));
        assert!(relaxed.is_ok());
    }

    #[test]
    fn permissive_notation_accepts_everything() {
        let mut store = ModelStore::default();
        let service = ModelingService::new(PermissiveNotation);
        let id = service
            .create_element(&mut store, NewElement::new("anything", "X"))
            .unwrap();
        assert!(store.document().element(&id).is_some());
    }
}
