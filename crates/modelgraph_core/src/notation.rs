//! Notation validation seam.
//!
//! # Responsibility
//! - Define the pure predicates creation flows consult before touching the
//!   store.
//!
//! # Invariants
//! - Rules are pure: the same inputs always give the same answer.
//! - The cascade engine never consults notation rules; deletes and moves are
//!   always structurally allowed.

/// How strictly relationship compatibility is enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ValidationStrictness {
    /// Only combinations the notation explicitly allows.
    #[default]
    Strict,
    /// Also allows combinations the notation tolerates.
    Relaxed,
    /// No compatibility checks.
    Off,
}

/// Notation-specific palette and compatibility rules.
pub trait NotationRules {
    /// Returns whether elements of `element_type` may be created.
    fn can_create_element(&self, element_type: &str) -> bool;

    /// Returns whether a `relationship_type` edge may connect an element of
    /// `source_type` to one of `target_type`.
    fn can_connect(
        &self,
        relationship_type: &str,
        source_type: &str,
        target_type: &str,
        strictness: ValidationStrictness,
    ) -> bool;
}

impl<N: NotationRules + ?Sized> NotationRules for &N {
    fn can_create_element(&self, element_type: &str) -> bool {
        (**self).can_create_element(element_type)
    }

    fn can_connect(
        &self,
        relationship_type: &str,
        source_type: &str,
        target_type: &str,
        strictness: ValidationStrictness,
    ) -> bool {
        (**self).can_connect(relationship_type, source_type, target_type, strictness)
    }
}

/// Rules that allow everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissiveNotation;

impl NotationRules for PermissiveNotation {
    fn can_create_element(&self, _element_type: &str) -> bool {
        true
    }

    fn can_connect(
        &self,
        _relationship_type: &str,
        _source_type: &str,
        _target_type: &str,
        _strictness: ValidationStrictness,
    ) -> bool {
        true
    }
}
