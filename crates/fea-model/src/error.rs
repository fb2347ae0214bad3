//! Error types for fea-model

use thiserror::Error;

use crate::ids::{EntityId, EntityKind, OwnerRef};

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("identifier {id} already exists in the model graph")]
    DuplicateIdentifier { id: EntityId },

    #[error("{id} is not owned by {container}")]
    NotOwned { id: EntityId, container: OwnerRef },

    #[error("{kind} {id} is already owned by {owner}")]
    AlreadyOwned {
        kind: EntityKind,
        id: EntityId,
        owner: OwnerRef,
    },

    #[error("backend '{0}' was never registered")]
    UnknownBackend(String),

    #[error("failed to load backend '{name}': {reason}")]
    BackendLoad { name: String, reason: String },

    #[error("malformed {class} record, field '{field}': {reason}")]
    MalformedRecord {
        class: String,
        field: String,
        reason: String,
    },

    #[error("{referrer} references {id}, which is not part of the model")]
    DanglingReference { referrer: EntityId, id: EntityId },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("constraint {constraint}: node {slave} is {distance} from its master, tolerance is {tolerance}")]
    ToleranceExceeded {
        constraint: EntityId,
        slave: EntityId,
        distance: f64,
        tolerance: f64,
    },

    #[error("node {id} coincides with node {existing} (tolerance {tolerance})")]
    CoincidentNode {
        id: EntityId,
        existing: EntityId,
        tolerance: f64,
    },

    #[error("{class} rejected {id}: {reason}")]
    Rejected {
        class: String,
        id: EntityId,
        reason: String,
    },

    #[error("invalid setting {key}={value}")]
    InvalidSetting { key: String, value: String },
}

impl ModelError {
    pub(crate) fn malformed(
        class: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ModelError::MalformedRecord {
            class: class.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ModelError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
