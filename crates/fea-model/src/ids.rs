//! Identity types shared by every entity in the model graph.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Process-unique identifier of a model entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Abstract domain class of an entity.
///
/// This is the backend-independent tag written to portable records, never
/// the name of whatever concrete class a backend resolved it to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Model,
    Part,
    Node,
    Step,
    TieMpc,
    BeamMpc,
    TieConstraint,
    FixConstraint,
    GeneralDisplacement,
    PointLoad,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Model,
        EntityKind::Part,
        EntityKind::Node,
        EntityKind::Step,
        EntityKind::TieMpc,
        EntityKind::BeamMpc,
        EntityKind::TieConstraint,
        EntityKind::FixConstraint,
        EntityKind::GeneralDisplacement,
        EntityKind::PointLoad,
    ];

    /// Portable class tag.
    pub fn class_name(self) -> &'static str {
        match self {
            EntityKind::Model => "Model",
            EntityKind::Part => "Part",
            EntityKind::Node => "Node",
            EntityKind::Step => "Step",
            EntityKind::TieMpc => "TieMPC",
            EntityKind::BeamMpc => "BeamMPC",
            EntityKind::TieConstraint => "TieConstraint",
            EntityKind::FixConstraint => "FixConstraint",
            EntityKind::GeneralDisplacement => "GeneralDisplacement",
            EntityKind::PointLoad => "PointLoad",
        }
    }

    pub fn is_constraint(self) -> bool {
        matches!(
            self,
            EntityKind::TieMpc
                | EntityKind::BeamMpc
                | EntityKind::TieConstraint
                | EntityKind::FixConstraint
        )
    }

    pub fn is_step_load(self) -> bool {
        matches!(self, EntityKind::GeneralDisplacement | EntityKind::PointLoad)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown entity class '{}'", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.class_name() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Handle to the container owning an entity.
///
/// Relation only: holding an `OwnerRef` keeps nothing alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl OwnerRef {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}
