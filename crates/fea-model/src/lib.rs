//! Backend-agnostic structural analysis model.
//!
//! This crate provides:
//! - **Identity & portable records**: every entity has a process-unique
//!   [`EntityId`], an optional name and an abstract [`EntityKind`], and
//!   round-trips through a backend-independent [`PortableRecord`]
//! - **Ownership hierarchy**: [`Model`] owns parts, constraints and steps;
//!   parts own nodes; steps own displacements and loads. Cross references
//!   are identifiers checked lazily by [`Model::validate`]
//! - **Backend registry**: [`BackendRegistry`] maps abstract kinds to
//!   backend-specific [`Implementation`]s; constructors resolve against the
//!   active backend and fall back to the abstract class
//!
//! ```text
//! Model ──┬── Part ── Node
//!         ├── Constraint (TieMPC, BeamMPC, TieConstraint, FixConstraint)
//!         └── Step ── GeneralDisplacement / PointLoad
//! ```

pub mod config;
pub mod constraints;
pub mod container;
pub mod entity;
pub mod error;
pub mod ids;
pub mod model;
pub mod part;
pub mod portable;
pub mod registry;
pub mod step;
pub mod summary;

pub use config::Settings;
pub use constraints::{Constraint, FixConstraint, MpcKind, MultiPointConstraint, Surface, SurfaceConstraint};
pub use container::Container;
pub use entity::{AbstractClass, DomainEntity, EntityData, FromPortable, Implementation, ImplementationRef};
pub use error::{ModelError, Result};
pub use ids::{EntityId, EntityKind, OwnerRef, UnknownKind};
pub use model::Model;
pub use part::{Node, Part};
pub use portable::PortableRecord;
pub use registry::{
    BackendPlugin, BackendRegistry, ImplementationTable, StaticBackend, activate_backend,
    active_backend, provide_backend, register_backend, resolve, use_backend,
};
pub use step::{Axes, Components, GeneralDisplacement, PointLoad, Step, StepLoad};
pub use summary::ModelSummary;
