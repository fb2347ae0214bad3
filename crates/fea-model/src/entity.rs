//! The entity contract shared by every domain object.
//!
//! Each entity carries an [`EntityData`] header: identity, optional name,
//! abstract kind, owner handle and the [`Implementation`] the backend
//! registry resolved for its kind at construction time.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{ModelError, Result};
use crate::ids::{EntityId, EntityKind, OwnerRef};
use crate::portable::PortableRecord;
use crate::registry::BackendRegistry;

/// A concrete class for one abstract entity kind.
///
/// Backends implement this on their own types and hand them to the
/// registry; entity constructors then carry whichever implementation is
/// resolved for the active backend.
pub trait Implementation: fmt::Debug + Send + Sync + 'static {
    /// Name of the concrete class, e.g. `AbaqusTieMPC`.
    fn class_name(&self) -> &str;

    /// Backend that supplied this class; `None` for the abstract fallback.
    fn backend(&self) -> Option<&str> {
        None
    }

    /// Backend-specific acceptance check, run by `Model::validate`.
    fn check(&self, _entity: &dyn DomainEntity) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn Implementation {
    pub fn is<T: Implementation>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Implementation>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

pub type ImplementationRef = Arc<dyn Implementation>;

/// Fallback implementation: the abstract class itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbstractClass(pub EntityKind);

impl Implementation for AbstractClass {
    fn class_name(&self) -> &str {
        self.0.class_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Header fields common to every entity.
#[derive(Debug, Clone)]
pub struct EntityData {
    id: EntityId,
    name: Option<String>,
    kind: EntityKind,
    owner: Option<OwnerRef>,
    /// Set on first attach and never cleared; the identifier is fixed from
    /// then on.
    attached: bool,
    implementation: ImplementationRef,
}

impl EntityData {
    /// Fresh header for `kind`, resolved against the global registry.
    pub(crate) fn new(kind: EntityKind) -> Self {
        Self {
            id: EntityId::new(),
            name: None,
            kind,
            owner: None,
            attached: false,
            implementation: BackendRegistry::global().resolve(kind),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn owner(&self) -> Option<OwnerRef> {
        self.owner
    }

    pub fn implementation(&self) -> &dyn Implementation {
        self.implementation.as_ref()
    }

    /// True once the entity has belonged to a container, even if it has
    /// since been removed.
    pub fn was_attached(&self) -> bool {
        self.attached
    }

    /// Handle other entities use to point back at this one as their owner.
    pub fn as_owner(&self) -> OwnerRef {
        OwnerRef::new(self.kind, self.id)
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub(crate) fn set_implementation(&mut self, implementation: ImplementationRef) {
        self.implementation = implementation;
    }

    pub(crate) fn attach(&mut self, owner: OwnerRef) {
        self.owner = Some(owner);
        self.attached = true;
    }

    pub(crate) fn detach(&mut self) {
        self.owner = None;
    }
}

/// Common behaviour of model entities.
pub trait DomainEntity: fmt::Debug + Send + Sync {
    fn data(&self) -> &EntityData;

    fn data_mut(&mut self) -> &mut EntityData;

    /// Portable record tagged with the abstract kind.
    fn to_portable(&self) -> PortableRecord;

    fn as_any(&self) -> &dyn Any;

    /// Identifiers of every entity owned, directly or not, by this one.
    /// Leaf entities own nothing.
    fn descendant_ids(&self) -> Vec<EntityId> {
        Vec::new()
    }

    /// Re-points owned children at this entity after its identifier
    /// changed.
    fn adopt_children(&mut self) {}

    fn id(&self) -> EntityId {
        self.data().id()
    }

    fn name(&self) -> Option<&str> {
        self.data().name()
    }

    fn kind(&self) -> EntityKind {
        self.data().kind()
    }

    fn owner(&self) -> Option<OwnerRef> {
        self.data().owner()
    }

    fn implementation(&self) -> &dyn Implementation {
        self.data().implementation()
    }

    /// Replaces the generated identifier with a caller-supplied one.
    ///
    /// Only allowed before the entity is first attached, and `id` must not
    /// already belong to anything this entity owns.
    fn with_id(mut self, id: EntityId) -> Result<Self>
    where
        Self: Sized,
    {
        if self.data().was_attached() {
            return Err(ModelError::invalid(
                "id",
                format!("{} {} has been attached, its identifier is fixed", self.kind(), self.id()),
            ));
        }
        if self.descendant_ids().contains(&id) {
            return Err(ModelError::DuplicateIdentifier { id });
        }
        self.data_mut().set_id(id);
        self.adopt_children();
        Ok(self)
    }

    fn with_name(mut self, name: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.data_mut().set_name(Some(name.into()));
        self
    }

    /// Resolves the implementation against an explicit registry context
    /// instead of the global one.
    fn resolve_in(mut self, registry: &BackendRegistry) -> Self
    where
        Self: Sized,
    {
        let kind = self.kind();
        self.data_mut().set_implementation(registry.resolve(kind));
        self
    }
}

/// Reconstruction from a portable record.
pub trait FromPortable: Sized {
    fn from_portable_in(record: &PortableRecord, registry: &BackendRegistry) -> Result<Self>;

    fn from_portable(record: &PortableRecord) -> Result<Self> {
        Self::from_portable_in(record, BackendRegistry::global())
    }
}

/// Writes the header fields every record shares.
pub(crate) fn portable_header(entity: &dyn DomainEntity) -> PortableRecord {
    let mut record = PortableRecord::new(entity.kind());
    record.insert_opt("name", entity.name());
    record
}

/// Applies the shared header fields from `record` to a freshly built entity.
pub(crate) fn apply_header<T: DomainEntity>(
    mut entity: T,
    record: &PortableRecord,
    registry: &BackendRegistry,
) -> Result<T> {
    let name = record.optional_str("name")?.map(str::to_string);
    entity.data_mut().set_name(name);
    Ok(entity.resolve_in(registry))
}
