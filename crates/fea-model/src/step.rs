//! Analysis steps and the displacements and loads they own.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::container::Container;
use crate::entity::{DomainEntity, EntityData, FromPortable, apply_header, portable_header};
use crate::error::{ModelError, Result};
use crate::ids::{EntityId, EntityKind};
use crate::model::Model;
use crate::portable::PortableRecord;
use crate::registry::BackendRegistry;

/// Frame the components are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axes {
    Local,
    #[default]
    Global,
}

impl Axes {
    /// Portable spelling, `local` or `global`.
    pub fn as_str(self) -> &'static str {
        match self {
            Axes::Local => "local",
            Axes::Global => "global",
        }
    }
}

impl fmt::Display for Axes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axes {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(Axes::Local),
            "global" => Ok(Axes::Global),
            other => Err(ModelError::invalid(
                "axes",
                format!("expected 'local' or 'global', got '{other}'"),
            )),
        }
    }
}

/// Three translations and three rotations. Unset components are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Components {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub xx: f64,
    pub yy: f64,
    pub zz: f64,
}

impl Components {
    pub const NAMES: [&'static str; 6] = ["x", "y", "z", "xx", "yy", "zz"];

    /// Components in `NAMES` order.
    pub fn values(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.xx, self.yy, self.zz]
    }

    fn write(&self, record: &mut PortableRecord) {
        for (name, value) in Self::NAMES.iter().zip(self.values()) {
            record.insert(name, value);
        }
    }

    fn read(record: &PortableRecord) -> Result<Self> {
        Ok(Self {
            x: record.require_f64("x")?,
            y: record.require_f64("y")?,
            z: record.require_f64("z")?,
            xx: record.require_f64("xx")?,
            yy: record.require_f64("yy")?,
            zz: record.require_f64("zz")?,
        })
    }
}

/// Fields shared by displacements and loads.
#[derive(Debug, Clone, PartialEq, Default)]
struct NodalAction {
    components: Components,
    axes: Axes,
    nodes: Vec<EntityId>,
}

impl NodalAction {
    fn write(&self, record: &mut PortableRecord) {
        self.components.write(record);
        record.insert("axes", self.axes.as_str());
        record.insert_ids("nodes", &self.nodes);
    }

    fn read(record: &PortableRecord) -> Result<Self> {
        let components = Components::read(record)?;
        let axes = record
            .require_str("axes")?
            .parse::<Axes>()
            .map_err(|err| record.malformed("axes", err.to_string()))?;
        let nodes = record.ids_or_empty("nodes")?;
        Ok(Self {
            components,
            axes,
            nodes,
        })
    }

    fn validate(&self, referrer: EntityId, model: &Model) -> Result<()> {
        for &node in &self.nodes {
            model.resolve_node(referrer, node)?;
        }
        Ok(())
    }

    fn remap(&mut self, keys: &HashMap<EntityId, EntityId>) {
        for node in &mut self.nodes {
            if let Some(new) = keys.get(node) {
                *node = *new;
            }
        }
    }
}

/// Imposed displacement on a set of nodes.
#[derive(Debug, Clone)]
pub struct GeneralDisplacement {
    data: EntityData,
    action: NodalAction,
}

impl GeneralDisplacement {
    pub fn new(components: Components) -> Self {
        Self {
            data: EntityData::new(EntityKind::GeneralDisplacement),
            action: NodalAction {
                components,
                ..NodalAction::default()
            },
        }
    }

    pub fn with_axes(mut self, axes: Axes) -> Self {
        self.action.axes = axes;
        self
    }

    /// Nodes the displacement is applied to (reference only).
    pub fn on_nodes(mut self, nodes: impl IntoIterator<Item = EntityId>) -> Self {
        self.action.nodes = nodes.into_iter().collect();
        self
    }

    pub fn components(&self) -> Components {
        self.action.components
    }

    pub fn axes(&self) -> Axes {
        self.action.axes
    }

    pub fn nodes(&self) -> &[EntityId] {
        &self.action.nodes
    }
}

impl DomainEntity for GeneralDisplacement {
    fn data(&self) -> &EntityData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    fn to_portable(&self) -> PortableRecord {
        let mut record = portable_header(self);
        self.action.write(&mut record);
        record
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl FromPortable for GeneralDisplacement {
    fn from_portable_in(record: &PortableRecord, registry: &BackendRegistry) -> Result<Self> {
        record.expect_class(&[EntityKind::GeneralDisplacement])?;
        let mut displacement = GeneralDisplacement::new(Components::default());
        displacement.action = NodalAction::read(record)?;
        apply_header(displacement, record, registry)
    }
}

/// Concentrated forces and moments on a set of nodes.
#[derive(Debug, Clone)]
pub struct PointLoad {
    data: EntityData,
    action: NodalAction,
}

impl PointLoad {
    pub fn new(components: Components) -> Self {
        Self {
            data: EntityData::new(EntityKind::PointLoad),
            action: NodalAction {
                components,
                ..NodalAction::default()
            },
        }
    }

    pub fn with_axes(mut self, axes: Axes) -> Self {
        self.action.axes = axes;
        self
    }

    pub fn on_nodes(mut self, nodes: impl IntoIterator<Item = EntityId>) -> Self {
        self.action.nodes = nodes.into_iter().collect();
        self
    }

    pub fn components(&self) -> Components {
        self.action.components
    }

    pub fn axes(&self) -> Axes {
        self.action.axes
    }

    pub fn nodes(&self) -> &[EntityId] {
        &self.action.nodes
    }
}

impl DomainEntity for PointLoad {
    fn data(&self) -> &EntityData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    fn to_portable(&self) -> PortableRecord {
        let mut record = portable_header(self);
        self.action.write(&mut record);
        record
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl FromPortable for PointLoad {
    fn from_portable_in(record: &PortableRecord, registry: &BackendRegistry) -> Result<Self> {
        record.expect_class(&[EntityKind::PointLoad])?;
        let mut load = PointLoad::new(Components::default());
        load.action = NodalAction::read(record)?;
        apply_header(load, record, registry)
    }
}

/// Anything a step can own.
#[derive(Debug, Clone)]
pub enum StepLoad {
    Displacement(GeneralDisplacement),
    Load(PointLoad),
}

impl StepLoad {
    /// The wrapped entity.
    pub fn as_entity(&self) -> &dyn DomainEntity {
        match self {
            StepLoad::Displacement(d) => d,
            StepLoad::Load(l) => l,
        }
    }

    fn as_entity_mut(&mut self) -> &mut dyn DomainEntity {
        match self {
            StepLoad::Displacement(d) => d,
            StepLoad::Load(l) => l,
        }
    }

    fn action(&self) -> &NodalAction {
        match self {
            StepLoad::Displacement(d) => &d.action,
            StepLoad::Load(l) => &l.action,
        }
    }

    pub fn components(&self) -> Components {
        self.action().components
    }

    pub fn axes(&self) -> Axes {
        self.action().axes
    }

    pub fn nodes(&self) -> &[EntityId] {
        &self.action().nodes
    }

    /// Checks that every target node is still in `model`.
    pub fn validate(&self, model: &Model) -> Result<()> {
        self.action().validate(self.id(), model)
    }

    pub(crate) fn remap(&mut self, keys: &HashMap<EntityId, EntityId>) {
        match self {
            StepLoad::Displacement(d) => d.action.remap(keys),
            StepLoad::Load(l) => l.action.remap(keys),
        }
    }
}

impl DomainEntity for StepLoad {
    fn data(&self) -> &EntityData {
        self.as_entity().data()
    }

    fn data_mut(&mut self) -> &mut EntityData {
        self.as_entity_mut().data_mut()
    }

    fn to_portable(&self) -> PortableRecord {
        self.as_entity().to_portable()
    }

    fn as_any(&self) -> &dyn Any {
        self.as_entity().as_any()
    }
}

impl FromPortable for StepLoad {
    fn from_portable_in(record: &PortableRecord, registry: &BackendRegistry) -> Result<Self> {
        match record.class()? {
            EntityKind::GeneralDisplacement => {
                GeneralDisplacement::from_portable_in(record, registry).map(StepLoad::Displacement)
            }
            EntityKind::PointLoad => PointLoad::from_portable_in(record, registry).map(StepLoad::Load),
            other => Err(record.malformed("class", format!("{other} cannot be owned by a step"))),
        }
    }
}

impl From<GeneralDisplacement> for StepLoad {
    fn from(d: GeneralDisplacement) -> Self {
        StepLoad::Displacement(d)
    }
}

impl From<PointLoad> for StepLoad {
    fn from(l: PointLoad) -> Self {
        StepLoad::Load(l)
    }
}

/// An analysis step; its loads apply only while it is active.
#[derive(Debug, Clone)]
pub struct Step {
    data: EntityData,
    loads: Container<StepLoad>,
}

impl Default for Step {
    fn default() -> Self {
        Self::new()
    }
}

impl Step {
    pub fn new() -> Self {
        Self {
            data: EntityData::new(EntityKind::Step),
            loads: Container::new(),
        }
    }

    /// Displacements and loads in insertion order.
    pub fn loads(&self) -> &Container<StepLoad> {
        &self.loads
    }

    /// Displacement or load with identifier `id`.
    pub fn load(&self, id: EntityId) -> Option<&StepLoad> {
        self.loads.get(id)
    }

    /// Only the imposed displacements.
    pub fn displacements(&self) -> impl Iterator<Item = &GeneralDisplacement> {
        self.loads.iter().filter_map(|load| match load {
            StepLoad::Displacement(d) => Some(d),
            StepLoad::Load(_) => None,
        })
    }

    /// Adds to a step that is not yet part of a model; see
    /// `Model::add_load` for steps inside one.
    pub fn add_load(&mut self, load: impl Into<StepLoad>) -> Result<&mut StepLoad> {
        let owner = self.data.as_owner();
        self.loads.insert(owner, load.into())
    }

    /// Detaches a displacement or load from this step.
    pub fn remove_load(&mut self, id: EntityId) -> Result<StepLoad> {
        let owner = self.data.as_owner();
        self.loads.take(owner, id)
    }

    /// Identifier of this step and of everything it owns.
    pub fn graph_ids(&self) -> Vec<EntityId> {
        std::iter::once(self.id()).chain(self.loads.ids()).collect()
    }

    pub(crate) fn remap(&mut self, keys: &HashMap<EntityId, EntityId>) {
        for load in self.loads.iter_mut() {
            load.remap(keys);
        }
    }
}

impl DomainEntity for Step {
    fn data(&self) -> &EntityData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    fn to_portable(&self) -> PortableRecord {
        let mut record = portable_header(self);
        record.insert_records("loads", self.loads.iter().map(StepLoad::to_portable).collect());
        record
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn descendant_ids(&self) -> Vec<EntityId> {
        self.loads.ids().collect()
    }

    fn adopt_children(&mut self) {
        let owner = self.data.as_owner();
        self.loads.rebind(owner);
    }
}

impl FromPortable for Step {
    fn from_portable_in(record: &PortableRecord, registry: &BackendRegistry) -> Result<Self> {
        record.expect_class(&[EntityKind::Step])?;
        let mut step = apply_header(Step::new(), record, registry)?;
        for load in record.records_or_empty("loads")? {
            step.add_load(StepLoad::from_portable_in(&load, registry)?)?;
        }
        Ok(step)
    }
}
