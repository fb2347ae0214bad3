//! The model: root of the ownership hierarchy.
//!
//! A model owns parts (which own nodes), constraints and steps (which own
//! displacements and loads). It keeps an index of every identifier in its
//! graph so uniqueness holds across all nested containers, not just within
//! one.

use std::any::Any;
use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::config::Settings;
use crate::constraints::Constraint;
use crate::container::Container;
use crate::entity::{DomainEntity, EntityData, FromPortable, apply_header, portable_header};
use crate::error::{ModelError, Result};
use crate::ids::{EntityId, EntityKind};
use crate::part::{Node, Part};
use crate::portable::PortableRecord;
use crate::registry::BackendRegistry;
use crate::step::{Step, StepLoad};
use crate::summary::ModelSummary;

#[derive(Debug, Clone)]
pub struct Model {
    data: EntityData,
    settings: Settings,
    parts: Container<Part>,
    constraints: Container<Constraint>,
    steps: Container<Step>,
    index: HashSet<EntityId>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Empty model with default settings.
    pub fn new() -> Self {
        let data = EntityData::new(EntityKind::Model);
        let index = HashSet::from([data.id()]);
        Self {
            data,
            settings: Settings::default(),
            parts: Container::new(),
            constraints: Container::new(),
            steps: Container::new(),
            index,
        }
    }

    /// Replaces the default settings.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Settings in effect for this model.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// True when `id` belongs to any entity of this graph.
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains(&id)
    }

    fn ensure_fresh(&self, ids: &[EntityId]) -> Result<()> {
        let mut seen = HashSet::new();
        for &id in ids {
            if self.index.contains(&id) || !seen.insert(id) {
                return Err(ModelError::DuplicateIdentifier { id });
            }
        }
        Ok(())
    }

    fn ensure_not_coincident<'a>(
        &self,
        existing: impl IntoIterator<Item = &'a Node>,
        node: &Node,
    ) -> Result<()> {
        if self.settings.point_overlap {
            return Ok(());
        }
        match existing
            .into_iter()
            .find(|other| self.settings.coincident(other.xyz(), node.xyz()))
        {
            Some(other) => Err(ModelError::CoincidentNode {
                id: node.id(),
                existing: other.id(),
                tolerance: self.settings.global_tolerance,
            }),
            None => Ok(()),
        }
    }

    // --------------------------------------------------------------------
    // Parts and nodes
    // --------------------------------------------------------------------

    /// Parts in insertion order.
    pub fn parts(&self) -> &Container<Part> {
        &self.parts
    }

    /// Part with identifier `id`.
    pub fn part(&self, id: EntityId) -> Option<&Part> {
        self.parts.get(id)
    }

    /// Adds a part together with the nodes it already owns.
    pub fn add_part(&mut self, part: Part) -> Result<&Part> {
        self.ensure_fresh(&part.graph_ids())?;
        let nodes = part.nodes().iter().collect::<Vec<_>>();
        for (i, node) in nodes.iter().enumerate() {
            self.ensure_not_coincident(nodes[..i].iter().copied(), node)?;
        }

        let ids = part.graph_ids();
        let owner = self.data.as_owner();
        let part = self.parts.insert(owner, part)?;
        self.index.extend(ids);
        Ok(part)
    }

    /// Removes a part; its nodes go with it.
    pub fn remove_part(&mut self, id: EntityId) -> Result<Part> {
        let owner = self.data.as_owner();
        let part = self.parts.take(owner, id)?;
        for gone in part.graph_ids() {
            self.index.remove(&gone);
        }
        Ok(part)
    }

    /// Adds a node to one of this model's parts.
    pub fn add_node(&mut self, part_id: EntityId, node: Node) -> Result<&Node> {
        self.ensure_fresh(&[node.id()])?;
        let owner = self.data.as_owner();
        let part = self.parts.get(part_id).ok_or(ModelError::NotOwned {
            id: part_id,
            container: owner,
        })?;
        self.ensure_not_coincident(part.nodes(), &node)?;

        let id = node.id();
        let part = self.parts.get_mut(part_id).ok_or(ModelError::NotOwned {
            id: part_id,
            container: owner,
        })?;
        let node = part.add_node(node)?;
        self.index.insert(id);
        Ok(node)
    }

    /// Removes a node from one of this model's parts.
    pub fn remove_node(&mut self, part_id: EntityId, node_id: EntityId) -> Result<Node> {
        let owner = self.data.as_owner();
        let part = self.parts.get_mut(part_id).ok_or(ModelError::NotOwned {
            id: part_id,
            container: owner,
        })?;
        let node = part.remove_node(node_id)?;
        self.index.remove(&node_id);
        Ok(node)
    }

    /// Node `id` anywhere in the model.
    pub fn node(&self, id: EntityId) -> Option<&Node> {
        self.parts.iter().find_map(|part| part.node(id))
    }

    /// Every node of every part, part by part.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.parts.iter().flat_map(|part| part.nodes().iter())
    }

    /// Follows a reference held by `referrer`, failing if the node is no
    /// longer in the model.
    pub fn resolve_node(&self, referrer: EntityId, id: EntityId) -> Result<&Node> {
        self.node(id)
            .ok_or(ModelError::DanglingReference { referrer, id })
    }

    // --------------------------------------------------------------------
    // Constraints
    // --------------------------------------------------------------------

    /// Constraints in insertion order.
    pub fn constraints(&self) -> &Container<Constraint> {
        &self.constraints
    }

    /// Constraint with identifier `id`.
    pub fn constraint(&self, id: EntityId) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    /// Adds a constraint. Node references are checked by `validate`.
    pub fn add_constraint(&mut self, constraint: impl Into<Constraint>) -> Result<&Constraint> {
        let constraint = constraint.into();
        let id = constraint.id();
        self.ensure_fresh(&[id])?;
        let owner = self.data.as_owner();
        let constraint = self.constraints.insert(owner, constraint)?;
        self.index.insert(id);
        Ok(constraint)
    }

    /// Detaches a constraint. Nodes it referenced are left untouched.
    pub fn remove_constraint(&mut self, id: EntityId) -> Result<Constraint> {
        let owner = self.data.as_owner();
        let constraint = self.constraints.take(owner, id)?;
        self.index.remove(&id);
        Ok(constraint)
    }

    // --------------------------------------------------------------------
    // Steps and loads
    // --------------------------------------------------------------------

    /// Steps in insertion order.
    pub fn steps(&self) -> &Container<Step> {
        &self.steps
    }

    /// Step with identifier `id`.
    pub fn step(&self, id: EntityId) -> Option<&Step> {
        self.steps.get(id)
    }

    /// Adds a step together with the loads it already owns.
    pub fn add_step(&mut self, step: Step) -> Result<&Step> {
        let ids = step.graph_ids();
        self.ensure_fresh(&ids)?;
        let owner = self.data.as_owner();
        let step = self.steps.insert(owner, step)?;
        self.index.extend(ids);
        Ok(step)
    }

    /// Removes a step; its loads go with it.
    pub fn remove_step(&mut self, id: EntityId) -> Result<Step> {
        let owner = self.data.as_owner();
        let step = self.steps.take(owner, id)?;
        for gone in step.graph_ids() {
            self.index.remove(&gone);
        }
        Ok(step)
    }

    /// Adds a displacement or load to one of this model's steps.
    pub fn add_load(&mut self, step_id: EntityId, load: impl Into<StepLoad>) -> Result<&StepLoad> {
        let load = load.into();
        let id = load.id();
        self.ensure_fresh(&[id])?;
        let owner = self.data.as_owner();
        let step = self.steps.get_mut(step_id).ok_or(ModelError::NotOwned {
            id: step_id,
            container: owner,
        })?;
        let load = step.add_load(load)?;
        self.index.insert(id);
        Ok(load)
    }

    /// Removes a displacement or load from one of this model's steps.
    pub fn remove_load(&mut self, step_id: EntityId, load_id: EntityId) -> Result<StepLoad> {
        let owner = self.data.as_owner();
        let step = self.steps.get_mut(step_id).ok_or(ModelError::NotOwned {
            id: step_id,
            container: owner,
        })?;
        let load = step.remove_load(load_id)?;
        self.index.remove(&load_id);
        Ok(load)
    }

    // --------------------------------------------------------------------
    // Validation
    // --------------------------------------------------------------------

    /// Resolves every reference, checks tolerances and runs each
    /// implementation's backend check. Stops at the first failure.
    pub fn validate(&self) -> Result<()> {
        self.implementation().check(self)?;
        for part in &self.parts {
            part.implementation().check(part)?;
            for node in part.nodes() {
                node.implementation().check(node)?;
            }
        }
        for constraint in &self.constraints {
            constraint.validate(self)?;
            let entity = constraint.as_entity();
            entity.implementation().check(entity)?;
        }
        for step in &self.steps {
            step.implementation().check(step)?;
            for load in step.loads() {
                load.validate(self)?;
                let entity = load.as_entity();
                entity.implementation().check(entity)?;
            }
        }

        let summary = self.summary();
        if self.settings.verbose {
            info!(model = %self.id(), "{}", summary.render(&self.settings));
        } else {
            debug!(model = %self.id(), "{}", summary.render(&self.settings));
        }
        Ok(())
    }

    /// Counts and extents of the current graph.
    pub fn summary(&self) -> ModelSummary {
        ModelSummary::from_model(self)
    }
}

impl DomainEntity for Model {
    fn data(&self) -> &EntityData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    /// Whole-graph record. Node identifiers are written as `key` so that
    /// constraint and load references can be rebuilt.
    fn to_portable(&self) -> PortableRecord {
        let mut record = portable_header(self);
        record.insert_records("parts", self.parts.iter().map(Part::to_portable_keyed).collect());
        record.insert_records(
            "constraints",
            self.constraints.iter().map(Constraint::to_portable).collect(),
        );
        record.insert_records("steps", self.steps.iter().map(Step::to_portable).collect());
        record
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn descendant_ids(&self) -> Vec<EntityId> {
        self.parts
            .iter()
            .flat_map(Part::graph_ids)
            .chain(self.constraints.ids())
            .chain(self.steps.iter().flat_map(Step::graph_ids))
            .collect()
    }

    fn adopt_children(&mut self) {
        let owner = self.data.as_owner();
        self.parts.rebind(owner);
        self.constraints.rebind(owner);
        self.steps.rebind(owner);
        self.index = std::iter::once(self.data.id())
            .chain(self.descendant_ids())
            .collect();
    }
}

impl FromPortable for Model {
    /// Rebuilds the graph with fresh identifiers; references are rewritten
    /// through the node keys.
    fn from_portable_in(record: &PortableRecord, registry: &BackendRegistry) -> Result<Self> {
        record.expect_class(&[EntityKind::Model])?;
        let mut model = apply_header(Model::new(), record, registry)?;

        let mut keys = HashMap::new();
        for part in record.records_or_empty("parts")? {
            model.add_part(Part::from_portable_keyed(&part, registry, &mut keys)?)?;
        }
        for constraint in record.records_or_empty("constraints")? {
            let mut constraint = Constraint::from_portable_in(&constraint, registry)?;
            constraint.remap(&keys);
            model.add_constraint(constraint)?;
        }
        for step in record.records_or_empty("steps")? {
            let mut step = Step::from_portable_in(&step, registry)?;
            step.remap(&keys);
            model.add_step(step)?;
        }
        Ok(model)
    }
}
