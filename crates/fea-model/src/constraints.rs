//! Constraints: entities that remove degrees of freedom from nodes.
//!
//! Constraints are owned by a [`Model`]. The nodes they tie together are
//! referenced by identifier only; whether those references still point
//! into the model is checked lazily by [`Constraint::validate`].

use std::any::Any;
use std::collections::HashMap;

use crate::entity::{DomainEntity, EntityData, FromPortable, apply_header, portable_header};
use crate::error::{ModelError, Result};
use crate::ids::{EntityId, EntityKind};
use crate::model::Model;
use crate::portable::PortableRecord;
use crate::registry::BackendRegistry;

fn check_tolerance(tol: f64) -> Result<f64> {
    if tol.is_finite() && tol >= 0.0 {
        Ok(tol)
    } else {
        Err(ModelError::invalid("tol", format!("must be a finite value >= 0, got {tol}")))
    }
}

fn remap_ids(ids: &mut [EntityId], keys: &HashMap<EntityId, EntityId>) {
    for id in ids {
        if let Some(new) = keys.get(id) {
            *id = *new;
        }
    }
}

// ------------------------------------------------------------------------------
// MPC
// ------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpcKind {
    /// Ties axial translations.
    Tie,
    /// Ties axial translations and rotations.
    Beam,
}

impl MpcKind {
    pub fn entity_kind(self) -> EntityKind {
        match self {
            MpcKind::Tie => EntityKind::TieMpc,
            MpcKind::Beam => EntityKind::BeamMpc,
        }
    }

    pub fn constraint_type(self) -> &'static str {
        match self {
            MpcKind::Tie => "tie",
            MpcKind::Beam => "beam",
        }
    }

    pub fn from_entity_kind(kind: EntityKind) -> Option<Self> {
        match kind {
            EntityKind::TieMpc => Some(MpcKind::Tie),
            EntityKind::BeamMpc => Some(MpcKind::Beam),
            _ => None,
        }
    }
}

/// Links a master node to a set of slave nodes.
#[derive(Debug, Clone)]
pub struct MultiPointConstraint {
    data: EntityData,
    mpc_kind: MpcKind,
    master: EntityId,
    slaves: Vec<EntityId>,
    tol: f64,
}

impl MultiPointConstraint {
    /// `tol` is the largest allowed master–slave distance.
    pub fn new(
        mpc_kind: MpcKind,
        master: EntityId,
        slaves: impl IntoIterator<Item = EntityId>,
        tol: f64,
    ) -> Result<Self> {
        Ok(Self {
            data: EntityData::new(mpc_kind.entity_kind()),
            mpc_kind,
            master,
            slaves: slaves.into_iter().collect(),
            tol: check_tolerance(tol)?,
        })
    }

    pub fn tie(master: EntityId, slaves: impl IntoIterator<Item = EntityId>, tol: f64) -> Result<Self> {
        Self::new(MpcKind::Tie, master, slaves, tol)
    }

    pub fn beam(master: EntityId, slaves: impl IntoIterator<Item = EntityId>, tol: f64) -> Result<Self> {
        Self::new(MpcKind::Beam, master, slaves, tol)
    }

    pub fn mpc_kind(&self) -> MpcKind {
        self.mpc_kind
    }

    /// `"tie"` or `"beam"`, following the kind.
    pub fn constraint_type(&self) -> &str {
        self.mpc_kind.constraint_type()
    }

    pub fn master(&self) -> EntityId {
        self.master
    }

    pub fn slaves(&self) -> &[EntityId] {
        &self.slaves
    }

    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// Resolves master and slaves in `model` and checks every slave lies
    /// within `tol` of the master.
    pub fn validate(&self, model: &Model) -> Result<()> {
        let master = model.resolve_node(self.id(), self.master)?;
        for &slave_id in &self.slaves {
            let slave = model.resolve_node(self.id(), slave_id)?;
            let distance = master.distance_to(slave);
            if distance > self.tol {
                return Err(ModelError::ToleranceExceeded {
                    constraint: self.id(),
                    slave: slave_id,
                    distance,
                    tolerance: self.tol,
                });
            }
        }
        Ok(())
    }

    fn remap(&mut self, keys: &HashMap<EntityId, EntityId>) {
        remap_ids(std::slice::from_mut(&mut self.master), keys);
        remap_ids(&mut self.slaves, keys);
    }
}

impl DomainEntity for MultiPointConstraint {
    fn data(&self) -> &EntityData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    fn to_portable(&self) -> PortableRecord {
        let mut record = portable_header(self);
        record.insert("constraint_type", self.constraint_type());
        record.insert("master", self.master.to_string());
        record.insert_ids("slaves", &self.slaves);
        record.insert("tol", self.tol);
        record
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl FromPortable for MultiPointConstraint {
    fn from_portable_in(record: &PortableRecord, registry: &BackendRegistry) -> Result<Self> {
        let kind = record.expect_class(&[EntityKind::TieMpc, EntityKind::BeamMpc])?;
        let mpc_kind = MpcKind::from_entity_kind(kind)
            .ok_or_else(|| record.malformed("class", "not a multi-point constraint"))?;
        let constraint_type = record.require_str("constraint_type")?;
        if constraint_type != mpc_kind.constraint_type() {
            return Err(record.malformed(
                "constraint_type",
                format!(
                    "'{constraint_type}' does not match class {kind}, expected '{}'",
                    mpc_kind.constraint_type()
                ),
            ));
        }
        let master = record.require_id("master")?;
        let slaves = record.require_ids("slaves")?;
        let tol = record.require_f64("tol")?;

        let mpc = MultiPointConstraint::new(mpc_kind, master, slaves, tol)
            .map_err(|err| record.malformed("tol", err.to_string()))?;
        apply_header(mpc, record, registry)
    }
}

// ------------------------------------------------------------------------------
// Surface constraints
// ------------------------------------------------------------------------------

/// Collection of nodes forming one side of a surface constraint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Surface {
    pub name: Option<String>,
    pub nodes: Vec<EntityId>,
}

impl Surface {
    pub fn new(nodes: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            name: None,
            nodes: nodes.into_iter().collect(),
        }
    }

    pub fn named(name: impl Into<String>, nodes: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            name: Some(name.into()),
            nodes: nodes.into_iter().collect(),
        }
    }

    fn write(&self, record: &mut PortableRecord, side: &str) {
        record.insert_ids(side, &self.nodes);
        record.insert_opt(&format!("{side}_name"), self.name.as_deref());
    }

    fn read(record: &PortableRecord, side: &str) -> Result<Self> {
        Ok(Self {
            name: record.optional_str(&format!("{side}_name"))?.map(str::to_string),
            nodes: record.require_ids(side)?,
        })
    }
}

/// Links a master surface to a slave surface.
#[derive(Debug, Clone)]
pub struct SurfaceConstraint {
    data: EntityData,
    master: Surface,
    slave: Surface,
    tol: f64,
}

impl SurfaceConstraint {
    /// Tie constraint between two surfaces.
    pub fn tie(master: Surface, slave: Surface, tol: f64) -> Result<Self> {
        Ok(Self {
            data: EntityData::new(EntityKind::TieConstraint),
            master,
            slave,
            tol: check_tolerance(tol)?,
        })
    }

    pub fn master(&self) -> &Surface {
        &self.master
    }

    pub fn slave(&self) -> &Surface {
        &self.slave
    }

    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// Resolves both surfaces and checks every slave node lies within `tol`
    /// of its nearest master node.
    pub fn validate(&self, model: &Model) -> Result<()> {
        let masters = self
            .master
            .nodes
            .iter()
            .map(|&id| model.resolve_node(self.id(), id))
            .collect::<Result<Vec<_>>>()?;

        for &slave_id in &self.slave.nodes {
            let slave = model.resolve_node(self.id(), slave_id)?;
            let nearest = masters
                .iter()
                .map(|master| master.distance_to(slave))
                .fold(f64::INFINITY, f64::min);
            if nearest > self.tol {
                return Err(ModelError::ToleranceExceeded {
                    constraint: self.id(),
                    slave: slave_id,
                    distance: nearest,
                    tolerance: self.tol,
                });
            }
        }
        Ok(())
    }

    fn remap(&mut self, keys: &HashMap<EntityId, EntityId>) {
        remap_ids(&mut self.master.nodes, keys);
        remap_ids(&mut self.slave.nodes, keys);
    }
}

impl DomainEntity for SurfaceConstraint {
    fn data(&self) -> &EntityData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    fn to_portable(&self) -> PortableRecord {
        let mut record = portable_header(self);
        self.master.write(&mut record, "master");
        self.slave.write(&mut record, "slave");
        record.insert("tol", self.tol);
        record
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl FromPortable for SurfaceConstraint {
    fn from_portable_in(record: &PortableRecord, registry: &BackendRegistry) -> Result<Self> {
        record.expect_class(&[EntityKind::TieConstraint])?;
        let master = Surface::read(record, "master")?;
        let slave = Surface::read(record, "slave")?;
        let tol = record.require_f64("tol")?;
        let constraint = SurfaceConstraint::tie(master, slave, tol)
            .map_err(|err| record.malformed("tol", err.to_string()))?;
        apply_header(constraint, record, registry)
    }
}

// ------------------------------------------------------------------------------
// Fix
// ------------------------------------------------------------------------------

/// Fixed constraint.
#[derive(Debug, Clone)]
pub struct FixConstraint {
    data: EntityData,
}

impl Default for FixConstraint {
    fn default() -> Self {
        Self::new()
    }
}

impl FixConstraint {
    pub fn new() -> Self {
        Self {
            data: EntityData::new(EntityKind::FixConstraint),
        }
    }
}

impl DomainEntity for FixConstraint {
    fn data(&self) -> &EntityData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    fn to_portable(&self) -> PortableRecord {
        portable_header(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl FromPortable for FixConstraint {
    fn from_portable_in(record: &PortableRecord, registry: &BackendRegistry) -> Result<Self> {
        record.expect_class(&[EntityKind::FixConstraint])?;
        apply_header(FixConstraint::new(), record, registry)
    }
}

// ------------------------------------------------------------------------------
// Any constraint
// ------------------------------------------------------------------------------

/// Any constraint a model can own.
#[derive(Debug, Clone)]
pub enum Constraint {
    Mpc(MultiPointConstraint),
    Surface(SurfaceConstraint),
    Fix(FixConstraint),
}

impl Constraint {
    pub fn as_entity(&self) -> &dyn DomainEntity {
        match self {
            Constraint::Mpc(c) => c,
            Constraint::Surface(c) => c,
            Constraint::Fix(c) => c,
        }
    }

    fn as_entity_mut(&mut self) -> &mut dyn DomainEntity {
        match self {
            Constraint::Mpc(c) => c,
            Constraint::Surface(c) => c,
            Constraint::Fix(c) => c,
        }
    }

    pub fn as_mpc(&self) -> Option<&MultiPointConstraint> {
        match self {
            Constraint::Mpc(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_surface(&self) -> Option<&SurfaceConstraint> {
        match self {
            Constraint::Surface(c) => Some(c),
            _ => None,
        }
    }

    /// Lazily checks references and tolerances against `model`.
    pub fn validate(&self, model: &Model) -> Result<()> {
        match self {
            Constraint::Mpc(c) => c.validate(model),
            Constraint::Surface(c) => c.validate(model),
            Constraint::Fix(_) => Ok(()),
        }
    }

    /// Rewrites node references through `keys`; unknown ids are kept.
    pub(crate) fn remap(&mut self, keys: &HashMap<EntityId, EntityId>) {
        match self {
            Constraint::Mpc(c) => c.remap(keys),
            Constraint::Surface(c) => c.remap(keys),
            Constraint::Fix(_) => {}
        }
    }
}

impl DomainEntity for Constraint {
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

impl FromPortable for Constraint {
    fn from_portable_in(record: &PortableRecord, registry: &BackendRegistry) -> Result<Self> {
        match record.class()? {
            EntityKind::TieMpc | EntityKind::BeamMpc => {
                MultiPointConstraint::from_portable_in(record, registry).map(Constraint::Mpc)
            }
            EntityKind::TieConstraint => {
                SurfaceConstraint::from_portable_in(record, registry).map(Constraint::Surface)
            }
            EntityKind::FixConstraint => {
                FixConstraint::from_portable_in(record, registry).map(Constraint::Fix)
            }
            other => Err(record.malformed("class", format!("{other} is not a constraint"))),
        }
    }
}

impl From<MultiPointConstraint> for Constraint {
    fn from(c: MultiPointConstraint) -> Self {
        Constraint::Mpc(c)
    }
}

impl From<SurfaceConstraint> for Constraint {
    fn from(c: SurfaceConstraint) -> Self {
        Constraint::Surface(c)
    }
}

impl From<FixConstraint> for Constraint {
    fn from(c: FixConstraint) -> Self {
        Constraint::Fix(c)
    }
}
