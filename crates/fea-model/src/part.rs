//! Parts and the nodes they own.

use std::any::Any;
use std::collections::HashMap;

use crate::config::distance;
use crate::container::Container;
use crate::entity::{DomainEntity, EntityData, FromPortable, apply_header, portable_header};
use crate::error::Result;
use crate::ids::{EntityId, EntityKind};
use crate::portable::PortableRecord;
use crate::registry::BackendRegistry;

/// A point of the discretized geometry.
#[derive(Debug, Clone)]
pub struct Node {
    data: EntityData,
    xyz: [f64; 3],
}

impl Node {
    pub fn new(xyz: [f64; 3]) -> Self {
        Self {
            data: EntityData::new(EntityKind::Node),
            xyz,
        }
    }

    /// Coordinates.
    pub fn xyz(&self) -> [f64; 3] {
        self.xyz
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Node) -> f64 {
        distance(self.xyz, other.xyz)
    }
}

impl DomainEntity for Node {
    fn data(&self) -> &EntityData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    fn to_portable(&self) -> PortableRecord {
        let mut record = portable_header(self);
        record.insert("xyz", self.xyz.to_vec());
        record
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl FromPortable for Node {
    fn from_portable_in(record: &PortableRecord, registry: &BackendRegistry) -> Result<Self> {
        record.expect_class(&[EntityKind::Node])?;
        let xyz = record.require_xyz("xyz")?;
        apply_header(Node::new(xyz), record, registry)
    }
}

/// A deformable body; exclusively owns its nodes.
#[derive(Debug, Clone)]
pub struct Part {
    data: EntityData,
    nodes: Container<Node>,
}

impl Default for Part {
    fn default() -> Self {
        Self::new()
    }
}

impl Part {
    pub fn new() -> Self {
        Self {
            data: EntityData::new(EntityKind::Part),
            nodes: Container::new(),
        }
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &Container<Node> {
        &self.nodes
    }

    /// Node with identifier `id`.
    pub fn node(&self, id: EntityId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Adds a node to a part that is not yet part of a model. Parts inside
    /// a model take nodes through `Model::add_node`, which also checks the
    /// graph-wide identifier index.
    pub fn add_node(&mut self, node: Node) -> Result<&mut Node> {
        let owner = self.data.as_owner();
        self.nodes.insert(owner, node)
    }

    /// Detaches a node from this part.
    pub fn remove_node(&mut self, id: EntityId) -> Result<Node> {
        let owner = self.data.as_owner();
        self.nodes.take(owner, id)
    }

    /// Identifier of this part and of every node it owns.
    pub fn graph_ids(&self) -> Vec<EntityId> {
        std::iter::once(self.id()).chain(self.nodes.ids()).collect()
    }

    /// Record with each node's identifier written as `key`, so references
    /// into this part survive a whole-model rebuild.
    pub(crate) fn to_portable_keyed(&self) -> PortableRecord {
        self.portable_with(|node| {
            let mut record = node.to_portable();
            record.insert("key", node.id().to_string());
            record
        })
    }

    /// Rebuilds a keyed part, recording `key -> new id` for every node.
    pub(crate) fn from_portable_keyed(
        record: &PortableRecord,
        registry: &BackendRegistry,
        keys: &mut HashMap<EntityId, EntityId>,
    ) -> Result<Self> {
        record.expect_class(&[EntityKind::Part])?;
        let mut part = apply_header(Part::new(), record, registry)?;
        for node_record in record.records_or_empty("nodes")? {
            let node = Node::from_portable_in(&node_record, registry)?;
            if node_record.contains("key") {
                keys.insert(node_record.require_id("key")?, node.id());
            }
            part.add_node(node)?;
        }
        Ok(part)
    }

    fn portable_with(&self, node_record: impl Fn(&Node) -> PortableRecord) -> PortableRecord {
        let mut record = portable_header(self);
        record.insert_records("nodes", self.nodes.iter().map(node_record).collect());
        record
    }
}

impl DomainEntity for Part {
    fn data(&self) -> &EntityData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut EntityData {
        &mut self.data
    }

    fn to_portable(&self) -> PortableRecord {
        self.portable_with(Node::to_portable)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn descendant_ids(&self) -> Vec<EntityId> {
        self.nodes.ids().collect()
    }

    fn adopt_children(&mut self) {
        let owner = self.data.as_owner();
        self.nodes.rebind(owner);
    }
}

impl FromPortable for Part {
    fn from_portable_in(record: &PortableRecord, registry: &BackendRegistry) -> Result<Self> {
        Part::from_portable_keyed(record, registry, &mut HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::ids::OwnerRef;

    #[test]
    fn add_node_sets_back_reference() {
        let mut part = Part::new();
        let node = Node::new([1.0, 2.0, 3.0]);
        let id = node.id();

        let added = part.add_node(node).expect("add node");
        assert_eq!(added.id(), id);
        assert_eq!(added.owner(), Some(OwnerRef::new(EntityKind::Part, part.id())));
    }

    #[test]
    fn duplicate_node_id_is_rejected() {
        let mut part = Part::new();
        let id = EntityId::new();
        part.add_node(Node::new([0.0; 3]).with_id(id).expect("unattached")).expect("first add");

        let err = part
            .add_node(Node::new([1.0, 0.0, 0.0]).with_id(id).expect("unattached"))
            .expect_err("second add");
        assert_eq!(err, ModelError::DuplicateIdentifier { id });
        assert_eq!(part.nodes().len(), 1);
    }

    #[test]
    fn remove_requires_ownership() {
        let mut part = Part::new();
        let stranger = Node::new([0.0; 3]);
        assert!(matches!(
            part.remove_node(stranger.id()),
            Err(ModelError::NotOwned { .. })
        ));

        let id = part.add_node(Node::new([0.0; 3])).expect("add").id();
        let removed = part.remove_node(id).expect("remove");
        assert_eq!(removed.owner(), None);
        assert!(part.nodes().is_empty());
    }

    #[test]
    fn owned_node_cannot_be_added_elsewhere() {
        let mut first = Part::new();
        let mut second = Part::new();
        let id = first.add_node(Node::new([0.0; 3])).expect("add").id();
        let copy = first.node(id).cloned().expect("node present");

        assert!(matches!(
            second.add_node(copy),
            Err(ModelError::AlreadyOwned { .. })
        ));
    }

    #[test]
    fn with_id_rebinds_owned_nodes() {
        let mut part = Part::new();
        part.add_node(Node::new([0.0; 3])).expect("add");
        let id = EntityId::new();
        let part = part.with_id(id).expect("fresh part");

        let node = part.nodes().iter().next().expect("one node");
        assert_eq!(node.owner(), Some(OwnerRef::new(EntityKind::Part, id)));
    }

    #[test]
    fn with_id_refuses_identifier_of_owned_node() {
        let mut part = Part::new();
        let node_id = part.add_node(Node::new([0.0; 3])).expect("add").id();
        assert_eq!(
            part.with_id(node_id).expect_err("node id taken"),
            ModelError::DuplicateIdentifier { id: node_id }
        );
    }

    #[test]
    fn removed_node_keeps_its_identifier() {
        let mut part = Part::new();
        let id = part.add_node(Node::new([0.0; 3])).expect("add").id();
        let removed = part.remove_node(id).expect("remove");

        match removed.with_id(EntityId::new()) {
            Err(ModelError::InvalidValue { field, .. }) => assert_eq!(field, "id"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn nodes_keep_insertion_order_in_records() {
        let mut part = Part::new().with_name("beam");
        for x in [3.0, 1.0, 2.0] {
            part.add_node(Node::new([x, 0.0, 0.0])).expect("add");
        }

        let rebuilt = Part::from_portable_in(&part.to_portable(), &BackendRegistry::new())
            .expect("rebuild");
        let xs = rebuilt.nodes().iter().map(|n| n.xyz()[0]).collect::<Vec<_>>();
        assert_eq!(xs, vec![3.0, 1.0, 2.0]);
        assert_eq!(rebuilt.name(), Some("beam"));
        assert_ne!(rebuilt.id(), part.id());
    }

    #[test]
    fn node_record_requires_three_coordinates() {
        let mut record = PortableRecord::new(EntityKind::Node);
        record.insert("xyz", vec![0.0, 1.0]);
        assert!(matches!(
            Node::from_portable_in(&record, &BackendRegistry::new()),
            Err(ModelError::MalformedRecord { .. })
        ));
    }
}
