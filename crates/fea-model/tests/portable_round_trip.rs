//! Portable record round trips against an explicit registry context.

use std::any::Any;

use fea_model::{
    AbstractClass, Axes, BackendRegistry, Components, Constraint, DomainEntity, EntityId,
    EntityKind, FixConstraint, FromPortable, GeneralDisplacement, Implementation, Model,
    ModelError, MultiPointConstraint, Node, Part, PointLoad, PortableRecord, StaticBackend, Step,
    StepLoad, Surface, SurfaceConstraint,
};
use serde_json::json;

#[derive(Debug)]
struct SolverXDisplacement;

impl Implementation for SolverXDisplacement {
    fn class_name(&self) -> &str {
        "SolverXGeneralDisplacement"
    }

    fn backend(&self) -> Option<&str> {
        Some("solver-x")
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn solver_x() -> BackendRegistry {
    let registry = BackendRegistry::new();
    registry.provide(
        StaticBackend::new("solver-x").with(EntityKind::GeneralDisplacement, SolverXDisplacement),
    );
    registry.use_backend("solver-x").expect("solver-x activates");
    registry
}

#[test]
fn local_displacement_keeps_unset_components_zero() {
    let registry = BackendRegistry::new();
    let d = GeneralDisplacement::new(Components {
        x: 1.0,
        ..Components::default()
    })
    .with_axes(Axes::Local)
    .resolve_in(&registry);

    let record = d.to_portable();
    assert_eq!(record.get("class"), Some(&json!("GeneralDisplacement")));
    assert_eq!(record.get("axes"), Some(&json!("local")));

    let rebuilt = GeneralDisplacement::from_portable_in(&record, &registry).expect("rebuild");
    let c = rebuilt.components();
    assert_eq!(c.x, 1.0);
    assert_eq!((c.y, c.z, c.xx, c.yy, c.zz), (0.0, 0.0, 0.0, 0.0, 0.0));
    assert_eq!(rebuilt.axes(), Axes::Local);
    assert!(rebuilt.implementation().is::<AbstractClass>());
}

#[test]
fn record_class_is_abstract_under_an_active_backend() {
    let registry = solver_x();
    let d = GeneralDisplacement::new(Components {
        z: -0.25,
        ..Components::default()
    })
    .resolve_in(&registry);
    assert!(d.implementation().is::<SolverXDisplacement>());

    let record = d.to_portable();
    assert_eq!(record.class(), Ok(EntityKind::GeneralDisplacement));

    let rebuilt = GeneralDisplacement::from_portable_in(&record, &registry).expect("rebuild");
    assert!(rebuilt.implementation().is::<SolverXDisplacement>());
    assert_eq!(rebuilt.components(), d.components());
    assert_eq!(rebuilt.axes(), Axes::Global);

    // The same record, read without the backend, yields the abstract class.
    let plain = GeneralDisplacement::from_portable_in(&record, &BackendRegistry::new()).expect("rebuild");
    assert!(plain.implementation().is::<AbstractClass>());
}

#[test]
fn every_constraint_kind_round_trips() {
    let registry = BackendRegistry::new();
    let (a, b, c) = (EntityId::new(), EntityId::new(), EntityId::new());
    let constraints: Vec<Constraint> = vec![
        MultiPointConstraint::tie(a, [b, c], 0.01).expect("valid").into(),
        MultiPointConstraint::beam(a, [c], 0.0).expect("valid").with_name("rigid").into(),
        SurfaceConstraint::tie(Surface::named("m", [a]), Surface::new([b, c]), 0.3)
            .expect("valid")
            .into(),
        FixConstraint::new().into(),
    ];

    for original in &constraints {
        let record = original.to_portable();
        let rebuilt = Constraint::from_portable_in(&record, &registry).expect("rebuild");
        assert_eq!(rebuilt.kind(), original.kind());
        assert_eq!(rebuilt.name(), original.name());
        assert_ne!(rebuilt.id(), original.id());
        assert_eq!(rebuilt.owner(), None);
        // Identifiers aside, the records match field for field.
        assert_eq!(rebuilt.to_portable(), record);
    }
}

#[test]
fn step_loads_round_trip_in_order() {
    let registry = BackendRegistry::new();
    let target = EntityId::new();
    let mut step = Step::new().with_name("push");
    step.add_load(PointLoad::new(Components {
        x: 5.0,
        zz: 2.0,
        ..Components::default()
    })
    .on_nodes([target]))
        .expect("add load");
    step.add_load(GeneralDisplacement::new(Components::default()).with_axes(Axes::Local))
        .expect("add displacement");

    let record = step.to_portable();
    let rebuilt = Step::from_portable_in(&record, &registry).expect("rebuild");
    assert_eq!(rebuilt.to_portable(), record);
    let first = rebuilt.loads().iter().next().expect("first load");
    assert!(matches!(first, StepLoad::Load(_)));
    assert_eq!(first.nodes(), &[target]);
    assert_eq!(first.components().zz, 2.0);
}

#[test]
fn malformed_records_are_reported() {
    let registry = BackendRegistry::new();

    let no_class = PortableRecord::from_value(json!({"x": 1.0})).expect("object");
    assert!(matches!(
        GeneralDisplacement::from_portable_in(&no_class, &registry),
        Err(ModelError::MalformedRecord { .. })
    ));

    let bad_slaves = PortableRecord::from_value(json!({
        "class": "TieMPC",
        "constraint_type": "tie",
        "master": EntityId::new().to_string(),
        "slaves": "everything",
        "tol": 0.1,
    }))
    .expect("object");
    match MultiPointConstraint::from_portable_in(&bad_slaves, &registry) {
        Err(ModelError::MalformedRecord { class, field, .. }) => {
            assert_eq!(class, "TieMPC");
            assert_eq!(field, "slaves");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let wrong_kind = Node::new([0.0; 3]).to_portable();
    assert!(Part::from_portable_in(&wrong_kind, &registry).is_err());
}

#[test]
fn whole_model_survives_json_text() {
    let registry = BackendRegistry::new();
    let mut model = Model::new().with_name("frame");
    let mut part = Part::new().with_name("column");
    let base = part.add_node(Node::new([0.0; 3])).expect("add").id();
    let top = part.add_node(Node::new([0.0, 0.0, 3.0])).expect("add").id();
    model.add_part(part).expect("add part");
    model
        .add_constraint(MultiPointConstraint::beam(base, [top], 3.5).expect("valid"))
        .expect("add");
    let step = model.add_step(Step::new()).expect("add step").id();
    model
        .add_load(step, GeneralDisplacement::new(Components::default()).on_nodes([base]))
        .expect("add bc");

    let text = model.to_portable().to_json_string();
    let record = PortableRecord::from_json_str(&text).expect("parse");
    let rebuilt = Model::from_portable_in(&record, &registry).expect("rebuild");

    rebuilt.validate().expect("rebuilt references resolve");
    assert_eq!(rebuilt.name(), Some("frame"));
    assert_eq!(rebuilt.summary().nodes, 2);
    assert_eq!(rebuilt.summary().total_constraints(), 1);
    assert!(!rebuilt.contains(base));
}
