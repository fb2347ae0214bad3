use fea_io::{load_model_in, save_model};
use fea_model::{
    BackendRegistry, Components, DomainEntity, FixConstraint, GeneralDisplacement,
    MultiPointConstraint, Model, Node, Part, PointLoad, Step, StepLoad,
};

fn cantilever() -> Model {
    let mut model = Model::new().with_name("cantilever");
    let mut part = Part::new().with_name("beam");
    let root = part.add_node(Node::new([0.0, 0.0, 0.0])).expect("root").id();
    let tip = part.add_node(Node::new([1.0, 0.0, 0.0])).expect("tip").id();
    let mid = part.add_node(Node::new([0.5, 0.0, 0.0])).expect("mid").id();
    model.add_part(part).expect("add part");

    model
        .add_constraint(MultiPointConstraint::beam(tip, [mid], 1.0).expect("valid mpc"))
        .expect("add mpc");
    model.add_constraint(FixConstraint::new()).expect("add fix");

    let step = model.add_step(Step::new().with_name("load")).expect("add step").id();
    model
        .add_load(step, GeneralDisplacement::new(Components::default()).on_nodes([root]))
        .expect("add displacement");
    let force = Components {
        z: -10.0,
        ..Components::default()
    };
    model
        .add_load(step, PointLoad::new(force).on_nodes([tip]))
        .expect("add load");
    model
}

#[test]
fn saved_model_loads_back_with_same_structure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("models").join("cantilever.json");
    let model = cantilever();
    model.validate().expect("source model is valid");

    save_model(&path, &model).expect("save should succeed");
    let loaded = load_model_in(&path, &BackendRegistry::new()).expect("load should succeed");

    assert_eq!(loaded.name(), Some("cantilever"));
    assert_eq!(loaded.summary(), model.summary());
    assert_ne!(loaded.id(), model.id());
    loaded.validate().expect("references are remapped onto the new nodes");

    let step = loaded.steps().iter().next().expect("one step");
    assert_eq!(step.name(), Some("load"));
    let load = step
        .loads()
        .iter()
        .find(|load| matches!(load, StepLoad::Load(_)))
        .expect("point load survives");
    assert_eq!(load.components().z, -10.0);
    let tip = loaded.node(load.nodes()[0]).expect("tip node resolves");
    assert_eq!(tip.xyz(), [1.0, 0.0, 0.0]);
}

#[test]
fn saved_file_is_plain_json() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("cantilever.json");
    save_model(&path, &cantilever()).expect("save should succeed");

    let raw = std::fs::read_to_string(&path).expect("read");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(value["class"], "Model");
    assert_eq!(value["parts"].as_array().map(Vec::len), Some(1));
    assert!(value.get("id").is_none());
}
