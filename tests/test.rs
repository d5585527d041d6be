use std::cell::Cell;
use std::rc::Rc;

use behavior_tree_xml::{
    boxify, build_tree_from_text, error::LoadError, write_xml, BehaviorNode, BehaviorResult,
    Blackboard, Context, Manifest, NodeKind, PortSpec, Registry, Tree, TreeNode, TreeParser,
};

struct Nop;

impl BehaviorNode for Nop {
    fn tick(&mut self, _ctx: &mut Context) -> BehaviorResult {
        BehaviorResult::Success
    }
}

fn test_registry() -> Registry {
    let mut registry = Registry::default();
    registry.register_builtin(Manifest::new("Sequence", NodeKind::Control), boxify(|| Nop));
    registry.register_builtin(Manifest::new("Fallback", NodeKind::Control), boxify(|| Nop));
    registry.register_builtin(
        Manifest::new("Inverter", NodeKind::Decorator),
        boxify(|| Nop),
    );
    registry.register(Manifest::new("Ping", NodeKind::Action), boxify(|| Nop));
    registry.register(
        Manifest::new("Move", NodeKind::Action)
            .port("goal", PortSpec::new_in())
            .port("feedback", PortSpec::new_inout()),
        boxify(|| Nop),
    );
    registry
}

#[test]
fn test_single_tree_with_generated_id() {
    let registry = test_registry();
    let mut parser = TreeParser::new(&registry);
    parser
        .load_from_text(
            r#"<root><BehaviorTree><Sequence><Action ID="Ping"/></Sequence></BehaviorTree></root>"#,
        )
        .unwrap();

    let tree_ids: Vec<&str> = parser.tree_ids().collect();
    assert_eq!(tree_ids, vec!["BehaviorTree_0"]);

    let tree = parser.instantiate(&Blackboard::new_shared()).unwrap();
    assert_eq!(tree.nodes().len(), 2);
    let root = tree.root().unwrap();
    assert_eq!(root.registration_id(), "Sequence");
    assert_eq!(tree.node(root.children()[0]).registration_id(), "Ping");
}

#[test]
fn test_missing_main_tree_selection() {
    let registry = test_registry();
    let mut parser = TreeParser::new(&registry);
    parser
        .load_from_text(
            r#"<root>
    <BehaviorTree ID="TreeA"><Ping/></BehaviorTree>
    <BehaviorTree ID="TreeB"><Ping/></BehaviorTree>
</root>"#,
        )
        .unwrap();
    let err = parser.instantiate(&Blackboard::new_shared()).unwrap_err();
    assert!(matches!(err, LoadError::Usage(_)));
}

#[test]
fn test_decorator_arity() {
    let registry = test_registry();
    let mut parser = TreeParser::new(&registry);
    let err = parser
        .load_from_text(
            r#"<root>
    <BehaviorTree>
        <Decorator ID="Inverter">
            <Action ID="A"/>
            <Action ID="B"/>
        </Decorator>
    </BehaviorTree>
</root>"#,
        )
        .unwrap_err();
    match err {
        LoadError::Schema { line, message } => {
            assert_eq!(line, Some(3));
            assert!(message.contains("exactly 1 child"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_unknown_element() {
    let registry = test_registry();
    let mut parser = TreeParser::new(&registry);
    let err = parser
        .load_from_text(
            r#"<root>
    <BehaviorTree>
        <Sequence>
            <Foo/>
        </Sequence>
    </BehaviorTree>
</root>"#,
        )
        .unwrap_err();
    match err {
        LoadError::MissingNode { name, line } => {
            assert_eq!(name, "Foo");
            assert_eq!(line, Some(4));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_port_type_conflict() {
    let mut registry = test_registry();
    registry.register(
        Manifest::new("PortA", NodeKind::Action).port("x", PortSpec::new_in().typed::<i32>()),
        boxify(|| Nop),
    );
    registry.register(
        Manifest::new("PortB", NodeKind::Action).port("y", PortSpec::new_in().typed::<String>()),
        boxify(|| Nop),
    );

    let err = build_tree_from_text(
        &registry,
        r#"<root>
    <BehaviorTree>
        <Sequence>
            <PortA x="{shared}"/>
            <PortB y="{shared}"/>
        </Sequence>
    </BehaviorTree>
</root>"#,
        &Blackboard::new_shared(),
    )
    .unwrap_err();
    match err {
        LoadError::PortTypeMismatch {
            key,
            previous,
            requested,
        } => {
            assert_eq!(key, "shared");
            assert_eq!(previous, "i32");
            assert!(requested.contains("String"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

struct ReadIn;

impl BehaviorNode for ReadIn {
    fn tick(&mut self, ctx: &mut Context) -> BehaviorResult {
        match ctx.get::<i32>("in") {
            Some(42) => BehaviorResult::Success,
            _ => BehaviorResult::Fail,
        }
    }
}

#[test]
fn test_subtree_remap() {
    let mut registry = test_registry();
    registry.register(
        Manifest::new("ReadIn", NodeKind::Action).port("in", PortSpec::new_in().typed::<i32>()),
        boxify(|| ReadIn),
    );

    let blackboard = Blackboard::new_shared();
    Blackboard::set(&blackboard, "outer_k", 42i32);

    let mut tree = build_tree_from_text(
        &registry,
        r#"<root main_tree_to_execute="Main">
    <BehaviorTree ID="Main">
        <SubTree ID="Sub">
            <remap internal="in" external="outer_k"/>
        </SubTree>
    </BehaviorTree>
    <BehaviorTree ID="Sub">
        <ReadIn in="{in}"/>
    </BehaviorTree>
</root>"#,
        &blackboard,
    )
    .unwrap();

    assert_eq!(tree.blackboard_stack().len(), 2);

    let reader_id = tree.root().unwrap().child().unwrap();
    assert_eq!(tree.node(reader_id).registration_id(), "ReadIn");
    assert_eq!(
        tree.node_mut(reader_id).execute_tick(),
        BehaviorResult::Success
    );
}

#[test]
fn test_nested_subtree_scopes() {
    let registry = test_registry();
    let tree = build_tree_from_text(
        &registry,
        r#"<root main_tree_to_execute="Main">
    <BehaviorTree ID="Main">
        <SubTree ID="TreeA">
            <remap internal="x" external="root_x"/>
        </SubTree>
    </BehaviorTree>
    <BehaviorTree ID="TreeA">
        <SubTree ID="TreeB">
            <remap internal="y" external="x"/>
        </SubTree>
    </BehaviorTree>
    <BehaviorTree ID="TreeB">
        <Ping/>
    </BehaviorTree>
</root>"#,
        &Blackboard::new_shared(),
    )
    .unwrap();

    // One stack entry per subtree expansion, each parented on the previous
    // entry; remapped reads resolve transitively to the root scope.
    assert_eq!(tree.blackboard_stack().len(), 3);
    Blackboard::set(&tree.blackboard_stack()[0], "root_x", 9i32);
    assert_eq!(
        Blackboard::get::<i32>(&tree.blackboard_stack()[2], "y"),
        Some(9)
    );
}

struct CountHalt(Rc<Cell<usize>>);

impl BehaviorNode for CountHalt {
    fn tick(&mut self, _ctx: &mut Context) -> BehaviorResult {
        BehaviorResult::Running
    }

    fn halt(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn test_halt_on_drop() {
    let halts = Rc::new(Cell::new(0));
    let counter = halts.clone();
    let mut registry = test_registry();
    registry.register(
        Manifest::new("Spin", NodeKind::Action),
        boxify(move || CountHalt(counter.clone())),
    );

    let tree = build_tree_from_text(
        &registry,
        r#"<root>
    <BehaviorTree>
        <Sequence>
            <Spin/>
            <Spin/>
        </Sequence>
    </BehaviorTree>
</root>"#,
        &Blackboard::new_shared(),
    )
    .unwrap();

    assert_eq!(halts.get(), 0);
    drop(tree);
    assert_eq!(halts.get(), 2);
}

fn assert_nodes_isomorphic(a: &Tree, na: &TreeNode, b: &Tree, nb: &TreeNode) {
    assert_eq!(na.kind(), nb.kind());
    assert_eq!(na.registration_id(), nb.registration_id());
    assert_eq!(na.instance_name(), nb.instance_name());
    let inputs_a: Vec<_> = na.config().input_ports.iter().collect();
    let inputs_b: Vec<_> = nb.config().input_ports.iter().collect();
    assert_eq!(inputs_a, inputs_b);
    let outputs_a: Vec<_> = na.config().output_ports.iter().collect();
    let outputs_b: Vec<_> = nb.config().output_ports.iter().collect();
    assert_eq!(outputs_a, outputs_b);

    match na.kind() {
        NodeKind::Control => {
            assert_eq!(na.children().len(), nb.children().len());
            for (ca, cb) in na.children().iter().zip(nb.children()) {
                assert_nodes_isomorphic(a, a.node(*ca), b, b.node(*cb));
            }
        }
        NodeKind::Decorator | NodeKind::SubTree => match (na.child(), nb.child()) {
            (Some(ca), Some(cb)) => assert_nodes_isomorphic(a, a.node(ca), b, b.node(cb)),
            (None, None) => {}
            other => panic!("child link mismatch: {:?}", other),
        },
        _ => {}
    }
}

#[test]
fn test_write_round_trip() {
    let registry = test_registry();
    let source = r#"<root>
    <BehaviorTree ID="Main">
        <Sequence>
            <Decorator ID="Inverter">
                <Action ID="Ping" name="ping_once"/>
            </Decorator>
            <Move goal="{target}" feedback="{fb}"/>
        </Sequence>
    </BehaviorTree>
</root>"#;

    let first = build_tree_from_text(&registry, source, &Blackboard::new_shared()).unwrap();
    let written = write_xml(&registry, &first, false).unwrap();
    let second = build_tree_from_text(&registry, &written, &Blackboard::new_shared()).unwrap();

    assert_eq!(first.nodes().len(), second.nodes().len());
    assert_nodes_isomorphic(
        &first,
        first.root().unwrap(),
        &second,
        second.root().unwrap(),
    );
}

#[test]
fn test_write_compact_mode() {
    let registry = test_registry();
    let tree = build_tree_from_text(
        &registry,
        r#"<root><BehaviorTree><Sequence><Ping/></Sequence></BehaviorTree></root>"#,
        &Blackboard::new_shared(),
    )
    .unwrap();

    let plain = write_xml(&registry, &tree, false).unwrap();
    assert!(plain.contains("<Action ID=\"Ping\"/>"));

    let compact = write_xml(&registry, &tree, true).unwrap();
    assert!(compact.contains("<Ping/>"));
}

#[test]
fn test_write_tree_nodes_model() {
    let mut registry = test_registry();
    registry.register(
        Manifest::new("Fetch", NodeKind::Action)
            .port("url", PortSpec::new_in())
            .port("data", PortSpec::new_out())
            .port("state", PortSpec::new_inout()),
        boxify(|| Nop),
    );

    let tree = build_tree_from_text(
        &registry,
        r#"<root><BehaviorTree><Fetch/></BehaviorTree></root>"#,
        &Blackboard::new_shared(),
    )
    .unwrap();

    let written = write_xml(&registry, &tree, false).unwrap();
    assert!(written.contains(
        "<Action ID=\"Fetch\" input_ports=\"url\" output_ports=\"data\" inout_ports=\"state\"/>"
    ));
    // Builtins stay out of the model section.
    assert!(!written.contains("<Control"));
    assert!(!written.contains("ID=\"Sequence\""));
}

mod include_files {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "behavior_tree_xml_{}_{}",
            label,
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_include_relative_path() {
        let dir = temp_dir("include");
        fs::write(
            dir.join("sub.xml"),
            r#"<root>
    <BehaviorTree ID="Sub">
        <Ping/>
    </BehaviorTree>
</root>"#,
        )
        .unwrap();
        fs::write(
            dir.join("main.xml"),
            r#"<root main_tree_to_execute="Main">
    <include path="sub.xml"/>
    <BehaviorTree ID="Main">
        <SubTree ID="Sub"/>
    </BehaviorTree>
</root>"#,
        )
        .unwrap();

        let registry = test_registry();
        let mut parser = TreeParser::new(&registry);
        parser.load_from_file(dir.join("main.xml")).unwrap();
        let tree = parser.instantiate(&Blackboard::new_shared()).unwrap();

        let ids: Vec<&str> = tree
            .nodes()
            .iter()
            .map(|node| node.registration_id())
            .collect();
        assert_eq!(ids, vec!["Sub", "Ping"]);
        assert_eq!(tree.blackboard_stack().len(), 2);
    }

    #[test]
    fn test_package_resolution() {
        let dir = temp_dir("package");
        fs::write(
            dir.join("sub.xml"),
            r#"<root>
    <BehaviorTree ID="Sub">
        <Ping/>
    </BehaviorTree>
</root>"#,
        )
        .unwrap();
        let main = r#"<root main_tree_to_execute="Main">
    <include path="sub.xml" ros_pkg="demo_pkg"/>
    <BehaviorTree ID="Main">
        <SubTree ID="Sub"/>
    </BehaviorTree>
</root>"#;

        let registry = test_registry();

        // Without a resolver the package attribute is a configuration
        // error.
        let mut parser = TreeParser::new(&registry);
        assert!(matches!(
            parser.load_from_text(main),
            Err(LoadError::Configuration(_))
        ));

        let package_root = dir.clone();
        let mut parser = TreeParser::new(&registry).with_package_resolver(Box::new(move |pkg| {
            (pkg == "demo_pkg").then(|| package_root.clone())
        }));
        parser.load_from_text(main).unwrap();
        let tree = parser.instantiate(&Blackboard::new_shared()).unwrap();
        assert_eq!(tree.nodes().len(), 2);
    }
}
