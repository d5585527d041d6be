//! Tree instantiation.
//!
//! Walks the XML body of the selected `<BehaviorTree>`, materializes one
//! node per element, links it to its parent and threads the blackboard
//! stack through subtree expansions.

use super::load::TreeParser;
use super::xml::XmlElement;
use crate::{
    blackboard::{Blackboard, SharedBlackboard},
    error::LoadError,
    port::{parse_port_value, BlackboardValue, PortRemapping, PortType},
    tree::{NodeConfig, NodeId, NodeKind, Tree, TreeNode},
    BehaviorNode, BehaviorResult, Context,
};

/// Placeholder runtime for a `<SubTree>` element; the referenced tree's
/// root becomes the placeholder's single child.
struct SubtreePlaceholder;

impl BehaviorNode for SubtreePlaceholder {
    fn tick(&mut self, _ctx: &mut Context) -> BehaviorResult {
        BehaviorResult::Success
    }
}

pub(crate) fn build_tree(
    parser: &TreeParser,
    main_tree_id: &str,
    root_blackboard: &SharedBlackboard,
) -> Result<Tree, LoadError> {
    let mut tree = Tree {
        nodes: Vec::new(),
        blackboard_stack: vec![root_blackboard.clone()],
    };
    build_tree_body(parser, main_tree_id, &mut tree, root_blackboard, None)?;
    Ok(tree)
}

fn build_tree_body(
    parser: &TreeParser,
    tree_id: &str,
    tree: &mut Tree,
    blackboard: &SharedBlackboard,
    parent: Option<NodeId>,
) -> Result<(), LoadError> {
    let tree_element = parser.tree_root(tree_id).ok_or_else(|| LoadError::MissingNode {
        name: tree_id.to_string(),
        line: None,
    })?;
    let root_element = tree_element.children.first().ok_or_else(|| LoadError::Schema {
        line: Some(tree_element.line),
        message: "The node <BehaviorTree> must have exactly 1 child".to_string(),
    })?;
    build_node_recurse(parser, root_element, tree, blackboard, parent)
}

fn build_node_recurse(
    parser: &TreeParser,
    element: &XmlElement,
    tree: &mut Tree,
    blackboard: &SharedBlackboard,
    parent: Option<NodeId>,
) -> Result<(), LoadError> {
    let node = build_node(parser, element, blackboard)?;
    let is_subtree = node.kind() == NodeKind::SubTree;
    let instance_name = node.instance_name().to_string();
    let node_id = NodeId(tree.nodes.len());
    tree.nodes.push(node);

    if let Some(parent_id) = parent {
        let parent_node = tree.node_mut(parent_id);
        let parent_name = parent_node.registration_id().to_string();
        parent_node
            .attach_child(node_id)
            .map_err(|e| LoadError::AddChild(e, parent_name))?;
    }

    if is_subtree {
        // The new scope's parent is the most recent expansion, and the
        // referenced tree body is walked inside the new scope.
        let parent_blackboard = tree
            .blackboard_stack
            .last()
            .cloned()
            .unwrap_or_else(|| blackboard.clone());
        let child_blackboard = Blackboard::create_child(&parent_blackboard);
        for remap in element.children_named("remap") {
            if let (Some(internal), Some(external)) =
                (remap.attribute("internal"), remap.attribute("external"))
            {
                child_blackboard
                    .borrow_mut()
                    .add_subtree_remapping(internal, external);
            }
        }
        tree.blackboard_stack.push(child_blackboard.clone());
        build_tree_body(parser, &instance_name, tree, &child_blackboard, Some(node_id))
    } else {
        for child_element in &element.children {
            build_node_recurse(parser, child_element, tree, blackboard, Some(node_id))?;
        }
        Ok(())
    }
}

fn build_node(
    parser: &TreeParser,
    element: &XmlElement,
    blackboard: &SharedBlackboard,
) -> Result<TreeNode, LoadError> {
    let element_name = element.name.as_str();

    // Actions, Decorators and Conditions carry their own ID attribute;
    // everything else is registered under the element name.
    let id = match element_name {
        "Action" | "Decorator" | "Condition" => {
            element.attribute("ID").ok_or_else(|| LoadError::Schema {
                line: Some(element.line),
                message: format!("The node <{}> must have the attribute [ID]", element_name),
            })?
        }
        _ => element_name,
    };

    let instance_name = if element_name == "SubTree" {
        element.attribute("ID").ok_or_else(|| LoadError::Schema {
            line: Some(element.line),
            message: "The node <SubTree> must have the attribute [ID]".to_string(),
        })?
    } else {
        element.attribute("name").unwrap_or(id)
    };

    let mut remapping = PortRemapping::default();
    for (attribute, value) in &element.attributes {
        if attribute != "ID" && attribute != "name" {
            remapping.insert(attribute.as_str().into(), value.clone());
        }
    }

    let mut config = NodeConfig::new(blackboard.clone());
    let registry = parser.registry();

    if registry.has_builder(id) {
        let manifest = registry.manifest(id).ok_or_else(|| LoadError::MissingNode {
            name: id.to_string(),
            line: None,
        })?;

        // Every remapped name must exist in the manifest.
        for (port, _) in remapping.iter() {
            if manifest.port_spec(port).is_none() {
                return Err(LoadError::PortUnmatch {
                    node: id.to_string(),
                    instance: instance_name.to_string(),
                    port: port.to_string(),
                });
            }
        }

        // Register the blackboard entry type of each typed port, and check
        // consistency with earlier uses of the same key.
        for (port_name, spec) in manifest.ports() {
            let Some(token) = spec.type_token else { continue };
            let Some(value) = remapping.get(port_name) else {
                continue;
            };
            let BlackboardValue::Ref(key) = parse_port_value(value) else {
                continue;
            };
            match Blackboard::port_type(blackboard, key) {
                None => Blackboard::set_port_type(blackboard, key, token),
                Some(previous) => {
                    if previous != token {
                        return Err(LoadError::PortTypeMismatch {
                            key: key.to_string(),
                            previous: previous.name(),
                            requested: token.name(),
                        });
                    }
                }
            }
        }

        // InOut ports appear in both maps.
        for (port, value) in remapping.iter() {
            let Some(spec) = manifest.port_spec(port) else {
                continue;
            };
            if spec.ty != PortType::Output {
                config.input_ports.insert(port, value.to_string());
            }
            if spec.ty != PortType::Input {
                config.output_ports.insert(port, value.to_string());
            }
        }

        registry
            .instantiate(instance_name, id, config)
            .ok_or_else(|| LoadError::MissingNode {
                name: id.to_string(),
                line: None,
            })
    } else if parser.has_tree(id) {
        Ok(TreeNode::new(
            instance_name,
            id,
            NodeKind::SubTree,
            Box::new(SubtreePlaceholder),
            config,
        ))
    } else {
        Err(LoadError::MissingNode {
            name: id.to_string(),
            line: None,
        })
    }
}
