//! XML emission from a live tree.

use std::collections::HashSet;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::{
    error::WriteError,
    port::PortType,
    registry::{Manifest, Registry},
    tree::{NodeKind, Tree, TreeNode},
    Symbol,
};

/// Serialize `tree` into the XML dialect accepted by the loader, followed
/// by a `<TreeNodesModel>` section describing every non-builtin manifest.
///
/// With `compact`, any node whose registration ID appears in the registry
/// is written with the ID as the element name instead of the kind tag.
pub fn write_xml(registry: &Registry, tree: &Tree, compact: bool) -> Result<String, WriteError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);

    writer.write_event(Event::Start(BytesStart::new("root")))?;

    if let Some(root) = tree.root() {
        writer.write_event(Event::Start(BytesStart::new("BehaviorTree")))?;
        write_node(&mut writer, registry, tree, root, compact)?;
        writer.write_event(Event::End(BytesEnd::new("BehaviorTree")))?;
    }

    write_models(&mut writer, registry)?;

    writer.write_event(Event::End(BytesEnd::new("root")))?;

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    registry: &Registry,
    tree: &Tree,
    node: &TreeNode,
    compact: bool,
) -> Result<(), WriteError> {
    let node_id = node.registration_id();
    let node_name = node.instance_name();

    let mut element_name = node.kind().as_str();
    if node.kind() == NodeKind::Control || (compact && registry.manifest(node_id).is_some()) {
        element_name = node_id;
    }

    let mut element = BytesStart::new(element_name);
    if element_name != node_id && !node_id.is_empty() {
        element.push_attribute(("ID", node_id));
    }
    if element_name != node_name && !node_name.is_empty() && node_name != node_id {
        element.push_attribute(("name", node_name));
    }

    let mut added_ports: HashSet<Symbol> = HashSet::new();
    for (port, value) in node.config().input_ports.iter() {
        element.push_attribute((port.as_str(), value));
        added_ports.insert(port);
    }
    // Don't add InOut ports twice.
    for (port, value) in node.config().output_ports.iter() {
        if !added_ports.contains(&port) {
            element.push_attribute((port.as_str(), value));
        }
    }

    let children: Vec<&TreeNode> = match node.kind() {
        NodeKind::Control => node.children().iter().map(|&id| tree.node(id)).collect(),
        NodeKind::Decorator | NodeKind::SubTree => {
            node.child().map(|id| tree.node(id)).into_iter().collect()
        }
        _ => Vec::new(),
    };

    if children.is_empty() {
        writer.write_event(Event::Empty(element))?;
    } else {
        writer.write_event(Event::Start(element))?;
        for child in children {
            write_node(writer, registry, tree, child, compact)?;
        }
        writer.write_event(Event::End(BytesEnd::new(element_name)))?;
    }
    Ok(())
}

fn write_models(writer: &mut Writer<Vec<u8>>, registry: &Registry) -> Result<(), WriteError> {
    writer.write_event(Event::Start(BytesStart::new("TreeNodesModel")))?;

    let mut manifests: Vec<&Manifest> = registry.manifests().collect();
    manifests.sort_by(|a, b| a.registration_id.cmp(&b.registration_id));

    for manifest in manifests {
        if registry.is_builtin(&manifest.registration_id) || manifest.kind == NodeKind::Control {
            continue;
        }

        let mut element = BytesStart::new(manifest.kind.as_str());
        element.push_attribute(("ID", manifest.registration_id.as_str()));

        let mut input_ports = Vec::new();
        let mut output_ports = Vec::new();
        let mut inout_ports = Vec::new();
        for (name, spec) in manifest.ports() {
            match spec.ty {
                PortType::Input => input_ports.push(name.as_str()),
                PortType::Output => output_ports.push(name.as_str()),
                PortType::InOut => inout_ports.push(name.as_str()),
            }
        }
        let input_ports = input_ports.join(";");
        let output_ports = output_ports.join(";");
        let inout_ports = inout_ports.join(";");
        if !input_ports.is_empty() {
            element.push_attribute(("input_ports", input_ports.as_str()));
        }
        if !output_ports.is_empty() {
            element.push_attribute(("output_ports", output_ports.as_str()));
        }
        if !inout_ports.is_empty() {
            element.push_attribute(("inout_ports", inout_ports.as_str()));
        }

        writer.write_event(Event::Empty(element))?;
    }

    writer.write_event(Event::End(BytesEnd::new("TreeNodesModel")))?;
    Ok(())
}
