//! Structural validation of one loaded document.
//!
//! Rules follow the accepted XML dialect: a `<root>` element wrapping
//! `<BehaviorTree>` definitions, an optional `<TreeNodesModel>` section and
//! per-kind arity constraints on the tree bodies.

use std::collections::HashMap;

use super::load::ElementRef;
use super::xml::{XmlDocument, XmlElement};
use crate::{error::LoadError, registry::Registry};

fn schema_error(line: u32, message: impl ToString) -> LoadError {
    LoadError::Schema {
        line: Some(line),
        message: message.to_string(),
    }
}

pub(crate) fn verify_document(
    document: &XmlDocument,
    registry: &Registry,
    tree_roots: &HashMap<String, ElementRef>,
) -> Result<(), LoadError> {
    let root = &document.root;
    if root.name != "root" {
        return Err(LoadError::Schema {
            line: None,
            message: "The XML must have a root node called <root>".to_string(),
        });
    }

    let mut models = root.children_named("TreeNodesModel");
    let model = models.next();
    if let Some(second) = models.next() {
        return Err(schema_error(
            second.line,
            "Only a single node <TreeNodesModel> is supported",
        ));
    }
    if model.is_some() {
        // Not having a model is not an error, but when one is present every
        // node declaration must carry an ID.
        for child in &root.children {
            if matches!(
                child.name.as_str(),
                "Action" | "Decorator" | "SubTree" | "Condition"
            ) && child.attribute("ID").is_none()
            {
                return Err(schema_error(child.line, "The attribute [ID] is mandatory"));
            }
        }
    }

    for tree in root.children_named("BehaviorTree") {
        if tree.children.len() != 1 {
            return Err(schema_error(
                tree.line,
                "The node <BehaviorTree> must have exactly 1 child",
            ));
        }
        verify_node(&tree.children[0], registry, tree_roots)?;
    }

    if let Some(main_tree) = root.attribute("main_tree_to_execute") {
        if !tree_roots.contains_key(main_tree) {
            return Err(LoadError::Schema {
                line: None,
                message: "The tree specified in [main_tree_to_execute] can't be found".to_string(),
            });
        }
    }

    Ok(())
}

fn verify_node(
    node: &XmlElement,
    registry: &Registry,
    tree_roots: &HashMap<String, ElementRef>,
) -> Result<(), LoadError> {
    let children_count = node.children.len();
    match node.name.as_str() {
        "Decorator" => {
            if children_count != 1 {
                return Err(schema_error(
                    node.line,
                    "The node <Decorator> must have exactly 1 child",
                ));
            }
            if node.attribute("ID").is_none() {
                return Err(schema_error(
                    node.line,
                    "The node <Decorator> must have the attribute [ID]",
                ));
            }
        }
        "Action" => {
            if children_count != 0 {
                return Err(schema_error(
                    node.line,
                    "The node <Action> must not have any child",
                ));
            }
            if node.attribute("ID").is_none() {
                return Err(schema_error(
                    node.line,
                    "The node <Action> must have the attribute [ID]",
                ));
            }
        }
        "Condition" => {
            if children_count != 0 {
                return Err(schema_error(
                    node.line,
                    "The node <Condition> must not have any child",
                ));
            }
            if node.attribute("ID").is_none() {
                return Err(schema_error(
                    node.line,
                    "The node <Condition> must have the attribute [ID]",
                ));
            }
        }
        "Sequence" | "SequenceStar" | "Fallback" | "FallbackStar" => {
            if children_count == 0 {
                return Err(schema_error(
                    node.line,
                    "A Control node must have at least 1 child",
                ));
            }
        }
        "SubTree" => {
            for child in &node.children {
                if child.name != "remap" {
                    return Err(schema_error(
                        node.line,
                        "<SubTree> accepts only children of type <remap>",
                    ));
                }
            }
            if node.attribute("ID").is_none() {
                return Err(schema_error(
                    node.line,
                    "The node <SubTree> must have the attribute [ID]",
                ));
            }
        }
        name => {
            let found = registry.manifest(name).is_some() || tree_roots.contains_key(name);
            if !found {
                return Err(LoadError::MissingNode {
                    name: name.to_string(),
                    line: Some(node.line),
                });
            }
        }
    }

    // Subtree bodies are validated when the referenced tree is walked.
    if node.name != "SubTree" {
        for child in &node.children {
            verify_node(child, registry, tree_roots)?;
        }
    }
    Ok(())
}
