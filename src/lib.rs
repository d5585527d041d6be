//! Loader, instantiator and writer for XML behavior tree definitions.
//!
//! The crate consumes the `<root><BehaviorTree>...` XML dialect, validates
//! it against a [`Registry`] of node manifests, and instantiates a fully
//! wired [`Tree`]: parent-child links, per-node port remappings and scoped
//! subtree blackboards, ready for an external tick engine. A live tree can
//! be written back to XML with [`write_xml`].
//!
//! Concrete node behaviors are not part of this crate; callers implement
//! [`BehaviorNode`] and register constructors through [`Registry`].

mod blackboard;
mod context;
pub mod error;
mod parser;
mod port;
mod registry;
mod symbol;
mod tree;
mod writer;

use std::path::Path;

pub use crate::blackboard::{Blackboard, SharedBlackboard};
pub use crate::context::Context;
pub use crate::parser::{PackageResolver, TreeParser};
pub use crate::port::{
    parse_port_value, BlackboardValue, PortRemapping, PortSpec, PortType, TypeToken,
};
pub use crate::registry::{boxify, Manifest, NodeConstructor, Registry};
pub use crate::symbol::Symbol;
pub use crate::tree::{NodeConfig, NodeId, NodeKind, Tree, TreeNode};
pub use crate::writer::write_xml;

use crate::error::LoadError;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum BehaviorResult {
    Success,
    Fail,
    /// The node should keep running in the next tick
    Running,
}

/// Runtime behavior of a node, supplied by a registered constructor.
///
/// Scheduling of children is the tick engine's concern; the loader only
/// needs construction and the halt contract invoked on [`Tree`] teardown.
pub trait BehaviorNode {
    fn tick(&mut self, ctx: &mut Context) -> BehaviorResult;

    /// Called when the tree is torn down while this node may be running.
    fn halt(&mut self) {}
}

/// Parse `text`, validate it and instantiate the main tree in one call.
pub fn build_tree_from_text(
    registry: &Registry,
    text: &str,
    blackboard: &SharedBlackboard,
) -> Result<Tree, LoadError> {
    let mut parser = TreeParser::new(registry);
    parser.load_from_text(text)?;
    parser.instantiate(blackboard)
}

/// Same as [`build_tree_from_text`], reading the definition from a file.
pub fn build_tree_from_file(
    registry: &Registry,
    filename: impl AsRef<Path>,
    blackboard: &SharedBlackboard,
) -> Result<Tree, LoadError> {
    let mut parser = TreeParser::new(registry);
    parser.load_from_file(filename)?;
    parser.instantiate(blackboard)
}
