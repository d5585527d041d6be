use std::fmt::{self, Display, Formatter};

use crate::{
    blackboard::SharedBlackboard,
    error::{AddChildError, AddChildResult},
    port::PortRemapping,
    BehaviorNode, BehaviorResult, Context,
};

/// Kind tag of a node, matching the XML element vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Action,
    Condition,
    Control,
    Decorator,
    SubTree,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "Action",
            Self::Condition => "Condition",
            Self::Control => "Control",
            Self::Decorator => "Decorator",
            Self::SubTree => "SubTree",
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

/// Handle of a node inside [`Tree::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(pub(crate) usize);

/// Per-instance construction data handed to a node builder.
pub struct NodeConfig {
    pub blackboard: SharedBlackboard,
    pub input_ports: PortRemapping,
    pub output_ports: PortRemapping,
}

impl NodeConfig {
    pub fn new(blackboard: SharedBlackboard) -> Self {
        Self {
            blackboard,
            input_ports: PortRemapping::default(),
            output_ports: PortRemapping::default(),
        }
    }
}

/// Child links of a node. The variant is fixed by the node's kind; the
/// tree, not the node, owns the children.
enum NodeLinks {
    Children(Vec<NodeId>),
    Child(Option<NodeId>),
    Leaf,
}

pub struct TreeNode {
    instance_name: String,
    registration_id: String,
    kind: NodeKind,
    config: NodeConfig,
    runtime: Box<dyn BehaviorNode>,
    links: NodeLinks,
}

impl TreeNode {
    pub(crate) fn new(
        instance_name: &str,
        registration_id: &str,
        kind: NodeKind,
        runtime: Box<dyn BehaviorNode>,
        config: NodeConfig,
    ) -> Self {
        let links = match kind {
            NodeKind::Control => NodeLinks::Children(Vec::new()),
            NodeKind::Decorator | NodeKind::SubTree => NodeLinks::Child(None),
            NodeKind::Action | NodeKind::Condition => NodeLinks::Leaf,
        };
        Self {
            instance_name: instance_name.to_string(),
            registration_id: registration_id.to_string(),
            kind,
            config,
            runtime,
            links,
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn registration_id(&self) -> &str {
        &self.registration_id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Children of a Control node, in declaration order.
    pub fn children(&self) -> &[NodeId] {
        match &self.links {
            NodeLinks::Children(children) => children,
            _ => &[],
        }
    }

    /// The single child of a Decorator or SubTree node.
    pub fn child(&self) -> Option<NodeId> {
        match self.links {
            NodeLinks::Child(child) => child,
            _ => None,
        }
    }

    pub(crate) fn attach_child(&mut self, child: NodeId) -> AddChildResult {
        match &mut self.links {
            NodeLinks::Children(children) => {
                children.push(child);
                Ok(())
            }
            NodeLinks::Child(slot) => {
                if slot.is_some() {
                    return Err(AddChildError::TooManyNodes);
                }
                *slot = Some(child);
                Ok(())
            }
            NodeLinks::Leaf => Err(AddChildError::TooManyNodes),
        }
    }

    /// Tick entry point used by an external engine.
    pub fn execute_tick(&mut self) -> BehaviorResult {
        let mut ctx = Context::new(&self.config);
        self.runtime.tick(&mut ctx)
    }

    pub fn halt(&mut self) {
        self.runtime.halt();
    }
}

/// A fully wired behavior tree. Nodes are stored in construction
/// (pre-order) order, so `nodes[0]` is the root; parent-child links are
/// [`NodeId`] handles into the same sequence.
pub struct Tree {
    pub(crate) nodes: Vec<TreeNode>,
    pub(crate) blackboard_stack: Vec<SharedBlackboard>,
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl Tree {
    pub fn root(&self) -> Option<&TreeNode> {
        self.nodes.first()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.0]
    }

    /// Blackboard scopes of this tree; index 0 is the root scope, each
    /// further entry corresponds to one subtree expansion in document
    /// order.
    pub fn blackboard_stack(&self) -> &[SharedBlackboard] {
        &self.blackboard_stack
    }
}

impl Drop for Tree {
    fn drop(&mut self) {
        for node in &mut self.nodes {
            node.halt();
        }
    }
}
