use std::collections::{HashMap, HashSet};

use crate::{
    port::PortSpec,
    tree::{NodeConfig, NodeKind, TreeNode},
    BehaviorNode, Symbol,
};

/// Declared signature of a node kind: registration ID, kind tag and port
/// specs. Port names are unique within a manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub registration_id: String,
    pub kind: NodeKind,
    ports: Vec<(Symbol, PortSpec)>,
}

impl Manifest {
    pub fn new(registration_id: impl ToString, kind: NodeKind) -> Self {
        Self {
            registration_id: registration_id.to_string(),
            kind,
            ports: Vec::new(),
        }
    }

    pub fn port(mut self, name: impl Into<Symbol>, spec: PortSpec) -> Self {
        let name = name.into();
        match self.ports.iter_mut().find(|(port, _)| *port == name) {
            Some(entry) => entry.1 = spec,
            None => self.ports.push((name, spec)),
        }
        self
    }

    pub fn port_spec(&self, name: Symbol) -> Option<&PortSpec> {
        self.ports
            .iter()
            .find(|(port, _)| *port == name)
            .map(|(_, spec)| spec)
    }

    /// Ports in declaration order.
    pub fn ports(&self) -> impl Iterator<Item = (Symbol, &PortSpec)> {
        self.ports.iter().map(|(name, spec)| (*name, spec))
    }
}

pub type NodeConstructor = Box<dyn Fn() -> Box<dyn BehaviorNode>>;

pub fn boxify<T>(cons: impl (Fn() -> T) + 'static) -> NodeConstructor
where
    T: BehaviorNode + 'static,
{
    Box::new(move || Box::new(cons()))
}

/// Registry of node builders and their manifests, consulted during
/// validation and instantiation. Ships empty; callers register the node
/// vocabulary of their engine.
#[derive(Default)]
pub struct Registry {
    builders: HashMap<String, NodeConstructor>,
    manifests: HashMap<String, Manifest>,
    builtins: HashSet<String>,
}

impl Registry {
    pub fn register(&mut self, manifest: Manifest, constructor: NodeConstructor) {
        let id = manifest.registration_id.clone();
        self.builders.insert(id.clone(), constructor);
        self.manifests.insert(id, manifest);
    }

    /// Same as [`Registry::register`], additionally marking the ID as
    /// built-in so the writer leaves it out of `<TreeNodesModel>`.
    pub fn register_builtin(&mut self, manifest: Manifest, constructor: NodeConstructor) {
        self.builtins.insert(manifest.registration_id.clone());
        self.register(manifest, constructor);
    }

    pub fn has_builder(&self, id: &str) -> bool {
        self.builders.contains_key(id)
    }

    pub fn manifest(&self, id: &str) -> Option<&Manifest> {
        self.manifests.get(id)
    }

    pub fn manifests(&self) -> impl Iterator<Item = &Manifest> {
        self.manifests.values()
    }

    pub fn is_builtin(&self, id: &str) -> bool {
        self.builtins.contains(id)
    }

    /// Build a node instance, assembling kind and child links from the
    /// manifest. Returns `None` for an unregistered ID.
    pub fn instantiate(
        &self,
        instance_name: &str,
        id: &str,
        config: NodeConfig,
    ) -> Option<TreeNode> {
        let constructor = self.builders.get(id)?;
        let manifest = self.manifests.get(id)?;
        Some(TreeNode::new(
            instance_name,
            id,
            manifest.kind,
            constructor(),
            config,
        ))
    }
}
