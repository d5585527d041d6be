//! Scoped key-value storage shared by the nodes of a tree.
//!
//! Each subtree expansion gets its own child blackboard; keys listed in the
//! subtree's `<remap>` entries are redirected to the enclosing scope, all
//! other keys stay local.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::{port::TypeToken, Symbol};

pub type SharedBlackboard = Rc<RefCell<Blackboard>>;

#[derive(Default)]
pub struct Blackboard {
    values: HashMap<Symbol, Box<dyn Any>>,
    port_types: HashMap<Symbol, TypeToken>,
    parent: Option<SharedBlackboard>,
    remapping: HashMap<Symbol, Symbol>,
}

impl Blackboard {
    pub fn new_shared() -> SharedBlackboard {
        Rc::new(RefCell::new(Self::default()))
    }

    /// A new scope whose unremapped keys are local.
    pub fn create_child(parent: &SharedBlackboard) -> SharedBlackboard {
        Rc::new(RefCell::new(Self {
            parent: Some(parent.clone()),
            ..Default::default()
        }))
    }

    /// Redirect reads and writes of `internal` to `external` in the parent
    /// scope.
    pub fn add_subtree_remapping(&mut self, internal: impl Into<Symbol>, external: impl Into<Symbol>) {
        self.remapping.insert(internal.into(), external.into());
    }

    pub fn get<T: Clone + 'static>(bb: &SharedBlackboard, key: impl Into<Symbol>) -> Option<T> {
        let (bb, key) = Self::resolve(bb, key.into());
        let value = bb
            .borrow()
            .values
            .get(&key)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned();
        value
    }

    pub fn set<T: 'static>(bb: &SharedBlackboard, key: impl Into<Symbol>, value: T) {
        let (bb, key) = Self::resolve(bb, key.into());
        bb.borrow_mut().values.insert(key, Box::new(value));
    }

    /// The type previously registered for `key`, if any.
    pub fn port_type(bb: &SharedBlackboard, key: impl Into<Symbol>) -> Option<TypeToken> {
        let (bb, key) = Self::resolve(bb, key.into());
        let token = bb.borrow().port_types.get(&key).copied();
        token
    }

    pub fn set_port_type(bb: &SharedBlackboard, key: impl Into<Symbol>, token: TypeToken) {
        let (bb, key) = Self::resolve(bb, key.into());
        bb.borrow_mut().port_types.insert(key, token);
    }

    /// Follow subtree remappings up the parent chain until the key is
    /// local.
    fn resolve(bb: &SharedBlackboard, key: Symbol) -> (SharedBlackboard, Symbol) {
        let redirected = {
            let inner = bb.borrow();
            match (inner.remapping.get(&key), &inner.parent) {
                (Some(external), Some(parent)) => Some((parent.clone(), *external)),
                _ => None,
            }
        };
        match redirected {
            Some((parent, external)) => Self::resolve(&parent, external),
            None => (bb.clone(), key),
        }
    }
}
