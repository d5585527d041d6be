use std::any::Any;
use std::str::FromStr;

use crate::{
    blackboard::Blackboard,
    port::{parse_port_value, BlackboardValue},
    tree::NodeConfig,
    Symbol,
};

/// Tick-time access to a node's ports.
///
/// Input values of the form `{key}` read through the node's blackboard
/// scope, anything else is handed back as a literal. A port with no
/// remapping falls back to the port name as a blackboard key.
pub struct Context<'a> {
    config: &'a NodeConfig,
}

impl<'a> Context<'a> {
    pub(crate) fn new(config: &'a NodeConfig) -> Self {
        Self { config }
    }

    pub fn get<T: Clone + 'static>(&self, port: impl Into<Symbol>) -> Option<T> {
        let port = port.into();
        match self.config.input_ports.get(port) {
            None => Blackboard::get(&self.config.blackboard, port),
            Some(value) => match parse_port_value(value) {
                BlackboardValue::Ref(key) => Blackboard::get(&self.config.blackboard, key),
                BlackboardValue::Literal(literal) => {
                    (&literal as &dyn Any).downcast_ref::<T>().cloned()
                }
            },
        }
    }

    /// Convenience method to get raw primitive types such as f64 or parse
    /// them from a literal string.
    pub fn get_parse<F>(&self, port: impl Into<Symbol> + Copy) -> Option<F>
    where
        F: FromStr + Clone + 'static,
    {
        self.get::<F>(port)
            .or_else(|| self.get::<String>(port).and_then(|value| value.parse().ok()))
    }

    pub fn set<T: 'static>(&mut self, port: impl Into<Symbol>, value: T) {
        let port = port.into();
        match self.config.output_ports.get(port) {
            None => Blackboard::set(&self.config.blackboard, port, value),
            Some(mapped) => match parse_port_value(mapped) {
                BlackboardValue::Ref(key) => Blackboard::set(&self.config.blackboard, key, value),
                BlackboardValue::Literal(_) => panic!("Cannot write to a literal!"),
            },
        }
    }
}
