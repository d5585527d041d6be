use std::any::{type_name, TypeId};

use nom::{
    bytes::complete::is_not, character::complete::char, combinator::all_consuming,
    sequence::delimited, IResult,
};

use crate::Symbol;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PortType {
    Input,
    Output,
    InOut,
}

/// Identity of a Rust type attached to a typed port. Two tokens compare
/// equal exactly when they refer to the same type.
#[derive(Debug, Clone, Copy, Eq)]
pub struct TypeToken {
    id: TypeId,
    name: &'static str,
}

impl TypeToken {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Declared direction and optional value type of a single port.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct PortSpec {
    pub ty: PortType,
    pub type_token: Option<TypeToken>,
}

impl PortSpec {
    pub fn new_in() -> Self {
        Self {
            ty: PortType::Input,
            type_token: None,
        }
    }

    pub fn new_out() -> Self {
        Self {
            ty: PortType::Output,
            type_token: None,
        }
    }

    pub fn new_inout() -> Self {
        Self {
            ty: PortType::InOut,
            type_token: None,
        }
    }

    /// Declare the port's value type, enabling consistency checks across
    /// every use of the same blackboard key.
    pub fn typed<T: 'static>(mut self) -> Self {
        self.type_token = Some(TypeToken::of::<T>());
        self
    }
}

/// A decoded remapping value: either a reference to a blackboard key or a
/// literal string.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BlackboardValue {
    Ref(Symbol),
    Literal(String),
}

fn blackboard_ref(i: &str) -> IResult<&str, &str> {
    all_consuming(delimited(char('{'), is_not("{}"), char('}')))(i)
}

/// Interpret an XML attribute value: `{key}` denotes a blackboard key,
/// anything else is a literal.
pub fn parse_port_value(value: &str) -> BlackboardValue {
    match blackboard_ref(value) {
        Ok((_, key)) => BlackboardValue::Ref(key.into()),
        Err(_) => BlackboardValue::Literal(value.to_owned()),
    }
}

/// Port-name to attribute-value pairs of one node instance, in XML
/// attribute order.
#[derive(Debug, Default, Clone)]
pub struct PortRemapping {
    entries: Vec<(Symbol, String)>,
}

impl PortRemapping {
    pub fn insert(&mut self, port: Symbol, value: String) {
        match self.entries.iter_mut().find(|(name, _)| *name == port) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((port, value)),
        }
    }

    pub fn get(&self, port: Symbol) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| *name == port)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> {
        self.entries
            .iter()
            .map(|(port, value)| (*port, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
