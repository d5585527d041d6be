use std::fmt::{self, Display, Formatter};

/// Violation of a parent node's child-attachment contract.
#[derive(Debug)]
#[non_exhaustive]
pub enum AddChildError {
    TooManyNodes,
}

impl Display for AddChildError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::TooManyNodes => write!(fmt, "Attempted to add too many nodes"),
        }
    }
}

impl std::error::Error for AddChildError {}

pub type AddChildResult = Result<(), AddChildError>;

/// Any failure while loading, validating or instantiating a tree
/// definition.
#[derive(Debug)]
#[non_exhaustive]
pub enum LoadError {
    Io(std::io::Error),
    XmlSyntax(roxmltree::Error),
    Schema {
        line: Option<u32>,
        message: String,
    },
    Configuration(String),
    /// An element refers to a name that is neither a registered node nor a
    /// declared tree.
    MissingNode {
        name: String,
        line: Option<u32>,
    },
    /// A remapping attribute does not match any port of the node's manifest.
    PortUnmatch {
        node: String,
        instance: String,
        port: String,
    },
    /// The same blackboard key was used with two different port types.
    PortTypeMismatch {
        key: String,
        previous: &'static str,
        requested: &'static str,
    },
    Usage(String),
    AddChild(AddChildError, String),
}

impl Display for LoadError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Io(e) => write!(fmt, "Error loading the XML file: {}", e),
            Self::XmlSyntax(e) => write!(fmt, "Error parsing the XML: {}", e),
            Self::Schema {
                line: Some(line),
                message,
            } => write!(fmt, "Error at line {}: -> {}", line, message),
            Self::Schema {
                line: None,
                message,
            } => fmt.write_str(message),
            Self::Configuration(message) => fmt.write_str(message),
            Self::MissingNode {
                name,
                line: Some(line),
            } => write!(fmt, "Error at line {}: -> Node not recognized: {}", line, name),
            Self::MissingNode { name, line: None } => {
                write!(fmt, "{} is not a registered node, nor a Subtree", name)
            }
            Self::PortUnmatch {
                node,
                instance,
                port,
            } => write!(
                fmt,
                "Possible typo. In the XML, you specified the port [{}] for node \
                 [{} / {}], but the manifest of this node does not contain a port \
                 with this name.",
                port, node, instance
            ),
            Self::PortTypeMismatch {
                key,
                previous,
                requested,
            } => write!(
                fmt,
                "The creation of the tree failed because the port [{}] was \
                 initially created with type [{}] and, later, type [{}] was used \
                 somewhere else.",
                key, previous, requested
            ),
            Self::Usage(message) => fmt.write_str(message),
            Self::AddChild(e, node) => {
                e.fmt(fmt)?;
                write!(fmt, " to {}", node)
            }
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<roxmltree::Error> for LoadError {
    fn from(err: roxmltree::Error) -> Self {
        Self::XmlSyntax(err)
    }
}

/// Failure while serializing a tree back to XML.
#[derive(Debug)]
#[non_exhaustive]
pub enum WriteError {
    Xml(quick_xml::Error),
}

impl Display for WriteError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Xml(e) => write!(fmt, "Error writing the XML: {}", e),
        }
    }
}

impl std::error::Error for WriteError {}

impl From<quick_xml::Error> for WriteError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err)
    }
}
