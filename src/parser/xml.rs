//! Owned XML document model.
//!
//! `roxmltree` borrows from the source text, but a parse session owns an
//! arbitrary number of documents pulled in through `<include>` chains, so
//! every document is re-rooted into an owned element tree annotated with
//! source line numbers.

use crate::error::LoadError;

#[derive(Debug)]
pub(crate) struct XmlDocument {
    pub(crate) root: XmlElement,
}

#[derive(Debug)]
pub(crate) struct XmlElement {
    pub(crate) name: String,
    /// Attributes in document order.
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) children: Vec<XmlElement>,
    /// 1-based line of the element's start tag.
    pub(crate) line: u32,
}

impl XmlDocument {
    pub(crate) fn parse(text: &str) -> Result<Self, LoadError> {
        let document = roxmltree::Document::parse(text)?;
        Ok(Self {
            root: convert(&document, document.root_element()),
        })
    }
}

impl XmlElement {
    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.name == name)
    }
}

fn convert(document: &roxmltree::Document, node: roxmltree::Node) -> XmlElement {
    XmlElement {
        name: node.tag_name().name().to_string(),
        attributes: node
            .attributes()
            .map(|attr| (attr.name().to_string(), attr.value().to_string()))
            .collect(),
        children: node
            .children()
            .filter(|child| child.is_element())
            .map(|child| convert(document, child))
            .collect(),
        line: document.text_pos_at(node.range().start).row,
    }
}
