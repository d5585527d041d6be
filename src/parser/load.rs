use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::instantiate;
use super::validate;
use super::xml::{XmlDocument, XmlElement};
use crate::{
    blackboard::SharedBlackboard, error::LoadError, registry::Registry, tree::Tree,
};

/// Resolves a package name to its root directory, for `<include>` elements
/// carrying a `ros_pkg` attribute.
pub type PackageResolver = Box<dyn Fn(&str) -> Option<PathBuf>>;

/// Reference to a `<BehaviorTree>` element: document index and position
/// among the document root's children.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ElementRef {
    doc: usize,
    child: usize,
}

struct IncludeSpec {
    path: String,
    package: Option<String>,
}

/// A parse session. Owns every document opened by `load_*` calls, resolves
/// `<include>` chains and indexes declared tree IDs; [`TreeParser::instantiate`]
/// turns the indexed definitions into a wired [`Tree`].
///
/// Not reentrant: one parser instance serves one sequence of loads followed
/// by any number of instantiations.
pub struct TreeParser<'r> {
    registry: &'r Registry,
    documents: Vec<XmlDocument>,
    tree_roots: HashMap<String, ElementRef>,
    current_path: PathBuf,
    suffix_count: usize,
    package_resolver: Option<PackageResolver>,
}

impl<'r> TreeParser<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            documents: Vec::new(),
            tree_roots: HashMap::new(),
            current_path: env::current_dir().unwrap_or_default(),
            suffix_count: 0,
            package_resolver: None,
        }
    }

    /// Install a resolver for the `ros_pkg` attribute of `<include>`.
    pub fn with_package_resolver(mut self, resolver: PackageResolver) -> Self {
        self.package_resolver = Some(resolver);
        self
    }

    pub fn load_from_file(&mut self, filename: impl AsRef<Path>) -> Result<(), LoadError> {
        let filename = filename.as_ref();
        let text = fs::read_to_string(filename)?;
        self.update_current_path(filename);
        self.load_document(&text)
    }

    pub fn load_from_text(&mut self, text: &str) -> Result<(), LoadError> {
        self.load_document(text)
    }

    /// IDs of every tree declared across the loaded documents. Trees
    /// without an `ID` attribute get a generated `BehaviorTree_<n>` name.
    pub fn tree_ids(&self) -> impl Iterator<Item = &str> {
        self.tree_roots.keys().map(String::as_str)
    }

    /// Instantiate the main tree with `root_blackboard` as the outermost
    /// scope.
    pub fn instantiate(&self, root_blackboard: &SharedBlackboard) -> Result<Tree, LoadError> {
        let main_tree_id = self.main_tree_id()?;
        instantiate::build_tree(self, &main_tree_id, root_blackboard)
    }

    fn load_document(&mut self, text: &str) -> Result<(), LoadError> {
        let document = XmlDocument::parse(text)?;
        let doc_index = self.documents.len();
        self.documents.push(document);

        // Includes are resolved depth-first, before this document's trees
        // are indexed and validated.
        let includes = self.collect_includes(doc_index)?;
        for include in includes {
            let path = self.resolve_include_path(&include)?;
            let text = fs::read_to_string(&path)?;
            self.update_current_path(&path);
            self.load_document(&text)?;
        }

        let tree_elements: Vec<(usize, Option<String>)> = self.documents[doc_index]
            .root
            .children
            .iter()
            .enumerate()
            .filter(|(_, child)| child.name == "BehaviorTree")
            .map(|(child, element)| (child, element.attribute("ID").map(str::to_string)))
            .collect();
        for (child, id) in tree_elements {
            let tree_name = id.unwrap_or_else(|| {
                let name = format!("BehaviorTree_{}", self.suffix_count);
                self.suffix_count += 1;
                name
            });
            self.tree_roots.insert(
                tree_name,
                ElementRef {
                    doc: doc_index,
                    child,
                },
            );
        }

        validate::verify_document(&self.documents[doc_index], self.registry, &self.tree_roots)
    }

    fn collect_includes(&self, doc_index: usize) -> Result<Vec<IncludeSpec>, LoadError> {
        self.documents[doc_index]
            .root
            .children_named("include")
            .map(|element| {
                let path = element.attribute("path").ok_or_else(|| LoadError::Schema {
                    line: Some(element.line),
                    message: "The node <include> must have the attribute [path]".to_string(),
                })?;
                Ok(IncludeSpec {
                    path: path.to_string(),
                    package: element.attribute("ros_pkg").map(str::to_string),
                })
            })
            .collect()
    }

    fn resolve_include_path(&self, include: &IncludeSpec) -> Result<PathBuf, LoadError> {
        let mut path = PathBuf::from(&include.path);
        if let Some(package) = &include.package {
            if path.is_absolute() {
                tracing::warn!(
                    "<include path=\"...\"> contains an absolute path, attribute [ros_pkg] will be ignored"
                );
            } else {
                let resolver = self.package_resolver.as_ref().ok_or_else(|| {
                    LoadError::Configuration(
                        "Using attribute [ros_pkg] in <include>, but no package resolver \
                         is available"
                            .to_string(),
                    )
                })?;
                let package_root = resolver(package).ok_or_else(|| {
                    LoadError::Configuration(format!("Package [{}] could not be resolved", package))
                })?;
                path = package_root.join(path);
            }
        }
        if !path.is_absolute() {
            path = self.current_path.join(path);
        }
        Ok(path)
    }

    fn update_current_path(&mut self, loaded: &Path) {
        let absolute = fs::canonicalize(loaded).unwrap_or_else(|_| loaded.to_path_buf());
        if let Some(parent) = absolute.parent() {
            self.current_path = parent.to_path_buf();
        }
    }

    fn main_tree_id(&self) -> Result<String, LoadError> {
        let primary = self
            .documents
            .first()
            .ok_or_else(|| LoadError::Usage("No behavior tree was loaded".to_string()))?;
        if let Some(id) = primary.root.attribute("main_tree_to_execute") {
            return Ok(id.to_string());
        }
        let mut ids = self.tree_roots.keys();
        match (ids.next(), ids.next()) {
            (Some(id), None) => Ok(id.clone()),
            _ => Err(LoadError::Usage(
                "[main_tree_to_execute] was not specified correctly".to_string(),
            )),
        }
    }

    pub(crate) fn tree_root(&self, id: &str) -> Option<&XmlElement> {
        let element_ref = self.tree_roots.get(id)?;
        self.documents
            .get(element_ref.doc)?
            .root
            .children
            .get(element_ref.child)
    }

    pub(crate) fn has_tree(&self, id: &str) -> bool {
        self.tree_roots.contains_key(id)
    }

    pub(crate) fn registry(&self) -> &Registry {
        self.registry
    }
}
