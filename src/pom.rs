//! `pom.xml` parsing into a plain project tree.
//!
//! Nothing here interpolates or inherits; values are kept exactly as written
//! (trimmed) so the resolver can apply the right context later.

use roxmltree::{Document, Node};
use std::path::Path;
use thiserror::Error;

use crate::coordinate::Exclusion;
use crate::error::{FinderError, FinderResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentRef {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub relative_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDependency {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub classifier: Option<String>,
    pub kind: Option<String>,
    pub optional: Option<String>,
    pub exclusions: Vec<Exclusion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<ParentRef>,
    pub properties: Vec<(String, String)>,
    pub dependency_management: Vec<RawDependency>,
    pub dependencies: Vec<RawDependency>,
}

#[derive(Debug, Error)]
pub enum PomError {
    #[error("unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Xml(#[from] roxmltree::Error),

    #[error("expected <project> root element, found <{0}>")]
    UnexpectedRoot(String),
}

pub fn read_pom(path: &Path) -> FinderResult<Pom> {
    let pom = std::fs::read_to_string(path)
        .map_err(PomError::from)
        .and_then(|text| parse_pom(&text));
    pom.map_err(|e| FinderError::parse(path, e.to_string()))
}

pub fn parse_pom(text: &str) -> Result<Pom, PomError> {
    let doc = Document::parse(text)?;
    let project = doc.root_element();
    if project.tag_name().name() != "project" {
        return Err(PomError::UnexpectedRoot(
            project.tag_name().name().to_string(),
        ));
    }

    let parent = child(project, "parent").map(|p| ParentRef {
        group_id: child_text(p, "groupId"),
        artifact_id: child_text(p, "artifactId"),
        version: child_text(p, "version"),
        relative_path: child_text(p, "relativePath"),
    });

    let properties = child(project, "properties")
        .map(|props| {
            elements(props)
                .map(|p| {
                    let value = p.text().map(str::trim).unwrap_or_default();
                    (p.tag_name().name().to_string(), value.to_string())
                })
                .collect()
        })
        .unwrap_or_default();

    let dependency_management = child(project, "dependencyManagement")
        .and_then(|dm| child(dm, "dependencies"))
        .map(parse_dependencies)
        .unwrap_or_default();

    let dependencies = child(project, "dependencies")
        .map(parse_dependencies)
        .unwrap_or_default();

    Ok(Pom {
        group_id: child_text(project, "groupId"),
        artifact_id: child_text(project, "artifactId"),
        version: child_text(project, "version"),
        packaging: child_text(project, "packaging"),
        parent,
        properties,
        dependency_management,
        dependencies,
    })
}

fn parse_dependencies(deps: Node<'_, '_>) -> Vec<RawDependency> {
    elements(deps)
        .filter(|d| d.tag_name().name() == "dependency")
        .map(|d| RawDependency {
            group_id: child_text(d, "groupId"),
            artifact_id: child_text(d, "artifactId"),
            version: child_text(d, "version"),
            scope: child_text(d, "scope"),
            classifier: child_text(d, "classifier"),
            kind: child_text(d, "type"),
            optional: child_text(d, "optional"),
            exclusions: child(d, "exclusions")
                .map(|ex| {
                    elements(ex)
                        .filter(|e| e.tag_name().name() == "exclusion")
                        .map(|e| {
                            Exclusion::new(
                                child_text(e, "groupId").unwrap_or_else(|| "*".to_string()),
                                child_text(e, "artifactId").unwrap_or_else(|| "*".to_string()),
                            )
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.tag_name().name() == name)
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
