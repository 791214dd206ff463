//! Class representations built from a sources jar or a compiled class.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::classfile::parse_class_file;
use crate::probe::read_entry;
use crate::repository::{class_name_to_class_path, class_name_to_source_path};
use crate::structure::{SourceMembers, parse_nested_members};
use crate::synth::synthesize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    /// `None` for constructors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub parameters: Vec<String>,
    pub modifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: String,
    pub modifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRepresentation {
    pub class_name: String,
    pub simple_name: String,
    pub package_name: String,
    pub source: Option<String>,
    pub methods: Vec<MethodInfo>,
    pub fields: Vec<FieldInfo>,
    pub archive_path: PathBuf,
    pub is_from_sources: bool,
}

impl ClassRepresentation {
    fn empty(class_name: &str, archive_path: &Path) -> Self {
        let (package_name, simple_name) = split_class_name(class_name);
        Self {
            class_name: class_name.to_string(),
            simple_name,
            package_name,
            source: None,
            methods: Vec::new(),
            fields: Vec::new(),
            archive_path: archive_path.to_path_buf(),
            is_from_sources: false,
        }
    }
}

/// Prefers the `.java` entry of the sources jar; otherwise decodes the
/// `.class` entry of the primary jar. Never fails: an unreadable archive or a
/// corrupt class yields a representation without source or members.
pub fn extract(
    class_name: &str,
    archive_path: &Path,
    sources_path: Option<&Path>,
) -> ClassRepresentation {
    if let Some(sources) = sources_path.filter(|p| p.is_file())
        && let Some(text) = read_source_text(class_name, sources)
        && let Some(members) = source_members(class_name, &text)
    {
        return ClassRepresentation {
            source: Some(text),
            methods: members.methods,
            fields: members.fields,
            is_from_sources: true,
            ..ClassRepresentation::empty(class_name, sources)
        };
    }

    let mut repr = ClassRepresentation::empty(class_name, archive_path);
    let class_path = class_name_to_class_path(class_name);
    let bytes = match read_entry(archive_path, &class_path) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            debug!(class = class_name, jar = %archive_path.display(), "class entry not found");
            return repr;
        }
        Err(e) => {
            debug!(jar = %archive_path.display(), error = %e, "archive unreadable");
            return repr;
        }
    };

    match parse_class_file(&bytes) {
        Ok(class) => {
            let synthesized = synthesize(&class);
            repr.simple_name = class.simple_name().to_string();
            repr.package_name = class.package_name().to_string();
            repr.source = Some(synthesized.source);
            repr.methods = synthesized.methods;
            repr.fields = synthesized.fields;
        }
        Err(e) => {
            debug!(class = class_name, error = %e, "class file could not be decoded");
        }
    }
    repr
}

fn read_source_text(class_name: &str, sources: &Path) -> Option<String> {
    let entry = class_name_to_source_path(class_name);
    match read_entry(sources, &entry) {
        Ok(Some(bytes)) => {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            (!text.trim().is_empty()).then_some(text)
        }
        Ok(None) => None,
        Err(e) => {
            debug!(jar = %sources.display(), error = %e, "sources jar unreadable");
            None
        }
    }
}

/// Members of the type `class_name` names within its top-level source file.
/// `a.Outer$Inner` reads the body of `Inner` declared inside `Outer`; `None`
/// when that declaration is not in the text (anonymous and local classes).
fn source_members(class_name: &str, text: &str) -> Option<SourceMembers> {
    let (_, simple) = split_class_name(class_name);
    let nested: Vec<&str> = simple.split('$').skip(1).collect();
    let members = parse_nested_members(text, &nested);
    if members.is_none() {
        debug!(class = class_name, "nested type not found in source, decoding class file");
    }
    members
}

/// `a.b.C` -> (`a.b`, `C`).
pub fn split_class_name(class_name: &str) -> (String, String) {
    match class_name.rsplit_once('.') {
        Some((pkg, simple)) => (pkg.to_string(), simple.to_string()),
        None => (String::new(), class_name.to_string()),
    }
}
