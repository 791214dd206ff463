//! JSON tool calls over a [`ClassFinder`].

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::path::Path;

use crate::coordinate::{Coordinate, Scope};
use crate::error::{FinderError, FinderResult};
use crate::finder::ClassFinder;
use crate::resolver::ResolveOptions;

pub const TOOL_NAMES: [&str; 5] = [
    "resolve_dependencies",
    "find_class",
    "search_classes",
    "extract_class",
    "locate_archive",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    MissingArgument,
    NotFound,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub status: ToolStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResponse {
    fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            status: ToolStatus::Ok,
            message: message.into(),
            data: Some(data),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::NotFound,
            message: message.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            message: message.into(),
            data: None,
        }
    }
}

impl From<FinderError> for ToolResponse {
    fn from(err: FinderError) -> Self {
        let status = match err {
            FinderError::MissingArgument { .. } => ToolStatus::MissingArgument,
            _ => ToolStatus::Error,
        };
        Self {
            status,
            // `{:#}` keeps the context chain on one line.
            message: format!("{err:#}"),
            data: None,
        }
    }
}

/// A single JSON-lines request: `{"tool": "...", "arguments": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

pub fn dispatch(finder: &ClassFinder, tool: &str, arguments: &Value) -> ToolResponse {
    let outcome = match tool {
        "resolve_dependencies" => resolve_dependencies(finder, arguments),
        "find_class" => find_class(finder, arguments),
        "search_classes" => search_classes(finder, arguments),
        "extract_class" => extract_class(finder, arguments),
        "locate_archive" => locate_archive(finder, arguments),
        other => {
            return ToolResponse::error(format!(
                "unknown tool: {other} (expected one of {})",
                TOOL_NAMES.join(", ")
            ));
        }
    };
    outcome.unwrap_or_else(ToolResponse::from)
}

fn resolve_dependencies(finder: &ClassFinder, args: &Value) -> FinderResult<ToolResponse> {
    let pom_path = Path::new(required(args, "pomPath")?);
    let options = resolve_options(args);
    let coordinates = finder.resolve_dependencies(Some(pom_path), &options)?;
    Ok(ToolResponse::ok(
        format!("resolved {} dependencies", coordinates.len()),
        json!({ "dependencies": coordinates }),
    ))
}

fn find_class(finder: &ClassFinder, args: &Value) -> FinderResult<ToolResponse> {
    let class_name = required(args, "className")?;
    let pom_path = Path::new(required(args, "pomPath")?);
    let options = resolve_options(args);

    match finder.lookup_class(class_name, Some(pom_path), &options)? {
        Some(found) => Ok(ToolResponse::ok(
            format!("found {class_name} in {}", found.location.coordinate),
            to_value(&found)?,
        )),
        None => Ok(ToolResponse::not_found(format!(
            "class {class_name} not found in dependencies"
        ))),
    }
}

fn search_classes(finder: &ClassFinder, args: &Value) -> FinderResult<ToolResponse> {
    let archive_path = Path::new(required(args, "archivePath")?);
    let pattern = required(args, "pattern")?;
    let classes = finder.search_classes(archive_path, pattern)?;
    Ok(ToolResponse::ok(
        format!("{} classes match {pattern}", classes.len()),
        json!({ "classes": classes }),
    ))
}

fn extract_class(finder: &ClassFinder, args: &Value) -> FinderResult<ToolResponse> {
    let class_name = required(args, "className")?;
    let archive_path = Path::new(required(args, "archivePath")?);
    let sources_path = optional(args, "sourceArchivePath").map(Path::new);

    let repr = finder.extract_class(class_name, archive_path, sources_path);
    if repr.source.is_none() {
        return Ok(ToolResponse::not_found(format!(
            "class {class_name} not found in {}",
            archive_path.display()
        )));
    }
    let origin = if repr.is_from_sources { "sources" } else { "class file" };
    Ok(ToolResponse::ok(
        format!("extracted {class_name} from {origin}"),
        to_value(repr.as_ref())?,
    ))
}

fn locate_archive(finder: &ClassFinder, args: &Value) -> FinderResult<ToolResponse> {
    let mut coordinate = Coordinate::new(
        required(args, "groupId")?,
        required(args, "artifactId")?,
        required(args, "version")?,
    );
    coordinate.classifier = optional(args, "classifier").map(str::to_string);

    match finder.locate_primary_archive(&coordinate) {
        Some(archive) => {
            let sources = finder.locate_source_archive(&coordinate);
            Ok(ToolResponse::ok(
                format!("located {coordinate}"),
                json!({ "archivePath": archive, "sourceArchivePath": sources }),
            ))
        }
        None => Ok(ToolResponse::not_found(format!(
            "no archive installed for {coordinate}"
        ))),
    }
}

/// A string argument; absent, `null` and blank all count as missing.
fn required<'a>(args: &'a Value, name: &str) -> FinderResult<&'a str> {
    optional(args, name).ok_or_else(|| FinderError::missing(name))
}

fn optional<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn resolve_options(args: &Value) -> ResolveOptions {
    let mut options = ResolveOptions::default();
    if let Some(transitive) = args.get("includeTransitive").and_then(Value::as_bool) {
        options.include_transitive = transitive;
    }
    if let Some(scopes) = args.get("scopes").and_then(Value::as_array) {
        let parsed: BTreeSet<Scope> = scopes
            .iter()
            .filter_map(Value::as_str)
            .map(Scope::parse)
            .collect();
        if !parsed.is_empty() {
            options.scopes = parsed;
        }
    }
    if let Some(depth) = args.get("maxDepth").and_then(Value::as_u64) {
        options.max_depth = u32::try_from(depth).unwrap_or(u32::MAX);
    }
    options
}

fn to_value<T: Serialize>(value: &T) -> FinderResult<Value> {
    serde_json::to_value(value).map_err(|e| FinderError::Internal(e.into()))
}
