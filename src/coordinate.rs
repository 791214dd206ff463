//! Dependency coordinates and the descriptor context they are resolved in.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Compile,
    Runtime,
    Test,
    Provided,
    System,
    Import,
}

impl Scope {
    /// Unknown scope strings are treated as compile, like Maven does.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "runtime" => Self::Runtime,
            "test" => Self::Test,
            "provided" => Self::Provided,
            "system" => Self::System,
            "import" => Self::Import,
            _ => Self::Compile,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Runtime => "runtime",
            Self::Test => "test",
            Self::Provided => "provided",
            Self::System => "system",
            Self::Import => "import",
        }
    }

    /// Whether dependencies declared with this scope are pulled into consumers.
    pub fn is_transitive(self) -> bool {
        matches!(self, Self::Compile | Self::Runtime)
    }

    /// Scope of a transitive dependency reached through a parent of scope `self`.
    pub fn propagate(self, child: Scope) -> Scope {
        match (self, child) {
            (Self::Runtime, Self::Compile) => Self::Runtime,
            (Self::Compile, c) => c,
            (s, _) => s,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    pub fn matches(&self, group_id: &str, artifact_id: &str) -> bool {
        (self.group_id == "*" || self.group_id == group_id)
            && (self.artifact_id == "*" || self.artifact_id == artifact_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Exclusion>,
    #[serde(default)]
    pub depth: u32,
}

impl Coordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            scope: None,
            classifier: None,
            optional: false,
            exclusions: Vec::new(),
            depth: 0,
        }
    }

    /// `group:artifact`; versions never take part in identity.
    pub fn identity(&self) -> String {
        identity_key(&self.group_id, &self.artifact_id)
    }

    pub fn effective_scope(&self) -> Scope {
        self.scope.unwrap_or(Scope::Compile)
    }

    pub fn is_excluded_by(&self, exclusions: &[Exclusion]) -> bool {
        exclusions
            .iter()
            .any(|e| e.matches(&self.group_id, &self.artifact_id))
    }

    pub fn with_depth(&self, depth: u32) -> Self {
        Self {
            depth,
            ..self.clone()
        }
    }

    pub fn with_scope(&self, scope: Scope) -> Self {
        Self {
            scope: Some(scope),
            ..self.clone()
        }
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(classifier) = self.classifier.as_deref() {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}

pub fn identity_key(group_id: &str, artifact_id: &str) -> String {
    format!("{group_id}:{artifact_id}")
}

/// A `dependencyManagement` row, kept uninterpolated so the consuming
/// descriptor's properties apply when it is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedDependency {
    pub version: Option<String>,
    pub scope: Option<String>,
    pub classifier: Option<String>,
    pub exclusions: Vec<Exclusion>,
}

/// Properties and version management accumulated over a descriptor and its
/// ancestors. Ancestor rows are seeded first and descendants layer on top.
#[derive(Debug, Clone, Default)]
pub struct DescriptorContext {
    pub properties: HashMap<String, String>,
    pub managed: HashMap<String, ManagedDependency>,
}

impl DescriptorContext {
    pub fn layered_on(parent: &DescriptorContext) -> Self {
        parent.clone()
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn manage(&mut self, identity: String, managed: ManagedDependency) {
        self.managed.insert(identity, managed);
    }

    pub fn managed(&self, identity: &str) -> Option<&ManagedDependency> {
        self.managed.get(identity)
    }
}
