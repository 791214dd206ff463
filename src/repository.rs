//! Local Maven repository layout.
//!
//! `root/<group/as/dirs>/<artifact>/<version>/<artifact>-<version>[-<classifier>].<ext>`

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::coordinate::Coordinate;

#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version_dir(&self, group_id: &str, artifact_id: &str, version: &str) -> PathBuf {
        let mut dir = self.root.clone();
        for part in group_id.split('.').filter(|p| !p.is_empty()) {
            dir.push(part);
        }
        dir.join(artifact_id).join(version)
    }

    /// Primary jar, falling back to the unclassified jar when the classified
    /// one is not installed.
    pub fn locate(&self, coord: &Coordinate) -> Option<PathBuf> {
        if let Some(classifier) = coord.classifier.as_deref() {
            let classified = self.artifact_file(coord, Some(classifier), "jar");
            if classified.is_file() {
                return Some(classified);
            }
            debug!(coordinate = %coord, "classified jar missing, trying unclassified");
        }
        let plain = self.artifact_file(coord, None, "jar");
        plain.is_file().then_some(plain)
    }

    pub fn locate_sources(&self, coord: &Coordinate) -> Option<PathBuf> {
        let path = self.artifact_file(coord, Some("sources"), "jar");
        path.is_file().then_some(path)
    }

    pub fn locate_pom(&self, group_id: &str, artifact_id: &str, version: &str) -> Option<PathBuf> {
        let path = self.pom_path(group_id, artifact_id, version);
        path.is_file().then_some(path)
    }

    /// Where the descriptor for `group:artifact:version` would live.
    pub fn pom_path(&self, group_id: &str, artifact_id: &str, version: &str) -> PathBuf {
        self.version_dir(group_id, artifact_id, version)
            .join(format!("{artifact_id}-{version}.pom"))
    }

    fn artifact_file(&self, coord: &Coordinate, classifier: Option<&str>, ext: &str) -> PathBuf {
        let file_name = match classifier {
            Some(c) => format!("{}-{}-{c}.{ext}", coord.artifact_id, coord.version),
            None => format!("{}-{}.{ext}", coord.artifact_id, coord.version),
        };
        self.version_dir(&coord.group_id, &coord.artifact_id, &coord.version)
            .join(file_name)
    }
}

pub fn default_m2_repository() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to resolve home directory"))?;
    let m2 = home.join(".m2");
    if let Some(configured) = settings_local_repository(&m2.join("settings.xml")) {
        return Ok(configured);
    }
    Ok(m2.join("repository"))
}

/// `<localRepository>` from a Maven `settings.xml`, when present and non-empty.
pub fn settings_local_repository(settings: &Path) -> Option<PathBuf> {
    let text = std::fs::read_to_string(settings).ok()?;
    let doc = roxmltree::Document::parse(&text).ok()?;
    let value = doc
        .root_element()
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "localRepository")?
        .text()?
        .trim()
        .to_string();
    if value.is_empty() {
        return None;
    }
    if let Some(rest) = value.strip_prefix("${user.home}") {
        let home = dirs::home_dir()?;
        return Some(home.join(rest.trim_start_matches(['/', '\\'])));
    }
    Some(PathBuf::from(value))
}

pub fn class_name_to_class_path(class_name: &str) -> String {
    format!("{}.class", class_name.replace('.', "/"))
}

/// Source entry for a class; nested classes live in their outermost file.
pub fn class_name_to_source_path(class_name: &str) -> String {
    let outer = class_name.split('$').next().unwrap_or(class_name);
    format!("{}.java", outer.replace('.', "/"))
}
