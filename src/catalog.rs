use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;

use crate::probe::open_archive;

/// Dotted class names of every `.class` entry, in archive order.
pub fn catalog(artifact_path: &Path) -> Result<Vec<String>> {
    let mut archive = open_archive(artifact_path)?;
    let mut classes = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let name = entry.name();
        if !name.ends_with(".class") {
            continue;
        }
        classes.push(name.trim_end_matches(".class").replace(['/', '\\'], "."));
    }
    Ok(classes)
}

/// Anchored regex for a glob: `*` any run of characters, `?` exactly one.
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    re.push('$');
    Regex::new(&re).with_context(|| format!("Invalid class pattern: {pattern}"))
}

pub fn search_classes(archive_path: &Path, pattern: &str) -> Result<Vec<String>> {
    let matcher = glob_to_regex(pattern)?;
    Ok(catalog(archive_path)?
        .into_iter()
        .filter(|name| matcher.is_match(name))
        .collect())
}
