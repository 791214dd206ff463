use anyhow::{Context, Result};
use memmap2::Mmap;
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

use crate::coordinate::Coordinate;
use crate::repository::{Repository, class_name_to_class_path};

pub type Archive = ZipArchive<Cursor<Mmap>>;

pub fn open_archive(jar_path: &Path) -> Result<Archive> {
    let file =
        File::open(jar_path).with_context(|| format!("Failed to open jar: {}", jar_path.display()))?;
    // SAFETY: The file is opened read-only; the map is owned by the archive cursor.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to mmap jar: {}", jar_path.display()))?;
    ZipArchive::new(Cursor::new(mmap))
        .with_context(|| format!("Failed to read zip structure: {}", jar_path.display()))
}

/// Name of the first entry equal to `entry_path` or ending in `/<entry_path>`.
pub fn find_entry_name(archive: &mut Archive, entry_path: &str) -> Option<String> {
    if archive.by_name(entry_path).is_ok() {
        return Some(entry_path.to_string());
    }
    let suffix = format!("/{entry_path}");
    for i in 0..archive.len() {
        let Ok(entry) = archive.by_index(i) else {
            continue;
        };
        if entry.name().ends_with(&suffix) {
            return Some(entry.name().to_string());
        }
    }
    None
}

pub fn jar_contains_class(jar_path: &Path, class_path: &str) -> Result<bool> {
    let mut archive = open_archive(jar_path)?;
    Ok(find_entry_name(&mut archive, class_path).is_some())
}

/// Bytes of the entry matching `entry_path` (exact or nested suffix), if any.
pub fn read_entry(jar_path: &Path, entry_path: &str) -> Result<Option<Vec<u8>>> {
    let mut archive = open_archive(jar_path)?;
    let Some(name) = find_entry_name(&mut archive, entry_path) else {
        return Ok(None);
    };
    let mut entry = archive
        .by_name(&name)
        .with_context(|| format!("Failed to open entry {name} in {}", jar_path.display()))?;
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut buf)
        .with_context(|| format!("Failed to inflate entry {name} in {}", jar_path.display()))?;
    Ok(Some(buf))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassLocation {
    pub archive_path: PathBuf,
    pub coordinate: Coordinate,
}

/// First coordinate, in input order, whose primary jar holds `class_name`.
pub fn find_archive_for_class(
    repo: &Repository,
    class_name: &str,
    coordinates: &[Coordinate],
) -> Option<ClassLocation> {
    let class_path = class_name_to_class_path(class_name);
    coordinates.par_iter().find_map_first(|coord| {
        let jar = repo.locate(coord)?;
        match jar_contains_class(&jar, &class_path) {
            Ok(true) => Some(ClassLocation {
                archive_path: jar,
                coordinate: coord.clone(),
            }),
            Ok(false) => None,
            Err(e) => {
                debug!(jar = %jar.display(), error = %e, "skipping unreadable archive");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use std::sync::atomic::{AtomicU64, Ordering};
    use zip::write::{FileOptions, ZipWriter};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        p.push(format!(
            "pom-class-finder-probe-{}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos(),
            n
        ));
        p
    }

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, content) in entries {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }

    fn jar_path(root: &Path, c: &Coordinate) -> PathBuf {
        Repository::new(root)
            .version_dir(&c.group_id, &c.artifact_id, &c.version)
            .join(format!("{}-{}.jar", c.artifact_id, c.version))
    }

    #[test]
    fn jar_contains_class_matches_exact_and_nested_entries() {
        let root = temp_dir();
        let jar = root.join("demo.jar");
        write_jar(
            &jar,
            &[
                ("org/apache/commons/lang3/StringUtils.class", b"dummy"),
                ("BOOT-INF/classes/com/acme/App.class", b"dummy"),
            ],
        );

        assert!(jar_contains_class(&jar, "org/apache/commons/lang3/StringUtils.class").unwrap());
        assert!(jar_contains_class(&jar, "com/acme/App.class").unwrap());
        assert!(!jar_contains_class(&jar, "org/apache/commons/lang3/ArrayUtils.class").unwrap());
        assert_eq!(
            read_entry(&jar, "com/acme/App.class").unwrap().as_deref(),
            Some(&b"dummy"[..])
        );
        assert!(read_entry(&jar, "missing.class").unwrap().is_none());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn find_archive_for_class_returns_first_in_input_order() {
        let root = temp_dir();
        let repo = Repository::new(&root);
        let broken = Coordinate::new("org.broken", "broken", "1.0");
        let first = Coordinate::new("org.first", "first", "1.0");
        let second = Coordinate::new("org.second", "second", "1.0");
        let absent = Coordinate::new("org.absent", "absent", "1.0");

        let broken_jar = jar_path(&root, &broken);
        fs::create_dir_all(broken_jar.parent().unwrap()).unwrap();
        fs::write(&broken_jar, b"not a zip").unwrap();
        write_jar(&jar_path(&root, &first), &[("com/x/Shared.class", b"1")]);
        write_jar(&jar_path(&root, &second), &[("com/x/Shared.class", b"2")]);

        let coords = vec![absent, broken, second.clone(), first];
        let found = find_archive_for_class(&repo, "com.x.Shared", &coords).unwrap();
        assert_eq!(found.coordinate, second);
        assert_eq!(found.archive_path, jar_path(&root, &second));

        assert!(find_archive_for_class(&repo, "com.x.Missing", &coords).is_none());
        let _ = fs::remove_dir_all(root);
    }
}
