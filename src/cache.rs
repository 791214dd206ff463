//! In-process and persistent caches for resolved dependency lists and
//! extracted classes.
//!
//! `BoundedCache` is a mutex-guarded LRU map. Concurrent callers follow a
//! get-then-set discipline: a race recomputes the same value and the last
//! writer wins.
//!
//! `PersistentCache` keeps the same results across processes in LMDB (via
//! heed). Keys are sha256 fingerprints of the inputs. Dependency entries, in
//! memory and on disk, also record the size and mtime of every descriptor
//! consulted, and are ignored once any of them changes.

use anyhow::{Context, Result};
use heed::types::Str;
use heed::{Database, Env, EnvFlags, EnvOpenOptions, RoTxn};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::UNIX_EPOCH;
use tracing::debug;

use crate::coordinate::Coordinate;
use crate::extract::ClassRepresentation;

pub const DEPENDENCIES_DB: &str = "dependencies";
pub const CLASSES_DB: &str = "classes";

pub const DEFAULT_DEPENDENCY_CAPACITY: usize = 64;
pub const DEFAULT_CLASS_CAPACITY: usize = 512;

const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024;
const DEFAULT_MAX_DBS: u32 = 8;

type StrDb = Database<Str, Str>;

#[derive(Debug)]
pub struct BoundedCache<K: Hash + Eq, V> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) {
        self.lock().put(key, value);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub type DependencyCache = BoundedCache<String, Arc<DependencyEntry>>;
pub type ClassCache = BoundedCache<String, Arc<ClassRepresentation>>;

/// Size and modification time of a file; `None` stands for "absent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    pub len: u64,
    pub modified_nanos: u128,
}

pub fn file_stamp(path: &Path) -> Option<FileStamp> {
    let meta = std::fs::metadata(path).ok()?;
    let modified_nanos = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    Some(FileStamp {
        len: meta.len(),
        modified_nanos,
    })
}

/// Hex sha256 over the parts, each length-prefixed so boundaries matter.
pub fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Key for an extracted class, covering both archives' current state.
pub fn class_fingerprint(class_name: &str, archive: &Path, sources: Option<&Path>) -> String {
    let stamp = |p: &Path| serde_json::to_string(&file_stamp(p)).unwrap_or_default();
    let archive_key = archive.to_string_lossy().into_owned();
    let archive_stamp = stamp(archive);
    let sources_key = sources
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sources_stamp = sources.map(stamp).unwrap_or_default();
    fingerprint(&[
        class_name,
        archive_key.as_str(),
        archive_stamp.as_str(),
        sources_key.as_str(),
        sources_stamp.as_str(),
    ])
}

/// A resolved dependency list with the stamps of the descriptors it was
/// computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEntry {
    inputs: Vec<(PathBuf, Option<FileStamp>)>,
    pub coordinates: Vec<Coordinate>,
}

impl DependencyEntry {
    /// Stamps every input as it is now.
    pub fn capture(inputs: &BTreeSet<PathBuf>, coordinates: Vec<Coordinate>) -> Self {
        Self {
            inputs: inputs.iter().map(|p| (p.clone(), file_stamp(p))).collect(),
            coordinates,
        }
    }

    /// True while every input still has its recorded stamp, absent ones
    /// included.
    pub fn is_fresh(&self) -> bool {
        self.inputs
            .iter()
            .all(|(path, stamp)| file_stamp(path) == *stamp)
    }
}

#[derive(Debug)]
pub struct PersistentCache {
    env: Arc<Env>,
    db_path: PathBuf,
    dependencies: StrDb,
    classes: StrDb,
}

impl PersistentCache {
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        let env = Arc::new(open_env(&db_path)?);

        let mut wtxn = env.write_txn()?;
        let dependencies = env.create_database::<Str, Str>(&mut wtxn, Some(DEPENDENCIES_DB))?;
        let classes = env.create_database::<Str, Str>(&mut wtxn, Some(CLASSES_DB))?;
        wtxn.commit()?;

        Ok(Self {
            env,
            db_path,
            dependencies,
            classes,
        })
    }

    /// The stored entry, unless any recorded descriptor has changed since.
    pub fn get_dependencies(&self, key: &str) -> Result<Option<DependencyEntry>> {
        let rtxn = self.env.read_txn()?;
        let Some(raw) = self.dependencies.get(&rtxn, key)? else {
            return Ok(None);
        };
        let Ok(entry) = serde_json::from_str::<DependencyEntry>(raw) else {
            debug!(key, "discarding undecodable dependency row");
            return Ok(None);
        };
        if !entry.is_fresh() {
            debug!(key, "dependency row is stale");
            return Ok(None);
        }
        Ok(Some(entry))
    }

    pub fn put_dependencies(&self, key: &str, entry: &DependencyEntry) -> Result<()> {
        let value = serde_json::to_string(entry)?;
        let mut wtxn = self.env.write_txn()?;
        self.dependencies.put(&mut wtxn, key, &value)?;
        wtxn.commit()?;
        Ok(())
    }

    pub fn get_class(&self, key: &str) -> Result<Option<ClassRepresentation>> {
        let rtxn = self.env.read_txn()?;
        Ok(self
            .classes
            .get(&rtxn, key)?
            .and_then(|raw| serde_json::from_str(raw).ok()))
    }

    pub fn put_class(&self, key: &str, repr: &ClassRepresentation) -> Result<()> {
        let value = serde_json::to_string(repr)?;
        let mut wtxn = self.env.write_txn()?;
        self.classes.put(&mut wtxn, key, &value)?;
        wtxn.commit()?;
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let rtxn = self.env.read_txn()?;
        let mut from_sources = 0u64;
        for item in self.classes.iter(&rtxn)? {
            let (_, v) = item?;
            if serde_json::from_str::<ClassRepresentation>(v).is_ok_and(|r| r.is_from_sources) {
                from_sources += 1;
            }
        }
        Ok(CacheStats {
            db_path: self.db_path.to_string_lossy().to_string(),
            dependency_entries: table_len(&self.dependencies, &rtxn)?,
            class_entries: table_len(&self.classes, &rtxn)?,
            classes_from_sources: from_sources,
        })
    }
}

fn open_env(db_path: &Path) -> Result<Env> {
    let mut options = EnvOpenOptions::new();
    options.map_size(DEFAULT_MAP_SIZE);
    options.max_dbs(DEFAULT_MAX_DBS);
    // SAFETY: default LMDB locking is kept; NO_SUB_DIR makes --db a single file.
    unsafe {
        options.flags(EnvFlags::NO_SUB_DIR);
        options
            .open(db_path)
            .with_context(|| format!("Failed to create/open db env: {}", db_path.display()))
    }
}

fn table_len(db: &StrDb, rtxn: &RoTxn<'_>) -> Result<u64> {
    let mut count = 0u64;
    for item in db.iter(rtxn)? {
        let _ = item?;
        count += 1;
    }
    Ok(count)
}

#[derive(Debug, Serialize)]
pub struct CacheStats {
    pub db_path: String,
    pub dependency_entries: u64,
    pub class_entries: u64,
    pub classes_from_sources: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "pom_class_finder_cache_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn sample_class(path: &Path) -> ClassRepresentation {
        ClassRepresentation {
            class_name: "a.B".to_string(),
            simple_name: "B".to_string(),
            package_name: "a".to_string(),
            source: Some("class B {}".to_string()),
            methods: Vec::new(),
            fields: Vec::new(),
            archive_path: path.to_path_buf(),
            is_from_sources: true,
        }
    }

    #[test]
    fn bounded_cache_evicts_least_recent() {
        let cache: BoundedCache<String, u32> = BoundedCache::new(2);
        cache.insert("a".into(), 1);
        cache.insert("b".into(), 2);
        assert_eq!(cache.get(&"a".into()), Some(1));
        cache.insert("c".into(), 3);
        assert_eq!(cache.get(&"b".into()), None);
        assert_eq!(cache.get(&"a".into()), Some(1));
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());

        let zero: BoundedCache<u8, u8> = BoundedCache::new(0);
        zero.insert(1, 1);
        assert_eq!(zero.get(&1), Some(1));
    }

    #[test]
    fn fingerprints_respect_part_boundaries() {
        assert_ne!(fingerprint(&["ab", "c"]), fingerprint(&["a", "bc"]));
        assert_eq!(fingerprint(&["x"]), fingerprint(&["x"]));
        assert_eq!(fingerprint(&["x"]).len(), 64);
    }

    #[test]
    fn dependency_rows_go_stale_when_inputs_change() -> Result<()> {
        let dir = temp_path("stale");
        std::fs::create_dir_all(&dir)?;
        let pom = dir.join("pom.xml");
        std::fs::write(&pom, "<project/>")?;
        let absent = dir.join("missing.pom");

        let cache = PersistentCache::open(dir.join("db.lmdb"))?;
        let coords = vec![Coordinate::new("g", "a", "1")];
        let inputs = BTreeSet::from([pom.clone(), absent.clone()]);
        let entry = DependencyEntry::capture(&inputs, coords.clone());
        assert!(entry.is_fresh());
        cache.put_dependencies("k", &entry)?;
        let stored = cache.get_dependencies("k")?.unwrap();
        assert_eq!(stored.coordinates, coords);
        assert_eq!(cache.get_dependencies("other")?, None);

        std::fs::write(&absent, "<project/>")?;
        assert!(!entry.is_fresh());
        assert_eq!(cache.get_dependencies("k")?, None);

        let _ = std::fs::remove_dir_all(dir);
        Ok(())
    }

    #[test]
    fn classes_round_trip_and_are_counted() -> Result<()> {
        let dir = temp_path("classes");
        let cache = PersistentCache::open(dir.join("db.lmdb"))?;
        let repr = sample_class(&dir);
        cache.put_class("key", &repr)?;
        assert_eq!(cache.get_class("key")?, Some(repr));
        assert_eq!(cache.get_class("nope")?, None);

        let stats = cache.stats()?;
        assert_eq!(stats.class_entries, 1);
        assert_eq!(stats.classes_from_sources, 1);
        assert_eq!(stats.dependency_entries, 0);

        let _ = std::fs::remove_dir_all(dir);
        Ok(())
    }

    #[test]
    fn class_fingerprint_tracks_archive_state() -> Result<()> {
        let jar = temp_path("fp.jar");
        std::fs::write(&jar, b"one")?;
        let first = class_fingerprint("a.B", &jar, None);
        assert_eq!(first, class_fingerprint("a.B", &jar, None));
        assert_ne!(first, class_fingerprint("a.C", &jar, None));
        std::fs::write(&jar, b"longer content")?;
        assert_ne!(first, class_fingerprint("a.B", &jar, None));
        std::fs::remove_file(jar)?;
        Ok(())
    }
}
