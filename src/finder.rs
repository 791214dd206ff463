//! The lookup pipeline: descriptor → dependencies → archive → class.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{
    ClassCache, DEFAULT_CLASS_CAPACITY, DEFAULT_DEPENDENCY_CAPACITY, DependencyCache,
    DependencyEntry, PersistentCache, class_fingerprint, fingerprint,
};
use crate::catalog;
use crate::coordinate::Coordinate;
use crate::error::{FinderError, FinderResult};
use crate::extract::{ClassRepresentation, extract};
use crate::probe::{ClassLocation, find_archive_for_class};
use crate::repository::Repository;
use crate::resolver::{ResolveOptions, Resolver};

/// The two in-process caches. Owned by a [`ClassFinder`]; build one per
/// test or per host as needed.
#[derive(Debug)]
pub struct FinderCaches {
    pub dependencies: DependencyCache,
    pub classes: ClassCache,
}

impl FinderCaches {
    pub fn with_capacity(dependencies: usize, classes: usize) -> Self {
        Self {
            dependencies: DependencyCache::new(dependencies),
            classes: ClassCache::new(classes),
        }
    }
}

impl Default for FinderCaches {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_DEPENDENCY_CAPACITY, DEFAULT_CLASS_CAPACITY)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassLookup {
    pub class_name: String,
    pub pom_path: PathBuf,
    pub location: ClassLocation,
    pub sources_path: Option<PathBuf>,
    pub dependencies_scanned: usize,
    pub duration_ms: u64,
    pub representation: Arc<ClassRepresentation>,
}

#[derive(Debug)]
pub struct ClassFinder {
    resolver: Resolver,
    caches: FinderCaches,
    store: Option<PersistentCache>,
}

impl ClassFinder {
    pub fn new(repository: Repository, caches: FinderCaches, store: Option<PersistentCache>) -> Self {
        Self {
            resolver: Resolver::new(repository),
            caches,
            store,
        }
    }

    pub fn repository(&self) -> &Repository {
        self.resolver.repository()
    }

    pub fn caches(&self) -> &FinderCaches {
        &self.caches
    }

    pub fn resolve_dependencies(
        &self,
        pom_path: Option<&Path>,
        options: &ResolveOptions,
    ) -> FinderResult<Vec<Coordinate>> {
        let pom_path = pom_path.ok_or_else(|| FinderError::missing("pomPath"))?;
        let canonical = std::fs::canonicalize(pom_path).unwrap_or_else(|_| pom_path.to_path_buf());
        let key = fingerprint(&[
            &canonical.to_string_lossy(),
            &options.cache_key(),
            &self.repository().root().to_string_lossy(),
        ]);

        if let Some(hit) = self.caches.dependencies.get(&key) {
            if hit.is_fresh() {
                debug!(pom = %pom_path.display(), "dependency cache hit");
                return Ok(hit.coordinates.clone());
            }
            debug!(pom = %pom_path.display(), "cached dependencies are stale");
        }

        if let Some(store) = &self.store {
            match store.get_dependencies(&key) {
                Ok(Some(entry)) => {
                    debug!(pom = %pom_path.display(), "persistent dependency cache hit");
                    let coordinates = entry.coordinates.clone();
                    self.caches.dependencies.insert(key, Arc::new(entry));
                    return Ok(coordinates);
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "persistent cache read failed"),
            }
        }

        let resolution = self.resolver.resolve(pom_path, options)?;
        let entry = DependencyEntry::capture(&resolution.inputs, resolution.coordinates);
        if let Some(store) = &self.store
            && let Err(e) = store.put_dependencies(&key, &entry)
        {
            warn!(error = %e, "persistent cache write failed");
        }
        let coordinates = entry.coordinates.clone();
        self.caches.dependencies.insert(key, Arc::new(entry));
        Ok(coordinates)
    }

    pub fn locate_primary_archive(&self, coordinate: &Coordinate) -> Option<PathBuf> {
        self.repository().locate(coordinate)
    }

    pub fn locate_source_archive(&self, coordinate: &Coordinate) -> Option<PathBuf> {
        self.repository().locate_sources(coordinate)
    }

    pub fn find_class(&self, class_name: &str, coordinates: &[Coordinate]) -> Option<ClassLocation> {
        find_archive_for_class(self.repository(), class_name, coordinates)
    }

    pub fn extract_class(
        &self,
        class_name: &str,
        archive_path: &Path,
        sources_path: Option<&Path>,
    ) -> Arc<ClassRepresentation> {
        let key = class_fingerprint(class_name, archive_path, sources_path);
        if let Some(hit) = self.caches.classes.get(&key) {
            return hit;
        }

        if let Some(store) = &self.store {
            match store.get_class(&key) {
                Ok(Some(repr)) => {
                    let repr = Arc::new(repr);
                    self.caches.classes.insert(key, Arc::clone(&repr));
                    return repr;
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "persistent cache read failed"),
            }
        }

        let repr = extract(class_name, archive_path, sources_path);
        // A representation with no source is a decode failure; retry next time.
        if repr.source.is_some()
            && let Some(store) = &self.store
            && let Err(e) = store.put_class(&key, &repr)
        {
            warn!(error = %e, "persistent cache write failed");
        }
        let repr = Arc::new(repr);
        self.caches.classes.insert(key, Arc::clone(&repr));
        repr
    }

    pub fn search_classes(&self, archive_path: &Path, pattern: &str) -> FinderResult<Vec<String>> {
        Ok(catalog::search_classes(archive_path, pattern)?)
    }

    /// Resolves `pom_path`, finds the archive holding `class_name` and
    /// extracts it. `Ok(None)` when no dependency contains the class.
    pub fn lookup_class(
        &self,
        class_name: &str,
        pom_path: Option<&Path>,
        options: &ResolveOptions,
    ) -> FinderResult<Option<ClassLookup>> {
        let start = Instant::now();
        let coordinates = self.resolve_dependencies(pom_path, options)?;
        let pom_path = pom_path.ok_or_else(|| FinderError::missing("pomPath"))?;

        let Some(location) = self.find_class(class_name, &coordinates) else {
            info!(class = class_name, dependencies = coordinates.len(), "class not found in dependencies");
            return Ok(None);
        };
        let sources_path = self.locate_source_archive(&location.coordinate);
        let representation =
            self.extract_class(class_name, &location.archive_path, sources_path.as_deref());

        Ok(Some(ClassLookup {
            class_name: class_name.to_string(),
            pom_path: pom_path.to_path_buf(),
            location,
            sources_path,
            dependencies_scanned: coordinates.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            representation,
        }))
    }
}
