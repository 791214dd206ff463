//! Dependency resolution over `pom.xml` descriptors in a local repository.
//!
//! A descriptor is first turned into an [`EffectivePom`]: its parent chain is
//! merged (ancestor first, descendant on top), `${...}` placeholders become
//! resolvable and `dependencyManagement` rows are collected, bill-of-materials
//! imports included. Transitive resolution then walks the graph breadth-first
//! with an explicit worklist. Each branch carries its own immutable ancestor
//! path and exclusion set, so nothing leaks between siblings.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::coordinate::{
    Coordinate, DescriptorContext, Exclusion, ManagedDependency, Scope, identity_key,
};
use crate::error::FinderResult;
use crate::pom::{Pom, RawDependency, read_pom};
use crate::repository::Repository;

const MAX_INTERPOLATION_PASSES: usize = 16;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolveOptions {
    pub include_transitive: bool,
    pub scopes: BTreeSet<Scope>,
    pub max_depth: u32,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            include_transitive: true,
            scopes: BTreeSet::from([Scope::Compile, Scope::Runtime]),
            max_depth: 10,
        }
    }
}

impl ResolveOptions {
    /// Stable text form, used in cache keys.
    pub fn cache_key(&self) -> String {
        let scopes: Vec<&str> = self.scopes.iter().map(|s| s.as_str()).collect();
        format!(
            "transitive={};scopes={};depth={}",
            self.include_transitive,
            scopes.join(","),
            self.max_depth
        )
    }
}

/// A descriptor with its ancestors merged in.
#[derive(Debug, Clone)]
pub struct EffectivePom {
    pub path: PathBuf,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub context: DescriptorContext,
    /// Own declarations first, then inherited ones.
    pub dependencies: Vec<RawDependency>,
}

impl EffectivePom {
    pub fn identity(&self) -> Option<String> {
        let group = self.interpolate(self.group_id.as_deref()?);
        let artifact = self.interpolate(self.artifact_id.as_deref()?);
        Some(identity_key(&group, &artifact))
    }

    pub fn interpolate(&self, value: &str) -> String {
        interpolate(value, &self.context.properties)
    }

    /// Resolves one declaration in this descriptor's context. `None` when
    /// group, artifact or version cannot be determined.
    pub fn resolve_declared(&self, raw: &RawDependency) -> Option<Coordinate> {
        let group_id = self.resolved_field(raw.group_id.as_deref())?;
        let artifact_id = self.resolved_field(raw.artifact_id.as_deref())?;
        let identity = identity_key(&group_id, &artifact_id);
        let managed = self.context.managed(&identity);

        let version = self
            .resolved_field(raw.version.as_deref())
            .or_else(|| self.resolved_field(managed?.version.as_deref()));
        let Some(version) = version else {
            debug!(dependency = %identity, pom = %self.path.display(), "dropping dependency without a resolvable version");
            return None;
        };

        let scope = self
            .resolved_field(raw.scope.as_deref())
            .or_else(|| self.resolved_field(managed?.scope.as_deref()))
            .map(|s| Scope::parse(&s));

        let mut classifier = self
            .resolved_field(raw.classifier.as_deref())
            .or_else(|| self.resolved_field(managed?.classifier.as_deref()));
        if classifier.is_none() && raw.kind.as_deref() == Some("test-jar") {
            classifier = Some("tests".to_string());
        }

        let optional = raw
            .optional
            .as_deref()
            .map(|o| self.interpolate(o).eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let mut exclusions: Vec<Exclusion> = raw
            .exclusions
            .iter()
            .map(|e| Exclusion::new(self.interpolate(&e.group_id), self.interpolate(&e.artifact_id)))
            .collect();
        if let Some(m) = managed {
            for e in &m.exclusions {
                if !exclusions.contains(e) {
                    exclusions.push(e.clone());
                }
            }
        }

        Some(Coordinate {
            group_id,
            artifact_id,
            version,
            scope,
            classifier,
            optional,
            exclusions,
            depth: 0,
        })
    }

    /// Interpolated value, or `None` when absent or still holding a placeholder.
    fn resolved_field(&self, raw: Option<&str>) -> Option<String> {
        let value = self.interpolate(raw?);
        (!value.is_empty() && !value.contains("${")).then_some(value)
    }
}

/// Substitutes `${name}` until nothing changes. Unknown names stay literal,
/// so cyclic definitions terminate unresolved.
pub fn interpolate(value: &str, properties: &HashMap<String, String>) -> String {
    let mut current = value.to_string();
    for _ in 0..MAX_INTERPOLATION_PASSES {
        if !current.contains("${") {
            break;
        }
        let next = PLACEHOLDER_RE
            .replace_all(&current, |caps: &Captures<'_>| {
                properties
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Keeps one coordinate per identity: the shallowest, earliest on ties.
/// Output follows first-encounter order.
pub fn mediate(coordinates: Vec<Coordinate>) -> Vec<Coordinate> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Coordinate> = Vec::new();
    for coord in coordinates {
        let identity = coord.identity();
        match position.get(&identity).copied() {
            Some(i) => {
                if coord.depth < out[i].depth {
                    out[i] = coord;
                }
            }
            None => {
                position.insert(identity, out.len());
                out.push(coord);
            }
        }
    }
    out
}

/// Identities from the root project down to the current node.
#[derive(Debug, Clone)]
pub struct AncestorPath(Option<Rc<AncestorLink>>);

#[derive(Debug)]
struct AncestorLink {
    identity: String,
    parent: AncestorPath,
}

impl AncestorPath {
    pub fn empty() -> Self {
        Self(None)
    }

    /// A new path one step longer; `self` is left untouched.
    pub fn push(&self, identity: impl Into<String>) -> Self {
        Self(Some(Rc::new(AncestorLink {
            identity: identity.into(),
            parent: self.clone(),
        })))
    }

    pub fn contains(&self, identity: &str) -> bool {
        let mut cur = self.0.as_ref();
        while let Some(link) = cur {
            if link.identity == identity {
                return true;
            }
            cur = link.parent.0.as_ref();
        }
        false
    }

    pub fn len(&self) -> usize {
        let mut n = 0;
        let mut cur = self.0.as_ref();
        while let Some(link) = cur {
            n += 1;
            cur = link.parent.0.as_ref();
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub coordinates: Vec<Coordinate>,
    /// Every descriptor path consulted, whether or not it existed.
    pub inputs: BTreeSet<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Resolver {
    repository: Repository,
}

struct Branch {
    index: usize,
    ancestors: AncestorPath,
    exclusions: Rc<Vec<Exclusion>>,
}

impl Resolver {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn resolve_context(&self, pom_path: &Path) -> FinderResult<EffectivePom> {
        let mut session = Session::new(&self.repository);
        let effective = session.effective(pom_path, &[])?;
        Ok((*effective).clone())
    }

    pub fn resolve_dependencies(
        &self,
        pom_path: &Path,
        options: &ResolveOptions,
    ) -> FinderResult<Vec<Coordinate>> {
        Ok(self.resolve(pom_path, options)?.coordinates)
    }

    pub fn resolve(&self, pom_path: &Path, options: &ResolveOptions) -> FinderResult<Resolution> {
        let mut session = Session::new(&self.repository);
        let root = session.effective(pom_path, &[])?;

        let mut all: Vec<Coordinate> = Vec::new();
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut queue: VecDeque<Branch> = VecDeque::new();
        let root_path = match root.identity() {
            Some(id) => AncestorPath::empty().push(id),
            None => AncestorPath::empty(),
        };

        for coord in root.dependencies.iter().filter_map(|d| root.resolve_declared(d)) {
            let index = all.len();
            let identity = coord.identity();
            let winner = !first_seen.contains_key(&identity);
            if winner {
                first_seen.insert(identity.clone(), index);
            }
            if winner && !coord.optional && options.include_transitive {
                queue.push_back(Branch {
                    index,
                    ancestors: root_path.push(identity),
                    exclusions: Rc::new(coord.exclusions.clone()),
                });
            }
            all.push(coord);
        }
        let direct_count = all.len();

        while let Some(branch) = queue.pop_front() {
            let parent = all[branch.index].clone();
            if parent.depth >= options.max_depth {
                continue;
            }
            let Some(effective) = session.dependency_pom(&parent) else {
                continue;
            };

            for child in effective
                .dependencies
                .iter()
                .filter_map(|d| effective.resolve_declared(d))
            {
                let identity = child.identity();
                if child.optional
                    || !child.effective_scope().is_transitive()
                    || child.is_excluded_by(&branch.exclusions)
                    || branch.ancestors.contains(&identity)
                {
                    continue;
                }

                let mut child = child
                    .with_depth(parent.depth + 1)
                    .with_scope(parent.effective_scope().propagate(child.effective_scope()));
                if let Some(version) = root
                    .context
                    .managed(&identity)
                    .and_then(|m| m.version.as_deref())
                    .map(|v| root.interpolate(v))
                    .filter(|v| !v.contains("${"))
                {
                    child = child.with_version(version);
                }

                let index = all.len();
                if !first_seen.contains_key(&identity) {
                    first_seen.insert(identity.clone(), index);
                    let mut exclusions = (*branch.exclusions).clone();
                    exclusions.extend(child.exclusions.iter().cloned());
                    queue.push_back(Branch {
                        index,
                        ancestors: branch.ancestors.push(identity),
                        exclusions: Rc::new(exclusions),
                    });
                }
                all.push(child);
            }
        }

        let total = all.len();
        let coordinates: Vec<Coordinate> = mediate(all)
            .into_iter()
            .filter(|c| options.scopes.contains(&c.effective_scope()))
            .collect();
        info!(
            pom = %pom_path.display(),
            direct = direct_count,
            collected = total,
            resolved = coordinates.len(),
            "dependencies resolved"
        );

        Ok(Resolution {
            coordinates,
            inputs: session.inputs,
        })
    }
}

/// Per-call state: descriptors already merged, and every path looked at.
struct Session<'r> {
    repository: &'r Repository,
    poms: HashMap<PathBuf, Rc<EffectivePom>>,
    inputs: BTreeSet<PathBuf>,
}

impl<'r> Session<'r> {
    fn new(repository: &'r Repository) -> Self {
        Self {
            repository,
            poms: HashMap::new(),
            inputs: BTreeSet::new(),
        }
    }

    /// `chain` holds the descriptors currently being merged below this one.
    fn effective(&mut self, pom_path: &Path, chain: &[PathBuf]) -> FinderResult<Rc<EffectivePom>> {
        let key = canonical(pom_path);
        if let Some(hit) = self.poms.get(&key) {
            return Ok(Rc::clone(hit));
        }
        self.inputs.insert(key.clone());
        let pom = read_pom(pom_path)?;

        let mut chain = chain.to_vec();
        chain.push(key.clone());

        let parent = self.parent_of(&pom, pom_path, &chain);
        let effective = Rc::new(self.merge(pom, pom_path, parent.as_deref(), &chain));
        self.poms.insert(key, Rc::clone(&effective));
        Ok(effective)
    }

    fn parent_of(&mut self, pom: &Pom, pom_path: &Path, chain: &[PathBuf]) -> Option<Rc<EffectivePom>> {
        let parent = pom.parent.as_ref()?;
        let (group, artifact) = (parent.group_id.as_deref()?, parent.artifact_id.as_deref()?);

        let candidates = [
            self.relative_parent(pom_path, parent.relative_path.as_deref(), group, artifact),
            parent.version.as_deref().and_then(|v| {
                let path = self.repository.pom_path(group, artifact, v);
                self.inputs.insert(path.clone());
                path.is_file().then_some(path)
            }),
        ];

        for path in candidates.into_iter().flatten() {
            if chain.contains(&canonical(&path)) {
                debug!(pom = %pom_path.display(), parent = %path.display(), "parent cycle, ignoring parent");
                return None;
            }
            match self.effective(&path, chain) {
                Ok(effective) => return Some(effective),
                Err(e) => debug!(parent = %path.display(), error = %e, "parent descriptor unusable"),
            }
        }
        debug!(pom = %pom_path.display(), parent = %identity_key(group, artifact), "parent not found, continuing without it");
        None
    }

    /// The relative-path hint is only trusted when it names the same parent.
    fn relative_parent(
        &mut self,
        pom_path: &Path,
        hint: Option<&str>,
        group: &str,
        artifact: &str,
    ) -> Option<PathBuf> {
        let base = pom_path.parent()?;
        let mut path = base.join(hint.unwrap_or("../pom.xml"));
        if path.is_dir() {
            path = path.join("pom.xml");
        }
        self.inputs.insert(canonical(&path));
        if !path.is_file() {
            return None;
        }
        let candidate = read_pom(&path).ok()?;
        let candidate_group = candidate
            .group_id
            .as_deref()
            .or_else(|| candidate.parent.as_ref()?.group_id.as_deref());
        (candidate_group == Some(group) && candidate.artifact_id.as_deref() == Some(artifact))
            .then_some(path)
    }

    fn merge(
        &mut self,
        pom: Pom,
        pom_path: &Path,
        parent: Option<&EffectivePom>,
        chain: &[PathBuf],
    ) -> EffectivePom {
        let mut context = parent
            .map(|p| DescriptorContext::layered_on(&p.context))
            .unwrap_or_default();

        let parent_ref = pom.parent.clone().unwrap_or_default();
        let group_id = pom.group_id.clone().or_else(|| parent_ref.group_id.clone());
        let version = pom.version.clone().or_else(|| parent_ref.version.clone());
        let artifact_id = pom.artifact_id.clone();

        let mut builtins: Vec<(&str, Option<String>)> = vec![
            ("project.groupId", group_id.clone()),
            ("project.artifactId", artifact_id.clone()),
            ("project.version", version.clone()),
            (
                "project.packaging",
                Some(pom.packaging.clone().unwrap_or_else(|| "jar".to_string())),
            ),
            ("pom.groupId", group_id.clone()),
            ("pom.artifactId", artifact_id.clone()),
            ("pom.version", version.clone()),
            ("project.parent.groupId", parent_ref.group_id.clone()),
            ("project.parent.artifactId", parent_ref.artifact_id.clone()),
            ("project.parent.version", parent_ref.version.clone()),
            ("parent.groupId", parent_ref.group_id.clone()),
            ("parent.artifactId", parent_ref.artifact_id.clone()),
            ("parent.version", parent_ref.version.clone()),
        ];
        if let Some(dir) = pom_path.parent() {
            let dir = dir.to_string_lossy().into_owned();
            builtins.push(("project.basedir", Some(dir.clone())));
            builtins.push(("basedir", Some(dir)));
        }
        for (name, value) in builtins {
            if let Some(value) = value {
                context.set_property(name, value);
            }
        }
        for (name, value) in &pom.properties {
            context.set_property(name.clone(), value.clone());
        }

        let mut imports = Vec::new();
        for raw in &pom.dependency_management {
            let (Some(g), Some(a)) = (raw.group_id.as_deref(), raw.artifact_id.as_deref()) else {
                continue;
            };
            let g = interpolate(g, &context.properties);
            let a = interpolate(a, &context.properties);
            let is_import = raw
                .scope
                .as_deref()
                .is_some_and(|s| Scope::parse(&interpolate(s, &context.properties)) == Scope::Import);
            if is_import {
                imports.push((g, a, raw.version.clone()));
                continue;
            }
            context.manage(
                identity_key(&g, &a),
                ManagedDependency {
                    version: raw.version.clone(),
                    scope: raw.scope.clone(),
                    classifier: raw.classifier.clone(),
                    exclusions: raw.exclusions.clone(),
                },
            );
        }

        for (g, a, v) in imports {
            let Some(v) = v.map(|v| interpolate(&v, &context.properties)) else {
                continue;
            };
            for (identity, managed) in self.imported_management(&g, &a, &v, chain) {
                context.managed.entry(identity).or_insert(managed);
            }
        }

        let mut dependencies = pom.dependencies;
        if let Some(parent) = parent {
            dependencies.extend(parent.dependencies.iter().cloned());
        }

        EffectivePom {
            path: pom_path.to_path_buf(),
            group_id,
            artifact_id,
            version,
            context,
            dependencies,
        }
    }

    /// Managed rows of a bill of materials, interpolated in its own context.
    fn imported_management(
        &mut self,
        group: &str,
        artifact: &str,
        version: &str,
        chain: &[PathBuf],
    ) -> Vec<(String, ManagedDependency)> {
        let path = self.repository.pom_path(group, artifact, version);
        self.inputs.insert(path.clone());
        if !path.is_file() || chain.contains(&canonical(&path)) {
            debug!(bom = %identity_key(group, artifact), "imported bill of materials unavailable");
            return Vec::new();
        }
        let bom = match self.effective(&path, chain) {
            Ok(bom) => bom,
            Err(e) => {
                debug!(bom = %path.display(), error = %e, "imported bill of materials unusable");
                return Vec::new();
            }
        };
        bom.context
            .managed
            .iter()
            .map(|(identity, m)| {
                let resolve = |v: &Option<String>| v.as_deref().map(|v| bom.interpolate(v));
                (
                    identity.clone(),
                    ManagedDependency {
                        version: resolve(&m.version),
                        scope: resolve(&m.scope),
                        classifier: resolve(&m.classifier),
                        exclusions: m.exclusions.clone(),
                    },
                )
            })
            .collect()
    }

    /// Descriptor of a resolved dependency, if installed and readable.
    fn dependency_pom(&mut self, coord: &Coordinate) -> Option<Rc<EffectivePom>> {
        let path = self
            .repository
            .pom_path(&coord.group_id, &coord.artifact_id, &coord.version);
        if !path.is_file() {
            self.inputs.insert(path);
            debug!(dependency = %coord, "no descriptor in repository, no transitive dependencies");
            return None;
        }
        match self.effective(&path, &[]) {
            Ok(effective) => Some(effective),
            Err(e) => {
                debug!(dependency = %coord, error = %e, "skipping unparsable descriptor");
                None
            }
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "pom-class-finder-resolver-{}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos(),
            n
        ))
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn dep(g: &str, a: &str, v: Option<&str>, extra: &str) -> String {
        let version = v.map(|v| format!("<version>{v}</version>")).unwrap_or_default();
        format!(
            "<dependency><groupId>{g}</groupId><artifactId>{a}</artifactId>{version}{extra}</dependency>"
        )
    }

    fn project(g: &str, a: &str, v: &str, body: &str) -> String {
        format!(
            "<project><groupId>{g}</groupId><artifactId>{a}</artifactId><version>{v}</version>{body}</project>"
        )
    }

    fn deps(items: &[String]) -> String {
        format!("<dependencies>{}</dependencies>", items.concat())
    }

    /// Installs a descriptor into the repository layout.
    fn install(repo: &Path, g: &str, a: &str, v: &str, body: &str) {
        let path = Repository::new(repo).pom_path(g, a, v);
        write(&path, &project(g, a, v, body));
    }

    fn ids(coords: &[Coordinate]) -> Vec<String> {
        coords.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn interpolation_is_recursive_and_tolerant() {
        let props = HashMap::from([
            ("a".to_string(), "${b}".to_string()),
            ("b".to_string(), "1.${c}".to_string()),
            ("c".to_string(), "2".to_string()),
            ("loop".to_string(), "${loop}".to_string()),
        ]);
        assert_eq!(interpolate("v${a}", &props), "v1.2");
        assert_eq!(interpolate("${missing}", &props), "${missing}");
        assert_eq!(interpolate("${loop}", &props), "${loop}");
        assert_eq!(interpolate("plain", &props), "plain");
    }

    #[test]
    fn mediation_prefers_nearest_then_first() {
        let a1 = Coordinate::new("g", "a", "1").with_depth(2);
        let b = Coordinate::new("g", "b", "1").with_depth(1);
        let a2 = Coordinate::new("g", "a", "2").with_depth(1);
        let a3 = Coordinate::new("g", "a", "3").with_depth(1);
        let out = mediate(vec![a1, b, a2, a3]);
        assert_eq!(ids(&out), vec!["g:a:2", "g:b:1"]);
    }

    #[test]
    fn ancestor_path_is_persistent() {
        let root = AncestorPath::empty().push("root");
        let left = root.push("left");
        let right = root.push("right");
        assert!(left.contains("root"));
        assert!(left.contains("left"));
        assert!(!left.contains("right"));
        assert!(!root.contains("left"));
        assert_eq!(right.len(), 2);
        assert!(AncestorPath::empty().is_empty());
    }

    #[test]
    fn parent_properties_and_management_are_inherited() {
        let base = temp_dir();
        let repo = base.join("repo");
        write(
            &base.join("pom.xml"),
            &project(
                "org.acme",
                "parent",
                "1.0",
                &format!(
                    "<properties><lib.version>1.1</lib.version><shadowed>parent</shadowed></properties>\
                     <dependencyManagement>{}</dependencyManagement>",
                    deps(&[dep("org.lib", "managed", Some("${managed.version}"), "")])
                ),
            ),
        );
        let child = base.join("app/pom.xml");
        write(
            &child,
            &format!(
                "<project><parent><groupId>org.acme</groupId><artifactId>parent</artifactId><version>1.0</version></parent>\
                 <artifactId>app</artifactId>\
                 <properties><shadowed>child</shadowed><managed.version>3.0</managed.version></properties>{}</project>",
                deps(&[
                    dep("org.lib", "lib", Some("${lib.version}"), ""),
                    dep("org.lib", "shadow", Some("${shadowed}"), ""),
                    dep("org.lib", "managed", None, ""),
                    dep("${project.groupId}", "sibling", Some("${project.version}"), ""),
                    dep("org.lib", "unversioned", None, ""),
                ])
            ),
        );

        let resolver = Resolver::new(Repository::new(&repo));
        let effective = resolver.resolve_context(&child).unwrap();
        assert_eq!(effective.context.property("lib.version"), Some("1.1"));
        assert_eq!(effective.context.property("shadowed"), Some("child"));
        assert_eq!(effective.context.property("project.version"), Some("1.0"));

        let coords = resolver
            .resolve_dependencies(&child, &ResolveOptions::default())
            .unwrap();
        assert_eq!(
            ids(&coords),
            vec![
                "org.lib:lib:1.1",
                "org.lib:shadow:child",
                "org.lib:managed:3.0",
                "org.acme:sibling:1.0",
            ]
        );
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn parent_falls_back_to_repository_and_may_be_absent() {
        let base = temp_dir();
        let repo = base.join("repo");
        install(
            &repo,
            "org.acme",
            "bom-parent",
            "2.0",
            "<properties><x.version>9</x.version></properties>",
        );
        let pom = base.join("project/pom.xml");
        write(
            &pom,
            &format!(
                "<project><parent><groupId>org.acme</groupId><artifactId>bom-parent</artifactId><version>2.0</version>\
                 <relativePath>../nowhere</relativePath></parent><artifactId>p</artifactId>{}</project>",
                deps(&[dep("g", "x", Some("${x.version}"), "")])
            ),
        );
        let resolver = Resolver::new(Repository::new(&repo));
        let coords = resolver
            .resolve_dependencies(&pom, &ResolveOptions::default())
            .unwrap();
        assert_eq!(ids(&coords), vec!["g:x:9"]);

        let orphan = base.join("orphan/pom.xml");
        write(
            &orphan,
            &format!(
                "<project><parent><groupId>none</groupId><artifactId>none</artifactId><version>1</version></parent>\
                 <artifactId>o</artifactId>{}</project>",
                deps(&[dep("g", "y", Some("1"), ""), dep("g", "z", Some("${unknown}"), "")])
            ),
        );
        let coords = resolver
            .resolve_dependencies(&orphan, &ResolveOptions::default())
            .unwrap();
        assert_eq!(ids(&coords), vec!["g:y:1"]);
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn bill_of_materials_import_supplies_versions() {
        let base = temp_dir();
        let repo = base.join("repo");
        install(
            &repo,
            "org.bom",
            "bom",
            "5",
            &format!(
                "<properties><v>5.1</v></properties><dependencyManagement>{}</dependencyManagement>",
                deps(&[
                    dep("org.bom", "one", Some("${v}"), ""),
                    dep("org.bom", "two", Some("${v}"), ""),
                ])
            ),
        );
        let pom = base.join("pom.xml");
        write(
            &pom,
            &project(
                "app",
                "app",
                "1",
                &format!(
                    "<dependencyManagement>{}</dependencyManagement>{}",
                    deps(&[
                        dep("org.bom", "bom", Some("5"), "<type>pom</type><scope>import</scope>"),
                        dep("org.bom", "two", Some("2.0"), ""),
                    ]),
                    deps(&[dep("org.bom", "one", None, ""), dep("org.bom", "two", None, "")])
                ),
            ),
        );
        let resolver = Resolver::new(Repository::new(&repo));
        let coords = resolver
            .resolve_dependencies(&pom, &ResolveOptions::default())
            .unwrap();
        assert_eq!(ids(&coords), vec!["org.bom:one:5.1", "org.bom:two:2.0"]);
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn transitive_resolution_is_nearest_wins_and_scoped() {
        let base = temp_dir();
        let repo = base.join("repo");
        install(
            &repo,
            "g",
            "a",
            "1",
            &deps(&[
                dep("g", "shared", Some("2"), ""),
                dep("g", "deep", Some("1"), ""),
                dep("g", "opt", Some("1"), "<optional>true</optional>"),
                dep("g", "tst", Some("1"), "<scope>test</scope>"),
                dep("g", "rt", Some("1"), "<scope>runtime</scope>"),
            ]),
        );
        install(&repo, "g", "deep", "1", &deps(&[dep("g", "deeper", Some("1"), "")]));
        install(&repo, "g", "shared", "1", "");
        let pom = base.join("pom.xml");
        write(
            &pom,
            &project(
                "root",
                "root",
                "1",
                &deps(&[
                    dep("g", "a", Some("1"), ""),
                    dep("g", "shared", Some("1"), ""),
                    dep("g", "junit", Some("4"), "<scope>test</scope>"),
                    dep("g", "missing", Some("1"), ""),
                ]),
            ),
        );
        let resolver = Resolver::new(Repository::new(&repo));

        let coords = resolver
            .resolve_dependencies(&pom, &ResolveOptions::default())
            .unwrap();
        assert_eq!(
            ids(&coords),
            vec!["g:a:1", "g:shared:1", "g:missing:1", "g:deep:1", "g:rt:1", "g:deeper:1"]
        );
        let depth: HashMap<String, u32> =
            coords.iter().map(|c| (c.artifact_id.clone(), c.depth)).collect();
        assert_eq!(depth["deep"], 1);
        assert_eq!(depth["deeper"], 2);
        let rt = coords.iter().find(|c| c.artifact_id == "rt").unwrap();
        assert_eq!(rt.effective_scope(), Scope::Runtime);

        let shallow = ResolveOptions {
            max_depth: 1,
            ..ResolveOptions::default()
        };
        let coords = resolver.resolve_dependencies(&pom, &shallow).unwrap();
        assert!(!coords.iter().any(|c| c.artifact_id == "deeper"));

        let direct_only = ResolveOptions {
            include_transitive: false,
            scopes: BTreeSet::from([Scope::Compile, Scope::Test]),
            ..ResolveOptions::default()
        };
        let coords = resolver.resolve_dependencies(&pom, &direct_only).unwrap();
        assert_eq!(
            ids(&coords),
            vec!["g:a:1", "g:shared:1", "g:junit:4", "g:missing:1"]
        );
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn exclusions_apply_along_the_path() {
        let base = temp_dir();
        let repo = base.join("repo");
        install(&repo, "g", "a", "1", &deps(&[dep("g", "b", Some("1"), "")]));
        install(
            &repo,
            "g",
            "b",
            "1",
            &deps(&[dep("log", "commons-logging", Some("1"), ""), dep("g", "c", Some("1"), "")]),
        );
        let pom = base.join("pom.xml");
        write(
            &pom,
            &project(
                "root",
                "root",
                "1",
                &deps(&[dep(
                    "g",
                    "a",
                    Some("1"),
                    "<exclusions><exclusion><groupId>log</groupId><artifactId>*</artifactId></exclusion></exclusions>",
                )]),
            ),
        );
        let resolver = Resolver::new(Repository::new(&repo));
        let coords = resolver
            .resolve_dependencies(&pom, &ResolveOptions::default())
            .unwrap();
        assert_eq!(ids(&coords), vec!["g:a:1", "g:b:1", "g:c:1"]);
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn cycles_terminate() {
        let base = temp_dir();
        let repo = base.join("repo");
        install(&repo, "g", "a", "1", &deps(&[dep("g", "b", Some("1"), "")]));
        install(
            &repo,
            "g",
            "b",
            "1",
            &deps(&[dep("g", "a", Some("1"), ""), dep("root", "root", Some("1"), "")]),
        );
        let pom = base.join("pom.xml");
        write(&pom, &project("root", "root", "1", &deps(&[dep("g", "a", Some("1"), "")])));
        let resolver = Resolver::new(Repository::new(&repo));
        let coords = resolver
            .resolve_dependencies(&pom, &ResolveOptions::default())
            .unwrap();
        assert_eq!(ids(&coords), vec!["g:a:1", "g:b:1"]);
        assert_eq!(coords[1].depth, 1);
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn root_management_overrides_transitive_versions() {
        let base = temp_dir();
        let repo = base.join("repo");
        install(&repo, "g", "a", "1", &deps(&[dep("g", "b", Some("1"), "")]));
        let pom = base.join("pom.xml");
        write(
            &pom,
            &project(
                "root",
                "root",
                "1",
                &format!(
                    "<dependencyManagement>{}</dependencyManagement>{}",
                    deps(&[dep("g", "b", Some("7"), "")]),
                    deps(&[dep("g", "a", Some("1"), "")])
                ),
            ),
        );
        let resolver = Resolver::new(Repository::new(&repo));
        let coords = resolver
            .resolve_dependencies(&pom, &ResolveOptions::default())
            .unwrap();
        assert_eq!(ids(&coords), vec!["g:a:1", "g:b:7"]);
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn broken_transitive_descriptor_is_skipped() {
        let base = temp_dir();
        let repo = base.join("repo");
        let broken = Repository::new(&repo).pom_path("g", "broken", "1");
        write(&broken, "<project><dependencies></project>");
        install(&repo, "g", "ok", "1", &deps(&[dep("g", "child", Some("1"), "")]));
        let pom = base.join("pom.xml");
        write(
            &pom,
            &project(
                "root",
                "root",
                "1",
                &deps(&[dep("g", "broken", Some("1"), ""), dep("g", "ok", Some("1"), "")]),
            ),
        );
        let resolver = Resolver::new(Repository::new(&repo));
        let resolution = resolver.resolve(&pom, &ResolveOptions::default()).unwrap();
        assert_eq!(
            ids(&resolution.coordinates),
            vec!["g:broken:1", "g:ok:1", "g:child:1"]
        );
        assert!(resolution.inputs.iter().any(|p| p.ends_with("broken-1.pom")));
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn malformed_root_descriptor_is_a_parse_failure() {
        let base = temp_dir();
        let pom = base.join("pom.xml");
        write(&pom, "<project><unclosed></project>");
        let resolver = Resolver::new(Repository::new(base.join("repo")));
        let err = resolver
            .resolve_dependencies(&pom, &ResolveOptions::default())
            .unwrap_err();
        assert!(matches!(err, crate::error::FinderError::ParseFailure { .. }));
        let _ = fs::remove_dir_all(base);
    }
}
