//! The manifest: one explicit object owning every derived index for a scan
//! root.
//!
//! Nothing here is process-global. Embedders construct a [`Manifest`] (or
//! several, for several roots) and pass it to whatever needs type lookups or
//! configuration; the environment snapshot it evaluates against is injected
//! the same way.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use strata_cache::{decode, encode, CacheKey, CacheStore};
use strata_config::{
    build_merged, load_fragment_file, prefilter, sort_fragments, ConfigFragment, Environment,
    MergedConfig, StaticContext, VariantResolver,
};
use strata_index::{extract_file_facts, FileFacts, TypeIndex, TypeIndexBuilder};

use crate::error::{ManifestError, Result};
use crate::modules::{discover_modules, fragment_files, Module};
use crate::walker::{FileWalker, WalkOptions};

/// Bump when any persisted shape changes; old blobs become orphaned misses
/// rather than decode hazards.
const SCHEMA_VERSION: &str = "1";

const SOURCE_EXTENSION: &str = "php";

#[derive(Debug, Clone, Copy)]
pub struct RebuildOptions {
    /// Also scan conventional test directories.
    pub include_test_dirs: bool,
    /// Rebuild the derived indexes from the tree instead of trusting their
    /// cached blobs. Per-file parse facts stay usable either way — their
    /// keys are content-addressed.
    pub force_regen: bool,
    /// Persist rebuilt artifacts back to the store.
    pub write_cache: bool,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self {
            include_test_dirs: false,
            force_regen: false,
            write_cache: true,
        }
    }
}

pub struct Manifest {
    root: PathBuf,
    store: Arc<dyn CacheStore>,
    environment: Environment,
    modules: Vec<Module>,
    index: TypeIndex,
    resolver: VariantResolver,
    write_cache: bool,
}

impl std::fmt::Debug for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manifest")
            .field("root", &self.root)
            .field("store", &"<dyn CacheStore>")
            .field("environment", &self.environment)
            .field("modules", &self.modules)
            .field("index", &self.index)
            .field("resolver", &self.resolver)
            .field("write_cache", &self.write_cache)
            .finish()
    }
}

impl Manifest {
    /// Scan `root` and build (or load from cache) every index.
    pub fn build(
        root: impl AsRef<Path>,
        store: Arc<dyn CacheStore>,
        environment: Environment,
        options: RebuildOptions,
    ) -> Result<Self> {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root).map_err(|source| ManifestError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let mut manifest = Self {
            root,
            store,
            environment,
            modules: Vec::new(),
            index: TypeIndex::default(),
            resolver: VariantResolver::new(Vec::new()),
            write_cache: options.write_cache,
        };
        manifest.rebuild(options)?;
        Ok(manifest)
    }

    /// Re-run the whole build. Fatal errors leave the previous state
    /// untouched and nothing partial in the cache.
    pub fn rebuild(&mut self, options: RebuildOptions) -> Result<()> {
        self.write_cache = options.write_cache;
        self.modules = discover_modules(&self.root)?;

        let index = self.load_or_build_index(&options)?;
        let fragments = self.load_or_build_fragments(&index, &options)?;

        tracing::info!(
            target = "strata.manifest",
            root = %self.root.display(),
            modules = self.modules.len(),
            classes = index.classes.len(),
            interfaces = index.interfaces.len(),
            fragments = fragments.len(),
            "manifest built"
        );

        self.index = index;
        self.resolver = VariantResolver::new(fragments);
        Ok(())
    }

    // ---- public query operations ----

    /// Absolute source path for a class or interface, case-insensitive.
    pub fn path_for_type(&self, name: &str) -> Option<PathBuf> {
        self.index.path_for_type(name).map(|rel| self.root.join(rel))
    }

    /// All transitive subtypes, in deterministic order.
    pub fn descendants_of(&self, name: &str) -> &[String] {
        self.index.descendants_of(name)
    }

    /// Classes directly declaring the interface.
    pub fn implementors_of(&self, name: &str) -> &[String] {
        self.index.implementors_of(name)
    }

    /// One configuration value from the merged config of the active
    /// variant.
    pub fn config_value(&mut self, type_name: &str, property: &str) -> Result<Option<Value>> {
        self.ensure_merged()?;
        Ok(self
            .resolver
            .cached()
            .and_then(|(_, merged)| merged.get(type_name, property))
            .cloned())
    }

    pub fn config_value_or(
        &mut self,
        type_name: &str,
        property: &str,
        default: Value,
    ) -> Result<Value> {
        Ok(self.config_value(type_name, property)?.unwrap_or(default))
    }

    pub fn merged_config(&mut self) -> Result<&MergedConfig> {
        self.ensure_merged()?;
        Ok(self
            .resolver
            .cached()
            .expect("merged configuration just ensured")
            .1)
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn type_index(&self) -> &TypeIndex {
        &self.index
    }

    pub fn fragments(&self) -> &[ConfigFragment] {
        self.resolver.fragments()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Switch the active environment snapshot. The merged configuration is
    /// re-resolved lazily on the next read — only if the variant key
    /// actually changed.
    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment;
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.store.clear()?;
        Ok(())
    }

    // ---- build internals ----

    fn load_or_build_index(&self, options: &RebuildOptions) -> Result<TypeIndex> {
        let key = self.index_key(options.include_test_dirs);
        if !options.force_regen {
            if let Some(index) = self.store.load(&key).and_then(|b| decode::<TypeIndex>(&b)) {
                tracing::debug!(target = "strata.manifest", key = %key, "type index cache hit");
                return Ok(index);
            }
        }

        let walk_options = if options.include_test_dirs {
            WalkOptions::default().including_tests()
        } else {
            WalkOptions::default()
        };

        let mut all_facts: Vec<FileFacts> = Vec::new();
        for module in &self.modules {
            let walker = FileWalker::new(&module.root, SOURCE_EXTENSION, walk_options);
            walker.walk(|path| {
                all_facts.push(self.facts_for_file(path, options)?);
                Ok(())
            })?;
        }

        // Merge order must not depend on discovery order.
        all_facts.sort_by(|a, b| a.path.cmp(&b.path));

        let mut builder = TypeIndexBuilder::new();
        for facts in &all_facts {
            builder.add_file(facts)?;
        }
        let index = builder.finish()?;

        if options.write_cache {
            self.store.save(&key, &encode(&index)?)?;
        }
        Ok(index)
    }

    /// Facts for one source file, through the per-file incremental cache.
    ///
    /// The key covers path, content hash and schema version, so a hit can
    /// never be stale — unchanged files skip re-parsing even on a forced
    /// rebuild. A changed file simply misses.
    fn facts_for_file(&self, path: &Path, options: &RebuildOptions) -> Result<FileFacts> {
        let bytes = std::fs::read(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        let rel = self.relative_path(path);

        let key = CacheKey::hasher()
            .update("file-facts")
            .update(SCHEMA_VERSION)
            .update(&rel)
            .update(text.as_bytes())
            .finish();

        if let Some(facts) = self.store.load(&key).and_then(|b| decode::<FileFacts>(&b)) {
            return Ok(facts);
        }

        let facts = extract_file_facts(&rel, &text)?;
        if options.write_cache {
            self.store.save(&key, &encode(&facts)?)?;
        }
        Ok(facts)
    }

    fn load_or_build_fragments(
        &self,
        index: &TypeIndex,
        options: &RebuildOptions,
    ) -> Result<Vec<ConfigFragment>> {
        let key = self.fragments_key();
        if !options.force_regen {
            if let Some(fragments) = self
                .store
                .load(&key)
                .and_then(|b| decode::<Vec<ConfigFragment>>(&b))
            {
                tracing::debug!(target = "strata.manifest", key = %key, "fragment list cache hit");
                return Ok(fragments);
            }
        }

        let mut fragments = Vec::new();
        for module in &self.modules {
            for file in fragment_files(module)? {
                let text = std::fs::read_to_string(&file).map_err(|source| ManifestError::Io {
                    path: file.clone(),
                    source,
                })?;
                let stem = file
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                fragments.extend(load_fragment_file(&module.name, &stem, &text)?);
            }
        }

        let statics = BuildStatics {
            index,
            modules: self
                .modules
                .iter()
                .map(|m| m.name.to_lowercase())
                .collect(),
        };
        let fragments = sort_fragments(prefilter(fragments, &statics))?;

        if options.write_cache {
            self.store.save(&key, &encode(&fragments)?)?;
        }
        Ok(fragments)
    }

    /// Make sure the resolver holds the merged configuration for the
    /// current variant, loading it from the store or building it.
    fn ensure_merged(&mut self) -> Result<()> {
        let variant = self.resolver.variant_key(&self.environment);
        if self
            .resolver
            .cached()
            .is_some_and(|(cached, _)| cached == &variant)
        {
            return Ok(());
        }

        let store_key = self.merged_key(&variant);
        if let Some(merged) = self
            .store
            .load(&store_key)
            .and_then(|b| decode::<MergedConfig>(&b))
        {
            tracing::debug!(target = "strata.manifest", variant = %variant, "merged config cache hit");
            self.resolver.restore(variant, merged);
            return Ok(());
        }

        let merged = build_merged(
            self.resolver.fragments(),
            &self.environment,
            &self.index.defaults,
        );
        if self.write_cache {
            self.store.save(&store_key, &encode(&merged)?)?;
        }
        self.resolver.restore(variant, merged);
        Ok(())
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn root_id(&self) -> String {
        self.root.to_string_lossy().to_string()
    }

    fn index_key(&self, include_test_dirs: bool) -> CacheKey {
        CacheKey::hasher()
            .update("type-index")
            .update(SCHEMA_VERSION)
            .update(self.root_id())
            .update(if include_test_dirs { "tests" } else { "no-tests" })
            .finish()
    }

    fn fragments_key(&self) -> CacheKey {
        CacheKey::hasher()
            .update("fragments")
            .update(SCHEMA_VERSION)
            .update(self.root_id())
            .finish()
    }

    fn merged_key(&self, variant: &CacheKey) -> CacheKey {
        CacheKey::hasher()
            .update("merged")
            .update(SCHEMA_VERSION)
            .update(self.root_id())
            .update(variant.as_str())
            .finish()
    }
}

/// Static predicate facts for the prefilter: what the build just learned.
struct BuildStatics<'a> {
    index: &'a TypeIndex,
    modules: BTreeSet<String>,
}

impl StaticContext for BuildStatics<'_> {
    fn class_exists(&self, name: &str) -> bool {
        self.index.has_type(name)
    }

    fn module_exists(&self, name: &str) -> bool {
        self.modules.contains(&name.to_lowercase())
    }
}
