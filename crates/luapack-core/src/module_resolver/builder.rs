use super::graph::{DependencyGraph, ModuleRecord, Reference};
use super::locator::ModuleLocator;
use super::module_id::{ModuleId, ModuleIdAllocator};
use crate::config::BundlerOptions;
use crate::diagnostics::DiagnosticHandler;
use crate::errors::{BundleError, Result};
use crate::fs::FileSystem;
use crate::scanner::{ScanError, Scanner};
use indexmap::IndexMap;
use path_clean::PathClean;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Computes the dependency closure of an entry module.
///
/// Holds no state between builds; everything a build needs lives in
/// [`GraphBuilder::build`].
pub struct GraphBuilder {
    fs: Arc<dyn FileSystem>,
    options: BundlerOptions,
    diagnostics: Arc<dyn DiagnosticHandler>,
}

impl GraphBuilder {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        options: BundlerOptions,
        diagnostics: Arc<dyn DiagnosticHandler>,
    ) -> Self {
        Self {
            fs,
            options,
            diagnostics,
        }
    }

    /// Breadth-first walk from `entry`. Each distinct file is read and
    /// scanned exactly once; references to already discovered files only
    /// add an edge, which is what makes cycles terminate.
    pub fn build(&self, entry: &Path) -> Result<DependencyGraph> {
        let entry_path = self
            .fs
            .canonicalize(entry)
            .map_err(|e| BundleError::io(entry, e))?;
        let root = entry_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let locator = ModuleLocator::new(
            self.fs.clone(),
            self.search_roots(&root),
            self.options.extension.clone(),
        );
        let mut ids = ModuleIdAllocator::new(&root, self.options.extension.clone());

        let entry_id = ids.assign(&entry_path);
        let mut discovered: FxHashMap<PathBuf, ModuleId> = FxHashMap::default();
        discovered.insert(entry_path.clone(), entry_id.clone());
        let mut pending: VecDeque<(ModuleId, PathBuf)> = VecDeque::new();
        pending.push_back((entry_id.clone(), entry_path));

        let mut modules: IndexMap<ModuleId, ModuleRecord> = IndexMap::new();
        let mut reported_externals: FxHashSet<String> = FxHashSet::default();

        while let Some((id, path)) = pending.pop_front() {
            debug!("Scanning {} ({})", id, path.display());
            let source = self
                .fs
                .read_file(&path)
                .map_err(|e| BundleError::io(&path, e))?;

            let scanned = Scanner::new(&source)
                .scan()
                .map_err(|err| match err {
                    ScanError::DynamicReference { call, span } => BundleError::DynamicReference {
                        requester: path.clone(),
                        call,
                        line: span.line,
                        column: span.column,
                    },
                })?;

            for span in &scanned.value_uses {
                self.diagnostics.warning(
                    &path,
                    *span,
                    "`require` is used as a value; only direct calls are bundled",
                );
            }

            let mut references = Vec::with_capacity(scanned.references.len());
            for raw in scanned.references {
                if self.options.is_external(&raw.literal) {
                    if reported_externals.insert(raw.literal.clone()) {
                        self.diagnostics.info(
                            &path,
                            raw.span,
                            &format!("'{}' is external and left to the host", raw.literal),
                        );
                    }
                    continue;
                }

                let target_path = locator.locate(&raw.literal, &path)?;
                let target = match discovered.get(&target_path) {
                    Some(existing) => existing.clone(),
                    None => {
                        let new_id = ids.assign(&target_path);
                        debug!("Discovered {} via '{}'", new_id, raw.literal);
                        discovered.insert(target_path.clone(), new_id.clone());
                        pending.push_back((new_id.clone(), target_path.clone()));
                        new_id
                    }
                };
                trace!("{}: '{}' -> {}", id, raw.literal, target);

                references.push(Reference {
                    literal: raw.literal,
                    span: raw.span,
                    path: target_path,
                    target,
                });
            }

            modules.insert(
                id.clone(),
                ModuleRecord {
                    id,
                    path,
                    source,
                    references,
                },
            );
        }

        let graph = DependencyGraph::new(entry_id, modules);
        debug_assert!(graph.is_closed());

        for group in graph.circular_groups() {
            let names: Vec<&str> = group.iter().map(ModuleId::as_str).collect();
            warn!("Circular dependency: {}", names.join(" -> "));
        }
        debug!("Dependency graph has {} module(s)", graph.len());

        Ok(graph)
    }

    fn search_roots(&self, root: &Path) -> Vec<PathBuf> {
        self.options
            .search_paths
            .iter()
            .map(|path| root.join(path).clean())
            .collect()
    }
}
