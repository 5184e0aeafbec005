use crate::codegen::BundleEmitter;
use crate::config::BundlerOptions;
use crate::diagnostics::{DiagnosticHandler, TracingDiagnosticHandler};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::module_resolver::{DependencyGraph, GraphBuilder};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Bundler entry point
/// Wires the file system, options and diagnostic sink together
pub struct Bundler {
    options: BundlerOptions,
    diagnostic_handler: Arc<dyn DiagnosticHandler>,
    file_system: Arc<dyn FileSystem>,
}

impl Bundler {
    /// Create a bundler backed by the real file system
    pub fn new(options: BundlerOptions) -> Self {
        Self::with_dependencies(
            options,
            Arc::new(TracingDiagnosticHandler::new()),
            Arc::new(RealFileSystem::new()),
        )
    }

    /// Create a bundler with custom dependencies (for testing)
    pub fn with_dependencies(
        options: BundlerOptions,
        diagnostic_handler: Arc<dyn DiagnosticHandler>,
        file_system: Arc<dyn FileSystem>,
    ) -> Self {
        Bundler {
            options,
            diagnostic_handler,
            file_system,
        }
    }

    pub fn options(&self) -> &BundlerOptions {
        &self.options
    }

    pub fn diagnostic_handler(&self) -> &Arc<dyn DiagnosticHandler> {
        &self.diagnostic_handler
    }

    /// Resolve the dependency closure of `entry` without emitting anything
    pub fn build_graph(&self, entry: &Path) -> Result<DependencyGraph> {
        GraphBuilder::new(
            self.file_system.clone(),
            self.options.clone(),
            self.diagnostic_handler.clone(),
        )
        .build(entry)
    }

    /// Bundle `entry` and everything it statically requires into one chunk
    pub fn bundle(&self, entry: &Path) -> Result<String> {
        let graph = self.build_graph(entry)?;
        let output = BundleEmitter::new().emit(&graph);
        info!(
            "Bundled {} module(s) from {}",
            graph.len(),
            entry.display()
        );
        Ok(output)
    }
}

/// Bundle `entry` with default options on the real file system
pub fn bundle(entry: impl AsRef<Path>) -> Result<String> {
    Bundler::new(BundlerOptions::default()).bundle(entry.as_ref())
}
