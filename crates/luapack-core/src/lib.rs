//! Static bundler for Lua modules.
//!
//! Starting from an entry file, [`Bundler`] follows every `require` call
//! whose argument is a string literal, resolves it to a file, and writes all
//! reachable modules into one chunk that runs without the module search
//! path. Each module body is wrapped in a loader function and executed at
//! most once, on first require.

pub mod bundler;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod fs;
pub mod module_resolver;
pub mod scanner;
pub mod span;

pub use bundler::{bundle, Bundler};
pub use codegen::BundleEmitter;
pub use config::{BundleTarget, BundlerOptions, CliOverrides, CopyFile, ProjectConfig};
pub use diagnostics::{
    CollectingDiagnosticHandler, Diagnostic, DiagnosticHandler, DiagnosticLevel,
    TracingDiagnosticHandler,
};
pub use errors::BundleError;
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use module_resolver::{DependencyGraph, ModuleId, ModuleRecord, Reference};
pub use span::Span;
