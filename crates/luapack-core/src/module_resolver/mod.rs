//! Module location, identification and dependency-closure computation.

mod builder;
mod graph;
mod locator;
mod module_id;

pub use builder::GraphBuilder;
pub use graph::{DependencyGraph, ModuleRecord, Reference};
pub use locator::ModuleLocator;
pub use module_id::ModuleId;
pub(crate) use module_id::relative_key;
