//! Test utilities and fixtures for luapack
//!
//! This crate provides shared test helpers that can be used by both
//! unit tests (#[cfg(test)]) and integration tests (tests/ directory).
//! It does not depend on `luapack-core`, so core can take it as a
//! dev-dependency.

pub mod fixtures;
pub mod lua;

pub use fixtures::ModuleTree;
pub use lua::{eval_bundle, eval_native, render};
