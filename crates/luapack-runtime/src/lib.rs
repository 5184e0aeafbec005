//! Runtime support code for luapack bundles.
//! Provides the Lua snippets the emitter writes into every bundle.

pub mod module;
pub mod stringified;
