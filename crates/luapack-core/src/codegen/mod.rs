//! Bundle emission.

mod bundle;
mod lua_string;

pub use bundle::{rewrite_module, BundleEmitter};
pub use lua_string::quote;
