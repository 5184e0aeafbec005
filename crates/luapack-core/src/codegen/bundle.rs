use super::lua_string::quote;
use crate::module_resolver::{relative_key, DependencyGraph, ModuleRecord};
use luapack_runtime::module::{BUNDLE_HEADER, DEFINE_FN, MODULE_PRELUDE, REQUIRE_FN};
use std::path::Path;
use tracing::debug;

const BOM: &str = "\u{feff}";

/// Writes a dependency graph out as one self-executing Lua chunk.
///
/// Layout:
/// - header and the module registry prelude
/// - one `__define(id, filename, function(...) <body> end)` unit per
///   module, in first-discovery order. `filename` is the module's path
///   relative to the entry module's directory.
/// - `return __require(<entry id>)`
#[derive(Debug, Default)]
pub struct BundleEmitter {
    output: String,
}

impl BundleEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(mut self, graph: &DependencyGraph) -> String {
        self.write(BUNDLE_HEADER);
        self.writeln("");
        self.write(MODULE_PRELUDE);
        self.writeln("");

        let root = graph
            .entry_module()
            .and_then(|entry| entry.path.parent())
            .unwrap_or_else(|| Path::new(""));
        for module in graph.modules() {
            self.emit_module(module, &relative_key(root, &module.path));
        }

        self.writeln("-- Execute entry point");
        self.writeln(&format!(
            "return {}({})",
            REQUIRE_FN,
            quote(graph.entry().as_str())
        ));

        debug!(
            "Emitted {} module(s), {} bytes",
            graph.len(),
            self.output.len()
        );
        self.output
    }

    fn emit_module(&mut self, module: &ModuleRecord, filename: &str) {
        let id = quote(module.id.as_str());
        self.writeln(&format!("-- Module: {}", module.id));
        self.writeln(&format!(
            "{}({}, {}, function(...)",
            DEFINE_FN,
            id,
            quote(filename)
        ));

        let body = rewrite_module(module);
        self.write(&body);
        // A trailing line comment would otherwise swallow the `end`
        if !body.is_empty() && !body.ends_with('\n') {
            self.writeln("");
        }

        self.writeln("end)");
        self.writeln("");
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn writeln(&mut self, s: &str) {
        self.output.push_str(s);
        self.output.push('\n');
    }
}

/// Module source with every reference call replaced by a bundle-local
/// `__require` of its target id. All other bytes are copied verbatim,
/// except that a byte order mark is dropped and a shebang line is turned
/// into a comment, since neither is legal inside a function body.
pub fn rewrite_module(module: &ModuleRecord) -> String {
    let source = module.source.as_str();
    let mut out = String::with_capacity(source.len() + module.references.len() * 16);

    let mut cursor = if source.starts_with(BOM) { BOM.len() } else { 0 };
    if source[cursor..].starts_with('#') {
        out.push_str("--");
    }

    for reference in &module.references {
        out.push_str(&source[cursor..reference.span.start]);
        out.push_str(REQUIRE_FN);
        out.push('(');
        out.push_str(&quote(reference.target.as_str()));
        out.push(')');
        cursor = reference.span.end;
    }
    out.push_str(&source[cursor..]);
    out
}
