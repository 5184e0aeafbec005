//! Test fixtures - module trees written to a temporary directory

use indoc::indoc;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A directory of Lua modules that is removed when dropped
pub struct ModuleTree {
    dir: TempDir,
}

impl ModuleTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    /// Add a file, creating parent directories as needed
    pub fn with(self, relative: &str, content: &str) -> Self {
        self.write(relative, content);
        self
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create module dir");
        }
        fs::write(&path, content).expect("failed to write module");
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }
}

impl Default for ModuleTree {
    fn default() -> Self {
        Self::new()
    }
}

/// `main` requires `a`, which requires `b`, which returns 42
pub fn chain_tree() -> ModuleTree {
    ModuleTree::new()
        .with(
            "main.lua",
            indoc! {r#"
                local a = require("a")
                return a.value
            "#},
        )
        .with(
            "a.lua",
            indoc! {r#"
                local b = require("b")
                return { value = b }
            "#},
        )
        .with("b.lua", "return 42\n")
}

/// `main` reaches `shared` through both `left` and `right`. `shared`
/// counts how often its body runs in the global `loads`.
pub fn diamond_tree() -> ModuleTree {
    ModuleTree::new()
        .with(
            "main.lua",
            indoc! {r#"
                local left = require("left")
                local right = require("right")
                return { loads = loads, same = left.shared == right.shared }
            "#},
        )
        .with(
            "left.lua",
            indoc! {r#"
                return { shared = require("shared") }
            "#},
        )
        .with(
            "right.lua",
            indoc! {r#"
                return { shared = require("shared") }
            "#},
        )
        .with(
            "shared.lua",
            indoc! {r#"
                loads = (loads or 0) + 1
                return {}
            "#},
        )
}

/// `a` and `b` require each other; `b` records what it saw for `a`
pub fn cycle_tree() -> ModuleTree {
    ModuleTree::new()
        .with(
            "main.lua",
            indoc! {r#"
                local a = require("a")
                return a.name .. ":" .. a.peer
            "#},
        )
        .with(
            "a.lua",
            indoc! {r#"
                local M = { name = "a" }
                local b = require("b")
                M.peer = b.saw
                return M
            "#},
        )
        .with(
            "b.lua",
            indoc! {r#"
                local a = require("a")
                return { saw = tostring(a) }
            "#},
        )
}

/// Like [`cycle_tree`], but `a` publishes itself through
/// `package.loaded[...]` before requiring `b`, so `b` sees the partial table
pub fn published_cycle_tree() -> ModuleTree {
    ModuleTree::new()
        .with(
            "main.lua",
            indoc! {r#"
                local a = require("a")
                return a.name .. ":" .. a.peer
            "#},
        )
        .with(
            "a.lua",
            indoc! {r#"
                local M = { name = "a" }
                package.loaded[...] = M
                local b = require("b")
                M.peer = b.saw
                return M
            "#},
        )
        .with(
            "b.lua",
            indoc! {r#"
                local a = require("a")
                return { saw = tostring(a and a.name) }
            "#},
        )
}

/// Dotted and directory (`init.lua`) module names. `shapes/init.lua`
/// names `lib.util` from a subdirectory, so bundling it needs the tree
/// root as a search path.
pub fn package_tree() -> ModuleTree {
    ModuleTree::new()
        .with(
            "main.lua",
            indoc! {r#"
                local util = require("lib.util")
                local shapes = require("shapes")
                return util.double(shapes.square(3))
            "#},
        )
        .with(
            "lib/util.lua",
            indoc! {r#"
                local M = {}
                function M.double(x) return x * 2 end
                return M
            "#},
        )
        .with(
            "shapes/init.lua",
            indoc! {r#"
                local util = require("lib.util")
                return { square = function(x) return util.double(x) * x / 2 end }
            "#},
        )
}
