//! Running Lua in tests
//!
//! Results are rendered to strings so a bundle's result can be compared
//! with what the plain interpreter produces for the same module tree.

use mlua::{Lua, Table, Value};
use std::path::Path;

const MAX_DEPTH: usize = 8;

/// Run a bundle as a chunk and render what it returns
pub fn eval_bundle(source: &str) -> Result<String, String> {
    let lua = Lua::new();
    let value: Value = lua
        .load(source)
        .set_name("=bundle")
        .eval()
        .map_err(|e| e.to_string())?;
    Ok(render(&value))
}

/// `require(entry)` with the interpreter's own module loader rooted at
/// `root`, rendering what it returns
pub fn eval_native(root: &Path, entry: &str) -> Result<String, String> {
    let lua = Lua::new();
    let root = root.to_string_lossy().replace('\\', "/");
    let package: Table = lua.globals().get("package").map_err(|e| e.to_string())?;
    package
        .set("path", format!("{root}/?.lua;{root}/?/init.lua"))
        .map_err(|e| e.to_string())?;

    let value: Value = lua
        .load(format!("return (require({:?}))", entry))
        .set_name("=native")
        .eval()
        .map_err(|e| e.to_string())?;
    Ok(render(&value))
}

/// Deterministic text form of a Lua value. Table entries are sorted.
pub fn render(value: &Value) -> String {
    render_at(value, 0)
}

fn render_at(value: &Value, depth: usize) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => format!("{:?}", n),
        Value::String(s) => format!("{:?}", s.to_string_lossy()),
        Value::Table(table) if depth < MAX_DEPTH => {
            let mut entries: Vec<String> = table
                .clone()
                .pairs::<Value, Value>()
                .filter_map(|pair| pair.ok())
                .map(|(key, value)| {
                    format!(
                        "{}={}",
                        render_at(&key, depth + 1),
                        render_at(&value, depth + 1)
                    )
                })
                .collect();
            entries.sort();
            format!("{{{}}}", entries.join(","))
        }
        Value::Table(_) => "{...}".to_string(),
        other => other.type_name().to_string(),
    }
}
