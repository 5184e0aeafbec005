use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Stable key of a module inside a bundle.
///
/// Derived from the module's resolved path relative to the entry module's
/// directory, so it never depends on how a `require` spelled the path nor on
/// where the project lives on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        ModuleId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hands out ids for canonical module paths within one build
#[derive(Debug)]
pub(crate) struct ModuleIdAllocator {
    root: PathBuf,
    extension: String,
    assigned: FxHashMap<ModuleId, PathBuf>,
}

impl ModuleIdAllocator {
    pub(crate) fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            assigned: FxHashMap::default(),
        }
    }

    /// Id for `path`. Calling this twice for the same path yields the same id.
    pub(crate) fn assign(&mut self, path: &Path) -> ModuleId {
        let relative = relative_key(&self.root, path);
        let suffix = format!(".{}", self.extension);
        let short = relative
            .strip_suffix(&suffix)
            .filter(|stem| !stem.is_empty() && !stem.ends_with('/'))
            .unwrap_or(relative.as_str())
            .to_string();

        for candidate in [short, relative.clone()] {
            let id = ModuleId::new(candidate);
            match self.assigned.get(&id) {
                Some(owner) if owner != path => continue,
                Some(_) => return id,
                None => {
                    self.assigned.insert(id.clone(), path.to_path_buf());
                    return id;
                }
            }
        }

        // Both keys belong to other files, e.g. `a` and `a.lua.lua` before `a.lua`
        let id = ModuleId::new(path.to_string_lossy().replace('\\', "/"));
        self.assigned.insert(id.clone(), path.to_path_buf());
        id
    }
}

/// `path` relative to `root`, `/`-separated, using `..` to leave `root`
pub(crate) fn relative_key(root: &Path, path: &Path) -> String {
    let root_parts: Vec<Component> = root.components().collect();
    let path_parts: Vec<Component> = path.components().collect();

    // Different prefixes (e.g. Windows drives) have no relative form
    if root_parts.first() != path_parts.first() {
        return path.to_string_lossy().replace('\\', "/");
    }

    let common = root_parts
        .iter()
        .zip(&path_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    segments.extend(root_parts[common..].iter().map(|_| "..".to_string()));
    segments.extend(
        path_parts[common..]
            .iter()
            .map(|part| part.as_os_str().to_string_lossy().to_string()),
    );
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_key() {
        let root = Path::new("/project/src");
        assert_eq!(relative_key(root, Path::new("/project/src/main.lua")), "main.lua");
        assert_eq!(
            relative_key(root, Path::new("/project/src/lib/util.lua")),
            "lib/util.lua"
        );
        assert_eq!(
            relative_key(root, Path::new("/project/shared/log.lua")),
            "../shared/log.lua"
        );
    }

    #[test]
    fn test_extension_is_stripped() {
        let mut ids = ModuleIdAllocator::new("/project", "lua");
        assert_eq!(ids.assign(Path::new("/project/main.lua")).as_str(), "main");
        assert_eq!(ids.assign(Path::new("/project/lib/a.lua")).as_str(), "lib/a");
        assert_eq!(ids.assign(Path::new("/project/README")).as_str(), "README");
    }

    #[test]
    fn test_same_path_same_id() {
        let mut ids = ModuleIdAllocator::new("/project", "lua");
        let first = ids.assign(Path::new("/project/a.lua"));
        let second = ids.assign(Path::new("/project/a.lua"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_collision_falls_back_to_full_name() {
        let mut ids = ModuleIdAllocator::new("/project", "lua");
        assert_eq!(ids.assign(Path::new("/project/a")).as_str(), "a");
        assert_eq!(ids.assign(Path::new("/project/a.lua")).as_str(), "a.lua");
    }

    #[test]
    fn test_both_keys_taken_uses_full_path() {
        let mut ids = ModuleIdAllocator::new("/project", "lua");
        ids.assign(Path::new("/project/a"));
        ids.assign(Path::new("/project/a.lua.lua"));
        assert_eq!(
            ids.assign(Path::new("/project/a.lua")).as_str(),
            "/project/a.lua"
        );
    }

    #[test]
    fn test_bare_extension_file_keeps_name() {
        let mut ids = ModuleIdAllocator::new("/project", "lua");
        assert_eq!(ids.assign(Path::new("/project/lib/.lua")).as_str(), "lib/.lua");
    }
}
