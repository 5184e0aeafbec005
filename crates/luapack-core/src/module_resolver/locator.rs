use crate::errors::{BundleError, Result};
use crate::fs::FileSystem;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Turns a `require` argument into the path of an existing file.
///
/// Candidates are tried relative to the requiring module's directory first,
/// then relative to each search root, in this order:
///
/// 1. the reference as written
/// 2. the reference with the source extension appended
/// 3. for dotted names such as `lib.util`, `lib/util` plus the extension
/// 4. `init` plus the extension inside the referenced directory
/// 5. for dotted names, `init` plus the extension inside `lib/util`
///
/// Only existence checks are made; file contents are never read.
#[derive(Debug, Clone)]
pub struct ModuleLocator {
    fs: Arc<dyn FileSystem>,
    search_roots: Vec<PathBuf>,
    extension: String,
}

impl ModuleLocator {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        search_roots: Vec<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            fs,
            search_roots,
            extension: extension.into(),
        }
    }

    /// Resolve `reference` as required from the file at `requester`,
    /// returning the canonical path of the module file.
    pub fn locate(&self, reference: &str, requester: &Path) -> Result<PathBuf> {
        let not_found = || BundleError::Resolution {
            reference: reference.to_string(),
            requester: requester.to_path_buf(),
        };

        if reference.is_empty() {
            return Err(not_found());
        }

        let requester_dir = requester.parent().unwrap_or_else(|| Path::new(""));
        let bases = std::iter::once(requester_dir).chain(self.search_roots.iter().map(PathBuf::as_path));

        for base in bases {
            for candidate in self.candidates(reference, base) {
                if self.fs.is_file(&candidate) {
                    trace!("{} -> {}", reference, candidate.display());
                    return self
                        .fs
                        .canonicalize(&candidate)
                        .map_err(|e| BundleError::io(&candidate, e));
                }
            }
        }

        Err(not_found())
    }

    /// Candidate paths for `reference` under `base`, in lookup order
    pub fn candidates(&self, reference: &str, base: &Path) -> Vec<PathBuf> {
        let init = format!("init.{}", self.extension);
        let exact = base.join(reference);
        let mut candidates = vec![exact.clone(), append_extension(&exact, &self.extension)];

        let nested = is_dotted_name(reference).then(|| base.join(reference.replace('.', "/")));
        if let Some(nested) = &nested {
            candidates.push(append_extension(nested, &self.extension));
        }

        candidates.push(exact.join(&init));
        if let Some(nested) = nested {
            candidates.push(nested.join(&init));
        }
        candidates
    }
}

/// `lib.util` style names, as opposed to paths like `./a` or `lib/a.lua`
fn is_dotted_name(reference: &str) -> bool {
    reference.contains('.')
        && !reference.starts_with('.')
        && !reference.contains('/')
        && !reference.contains('\\')
}

fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(".");
    raw.push(extension);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    fn locator(fs: MockFileSystem, roots: Vec<PathBuf>) -> ModuleLocator {
        ModuleLocator::new(Arc::new(fs), roots, "lua")
    }

    #[test]
    fn test_exact_then_extension() {
        let mut fs = MockFileSystem::new();
        fs.add_file("/p/a.lua", "return 1");
        fs.add_file("/p/data", "return 2");
        let locator = locator(fs, Vec::new());
        let main = Path::new("/p/main.lua");

        assert_eq!(locator.locate("./a", main).unwrap(), PathBuf::from("/p/a.lua"));
        assert_eq!(locator.locate("a", main).unwrap(), PathBuf::from("/p/a.lua"));
        assert_eq!(locator.locate("./a.lua", main).unwrap(), PathBuf::from("/p/a.lua"));
        assert_eq!(locator.locate("data", main).unwrap(), PathBuf::from("/p/data"));
    }

    #[test]
    fn test_exact_path_wins_over_extension() {
        let mut fs = MockFileSystem::new();
        fs.add_file("/p/b", "return 'exact'");
        fs.add_file("/p/b.lua", "return 'extension'");
        let locator = locator(fs, Vec::new());
        assert_eq!(
            locator.locate("./b", Path::new("/p/main.lua")).unwrap(),
            PathBuf::from("/p/b")
        );
    }

    #[test]
    fn test_relative_to_requester_directory() {
        let mut fs = MockFileSystem::new();
        fs.add_file("/p/lib/b.lua", "return 1");
        fs.add_file("/p/shared.lua", "return 2");
        let locator = locator(fs, Vec::new());
        let requester = Path::new("/p/lib/a.lua");

        assert_eq!(locator.locate("./b", requester).unwrap(), PathBuf::from("/p/lib/b.lua"));
        assert_eq!(
            locator.locate("../shared", requester).unwrap(),
            PathBuf::from("/p/shared.lua")
        );
    }

    #[test]
    fn test_dotted_names_and_init() {
        let mut fs = MockFileSystem::new();
        fs.add_file("/p/lib/util.lua", "return 1");
        fs.add_file("/p/pkg/init.lua", "return 2");
        let locator = locator(fs, Vec::new());
        let main = Path::new("/p/main.lua");

        assert_eq!(locator.locate("lib.util", main).unwrap(), PathBuf::from("/p/lib/util.lua"));
        assert_eq!(locator.locate("./pkg", main).unwrap(), PathBuf::from("/p/pkg/init.lua"));
    }

    #[test]
    fn test_dotted_name_of_package_directory() {
        let mut fs = MockFileSystem::new();
        fs.add_file("/p/lib/pkg/init.lua", "return {}");
        let locator = locator(fs, Vec::new());

        assert_eq!(
            locator.locate("lib.pkg", Path::new("/p/main.lua")).unwrap(),
            PathBuf::from("/p/lib/pkg/init.lua")
        );
    }

    #[test]
    fn test_search_roots_after_requester_directory() {
        let mut fs = MockFileSystem::new();
        fs.add_file("/vendor/json.lua", "return {}");
        fs.add_file("/p/local.lua", "return {}");
        let locator = locator(fs, vec![PathBuf::from("/vendor")]);
        let main = Path::new("/p/main.lua");

        assert_eq!(locator.locate("json", main).unwrap(), PathBuf::from("/vendor/json.lua"));
        assert_eq!(locator.locate("local", main).unwrap(), PathBuf::from("/p/local.lua"));
    }

    #[test]
    fn test_missing_module() {
        let locator = locator(MockFileSystem::new(), Vec::new());
        let err = locator.locate("./missing", Path::new("/p/main.lua")).unwrap_err();
        match err {
            BundleError::Resolution {
                reference,
                requester,
            } => {
                assert_eq!(reference, "./missing");
                assert_eq!(requester, PathBuf::from("/p/main.lua"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_empty_reference_never_resolves() {
        let mut fs = MockFileSystem::new();
        fs.add_file("/p/init.lua", "return 1");
        let locator = locator(fs, Vec::new());
        assert!(locator.locate("", Path::new("/p/main.lua")).is_err());
    }

    #[test]
    fn test_candidate_order() {
        let locator = locator(MockFileSystem::new(), Vec::new());
        let candidates = locator.candidates("lib.util", Path::new("/p"));
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/p/lib.util"),
                PathBuf::from("/p/lib.util.lua"),
                PathBuf::from("/p/lib/util.lua"),
                PathBuf::from("/p/lib.util/init.lua"),
                PathBuf::from("/p/lib/util/init.lua"),
            ]
        );
    }
}
