use crate::errors::BundleError;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options that control how references are resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlerOptions {
    /// Extra directories tried after the requiring module's own directory.
    /// Relative roots are taken relative to the entry module's directory.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// Module names provided by the host at run time. Requires of these are
    /// left untouched.
    #[serde(default)]
    pub externals: Vec<String>,

    /// Source file extension, without the dot (default: lua)
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    "lua".to_string()
}

impl Default for BundlerOptions {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            externals: Vec::new(),
            extension: default_extension(),
        }
    }
}

impl BundlerOptions {
    pub fn is_external(&self, reference: &str) -> bool {
        self.externals.iter().any(|name| name == reference)
    }

    /// Merge command-line overrides into these options
    pub fn merge(&mut self, overrides: &CliOverrides) {
        for path in &overrides.search_paths {
            if !self.search_paths.contains(path) {
                self.search_paths.push(path.clone());
            }
        }
        for name in &overrides.externals {
            if !self.externals.contains(name) {
                self.externals.push(name.clone());
            }
        }
        if let Some(ref extension) = overrides.extension {
            self.extension = extension.clone();
        }
    }
}

/// Values given on the command line that take part in option merging
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub search_paths: Vec<PathBuf>,
    pub externals: Vec<String>,
    pub extension: Option<String>,
}

/// An auxiliary file copied next to a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyFile {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// One entry file and where its bundle goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleTarget {
    /// Display name (default: entry file stem)
    #[serde(default)]
    pub name: Option<String>,

    pub entry: PathBuf,

    pub output: PathBuf,

    /// Files copied verbatim after the bundle is written
    #[serde(default)]
    pub copy: Vec<CopyFile>,

    /// Where to write the base64 stringified variant, if anywhere
    #[serde(default)]
    pub stringify: Option<PathBuf>,
}

impl BundleTarget {
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self
                .entry
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| self.entry.display().to_string()),
        }
    }

    fn rebase(&mut self, base_dir: &Path) {
        let rebase = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        };
        rebase(&mut self.entry);
        rebase(&mut self.output);
        for copy in &mut self.copy {
            rebase(&mut copy.from);
            rebase(&mut copy.to);
        }
        if let Some(ref mut stringify) = self.stringify {
            rebase(stringify);
        }
    }
}

/// Project file (`luapack.yaml`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub bundler_options: BundlerOptions,

    #[serde(default)]
    pub targets: Vec<BundleTarget>,
}

impl ProjectConfig {
    /// Load a project file. Relative paths inside it are taken relative to
    /// the directory containing the file.
    pub fn from_file(path: &Path) -> Result<Self, BundleError> {
        let content = std::fs::read_to_string(path).map_err(|e| BundleError::io(path, e))?;
        let mut config = Self::from_yaml_str(&content)?;
        if let Some(base_dir) = path.parent() {
            config.rebase(base_dir);
        }
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, BundleError> {
        let config: ProjectConfig =
            serde_yaml::from_str(content).map_err(|e| BundleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, BundleError> {
        serde_yaml::to_string(self).map_err(|e| BundleError::Config(e.to_string()))
    }

    fn rebase(&mut self, base_dir: &Path) {
        for target in &mut self.targets {
            target.rebase(base_dir);
        }
    }

    fn validate(&self) -> Result<(), BundleError> {
        if self.bundler_options.extension.is_empty() {
            return Err(BundleError::Config(
                "extension must not be empty".to_string(),
            ));
        }

        let mut outputs = FxHashSet::default();
        for target in &self.targets {
            if target.entry.as_os_str().is_empty() {
                return Err(BundleError::Config(format!(
                    "target '{}' has an empty entry",
                    target.display_name()
                )));
            }
            if !outputs.insert(target.output.clone()) {
                return Err(BundleError::Config(format!(
                    "output {} is used by more than one target",
                    target.output.display()
                )));
            }
        }
        Ok(())
    }
}
