//! Build definition surface.
//!
//! A project lists its modules in a JSON manifest (`skinbuild.json` by
//! convention). Relative paths are taken relative to the manifest's own
//! directory.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::compile::{Platform, ToolchainOptions, TranslatorOptions};
use crate::error::{Error, Result};
use crate::module::{DEFAULT_RUNTIME_MODULE, ModuleName, NamespaceTable};

/// Default manifest file name.
pub const MANIFEST_FILE: &str = "skinbuild.json";

/// One module to build.
///
/// Dependency names stay raw strings here and are validated when the module
/// is defined, so a bad name only fails its own module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDefinition {
    /// Untranslated entry source. Its file stem names the module.
    pub source: PathBuf,

    #[serde(default)]
    pub system_modules: Vec<String>,

    #[serde(default)]
    pub application_modules: Vec<String>,

    /// Log the resolved module lists at info level.
    #[serde(default)]
    pub debug: bool,
}

impl ModuleDefinition {
    /// The source file stem, unvalidated. Used to select and report modules.
    pub fn label(&self) -> String {
        match self.source.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => self.source.display().to_string(),
        }
    }

    /// The entry module name, derived from the source file name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Manifest`] if the stem is not a single identifier.
    /// A dotted stem such as `a.b.py` could never be imported by that name.
    pub fn entry_name(&self) -> Result<ModuleName> {
        let stem = self
            .source
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                Error::Manifest(format!("invalid module source: {}", self.source.display()))
            })?;
        let name = ModuleName::new(stem)?;
        if name.split_head().1.is_some() {
            return Err(Error::Manifest(format!(
                "entry source {} must be named <identifier>.py to be importable",
                self.source.display()
            )));
        }
        Ok(name)
    }

    /// Validated system module names, in declared order.
    pub fn system_names(&self) -> Result<Vec<ModuleName>> {
        parse_names(&self.system_modules)
    }

    /// Validated application module names, in declared order.
    pub fn application_names(&self) -> Result<Vec<ModuleName>> {
        parse_names(&self.application_modules)
    }
}

fn parse_names(names: &[String]) -> Result<Vec<ModuleName>> {
    names.iter().map(|n| ModuleName::new(n.as_str())).collect()
}

/// Project-wide build settings plus the module list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildManifest {
    /// Pre-generated runtime and system modules.
    pub library_root: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Defaults to the manifest's directory.
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// Host interpreter headers. Queried from the host when absent.
    #[serde(default)]
    pub host_include: Option<PathBuf>,

    #[serde(default = "default_local_include")]
    pub local_include: PathBuf,

    /// Defaults to the platform skinbuild runs on.
    #[serde(default)]
    pub platform: Option<Platform>,

    #[serde(default = "default_runtime_module")]
    pub runtime_module: ModuleName,

    /// Reserved namespace tokens with nested layout.
    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<ModuleName>,

    #[serde(default)]
    pub translator: TranslatorOptions,

    #[serde(default)]
    pub toolchain: ToolchainOptions,

    pub modules: Vec<ModuleDefinition>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_local_include() -> PathBuf {
    PathBuf::from("/usr/local/include")
}

fn default_runtime_module() -> ModuleName {
    ModuleName::from_static(DEFAULT_RUNTIME_MODULE)
}

fn default_namespaces() -> Vec<ModuleName> {
    NamespaceTable::default()
        .tokens()
        .filter_map(|t| ModuleName::new(t).ok())
        .collect()
}

impl BuildManifest {
    /// Read and validate a manifest file.
    ///
    /// Relative paths inside it resolve against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Manifest`] if the file cannot be read or fails
    /// validation, and [`Error::Json`] if it is not a valid manifest document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Manifest(format!("cannot read {}: {}", path.display(), e))
        })?;
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let base = base.canonicalize().map_err(|e| {
            Error::Manifest(format!("cannot resolve {}: {}", base.display(), e))
        })?;
        Self::parse(&text, &base)
    }

    /// Parse manifest JSON, resolving relative paths against `base`.
    pub fn parse(json: &str, base: &Path) -> Result<Self> {
        let mut manifest: Self = serde_json::from_str(json)?;
        manifest.rebase(base);
        manifest.validate()?;
        Ok(manifest)
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        join(&mut self.library_root);
        join(&mut self.output_dir);
        match &mut self.project_root {
            Some(root) => join(root),
            None => self.project_root = Some(base.to_path_buf()),
        }
        if let Some(include) = &mut self.host_include {
            join(include);
        }
        for dir in &mut self.translator.libdirs {
            join(dir);
        }
        for module in &mut self.modules {
            join(&mut module.source);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.modules.is_empty() {
            return Err(Error::Manifest("no modules defined".to_string()));
        }

        for token in &self.namespaces {
            if token.split_head().1.is_some() {
                return Err(Error::Manifest(format!(
                    "namespace token '{}' must be a single identifier",
                    token
                )));
            }
        }

        // Two modules with the same stem would share one build directory.
        let mut seen = FxHashSet::default();
        for module in &self.modules {
            let label = module.label();
            if !seen.insert(label.clone()) {
                return Err(Error::Manifest(format!(
                    "module '{}' is defined more than once",
                    label
                )));
            }
        }
        Ok(())
    }

    /// Project root added to the include path.
    pub fn project_root(&self) -> &Path {
        self.project_root.as_deref().unwrap_or(Path::new("."))
    }

    /// Namespace table built from the `namespaces` tokens.
    pub fn namespace_table(&self) -> NamespaceTable {
        self.namespaces
            .iter()
            .fold(NamespaceTable::empty(), |table, token| {
                table.with_package(token.as_str())
            })
    }

    /// Target platform, defaulting to the one skinbuild runs on.
    pub fn platform(&self) -> Result<Platform> {
        match self.platform {
            Some(platform) => Ok(platform),
            None => Platform::host(),
        }
    }

    /// Modules to build: all of them, or those named in `names`.
    pub fn select(&self, names: &[String]) -> Result<Vec<&ModuleDefinition>> {
        if names.is_empty() {
            return Ok(self.modules.iter().collect());
        }

        names
            .iter()
            .map(|wanted| {
                self.modules
                    .iter()
                    .find(|m| m.label() == *wanted)
                    .ok_or_else(|| Error::Manifest(format!("unknown module '{}'", wanted)))
            })
            .collect()
    }
}
