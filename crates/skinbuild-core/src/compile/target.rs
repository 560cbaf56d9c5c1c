//! Build target assembly.
//!
//! A [`BuildTarget`] is everything the native toolchain needs to turn one
//! entry module into a loadable artifact. Assembly only describes the
//! compile and link commands; running them is the executor's job.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::module::{DependencySet, FilePair, ModuleName, ModuleReference};
use crate::process::CommandSpec;

use super::flags::FlagSet;

/// Fixed include roots, in search order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeRoots {
    /// Host interpreter headers.
    pub host: PathBuf,
    /// Local include root (`/usr/local/include` by default).
    pub local: PathBuf,
    /// Library root with the pre-generated runtime headers.
    pub library: PathBuf,
    /// Project root.
    pub project: PathBuf,
}

impl IncludeRoots {
    pub fn to_vec(&self) -> Vec<PathBuf> {
        vec![
            self.host.clone(),
            self.local.clone(),
            self.library.clone(),
            self.project.clone(),
        ]
    }
}

/// Assembled description of one native build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildTarget {
    /// Entry module name; also the artifact's logical name.
    pub module_name: ModuleName,

    /// File name of the artifact, with no `lib` prefix.
    pub artifact_file_name: String,

    /// Entry pair, then application pairs, then runtime/system pairs.
    pub translation_units: Vec<FilePair>,

    pub include_paths: Vec<PathBuf>,
    pub compile_flags: Vec<String>,
    pub link_flags: Vec<String>,
    pub linked_libraries: Vec<String>,
}

/// Combine the entry module, its dependency set and the platform flags.
pub fn assemble(
    entry: &ModuleReference,
    dependencies: &DependencySet,
    flags: &FlagSet,
    includes: &IncludeRoots,
) -> BuildTarget {
    let translation_units = std::iter::once(entry)
        .chain(dependencies.application_modules())
        .chain(dependencies.library_modules())
        .map(|reference| reference.files.clone())
        .collect();

    BuildTarget {
        module_name: entry.name.clone(),
        artifact_file_name: format!("{}.{}", entry.name, flags.artifact_extension),
        translation_units,
        include_paths: includes.to_vec(),
        compile_flags: flags.compile_flags.clone(),
        link_flags: flags.link_flags.clone(),
        linked_libraries: flags.linked_libraries.clone(),
    }
}

impl BuildTarget {
    /// Total number of files (sources and headers).
    pub fn file_count(&self) -> usize {
        self.translation_units.len() * 2
    }

    pub fn sources(&self) -> impl Iterator<Item = &Path> {
        self.translation_units.iter().map(|u| u.source.as_path())
    }

    /// Object file for each source, in unit order.
    ///
    /// Objects carry their unit index so `os/__init__` and another
    /// package's `__init__` cannot collide.
    pub fn object_paths(&self, object_dir: &Path) -> Vec<PathBuf> {
        self.sources()
            .enumerate()
            .map(|(index, source)| {
                let stem = source
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("unit");
                object_dir.join(format!("{:02}-{}.o", index, stem))
            })
            .collect()
    }

    /// One compile command per source unit.
    pub fn compile_commands(&self, compiler: &str, object_dir: &Path) -> Vec<CommandSpec> {
        let includes: Vec<String> = self
            .include_paths
            .iter()
            .map(|p| format!("-I{}", p.display()))
            .collect();

        self.sources()
            .zip(self.object_paths(object_dir))
            .map(|(source, object)| {
                CommandSpec::new(compiler)
                    .args(self.compile_flags.iter().cloned())
                    .args(includes.iter().cloned())
                    .arg("-c")
                    .arg(source.display().to_string())
                    .arg("-o")
                    .arg(object.display().to_string())
            })
            .collect()
    }

    /// The link command producing `artifact_dir/<artifact_file_name>`.
    pub fn link_command(&self, compiler: &str, object_dir: &Path, artifact_dir: &Path) -> CommandSpec {
        let objects = self
            .object_paths(object_dir)
            .into_iter()
            .map(|p| p.display().to_string());

        CommandSpec::new(compiler)
            .args(objects)
            .args(self.link_flags.iter().cloned())
            .arg("-o")
            .arg(self.artifact_path(artifact_dir).display().to_string())
            .args(self.linked_libraries.iter().map(|lib| format!("-l{}", lib)))
    }

    pub fn artifact_path(&self, artifact_dir: &Path) -> PathBuf {
        artifact_dir.join(&self.artifact_file_name)
    }
}
