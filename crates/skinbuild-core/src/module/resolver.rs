//! Mapping of module names to generated translation-unit pairs.
//!
//! Runtime and System modules live under the read-only library root,
//! Application and Entry modules under the build output root:
//!
//! ```text
//! <library root>/
//! ├── builtin.cpp, builtin.hpp     # runtime module
//! ├── math.cpp, math.hpp           # plain system module
//! └── os/                          # namespace module
//!     ├── __init__.cpp, __init__.hpp
//!     └── path.cpp, path.hpp       # os.path
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};

use super::name::ModuleName;

/// Which root a module's generated files live under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// The always-linked base support module.
    Runtime,
    /// A pre-generated library module.
    System,
    /// A sibling module translated alongside the entry module.
    Application,
    /// The module being built.
    Entry,
}

impl Category {
    /// Whether files of this category come from the library root.
    pub fn is_library(self) -> bool {
        matches!(self, Self::Runtime | Self::System)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Runtime => "runtime",
            Self::System => "system",
            Self::Application => "application",
            Self::Entry => "entry",
        })
    }
}

/// A generated source file and its header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilePair {
    pub source: PathBuf,
    pub header: PathBuf,
}

/// Resolved identity of a module's generated artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReference {
    pub name: ModuleName,
    pub category: Category,
    pub files: FilePair,
}

/// File extensions used by the translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extensions {
    /// Generated source extension.
    pub source: String,
    /// Generated header extension.
    pub header: String,
    /// Extension of the untranslated module sources.
    pub script: String,
}

impl Default for Extensions {
    fn default() -> Self {
        Self {
            source: "cpp".to_string(),
            header: "hpp".to_string(),
            script: "py".to_string(),
        }
    }
}

/// How a reserved namespace token is laid out on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceLayout {
    /// Directory holding the namespace's files, relative to the root.
    pub directory: PathBuf,
    /// File stem used for the bare namespace module itself.
    pub init_stem: String,
}

impl NamespaceLayout {
    /// The package layout: `<token>/__init__.<ext>` and `<token>/<sub>.<ext>`.
    pub fn package(token: &str) -> Self {
        Self {
            directory: PathBuf::from(token),
            init_stem: "__init__".to_string(),
        }
    }
}

/// Reserved top-level tokens that resolve to nested paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceTable {
    entries: BTreeMap<String, NamespaceLayout>,
}

impl NamespaceTable {
    /// A table with no namespace modules.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register a token with the package layout.
    pub fn with_package(mut self, token: &str) -> Self {
        self.insert(token, NamespaceLayout::package(token));
        self
    }

    /// Register `token` with an explicit layout, replacing any previous one.
    pub fn insert(&mut self, token: impl Into<String>, layout: NamespaceLayout) {
        self.entries.insert(token.into(), layout);
    }

    /// Layout of a reserved token, if `token` is one.
    pub fn get(&self, token: &str) -> Option<&NamespaceLayout> {
        self.entries.get(token)
    }

    /// Reserved tokens in sorted order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::empty().with_package("os")
    }
}

/// Location of a module's files relative to a root, without extension.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RelativeStem {
    directory: PathBuf,
    file: String,
}

impl RelativeStem {
    fn flat(name: &ModuleName) -> Self {
        Self {
            directory: PathBuf::new(),
            file: name.to_string(),
        }
    }

    fn with_extension(&self, root: &Path, ext: &str) -> PathBuf {
        root.join(&self.directory).join(format!("{}.{}", self.file, ext))
    }
}

/// Maps module names to their generated file pairs.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    /// Root of the pre-generated runtime and system modules.
    library_root: PathBuf,

    /// Root the translator writes application and entry files into.
    output_root: PathBuf,

    /// Directory holding the entry module's untranslated source.
    source_dir: PathBuf,

    namespaces: NamespaceTable,

    extensions: Extensions,
}

impl ModuleResolver {
    /// Create a resolver with the default namespace table and extensions.
    pub fn new(
        library_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            library_root: library_root.into(),
            output_root: output_root.into(),
            source_dir: source_dir.into(),
            namespaces: NamespaceTable::default(),
            extensions: Extensions::default(),
        }
    }

    /// Replace the namespace table.
    pub fn with_namespaces(mut self, namespaces: NamespaceTable) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Replace the file extensions.
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// Root of the pre-generated runtime and system modules.
    pub fn library_root(&self) -> &Path {
        &self.library_root
    }

    /// Root the translator writes entry and application files into.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Compute a module's file pair without touching the filesystem.
    ///
    /// Entry modules are written flat by the translator, so the namespace
    /// table never applies to them.
    pub fn locate(&self, name: &ModuleName, category: Category) -> FilePair {
        let stem = match category {
            Category::Entry => RelativeStem::flat(name),
            _ => self.relative_stem(name),
        };
        let root = self.root_for(category);
        FilePair {
            source: stem.with_extension(root, &self.extensions.source),
            header: stem.with_extension(root, &self.extensions.header),
        }
    }

    /// Resolve a module name, failing if its inputs are missing.
    ///
    /// Library modules must have both generated files present. Application
    /// modules must have their untranslated source next to the entry module,
    /// since their generated files only appear once the translator runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedModule`] naming the first missing file.
    pub fn resolve(&self, name: &ModuleName, category: Category) -> Result<ModuleReference> {
        let files = self.locate(name, category);

        match category {
            Category::Runtime | Category::System => {
                for path in [&files.source, &files.header] {
                    if !path.is_file() {
                        return Err(Error::UnresolvedModule {
                            name: name.to_string(),
                            category,
                            path: path.clone(),
                        });
                    }
                }
            }
            Category::Application => {
                let script = self.script_path(name);
                if !script.is_file() {
                    return Err(Error::UnresolvedModule {
                        name: name.to_string(),
                        category,
                        path: script,
                    });
                }
            }
            Category::Entry => {}
        }

        tracing::trace!(module = %name, %category, source = %files.source.display(), "resolved");

        Ok(ModuleReference {
            name: name.clone(),
            category,
            files,
        })
    }

    /// Path of the untranslated source for an application module.
    pub fn script_path(&self, name: &ModuleName) -> PathBuf {
        self.relative_stem(name)
            .with_extension(&self.source_dir, &self.extensions.script)
    }

    fn root_for(&self, category: Category) -> &Path {
        if category.is_library() {
            &self.library_root
        } else {
            &self.output_root
        }
    }

    fn relative_stem(&self, name: &ModuleName) -> RelativeStem {
        let (head, rest) = name.split_head();
        match (self.namespaces.get(head), rest) {
            (Some(layout), None) => RelativeStem {
                directory: layout.directory.clone(),
                file: layout.init_stem.clone(),
            },
            (Some(layout), Some(sub)) => RelativeStem {
                directory: layout.directory.clone(),
                file: sub.to_string(),
            },
            (None, _) => RelativeStem::flat(name),
        }
    }
}
