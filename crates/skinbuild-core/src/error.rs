//! Error types for skinbuild-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::module::Category;

/// Result type for skinbuild-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while defining or building a module.
///
/// Every variant is scoped to a single module build. None of them is
/// retried or swallowed by the core.
#[derive(Debug, Error)]
pub enum Error {
    /// A module name is not a valid dotted identifier.
    #[error("invalid module name '{0}'")]
    InvalidModuleName(String),

    /// A module name could not be mapped to an existing file.
    #[error("cannot resolve {category} module '{name}': no file at {}", path.display())]
    UnresolvedModule {
        name: String,
        category: Category,
        path: PathBuf,
    },

    /// Two declared dependencies resolve to the same physical files.
    #[error("duplicate dependency '{name}' (already declared as '{existing}') at {}", path.display())]
    DuplicateDependency {
        name: String,
        existing: String,
        path: PathBuf,
    },

    /// The build manifest is malformed or inconsistent.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// No flag profile is known for the requested platform.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The external translator exited with a failure status.
    #[error("translation failed for module '{module}':\n{output}")]
    Translation { module: String, output: String },

    /// The native compiler or linker exited with a failure status.
    #[error("toolchain failed for module '{module}':\n{output}")]
    Toolchain { module: String, output: String },

    /// The smoke test raised while loading or verifying the artifact.
    #[error("verification failed for module '{module}':\n{output}")]
    Verification { module: String, output: String },

    /// The host interpreter could not report its C header directory.
    #[error("could not determine header directory of '{host}':\n{output}")]
    HostQuery { host: String, output: String },

    /// An external program could not be started at all.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error was raised while defining the build, before any
    /// external process ran.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidModuleName(_)
                | Self::UnresolvedModule { .. }
                | Self::DuplicateDependency { .. }
                | Self::Manifest(_)
                | Self::UnsupportedPlatform(_)
        )
    }

    /// Render the error together with a recovery hint, if one applies.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Self::InvalidModuleName(_) => {
                Some("module names are dotted identifiers such as 'os' or 'os.path'")
            }
            Self::UnresolvedModule {
                category: Category::System | Category::Runtime,
                ..
            } => Some("check that `library_root` points at the translator's lib directory"),
            Self::UnresolvedModule { .. } => {
                Some("application modules must sit next to the entry source file")
            }
            Self::DuplicateDependency { .. } => {
                Some("remove the repeated entry from the module's dependency lists")
            }
            Self::Spawn { .. } => Some("make sure the program is installed and on PATH"),
            Self::HostQuery { .. } => {
                Some("set `host_include` in the manifest to skip the interpreter query")
            }
            _ => None,
        };

        match hint {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}
