//! Toolchain discovery.
//!
//! Locates the translator, the native compiler and the host interpreter on
//! PATH, and asks the interpreter where its C headers live.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::process::{CommandSpec, ProcessRunner};

/// Program names for the native side of the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainOptions {
    /// C++ compiler driver, also used for linking.
    pub compiler: String,
    /// Host interpreter that loads the built module.
    pub host: String,
}

impl Default for ToolchainOptions {
    fn default() -> Self {
        Self {
            compiler: "c++".to_string(),
            host: "python3".to_string(),
        }
    }
}

/// Resolved paths of the external tools.
#[derive(Debug, Clone)]
pub struct ToolchainManager {
    /// Path to the translator
    translator_path: PathBuf,

    /// Path to the compiler driver
    compiler_path: PathBuf,

    /// Path to the host interpreter
    host_path: PathBuf,
}

const INCLUDE_QUERY: &str = "import sysconfig; print(sysconfig.get_paths()['include'])";

impl ToolchainManager {
    /// Locate all three tools.
    ///
    /// # Arguments
    ///
    /// * `translator` - Translator program name or path
    /// * `options` - Compiler driver and host interpreter names
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] with `NotFound` for the first tool missing
    /// from PATH.
    pub fn detect(translator: &str, options: &ToolchainOptions) -> Result<Self> {
        let manager = Self {
            translator_path: Self::find(translator)?,
            compiler_path: Self::find(&options.compiler)?,
            host_path: Self::find(&options.host)?,
        };
        tracing::debug!(
            translator = %manager.translator_path.display(),
            compiler = %manager.compiler_path.display(),
            host = %manager.host_path.display(),
            "toolchain detected"
        );
        Ok(manager)
    }

    pub fn translator_path(&self) -> &Path {
        &self.translator_path
    }

    /// Compiler driver, also used to link.
    pub fn compiler_path(&self) -> &Path {
        &self.compiler_path
    }

    pub fn host_path(&self) -> &Path {
        &self.host_path
    }

    fn find(program: &str) -> Result<PathBuf> {
        which::which(program).map_err(|_| Error::Spawn {
            program: program.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found in PATH"),
        })
    }
}

/// Run `host -c <query>` and return the printed include directory.
pub fn query_host_include(runner: &dyn ProcessRunner, host: &str) -> Result<PathBuf> {
    let output = runner.run(&CommandSpec::new(host).arg("-c").arg(INCLUDE_QUERY))?;
    let dir = output.stdout.trim();
    if !output.success() || dir.is_empty() {
        return Err(Error::HostQuery {
            host: host.to_string(),
            output: output.combined(),
        });
    }
    Ok(PathBuf::from(dir))
}
