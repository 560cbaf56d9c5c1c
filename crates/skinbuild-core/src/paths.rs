//! Build directory management.
//!
//! Every module builds into its own directory under the output root, so
//! concurrent builds never write to the same place:
//!
//! ```text
//! build/
//! └── foo/
//!     ├── foo.cpp, foo.hpp   # translator output (entry + application modules)
//!     ├── obj/               # compiled objects
//!     └── foo.so             # loadable artifact
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::module::ModuleName;

/// Directory structure for one module build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDirs {
    /// Translator output and artifact directory.
    pub module_dir: PathBuf,

    /// Object files.
    pub object_dir: PathBuf,
}

impl BuildDirs {
    /// Compute the directories without creating them.
    pub fn for_module(output_root: &Path, module: &ModuleName) -> Self {
        let module_dir = output_root.join(module.as_str());
        let object_dir = module_dir.join("obj");
        Self {
            module_dir,
            object_dir,
        }
    }

    /// Create all directories if they don't exist.
    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.object_dir)?;
        Ok(())
    }

    /// Remove everything produced for this module and recreate the layout.
    pub fn clean(&self) -> Result<()> {
        if self.module_dir.exists() {
            fs::remove_dir_all(&self.module_dir)?;
        }
        self.create()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_for_module() {
        let dirs = BuildDirs::for_module(Path::new("build"), &ModuleName::new("foo").unwrap());
        assert_eq!(dirs.module_dir, PathBuf::from("build/foo"));
        assert_eq!(dirs.object_dir, PathBuf::from("build/foo/obj"));
    }

    #[test]
    fn test_clean() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let dirs = BuildDirs::for_module(temp.path(), &ModuleName::new("foo").unwrap());
        dirs.create().expect("Failed to create dirs");

        let stale = dirs.object_dir.join("00-foo.o");
        fs::write(&stale, "").expect("Failed to write test file");

        dirs.clean().expect("Failed to clean");
        assert!(!stale.exists());
        assert!(dirs.object_dir.exists());
    }
}
