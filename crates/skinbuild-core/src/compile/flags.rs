//! Compiler and linker flag bundles, keyed by target platform.
//!
//! Every module built for a platform gets the same bundle; nothing here is
//! derived from a module's dependencies.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Platforms with a known flag bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Macos,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn host() -> Result<Self> {
        if cfg!(target_os = "linux") {
            Ok(Self::Linux)
        } else if cfg!(target_os = "macos") {
            Ok(Self::Macos)
        } else {
            Err(Error::UnsupportedPlatform(std::env::consts::OS.to_string()))
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
        })
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" => Ok(Self::Macos),
            other => Err(Error::UnsupportedPlatform(other.to_string())),
        }
    }
}

/// Flags applied uniformly to every assembled target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet {
    pub compile_flags: Vec<String>,
    pub link_flags: Vec<String>,
    /// Libraries passed to the linker as `-l<name>`.
    pub linked_libraries: Vec<String>,
    /// Extension of the loadable artifact, without the dot.
    pub artifact_extension: String,
}

/// Compile flags shared by the GCC-style toolchains.
///
/// `__SS_BIND` switches the generated sources to their interpreter-binding
/// code paths.
const COMPILE_FLAGS: &[&str] = &[
    "-fPIC",
    "-D__SS_BIND",
    "-Wno-unused-result",
    "-Wno-sign-compare",
    "-Wunreachable-code",
    "-O2",
    "-g",
    "-fwrapv",
];

/// Garbage collector, its C++ layer, and the regex engine.
const RUNTIME_LIBRARIES: &[&str] = &["gc", "gccpp", "pcre"];

fn owned(flags: &[&str]) -> Vec<String> {
    flags.iter().map(|f| f.to_string()).collect()
}

impl FlagSet {
    /// GCC/ELF bundle: host symbols stay unresolved until load time.
    pub fn linux() -> Self {
        Self {
            compile_flags: owned(COMPILE_FLAGS),
            link_flags: owned(&[
                "-Wl,--unresolved-symbols=ignore-all",
                "-Wno-unused-result",
                "-Wno-sign-compare",
                "-fno-common",
                "-shared",
            ]),
            linked_libraries: owned(RUNTIME_LIBRARIES),
            artifact_extension: "so".to_string(),
        }
    }

    /// Clang/Mach-O bundle.
    pub fn macos() -> Self {
        Self {
            compile_flags: owned(COMPILE_FLAGS),
            link_flags: owned(&[
                "-undefined",
                "dynamic_lookup",
                "-Wno-unused-result",
                "-Wno-sign-compare",
                "-fno-common",
                "-bundle",
            ]),
            linked_libraries: owned(RUNTIME_LIBRARIES),
            artifact_extension: "so".to_string(),
        }
    }

    /// Linker arguments for the runtime libraries.
    pub fn library_args(&self) -> impl Iterator<Item = String> + '_ {
        self.linked_libraries.iter().map(|lib| format!("-l{}", lib))
    }
}

/// Flag bundles keyed by platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagTable {
    entries: BTreeMap<Platform, FlagSet>,
}

impl FlagTable {
    pub fn get(&self, platform: Platform) -> Result<&FlagSet> {
        self.entries
            .get(&platform)
            .ok_or_else(|| Error::UnsupportedPlatform(platform.to_string()))
    }

    /// Replace the bundle for one platform.
    pub fn insert(&mut self, platform: Platform, flags: FlagSet) {
        self.entries.insert(platform, flags);
    }
}

impl Default for FlagTable {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(Platform::Linux, FlagSet::linux());
        entries.insert(Platform::Macos, FlagSet::macos());
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_bundle() {
        let flags = FlagSet::linux();
        for flag in ["-fPIC", "-D__SS_BIND", "-Wno-unused-result", "-Wno-sign-compare", "-fwrapv"] {
            assert!(flags.compile_flags.iter().any(|f| f == flag), "missing {flag}");
        }
        assert!(flags.link_flags.iter().any(|f| f == "-shared"));
        assert!(flags.link_flags.iter().any(|f| f == "-fno-common"));
        assert_eq!(
            flags.library_args().collect::<Vec<_>>(),
            ["-lgc", "-lgccpp", "-lpcre"]
        );
    }

    #[test]
    fn test_macos_defers_symbol_lookup() {
        let flags = FlagSet::macos();
        let joined = flags.link_flags.join(" ");
        assert!(joined.contains("-undefined dynamic_lookup"));
        assert!(joined.contains("-bundle"));
        assert_eq!(flags.compile_flags, FlagSet::linux().compile_flags);
    }

    #[test]
    fn test_table_lookup() {
        let mut table = FlagTable::default();
        assert_eq!(table.get(Platform::Linux).unwrap(), &FlagSet::linux());

        let mut custom = FlagSet::linux();
        custom.linked_libraries.clear();
        table.insert(Platform::Linux, custom);
        assert!(table.get(Platform::Linux).unwrap().linked_libraries.is_empty());
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!("linux".parse::<Platform>().unwrap(), Platform::Linux);
        assert_eq!("darwin".parse::<Platform>().unwrap(), Platform::Macos);
        assert!(matches!(
            "windows".parse::<Platform>(),
            Err(Error::UnsupportedPlatform(_))
        ));
    }
}
