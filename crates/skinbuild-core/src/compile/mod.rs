//! Translation and native build assembly.
//!
//! # Architecture
//!
//! ```text
//! entry.py ──► TranslationInvoker ──► entry.cpp / entry.hpp
//!                                          │
//! DependencySet ───────────────────────────┤
//!                                          ▼
//!                FlagTable[platform] ──► assemble ──► BuildTarget
//!                                                        │
//!                          compile_commands / link_command ──► entry.so
//! ```

mod flags;
mod target;
mod toolchain;
mod translate;

pub use flags::{FlagSet, FlagTable, Platform};
pub use target::{BuildTarget, IncludeRoots, assemble};
pub use toolchain::{ToolchainManager, ToolchainOptions, query_host_include};
pub use translate::{TranslationInvoker, TranslationStep, TranslatorOptions, outputs_are_fresh};
