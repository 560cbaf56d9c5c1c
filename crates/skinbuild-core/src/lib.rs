//! Core engine for skinbuild.
//!
//! This crate provides:
//! - Module name resolution with namespace-style nested layouts
//! - Dependency set construction (runtime + system + application modules)
//! - Translator invocation planning
//! - Native build-target assembly with per-platform flag bundles
//! - Smoke-test registration for built modules
//! - A concurrent per-module build executor

pub mod compile;
pub mod error;
pub mod manifest;
pub mod module;
pub mod paths;
pub mod pipeline;
pub mod process;
pub mod verify;

pub use compile::{BuildTarget, FlagSet, FlagTable, Platform, ToolchainManager};
pub use error::{Error, Result};
pub use manifest::{BuildManifest, ModuleDefinition};
pub use module::{Category, DependencySet, ModuleName, ModuleReference, ModuleResolver};
pub use paths::BuildDirs;
pub use pipeline::{BuildExecutor, BuildPlan, ModuleBuilder, ModuleOutcome};
pub use process::{CommandSpec, ProcessOutput, ProcessRunner, SystemRunner};
pub use verify::{TestDescriptor, TestRegistrar};
