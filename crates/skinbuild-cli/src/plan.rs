//! Plan command: print build plans as JSON.

use std::path::{Path, PathBuf};

use skinbuild_core::compile::query_host_include;
use skinbuild_core::{BuildManifest, ModuleBuilder, SystemRunner};

use crate::colors;

/// Define every selected module and print the plans that succeeded.
///
/// Each module is defined on its own: a module that fails to define is
/// reported on stderr and the rest are still printed. No external tool runs
/// unless the manifest leaves `host_include` unset.
///
/// # Errors
///
/// Fails if the manifest cannot be loaded, or after printing if any module
/// failed to define.
pub fn execute(manifest_path: &Path, modules: &[String]) -> anyhow::Result<()> {
    let manifest = BuildManifest::load(manifest_path)?;
    let host_include = host_include(&manifest)?;
    let builder = ModuleBuilder::new(&manifest, host_include);

    let mut plans = Vec::new();
    let mut failed = 0;
    for definition in manifest.select(modules)? {
        match builder.define(definition) {
            Ok(plan) => plans.push(plan),
            Err(e) => {
                failed += 1;
                eprintln!(
                    "{}✗{} {}: {}",
                    colors::RED,
                    colors::RESET,
                    definition.label(),
                    e.with_hint()
                );
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&plans)?);

    if failed > 0 {
        anyhow::bail!("{} module(s) could not be planned", failed);
    }
    Ok(())
}

/// The manifest's header directory, or the host interpreter's own.
pub fn host_include(manifest: &BuildManifest) -> anyhow::Result<PathBuf> {
    match &manifest.host_include {
        Some(dir) => Ok(dir.clone()),
        None => Ok(query_host_include(&SystemRunner, &manifest.toolchain.host)?),
    }
}
