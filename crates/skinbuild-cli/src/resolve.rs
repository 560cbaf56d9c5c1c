//! Resolve command: show where a library module lives.

use std::path::Path;

use skinbuild_core::{Category, ModuleName, ModuleResolver};

/// Resolve `name` under `library_root` and print its source and header.
pub fn execute(name: &str, library_root: &Path, category: Category) -> anyhow::Result<()> {
    let name = ModuleName::new(name)?;
    // Library modules never touch the output or source directories.
    let resolver = ModuleResolver::new(library_root, ".", ".");
    let reference = resolver.resolve(&name, category)?;

    println!("{}", reference.files.source.display());
    println!("{}", reference.files.header.display());
    Ok(())
}
