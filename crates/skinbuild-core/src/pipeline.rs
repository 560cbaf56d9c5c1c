//! Per-module build pipeline.
//!
//! [`ModuleBuilder::define`] turns a module definition into a [`BuildPlan`]
//! without running anything; every configuration error surfaces there.
//! [`BuildExecutor`] then runs the plan's translator, compile, link and test
//! commands through a [`ProcessRunner`].
//!
//! Modules never share mutable state, so [`BuildExecutor::run_all`] builds
//! them concurrently and a failure only ends its own module's pipeline.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use crate::compile::{
    BuildTarget, FlagTable, IncludeRoots, TranslationInvoker, TranslationStep, assemble,
    outputs_are_fresh,
};
use crate::error::{Error, Result};
use crate::manifest::{BuildManifest, ModuleDefinition};
use crate::module::{
    Category, DependencySet, DependencySetBuilder, ModuleName, ModuleReference, ModuleResolver,
};
use crate::paths::BuildDirs;
use crate::process::{CommandSpec, ProcessRunner};
use crate::verify::{TestDescriptor, TestRegistrar};

/// Everything needed to build and verify one module.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub module: ModuleName,
    pub entry_source: PathBuf,
    pub translation: TranslationStep,
    pub dependencies: DependencySet,
    pub target: BuildTarget,
    pub test: TestDescriptor,
    #[serde(skip)]
    pub dirs: BuildDirs,
}

impl BuildPlan {
    /// Where the linked artifact lands.
    pub fn artifact_path(&self) -> PathBuf {
        self.target.artifact_path(&self.dirs.module_dir)
    }
}

/// Turns module definitions into build plans.
#[derive(Debug, Clone)]
pub struct ModuleBuilder<'a> {
    manifest: &'a BuildManifest,
    host_include: PathBuf,
    flags: FlagTable,
}

impl<'a> ModuleBuilder<'a> {
    /// `host_include` is the host interpreter's header directory.
    pub fn new(manifest: &'a BuildManifest, host_include: impl Into<PathBuf>) -> Self {
        Self {
            manifest,
            host_include: host_include.into(),
            flags: FlagTable::default(),
        }
    }

    /// Replace the platform flag table.
    pub fn with_flags(mut self, flags: FlagTable) -> Self {
        self.flags = flags;
        self
    }

    /// Resolve and assemble one module. Runs no external process.
    ///
    /// # Errors
    ///
    /// Only configuration errors: a bad entry or dependency name, a missing
    /// file, a duplicate dependency or an unsupported platform. They affect
    /// this module alone.
    pub fn define(&self, definition: &ModuleDefinition) -> Result<BuildPlan> {
        let module = definition.entry_name()?;
        if !definition.source.is_file() {
            return Err(Error::UnresolvedModule {
                name: module.to_string(),
                category: Category::Entry,
                path: definition.source.clone(),
            });
        }

        let source_dir = definition.source.parent().unwrap_or(Path::new("."));
        let dirs = BuildDirs::for_module(&self.manifest.output_dir, &module);
        let resolver = ModuleResolver::new(
            &self.manifest.library_root,
            &dirs.module_dir,
            source_dir,
        )
        .with_namespaces(self.manifest.namespace_table());

        let system = definition.system_names()?;
        let application = definition.application_names()?;
        let dependencies = DependencySetBuilder::new(&resolver, self.manifest.runtime_module.clone())
            .build(&module, &system, &application)?;
        log_dependencies(&module, &dependencies, definition.debug);

        let entry = resolver.resolve(&module, Category::Entry)?;
        let translation =
            TranslationInvoker::new(self.manifest.translator.clone(), &dirs.module_dir)
                .plan(&entry, &definition.source)?;

        let flags = self.flags.get(self.manifest.platform()?)?;
        let includes = IncludeRoots {
            host: self.host_include.clone(),
            local: self.manifest.local_include.clone(),
            library: self.manifest.library_root.clone(),
            project: self.manifest.project_root().to_path_buf(),
        };
        let target = assemble(&entry, &dependencies, flags, &includes);
        let test = TestRegistrar.register(&module);

        Ok(BuildPlan {
            module,
            entry_source: definition.source.clone(),
            translation,
            dependencies,
            target,
            test,
            dirs,
        })
    }
}

/// Tracing target of the resolved-module report. Front ends enable it at
/// `info` so modules marked `debug` are reported without `--verbose`.
pub const MODULES_LOG_TARGET: &str = "skinbuild::modules";

fn log_dependencies(module: &ModuleName, dependencies: &DependencySet, verbose: bool) {
    let system = join_names(dependencies.library_modules());
    let application = join_names(dependencies.application_modules());

    if verbose {
        tracing::info!(target: MODULES_LOG_TARGET, %module, system = %system, application = %application, "resolved modules");
    } else {
        tracing::debug!(target: MODULES_LOG_TARGET, %module, system = %system, application = %application, "resolved modules");
    }
}

fn join_names<'r>(references: impl Iterator<Item = &'r ModuleReference>) -> String {
    references
        .map(|r| r.name.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// What happened to one module.
#[derive(Debug)]
pub struct ModuleOutcome {
    pub module: String,
    /// Artifact path on success.
    pub result: Result<PathBuf>,
    pub elapsed: Duration,
}

impl ModuleOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs build plans against the external tools.
pub struct BuildExecutor<'a> {
    runner: &'a dyn ProcessRunner,
    compiler: String,
    host: String,
    /// Re-run the translator even if its outputs are fresh.
    force: bool,
}

impl<'a> BuildExecutor<'a> {
    /// Create an executor.
    ///
    /// # Arguments
    ///
    /// * `runner` - Runs every external command
    /// * `compiler` - Compiler driver used for compiling and linking
    /// * `host` - Host interpreter used for smoke tests
    pub fn new(runner: &'a dyn ProcessRunner, compiler: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            runner,
            compiler: compiler.into(),
            host: host.into(),
            force: false,
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Translate, compile and link one module.
    pub fn build(&self, plan: &BuildPlan) -> Result<PathBuf> {
        plan.dirs.create()?;
        let module = plan.module.as_str();

        if !self.force && outputs_are_fresh(&plan.entry_source, &plan.translation.outputs) {
            tracing::debug!(module, "translation up to date");
        } else {
            plan.translation.run(self.runner, module)?;
        }

        tracing::info!(module, units = plan.target.translation_units.len(), "compiling");
        plan.target
            .compile_commands(&self.compiler, &plan.dirs.object_dir)
            .par_iter()
            .try_for_each(|command| self.run_toolchain(module, command))?;

        tracing::info!(module, "linking");
        let link = plan.target.link_command(
            &self.compiler,
            &plan.dirs.object_dir,
            &plan.dirs.module_dir,
        );
        self.run_toolchain(module, &link)?;

        Ok(plan.artifact_path())
    }

    /// Run the module's smoke test against its built artifact.
    pub fn verify(&self, plan: &BuildPlan) -> Result<()> {
        TestRegistrar.run(self.runner, &plan.test, &self.host, &plan.dirs.module_dir)
    }

    /// Define, build and optionally verify every module concurrently.
    ///
    /// Outcomes come back in definition order.
    pub fn run_all(
        &self,
        builder: &ModuleBuilder<'_>,
        definitions: &[&ModuleDefinition],
        verify: bool,
    ) -> Vec<ModuleOutcome> {
        definitions
            .par_iter()
            .map(|definition| {
                let start = Instant::now();
                let module = definition.label();

                let result = builder.define(definition).and_then(|plan| {
                    let artifact = self.build(&plan)?;
                    if verify {
                        self.verify(&plan)?;
                    }
                    Ok(artifact)
                });

                if let Err(e) = &result {
                    tracing::warn!(module = %module, error = %e, "module failed");
                }
                ModuleOutcome {
                    module,
                    result,
                    elapsed: start.elapsed(),
                }
            })
            .collect()
    }

    fn run_toolchain(&self, module: &str, command: &CommandSpec) -> Result<()> {
        let output = self.runner.run(command)?;
        if output.success() {
            Ok(())
        } else {
            Err(Error::Toolchain {
                module: module.to_string(),
                output: output.combined(),
            })
        }
    }
}
