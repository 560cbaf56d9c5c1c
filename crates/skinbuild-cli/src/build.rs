//! Build and test command implementation.
//!
//! Builds every selected module concurrently, optionally runs each module's
//! smoke test, and prints a per-module summary.

use std::path::PathBuf;
use std::time::Instant;

use skinbuild_core::{
    BuildDirs, BuildExecutor, BuildManifest, ModuleBuilder, ModuleOutcome, SystemRunner,
    ToolchainManager,
};

use crate::{colors, plan};

/// Options shared by `build` and `test`.
pub struct BuildOptions {
    pub manifest: PathBuf,
    pub modules: Vec<String>,
    pub jobs: Option<usize>,
    pub force: bool,
    pub clean: bool,
    /// Run smoke tests after building.
    pub verify: bool,
}

pub fn execute(options: &BuildOptions) -> anyhow::Result<()> {
    let start = Instant::now();
    let manifest = BuildManifest::load(&options.manifest)?;
    let definitions = manifest.select(&options.modules)?;

    println!(
        "\n{}skinbuild{} - {} {}{}{} module(s)\n",
        colors::BOLD,
        colors::RESET,
        if options.verify { "Testing" } else { "Building" },
        colors::CYAN,
        definitions.len(),
        colors::RESET
    );

    print!("{}  ◆ Locating toolchain{} ... ", colors::BLUE, colors::RESET);
    colors::flush_stdout();

    let toolchain = ToolchainManager::detect(&manifest.translator.program, &manifest.toolchain)?;
    let host_include = plan::host_include(&manifest)?;
    println!("{}✓{}", colors::GREEN, colors::RESET);

    if options.clean {
        // Modules with an invalid name fail in their own build below.
        for name in definitions.iter().filter_map(|d| d.entry_name().ok()) {
            BuildDirs::for_module(&manifest.output_dir, &name).clean()?;
        }
    }

    let builder = ModuleBuilder::new(&manifest, host_include);
    let executor = BuildExecutor::new(
        &SystemRunner,
        toolchain.compiler_path().display().to_string(),
        toolchain.host_path().display().to_string(),
    )
    .force(options.force);

    let outcomes = match options.jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()?
            .install(|| executor.run_all(&builder, &definitions, options.verify)),
        None => executor.run_all(&builder, &definitions, options.verify),
    };

    println!();
    for outcome in &outcomes {
        print_outcome(outcome);
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    let passed = outcomes.len() - failed;

    // Summary
    println!();
    println!(
        "{}{}:{} {} passed, {} failed",
        if failed == 0 { colors::GREEN } else { colors::RED },
        if options.verify { "Tested" } else { "Built" },
        colors::RESET,
        passed,
        failed
    );
    println!(
        "{}Time:{} {:.2}s",
        colors::DIM,
        colors::RESET,
        start.elapsed().as_secs_f64()
    );

    if failed > 0 {
        anyhow::bail!("{} of {} module(s) failed", failed, outcomes.len());
    }
    Ok(())
}

fn print_outcome(outcome: &ModuleOutcome) {
    match &outcome.result {
        Ok(artifact) => println!(
            "  {}✓{} {} {}({}, {:.2}s){}",
            colors::GREEN,
            colors::RESET,
            outcome.module,
            colors::DIM,
            artifact.display(),
            outcome.elapsed.as_secs_f64(),
            colors::RESET
        ),
        Err(e) => {
            println!("  {}✗{} {}", colors::RED, colors::RESET, outcome.module);
            for line in e.with_hint().lines() {
                println!("    {}{}{}", colors::DIM, line, colors::RESET);
            }
        }
    }
}
