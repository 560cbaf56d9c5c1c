//! skinbuild CLI - build translated modules into loadable extension modules.

mod build;
mod colors;
mod plan;
mod resolve;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skinbuild")]
#[command(about = "Build translated modules into loadable extension modules")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the file pair a library module resolves to
    Resolve {
        /// Dotted module name (e.g. os.path)
        name: String,

        /// Directory holding the pre-generated library modules
        #[arg(long)]
        library_root: PathBuf,

        /// Module category
        #[arg(long, value_enum, default_value = "system")]
        category: LibraryCategory,
    },

    /// Print the build plans without running anything
    Plan {
        /// Path to the build manifest
        #[arg(short, long, default_value = skinbuild_core::manifest::MANIFEST_FILE)]
        manifest: PathBuf,

        /// Modules to plan (default: all)
        modules: Vec<String>,
    },

    /// Translate, compile and link modules
    Build(BuildArgs),

    /// Build modules, then run their smoke tests
    Test(BuildArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum LibraryCategory {
    System,
    Runtime,
}

#[derive(Args)]
struct BuildArgs {
    /// Path to the build manifest
    #[arg(short, long, default_value = skinbuild_core::manifest::MANIFEST_FILE)]
    manifest: PathBuf,

    /// Maximum number of modules built at once
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Re-run the translator even if its outputs are up to date
    #[arg(long)]
    force: bool,

    /// Remove each module's build directory first
    #[arg(long)]
    clean: bool,

    /// Modules to build (default: all)
    modules: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging. RUST_LOG replaces the WARN default; the resolved
    // module report stays on so `"debug": true` modules are always shown.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn"))
            .add_directive(
                format!("{}=info", skinbuild_core::pipeline::MODULES_LOG_TARGET).parse()?,
            )
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();

    // Helper to format skinbuild-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<skinbuild_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else {
            err
        }
    };

    match cli.command {
        Commands::Resolve {
            name,
            library_root,
            category,
        } => {
            let category = match category {
                LibraryCategory::System => skinbuild_core::Category::System,
                LibraryCategory::Runtime => skinbuild_core::Category::Runtime,
            };
            resolve::execute(&name, &library_root, category).map_err(format_error)?;
        }

        Commands::Plan { manifest, modules } => {
            plan::execute(&manifest, &modules).map_err(format_error)?;
        }

        Commands::Build(args) => {
            build::execute(&args.options(false)).map_err(format_error)?;
        }

        Commands::Test(args) => {
            build::execute(&args.options(true)).map_err(format_error)?;
        }
    }

    Ok(())
}

impl BuildArgs {
    fn options(self, verify: bool) -> build::BuildOptions {
        build::BuildOptions {
            manifest: self.manifest,
            modules: self.modules,
            jobs: self.jobs,
            force: self.force,
            clean: self.clean,
            verify,
        }
    }
}
