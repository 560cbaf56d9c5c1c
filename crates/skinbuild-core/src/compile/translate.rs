//! Invocation of the external source-to-native translator.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::module::{FilePair, ModuleReference};
use crate::process::{CommandSpec, ProcessRunner};

/// Code-generation switches passed through to the translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslatorOptions {
    /// Translator executable.
    pub program: String,
    /// Write annotated source (`.ss.py`) next to the input.
    pub ann: bool,
    /// Disable bounds checking.
    pub nobounds: bool,
    /// Disable wrap-around checking of negative indices.
    pub nowrap: bool,
    /// Use 64-bit integers.
    pub long: bool,
    /// Disable garbage collection.
    pub nogc: bool,
    /// Disable runtime GC warnings.
    pub nogcwarns: bool,
    /// Disable assert statements.
    pub noassert: bool,
    /// Use the fast (`rand()`) random number generator.
    pub random: bool,
    /// Print a traceback for uncaught exceptions.
    pub traceback: bool,
    /// Only report warnings.
    pub silent: bool,
    /// Translator debug level (3 enables flow-analysis logging).
    pub debug_level: Option<u8>,
    /// Extra library directories searched by the translator.
    pub libdirs: Vec<PathBuf>,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            program: "shedskin".to_string(),
            ann: false,
            nobounds: false,
            nowrap: false,
            long: false,
            nogc: false,
            nogcwarns: false,
            noassert: false,
            random: false,
            traceback: false,
            silent: false,
            debug_level: None,
            libdirs: Vec::new(),
        }
    }
}

impl TranslatorOptions {
    fn switches(&self) -> Vec<String> {
        let table = [
            (self.ann, "-a"),
            (self.nobounds, "-b"),
            (self.nowrap, "-w"),
            (self.long, "-l"),
            (self.nogc, "-c"),
            (self.nogcwarns, "-g"),
            (self.noassert, "-n"),
            (self.random, "-r"),
            (self.traceback, "-x"),
            (self.silent, "-s"),
        ];
        let mut args: Vec<String> = table
            .iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, flag)| flag.to_string())
            .collect();

        if let Some(level) = self.debug_level {
            args.push("-d".to_string());
            args.push(level.to_string());
        }
        if !self.libdirs.is_empty() {
            args.push("-L".to_string());
            args.extend(self.libdirs.iter().map(|d| d.display().to_string()));
        }
        args
    }
}

/// A planned translator run and the files it is expected to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationStep {
    pub command: CommandSpec,
    /// Exactly the entry module's pair; anything else the translator writes
    /// is untracked.
    pub outputs: FilePair,
}

/// Issues the single translator run for an entry module.
#[derive(Debug, Clone)]
pub struct TranslationInvoker {
    options: TranslatorOptions,
    output_root: PathBuf,
}

impl TranslationInvoker {
    pub fn new(options: TranslatorOptions, output_root: impl Into<PathBuf>) -> Self {
        Self {
            options,
            output_root: output_root.into(),
        }
    }

    /// Describe the run for `entry`, whose untranslated source is `entry_source`.
    ///
    /// The command runs from the source's directory so the translator finds
    /// sibling modules exactly as it would when invoked by hand there.
    pub fn plan(&self, entry: &ModuleReference, entry_source: &Path) -> Result<TranslationStep> {
        let file_name = entry_source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::Manifest(format!(
                    "entry source has no file name: {}",
                    entry_source.display()
                ))
            })?;
        let working_dir = match entry_source.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let command = CommandSpec::new(&self.options.program)
            .args(self.options.switches())
            .arg("-e")
            .arg("-N")
            .arg("-o")
            .arg(self.output_root.display().to_string())
            .arg(file_name)
            .current_dir(working_dir);

        Ok(TranslationStep {
            command,
            outputs: entry.files.clone(),
        })
    }

    /// Plan and run the translator for `entry` in one go.
    pub fn invoke(
        &self,
        runner: &dyn ProcessRunner,
        entry: &ModuleReference,
        entry_source: &Path,
    ) -> Result<FilePair> {
        self.plan(entry, entry_source)?
            .run(runner, entry.name.as_str())
    }
}

impl TranslationStep {
    /// Run the translator. A nonzero exit fails this module only.
    pub fn run(&self, runner: &dyn ProcessRunner, module: &str) -> Result<FilePair> {
        if let Some(dir) = self.outputs.source.parent() {
            fs::create_dir_all(dir)?;
        }

        tracing::info!(module, "translating");
        let output = runner.run(&self.command)?;
        if !output.success() {
            return Err(Error::Translation {
                module: module.to_string(),
                output: output.combined(),
            });
        }

        Ok(self.outputs.clone())
    }
}

/// Whether both outputs exist and are no older than the entry source.
pub fn outputs_are_fresh(entry_source: &Path, outputs: &FilePair) -> bool {
    let modified = |path: &Path| -> Option<SystemTime> { fs::metadata(path).ok()?.modified().ok() };

    let Some(source_time) = modified(entry_source) else {
        return false;
    };
    [&outputs.source, &outputs.header]
        .iter()
        .all(|out| modified(out).is_some_and(|t| t >= source_time))
}
