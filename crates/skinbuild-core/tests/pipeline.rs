//! Integration tests for the per-module build pipeline.
//!
//! External tools are replaced by a scripted runner that records every
//! command and fails the ones matching a predicate.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use skinbuild_core::pipeline::{BuildExecutor, ModuleBuilder};
use skinbuild_core::{
    BuildManifest, CommandSpec, Error, ProcessOutput, ProcessRunner, Result,
};
use tempfile::TempDir;

type Predicate = Box<dyn Fn(&CommandSpec) -> bool + Send + Sync>;

struct ScriptedRunner {
    calls: Mutex<Vec<CommandSpec>>,
    fail_when: Predicate,
}

impl ScriptedRunner {
    fn succeeding() -> Self {
        Self::failing_when(|_| false)
    }

    fn failing_when(predicate: impl Fn(&CommandSpec) -> bool + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_when: Box::new(predicate),
        }
    }

    fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, command: &CommandSpec) -> Result<ProcessOutput> {
        self.calls.lock().unwrap().push(command.clone());
        if (self.fail_when)(command) {
            Ok(ProcessOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: format!("{} failed", command.program),
            })
        } else {
            Ok(ProcessOutput {
                code: Some(0),
                ..Default::default()
            })
        }
    }
}

/// A project with a library root and a few entry modules.
struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        for stem in ["builtin", "math", "os/__init__", "os/path"] {
            let source = dir.path().join("lib").join(format!("{stem}.cpp"));
            fs::create_dir_all(source.parent().unwrap()).unwrap();
            fs::write(&source, "").unwrap();
            fs::write(source.with_extension("hpp"), "").unwrap();
        }
        fs::create_dir_all(dir.path().join("src")).unwrap();
        for script in ["foo.py", "bar.py", "a.py", "b.py"] {
            fs::write(dir.path().join("src").join(script), "").unwrap();
        }
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn manifest(&self, modules: &str) -> BuildManifest {
        let json = format!(
            r#"{{
                "library_root": "lib",
                "host_include": "/usr/include/python3.11",
                "platform": "linux",
                "modules": {modules}
            }}"#
        );
        BuildManifest::parse(&json, self.path()).expect("valid manifest")
    }
}

const FOO: &str = r#"[
    { "source": "src/foo.py", "system_modules": ["os", "os.path"], "application_modules": ["bar"] }
]"#;

#[test]
fn test_define_foo_runs_nothing() {
    let project = Project::new();
    let manifest = project.manifest(FOO);
    let builder = ModuleBuilder::new(&manifest, "/usr/include/python3.11");

    let plan = builder.define(&manifest.modules[0]).unwrap();

    assert_eq!(plan.module.as_str(), "foo");
    assert_eq!(plan.target.artifact_file_name, "foo.so");
    assert_eq!(plan.artifact_path(), project.path().join("build/foo/foo.so"));
    assert_eq!(plan.target.translation_units.len(), 5);
    assert_eq!(plan.test.verify_call, "foo.test_all()");
    assert_eq!(
        plan.translation.command.cwd.as_deref(),
        Some(project.path().join("src").as_path())
    );

    let lib = project.path().join("lib");
    let sources: Vec<PathBuf> = plan.target.sources().map(Path::to_path_buf).collect();
    assert_eq!(
        sources,
        [
            project.path().join("build/foo/foo.cpp"),
            project.path().join("build/foo/bar.cpp"),
            lib.join("builtin.cpp"),
            lib.join("os/__init__.cpp"),
            lib.join("os/path.cpp"),
        ]
    );
}

#[test]
fn test_plan_is_reproducible() {
    let project = Project::new();
    let manifest = project.manifest(FOO);
    let builder = ModuleBuilder::new(&manifest, "/usr/include/python3.11");

    let first = serde_json::to_string(&builder.define(&manifest.modules[0]).unwrap()).unwrap();
    let second = serde_json::to_string(&builder.define(&manifest.modules[0]).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_duplicate_dependency_spawns_nothing() {
    let project = Project::new();
    let manifest = project.manifest(
        r#"[ { "source": "src/foo.py", "system_modules": ["math", "math"] } ]"#,
    );
    let builder = ModuleBuilder::new(&manifest, "/usr/include/python3.11");
    let runner = ScriptedRunner::succeeding();
    let executor = BuildExecutor::new(&runner, "c++", "python3");

    let outcomes = executor.run_all(&builder, &manifest.select(&[]).unwrap(), true);

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0].result,
        Err(Error::DuplicateDependency { .. })
    ));
    assert!(runner.calls().is_empty());
}

#[test]
fn test_bad_dependency_name_fails_only_its_module() {
    let project = Project::new();
    let manifest = project.manifest(
        r#"[ { "source": "src/a.py", "system_modules": ["os..path"] }, { "source": "src/b.py" } ]"#,
    );
    let builder = ModuleBuilder::new(&manifest, "/usr/include/python3.11");
    let runner = ScriptedRunner::succeeding();
    let executor = BuildExecutor::new(&runner, "c++", "python3");

    let outcomes = executor.run_all(&builder, &manifest.select(&[]).unwrap(), false);

    assert_eq!(outcomes[0].module, "a");
    assert!(matches!(outcomes[0].result, Err(Error::InvalidModuleName(_))));
    assert!(outcomes[1].is_success());
    assert!(runner.calls().iter().all(|c| c.args.last().is_none_or(|a| a != "a.py")));
}

#[test]
fn test_namespace_named_entry_builds_flat() {
    let project = Project::new();
    fs::write(project.path().join("src/os.py"), "").unwrap();
    let manifest = project.manifest(r#"[ { "source": "src/os.py" } ]"#);
    let builder = ModuleBuilder::new(&manifest, "/usr/include/python3.11");

    let plan = builder.define(&manifest.modules[0]).unwrap();
    assert_eq!(
        plan.translation.outputs.source,
        project.path().join("build/os/os.cpp")
    );
}

#[test]
fn test_missing_entry_source_is_configuration_error() {
    let project = Project::new();
    let manifest = project.manifest(r#"[ { "source": "src/missing.py" } ]"#);
    let builder = ModuleBuilder::new(&manifest, "/usr/include/python3.11");

    let err = builder.define(&manifest.modules[0]).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_build_translates_compiles_and_links() {
    let project = Project::new();
    let manifest = project.manifest(FOO);
    let builder = ModuleBuilder::new(&manifest, "/usr/include/python3.11");
    let plan = builder.define(&manifest.modules[0]).unwrap();
    let runner = ScriptedRunner::succeeding();

    let artifact = BuildExecutor::new(&runner, "c++", "python3")
        .build(&plan)
        .unwrap();
    assert_eq!(artifact, project.path().join("build/foo/foo.so"));

    let calls = runner.calls();
    assert_eq!(calls.len(), 1 + 5 + 1);
    assert_eq!(calls[0].program, "shedskin");
    assert!(calls[1..6].iter().all(|c| c.args.contains(&"-c".to_string())));

    let link = calls.last().unwrap();
    assert!(link.args.contains(&"-shared".to_string()));
    assert!(link.args.contains(&artifact.display().to_string()));
    assert!(project.path().join("build/foo/obj").is_dir());
}

#[test]
fn test_compile_failure_skips_link() {
    let project = Project::new();
    let manifest = project.manifest(FOO);
    let builder = ModuleBuilder::new(&manifest, "/usr/include/python3.11");
    let plan = builder.define(&manifest.modules[0]).unwrap();
    let runner = ScriptedRunner::failing_when(|c| {
        c.args.iter().any(|a| a.ends_with("os/path.cpp"))
    });

    let err = BuildExecutor::new(&runner, "c++", "python3")
        .build(&plan)
        .unwrap_err();

    match err {
        Error::Toolchain { module, output } => {
            assert_eq!(module, "foo");
            assert_eq!(output, "c++ failed");
        }
        other => panic!("expected toolchain error, got {other:?}"),
    }
    assert!(
        !runner
            .calls()
            .iter()
            .any(|c| c.args.contains(&"-shared".to_string()))
    );
}

#[test]
fn test_translation_failure_is_isolated() {
    let project = Project::new();
    let manifest = project.manifest(
        r#"[ { "source": "src/a.py" }, { "source": "src/b.py", "system_modules": ["math"] } ]"#,
    );
    let builder = ModuleBuilder::new(&manifest, "/usr/include/python3.11");
    let runner = ScriptedRunner::failing_when(|c| {
        c.program == "shedskin" && c.args.last().is_some_and(|a| a == "a.py")
    });
    let executor = BuildExecutor::new(&runner, "c++", "python3");

    let outcomes = executor.run_all(&builder, &manifest.select(&[]).unwrap(), false);

    assert_eq!(outcomes[0].module, "a");
    assert!(matches!(outcomes[0].result, Err(Error::Translation { .. })));
    assert_eq!(outcomes[1].module, "b");
    assert_eq!(
        outcomes[1].result.as_ref().unwrap(),
        &project.path().join("build/b/b.so")
    );
}

#[test]
fn test_verification_failure() {
    let project = Project::new();
    let manifest = project.manifest(FOO);
    let builder = ModuleBuilder::new(&manifest, "/usr/include/python3.11");
    let runner = ScriptedRunner::failing_when(|c| c.program == "python3");
    let executor = BuildExecutor::new(&runner, "c++", "python3");

    let outcomes = executor.run_all(&builder, &manifest.select(&[]).unwrap(), true);
    match &outcomes[0].result {
        Err(Error::Verification { module, .. }) => assert_eq!(module, "foo"),
        other => panic!("expected verification failure, got {other:?}"),
    }

    let test_call = runner.calls().into_iter().last().unwrap();
    assert_eq!(test_call.args, ["-c", "import foo; foo.test_all()"]);
    assert_eq!(test_call.cwd, Some(project.path().join("build/foo")));
}

#[test]
fn test_fresh_translation_is_skipped_unless_forced() {
    let project = Project::new();
    let manifest = project.manifest(r#"[ { "source": "src/a.py" } ]"#);
    let builder = ModuleBuilder::new(&manifest, "/usr/include/python3.11");
    let plan = builder.define(&manifest.modules[0]).unwrap();

    let past = SystemTime::now() - Duration::from_secs(60);
    fs::File::options()
        .write(true)
        .open(project.path().join("src/a.py"))
        .unwrap()
        .set_modified(past)
        .unwrap();
    fs::create_dir_all(project.path().join("build/a")).unwrap();
    fs::write(&plan.translation.outputs.source, "").unwrap();
    fs::write(&plan.translation.outputs.header, "").unwrap();

    let runner = ScriptedRunner::succeeding();
    BuildExecutor::new(&runner, "c++", "python3").build(&plan).unwrap();
    assert!(runner.calls().iter().all(|c| c.program != "shedskin"));

    let runner = ScriptedRunner::succeeding();
    BuildExecutor::new(&runner, "c++", "python3")
        .force(true)
        .build(&plan)
        .unwrap();
    assert_eq!(runner.calls()[0].program, "shedskin");
}
