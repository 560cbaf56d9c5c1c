//! Smoke tests for built modules.
//!
//! Each module gets exactly one test: import it into the host runtime and
//! call its `test_all` function. Any raised error fails the test.

use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::module::ModuleName;
use crate::process::{CommandSpec, ProcessRunner};

/// Conventional verification entry point exposed by every built module.
pub const VERIFY_FUNCTION: &str = "test_all";

/// How to validate one built artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestDescriptor {
    pub artifact_name: ModuleName,
    pub load_expression: String,
    pub verify_call: String,
}

impl TestDescriptor {
    /// The host-runtime script: load, then verify.
    pub fn script(&self) -> String {
        format!("{}; {}", self.load_expression, self.verify_call)
    }

    /// Command running the script with `host`, from the artifact's directory.
    pub fn command(&self, host: &str, artifact_dir: &Path) -> CommandSpec {
        CommandSpec::new(host)
            .arg("-c")
            .arg(self.script())
            .current_dir(artifact_dir)
    }
}

/// Creates and runs [`TestDescriptor`]s.
#[derive(Debug, Clone, Default)]
pub struct TestRegistrar;

impl TestRegistrar {
    pub fn register(&self, artifact_name: &ModuleName) -> TestDescriptor {
        TestDescriptor {
            artifact_name: artifact_name.clone(),
            load_expression: format!("import {}", artifact_name),
            verify_call: format!("{}.{}()", artifact_name, VERIFY_FUNCTION),
        }
    }

    /// Run one test. A nonzero exit from the host is a failure; there is no
    /// retry and no partial success.
    pub fn run(
        &self,
        runner: &dyn ProcessRunner,
        test: &TestDescriptor,
        host: &str,
        artifact_dir: &Path,
    ) -> Result<()> {
        let output = runner.run(&test.command(host, artifact_dir))?;
        if output.success() {
            tracing::info!(module = %test.artifact_name, "test passed");
            Ok(())
        } else {
            Err(Error::Verification {
                module: test.artifact_name.to_string(),
                output: output.combined(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::process::ProcessOutput;

    struct Exit(i32);

    impl ProcessRunner for Exit {
        fn run(&self, _command: &CommandSpec) -> Result<ProcessOutput> {
            Ok(ProcessOutput {
                code: Some(self.0),
                stdout: String::new(),
                stderr: "AssertionError".into(),
            })
        }
    }

    fn foo() -> ModuleName {
        ModuleName::new("foo").unwrap()
    }

    #[test]
    fn test_descriptor_for_foo() {
        let test = TestRegistrar.register(&foo());
        assert_eq!(test.load_expression, "import foo");
        assert_eq!(test.verify_call, "foo.test_all()");

        let cmd = test.command("python3", Path::new("/build/foo"));
        assert_eq!(cmd.args, ["-c", "import foo; foo.test_all()"]);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/build/foo")));
    }

    #[test]
    fn test_pass_and_fail() {
        let test = TestRegistrar.register(&foo());
        assert!(TestRegistrar.run(&Exit(0), &test, "python3", Path::new(".")).is_ok());

        match TestRegistrar.run(&Exit(1), &test, "python3", Path::new(".")) {
            Err(Error::Verification { module, output }) => {
                assert_eq!(module, "foo");
                assert_eq!(output, "AssertionError");
            }
            other => panic!("expected verification failure, got {other:?}"),
        }
    }
}
