//! Build plans
//!
//! A plan is the ordered list of commands needed to produce every output of
//! one flavor. Plans are recorded by [`PlanExecutor`](crate::executor::PlanExecutor)
//! and either printed (dry run) or executed.

use crate::error::{BuildError, BuildResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// One step of a build plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum BuildStep {
    /// Compile one source file to an object
    Compile {
        source: PathBuf,
        output: PathBuf,
        command: Vec<String>,
    },
    /// Archive objects into a static library
    Archive {
        output: PathBuf,
        command: Vec<String>,
    },
    /// Link a shared library
    LinkShared {
        output: PathBuf,
        command: Vec<String>,
    },
    /// Link an executable
    LinkProgram {
        output: PathBuf,
        command: Vec<String>,
    },
    /// Copy an artifact to its install location
    Install { from: PathBuf, to: PathBuf },
}

impl BuildStep {
    /// File produced by this step
    pub fn output(&self) -> &Path {
        match self {
            Self::Compile { output, .. }
            | Self::Archive { output, .. }
            | Self::LinkShared { output, .. }
            | Self::LinkProgram { output, .. } => output,
            Self::Install { to, .. } => to,
        }
    }

    /// Command line of this step, if it runs a tool
    pub fn command(&self) -> Option<&[String]> {
        match self {
            Self::Compile { command, .. }
            | Self::Archive { command, .. }
            | Self::LinkShared { command, .. }
            | Self::LinkProgram { command, .. } => Some(command),
            Self::Install { .. } => None,
        }
    }

    /// Short label for progress output
    pub fn label(&self) -> &'static str {
        match self {
            Self::Compile { .. } => "CC",
            Self::Archive { .. } => "AR",
            Self::LinkShared { .. } => "SHLINK",
            Self::LinkProgram { .. } => "LINK",
            Self::Install { .. } => "INSTALL",
        }
    }
}

impl std::fmt::Display for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Install { from, to } => {
                write!(f, "{:<8}{} -> {}", self.label(), from.display(), to.display())
            }
            _ => write!(f, "{:<8}{}", self.label(), self.output().display()),
        }
    }
}

/// Ordered build steps of one flavor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    /// Flavor the plan builds
    pub flavor: String,
    /// Directory commands run in
    pub working_dir: PathBuf,
    /// Steps, in execution order
    pub steps: Vec<BuildStep>,
}

impl BuildPlan {
    /// Create an empty plan
    pub fn new(flavor: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            flavor: flavor.into(),
            working_dir: working_dir.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step
    pub fn push(&mut self, step: BuildStep) {
        self.steps.push(step);
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the plan has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterate over the steps
    pub fn iter(&self) -> impl Iterator<Item = &BuildStep> {
        self.steps.iter()
    }

    /// Find the step producing `output`
    pub fn step_for(&self, output: &Path) -> Option<&BuildStep> {
        self.steps.iter().find(|step| step.output() == output)
    }
}

/// Run every step of a plan in order, stopping at the first failure
pub fn execute(plan: &BuildPlan) -> BuildResult<()> {
    for step in plan.iter() {
        debug!(flavor = %plan.flavor, "{}", step);
        prepare_output(step.output())?;

        match step {
            BuildStep::Install { from, to } => {
                fs::copy(from, to).map_err(|e| BuildError::io(from, e))?;
            }
            BuildStep::Archive { output, command } => {
                // ar appends to existing archives
                remove_stale(output)?;
                run(command, output, &plan.working_dir)?;
            }
            BuildStep::Compile { output, command, .. }
            | BuildStep::LinkShared { output, command }
            | BuildStep::LinkProgram { output, command } => {
                run(command, output, &plan.working_dir)?;
            }
        }
    }
    Ok(())
}

fn prepare_output(output: &Path) -> BuildResult<()> {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))
        }
        _ => Ok(()),
    }
}

fn remove_stale(output: &Path) -> BuildResult<()> {
    match fs::remove_file(output) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(BuildError::io(output, e)),
        _ => Ok(()),
    }
}

fn run(command: &[String], output: &Path, working_dir: &Path) -> BuildResult<()> {
    let Some((program, args)) = command.split_first() else {
        return Err(BuildError::BuildFailed(format!(
            "empty command for {}",
            output.display()
        )));
    };

    let status = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .status()
        .map_err(|e| BuildError::io(program, e))?;

    if !status.success() {
        return Err(BuildError::CommandFailed {
            output: output.to_path_buf(),
            command: command.join(" "),
            status: status.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn compile_step(output: &str) -> BuildStep {
        BuildStep::Compile {
            source: PathBuf::from("a.cc"),
            output: PathBuf::from(output),
            command: vec!["c++".to_string(), "-c".to_string(), "a.cc".to_string()],
        }
    }

    #[test]
    fn test_step_accessors() {
        let step = compile_step("out/a.o");
        assert_eq!(step.output(), Path::new("out/a.o"));
        assert_eq!(step.command().map(|c| c.len()), Some(3));
        assert_eq!(step.label(), "CC");

        let install = BuildStep::Install {
            from: PathBuf::from("app/tool"),
            to: PathBuf::from("bin/app.tool"),
        };
        assert_eq!(install.output(), Path::new("bin/app.tool"));
        assert!(install.command().is_none());
        assert_eq!(install.to_string(), "INSTALL app/tool -> bin/app.tool");
    }

    #[test]
    fn test_plan_step_lookup() {
        let mut plan = BuildPlan::new("debug", ".");
        assert!(plan.is_empty());
        plan.push(compile_step("out/a.o"));
        plan.push(compile_step("out/b.o"));

        assert_eq!(plan.len(), 2);
        assert!(plan.step_for(Path::new("out/b.o")).is_some());
        assert!(plan.step_for(Path::new("out/c.o")).is_none());
    }

    #[test]
    fn test_step_serializes_with_tag() {
        let json = serde_json::to_value(compile_step("a.o")).unwrap();
        assert_eq!(json["step"], "compile");
        assert_eq!(json["output"], "a.o");
    }

    #[test]
    fn test_execute_install_creates_directories() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("tool");
        fs::write(&from, "binary").unwrap();
        let to = temp.path().join("bin").join("app.tool");

        let mut plan = BuildPlan::new("debug", temp.path());
        plan.push(BuildStep::Install {
            from,
            to: to.clone(),
        });

        execute(&plan).unwrap();
        assert_eq!(fs::read_to_string(to).unwrap(), "binary");
    }

    #[test]
    fn test_execute_missing_install_source_fails() {
        let temp = TempDir::new().unwrap();
        let mut plan = BuildPlan::new("debug", temp.path());
        plan.push(BuildStep::Install {
            from: temp.path().join("missing"),
            to: temp.path().join("bin").join("x"),
        });

        assert!(matches!(execute(&plan), Err(BuildError::IoError { .. })));
    }

    #[test]
    fn test_execute_empty_command_fails() {
        let temp = TempDir::new().unwrap();
        let mut plan = BuildPlan::new("debug", temp.path());
        plan.push(BuildStep::LinkProgram {
            output: temp.path().join("tool"),
            command: Vec::new(),
        });

        assert!(matches!(execute(&plan), Err(BuildError::BuildFailed(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_failing_command() {
        let temp = TempDir::new().unwrap();
        let mut plan = BuildPlan::new("debug", temp.path());
        plan.push(BuildStep::LinkProgram {
            output: temp.path().join("tool"),
            command: vec!["false".to_string()],
        });

        match execute(&plan) {
            Err(BuildError::CommandFailed { command, .. }) => assert_eq!(command, "false"),
            other => panic!("expected command failure, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_runs_in_working_dir() {
        let temp = TempDir::new().unwrap();
        let mut plan = BuildPlan::new("debug", temp.path());
        plan.push(BuildStep::Archive {
            output: temp.path().join("out").join("marker"),
            command: vec!["touch".to_string(), "out/marker".to_string()],
        });

        execute(&plan).unwrap();
        assert!(temp.path().join("out").join("marker").exists());
    }
}
