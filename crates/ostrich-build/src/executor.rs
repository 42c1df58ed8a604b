//! Build executors
//!
//! The orchestrator decides *what* to build; an executor decides *how*.
//! Executors turn target requests into artifact handles and schedule
//! installs.

use crate::error::BuildResult;
use crate::flavor::FlavorEnv;
use crate::plan::{BuildPlan, BuildStep};
use crate::targets::{ArtifactHandle, ArtifactKind, Source, TargetRequest};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Suffix of executables on the host platform
pub const EXE_SUFFIX: &str = std::env::consts::EXE_SUFFIX;

/// Builds targets of one flavor
pub trait BuildExecutor {
    /// Build a library, returning its outputs (static archive first)
    fn build_library(&mut self, request: &TargetRequest<'_>) -> BuildResult<Vec<ArtifactHandle>>;

    /// Build a program, returning its outputs
    fn build_program(&mut self, request: &TargetRequest<'_>) -> BuildResult<Vec<ArtifactHandle>>;

    /// Install `artifact` at `destination`
    fn install_as(&mut self, destination: &Path, artifact: &ArtifactHandle) -> BuildResult<()>;
}

/// Executor recording compiler and linker invocations into a [`BuildPlan`]
#[derive(Debug, Clone)]
pub struct PlanExecutor {
    env: FlavorEnv,
    plan: BuildPlan,
}

impl PlanExecutor {
    /// Create an executor for one flavor
    pub fn new(env: FlavorEnv) -> Self {
        let plan = BuildPlan::new(env.name.clone(), env.project_root.clone());
        Self { env, plan }
    }

    /// Steps recorded so far
    pub fn plan(&self) -> &BuildPlan {
        &self.plan
    }

    /// Consume the executor and return its plan
    pub fn into_plan(self) -> BuildPlan {
        self.plan
    }

    /// Compile every file source of the request, returning object paths
    fn compile_sources(&mut self, request: &TargetRequest<'_>, pic: bool) -> Vec<PathBuf> {
        let module_dir = self.env.module_dir(request.module);
        let variant_dir = self.env.variant_dir(request.module);
        let compile_args = self.compile_args(request, &module_dir, pic);

        let mut objects = Vec::new();
        for source in request.sources {
            let Source::File(file) = source else {
                continue;
            };
            let source_path = module_dir.join(file);
            let object = object_path(&variant_dir, file);

            let mut command = vec![self.env.toolchain.compiler_for(file).to_string()];
            command.extend(compile_args.iter().cloned());
            command.extend([
                "-c".to_string(),
                path_arg(&source_path),
                "-o".to_string(),
                path_arg(&object),
            ]);

            self.plan.push(BuildStep::Compile {
                source: source_path,
                output: object.clone(),
                command,
            });
            objects.push(object);
        }
        objects
    }

    /// Flags, defines and include paths: flavor settings first, then target options
    fn compile_args(&self, request: &TargetRequest<'_>, module_dir: &Path, pic: bool) -> Vec<String> {
        let options = request.options;
        let mut args: Vec<String> = self.env.flags.clone();
        args.extend(options.flags.iter().cloned());
        if pic {
            args.push("-fPIC".to_string());
        }
        args.extend(
            self.env
                .defines
                .iter()
                .chain(&options.defines)
                .map(|define| format!("-D{}", define)),
        );
        args.extend(self.env.include_paths.iter().map(|p| format!("-I{}", p.display())));
        args.extend(
            options
                .include_paths
                .iter()
                .map(|raw| format!("-I{}", self.env.expand_path(raw, module_dir).display())),
        );
        args
    }

    /// Library artifacts among the sources, in order
    fn link_inputs(request: &TargetRequest<'_>) -> Vec<String> {
        request
            .sources
            .iter()
            .filter_map(|source| match source {
                Source::Artifact(handle) if handle.kind != ArtifactKind::Executable => {
                    Some(path_arg(handle.path()))
                }
                _ => None,
            })
            .collect()
    }

    /// Search paths, libraries and flags for the link line
    fn link_args(&self, request: &TargetRequest<'_>, module_dir: &Path) -> Vec<String> {
        let options = request.options;
        let mut args: Vec<String> = options
            .lib_paths
            .iter()
            .map(|raw| format!("-L{}", self.env.expand_path(raw, module_dir).display()))
            .collect();
        args.extend(options.libs.iter().map(|lib| format!("-l{}", lib)));
        args.extend(self.env.link_flags.iter().cloned());
        args.extend(options.link_flags.iter().cloned());
        args
    }
}

impl BuildExecutor for PlanExecutor {
    fn build_library(&mut self, request: &TargetRequest<'_>) -> BuildResult<Vec<ArtifactHandle>> {
        let shared = request.options.shared;
        let objects = self.compile_sources(request, shared);
        let variant_dir = self.env.variant_dir(request.module);

        let archive = variant_dir.join(format!("lib{}.a", request.name));
        let mut command = vec![
            self.env.toolchain.ar.clone(),
            "rcs".to_string(),
            path_arg(&archive),
        ];
        command.extend(objects.iter().map(|object| path_arg(object)));
        self.plan.push(BuildStep::Archive {
            output: archive.clone(),
            command,
        });

        let mut handles = vec![ArtifactHandle::new(ArtifactKind::StaticLibrary, archive)];

        if shared {
            let module_dir = self.env.module_dir(request.module);
            let shared_object = variant_dir.join(format!("lib{}.so", request.name));
            let mut command = vec![
                self.env.toolchain.cxx.clone(),
                "-shared".to_string(),
                "-o".to_string(),
                path_arg(&shared_object),
            ];
            command.extend(objects.iter().map(|object| path_arg(object)));
            command.extend(Self::link_inputs(request));
            command.extend(self.link_args(request, &module_dir));
            self.plan.push(BuildStep::LinkShared {
                output: shared_object.clone(),
                command,
            });
            handles.push(ArtifactHandle::new(ArtifactKind::SharedLibrary, shared_object));
        }

        debug!(
            flavor = %self.env.name,
            module = %request.module,
            library = request.name,
            outputs = handles.len(),
            "planned library"
        );
        Ok(handles)
    }

    fn build_program(&mut self, request: &TargetRequest<'_>) -> BuildResult<Vec<ArtifactHandle>> {
        let objects = self.compile_sources(request, false);
        let module_dir = self.env.module_dir(request.module);
        let executable = self
            .env
            .variant_dir(request.module)
            .join(format!("{}{}", request.name, EXE_SUFFIX));

        let mut command = vec![self.env.toolchain.cxx.clone()];
        command.extend(objects.iter().map(|object| path_arg(object)));
        command.extend(Self::link_inputs(request));
        command.extend(["-o".to_string(), path_arg(&executable)]);
        command.extend(self.link_args(request, &module_dir));
        self.plan.push(BuildStep::LinkProgram {
            output: executable.clone(),
            command,
        });

        debug!(
            flavor = %self.env.name,
            module = %request.module,
            program = request.name,
            "planned program"
        );
        Ok(vec![ArtifactHandle::new(ArtifactKind::Executable, executable)])
    }

    fn install_as(&mut self, destination: &Path, artifact: &ArtifactHandle) -> BuildResult<()> {
        self.plan.push(BuildStep::Install {
            from: artifact.path().to_path_buf(),
            to: destination.to_path_buf(),
        });
        Ok(())
    }
}

/// Object file of a source: the source path mirrored below the variant
/// directory, with `.o` appended to the full file name (`a/x.cc` becomes
/// `a/x.cc.o`).
fn object_path(variant_dir: &Path, source: &Path) -> PathBuf {
    let mut object = variant_dir.to_path_buf();
    for component in source.components() {
        match component {
            Component::Normal(part) => object.push(part),
            Component::ParentDir => object.push("__"),
            _ => {}
        }
    }
    let mut name = object.file_name().map(OsString::from).unwrap_or_default();
    name.push(".o");
    object.set_file_name(name);
    object
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
