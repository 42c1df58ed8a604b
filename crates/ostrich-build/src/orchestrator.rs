//! Per-flavor module processing
//!
//! The orchestrator walks the module list in order. For each module it loads
//! the descriptor, builds the module's libraries and programs through the
//! executor, and records every output in the flavor's target registry so
//! that later modules can refer to it.

use crate::descriptor::DescriptorSource;
use crate::error::{BuildError, BuildResult};
use crate::executor::BuildExecutor;
use crate::flavor::FlavorEnv;
use crate::names::ModulePath;
use crate::query::QueryWarning;
use crate::registry::TargetRegistry;
use crate::targets::{ArtifactHandle, Source, TargetKind, TargetOptions, TargetRequest};
use ostrich_config::ExtLibConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Lifecycle of an orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrchestratorState {
    /// No module processed yet
    Init,
    /// Modules are being processed
    ProcessingModules,
    /// Installs scheduled, no further modules accepted
    Done,
}

/// A program scheduled for installation into the flavor's binary directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallEntry {
    /// `<module key>.<artifact file name>`
    pub bin_name: String,
    /// Full install path
    pub destination: PathBuf,
    /// Installed artifact
    pub artifact: ArtifactHandle,
}

/// Build statistics of one flavor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Modules processed
    pub modules: usize,
    /// Libraries built
    pub libraries: usize,
    /// Programs built
    pub programs: usize,
    /// Programs installed
    pub installs: usize,
    /// Query warnings raised
    pub warnings: usize,
    /// Wall-clock time spent
    pub elapsed: Duration,
}

/// Result of processing every module of a flavor
#[derive(Debug, Clone)]
pub struct FlavorOutcome {
    /// Flavor name
    pub flavor: String,
    /// Every registered target
    pub registry: TargetRegistry,
    /// Scheduled installs, in module order
    pub installs: Vec<InstallEntry>,
    /// Query warnings, in the order they were raised
    pub warnings: Vec<QueryWarning>,
    /// Statistics
    pub stats: BuildStats,
}

/// Processes modules of one flavor against its own registry
pub struct ModuleOrchestrator<E, D> {
    flavor: String,
    executor: E,
    descriptors: D,
    registry: TargetRegistry,
    ext_libs: BTreeMap<String, ExtLibConfig>,
    bin_dir: PathBuf,
    installs: Vec<InstallEntry>,
    warnings: Vec<QueryWarning>,
    stats: BuildStats,
    state: OrchestratorState,
}

impl<E: BuildExecutor, D: DescriptorSource> ModuleOrchestrator<E, D> {
    /// Create an orchestrator installing programs into `bin_dir`
    pub fn new(flavor: impl Into<String>, executor: E, descriptors: D, bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            flavor: flavor.into(),
            executor,
            descriptors,
            registry: TargetRegistry::new(),
            ext_libs: BTreeMap::new(),
            bin_dir: bin_dir.into(),
            installs: Vec::new(),
            warnings: Vec::new(),
            stats: BuildStats::default(),
            state: OrchestratorState::Init,
        }
    }

    /// Create an orchestrator for a flavor environment
    pub fn for_flavor(env: &FlavorEnv, executor: E, descriptors: D) -> Self {
        Self::new(env.name.clone(), executor, descriptors, env.bin_dir.clone())
            .with_ext_libs(env.ext_libs.clone())
    }

    /// Set the external libraries modules may reference
    pub fn with_ext_libs(mut self, ext_libs: BTreeMap<String, ExtLibConfig>) -> Self {
        self.ext_libs = ext_libs;
        self
    }

    /// Current state
    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Targets registered so far
    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    /// Installs recorded so far
    pub fn installs(&self) -> &[InstallEntry] {
        &self.installs
    }

    /// The executor
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Consume the orchestrator, returning its executor
    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Process modules in the given order
    pub fn process_modules<S: AsRef<str>>(&mut self, modules: &[S]) -> BuildResult<()> {
        for module in modules {
            self.process_module(&ModulePath::new(module.as_ref()))?;
        }
        Ok(())
    }

    /// Build every target declared by `module` and register its outputs.
    ///
    /// Libraries are built before programs, each in declaration order, so
    /// programs may depend on libraries of their own module.
    pub fn process_module(&mut self, module: &ModulePath) -> BuildResult<()> {
        if self.state == OrchestratorState::Done {
            return Err(BuildError::BuildFailed(format!(
                "cannot process module '{}': flavor '{}' is already finished",
                module, self.flavor
            )));
        }
        self.state = OrchestratorState::ProcessingModules;

        let descriptor = self.descriptors.load(module)?;
        info!(
            flavor = %self.flavor,
            module = %module,
            libraries = descriptor.libraries.len(),
            programs = descriptor.programs.len(),
            "reading module"
        );

        for library in &descriptor.libraries {
            let options = self.target_options(module, &library.name, &library.options, &library.ext_libs)?;
            let sources: Vec<Source> = library.sources.iter().cloned().map(Source::File).collect();
            let request = TargetRequest {
                module,
                name: &library.name,
                sources: &sources,
                options: &options,
            };

            let handles = self.executor.build_library(&request)?;
            self.registry
                .insert(module, &library.name, TargetKind::Library, handles)?;
            self.stats.libraries += 1;
        }

        for program in &descriptor.programs {
            let options = self.target_options(module, &program.name, &program.options, &program.ext_libs)?;

            let mut sources: Vec<Source> = program.sources.iter().cloned().map(Source::File).collect();
            let deps = self.registry.library_resolver().resolve_all(&program.deps)?;
            sources.extend(deps.into_iter().map(Source::Artifact));

            let resolution = self.registry.resolve(&program.targets, program.no_multi_warn)?;
            sources.extend(resolution.handles.into_iter().map(Source::Artifact));
            self.stats.warnings += resolution.warnings.len();
            self.warnings.extend(resolution.warnings);

            let request = TargetRequest {
                module,
                name: &program.name,
                sources: &sources,
                options: &options,
            };
            let handles = self.executor.build_program(&request)?;
            self.registry
                .insert(module, &program.name, TargetKind::Program, handles.clone())?;
            self.stats.programs += 1;

            if program.install {
                self.record_installs(module, &handles);
            }
        }

        self.stats.modules += 1;
        Ok(())
    }

    /// Schedule every recorded install and hand back the flavor's results
    pub fn finish(&mut self) -> BuildResult<FlavorOutcome> {
        if self.state == OrchestratorState::Done {
            return Err(BuildError::BuildFailed(format!(
                "flavor '{}' is already finished",
                self.flavor
            )));
        }

        for entry in &self.installs {
            self.executor.install_as(&entry.destination, &entry.artifact)?;
        }
        self.stats.installs = self.installs.len();
        self.state = OrchestratorState::Done;

        info!(
            flavor = %self.flavor,
            modules = self.stats.modules,
            targets = self.registry.len(),
            installs = self.stats.installs,
            "flavor processed"
        );

        Ok(FlavorOutcome {
            flavor: self.flavor.clone(),
            registry: std::mem::take(&mut self.registry),
            installs: std::mem::take(&mut self.installs),
            warnings: std::mem::take(&mut self.warnings),
            stats: self.stats.clone(),
        })
    }

    /// Target options with the referenced external libraries applied
    fn target_options(
        &self,
        module: &ModulePath,
        target: &str,
        base: &TargetOptions,
        ext_libs: &[String],
    ) -> BuildResult<TargetOptions> {
        let mut options = base.clone();
        for name in ext_libs {
            let ext_lib = self
                .ext_libs
                .get(name)
                .ok_or_else(|| BuildError::UnknownExtLib {
                    name: name.clone(),
                    target: module.qualify(target),
                })?;
            options.apply_ext_lib(name, ext_lib);
        }
        Ok(options)
    }

    fn record_installs(&mut self, module: &ModulePath, handles: &[ArtifactHandle]) {
        for artifact in handles.iter().filter(|handle| handle.kind.is_installable()) {
            let bin_name = install_name(module, artifact);
            let destination = install_path(&self.bin_dir, module, artifact);
            debug!(flavor = %self.flavor, from = %artifact, to = %destination.display(), "scheduled install");
            self.installs.push(InstallEntry {
                bin_name,
                destination,
                artifact: artifact.clone(),
            });
        }
    }
}

/// Name a program is installed under: `<module key>.<file name>`
pub fn install_name(module: &ModulePath, artifact: &ArtifactHandle) -> String {
    format!("{}.{}", module.key(), artifact.base_name())
}

/// Install destination of `artifact` below `bin_dir`
pub fn install_path(bin_dir: &Path, module: &ModulePath, artifact: &ArtifactHandle) -> PathBuf {
    bin_dir.join(install_name(module, artifact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{LibraryDecl, ModuleDescriptor, ProgramDecl};
    use crate::targets::ArtifactKind;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    /// Executor that records requests and hands out predictable handles
    #[derive(Debug, Default)]
    struct RecordingExecutor {
        libraries: Vec<(String, Vec<Source>)>,
        programs: Vec<(String, Vec<Source>)>,
        installs: Vec<(PathBuf, ArtifactHandle)>,
    }

    impl BuildExecutor for RecordingExecutor {
        fn build_library(&mut self, request: &TargetRequest<'_>) -> BuildResult<Vec<ArtifactHandle>> {
            self.libraries
                .push((request.module.qualify(request.name), request.sources.to_vec()));
            Ok(vec![static_lib(request.module.as_str(), request.name)])
        }

        fn build_program(&mut self, request: &TargetRequest<'_>) -> BuildResult<Vec<ArtifactHandle>> {
            self.programs
                .push((request.module.qualify(request.name), request.sources.to_vec()));
            Ok(vec![ArtifactHandle::new(
                ArtifactKind::Executable,
                format!("out/{}/{}", request.module, request.name),
            )])
        }

        fn install_as(&mut self, destination: &Path, artifact: &ArtifactHandle) -> BuildResult<()> {
            self.installs.push((destination.to_path_buf(), artifact.clone()));
            Ok(())
        }
    }

    fn static_lib(module: &str, name: &str) -> ArtifactHandle {
        ArtifactHandle::new(ArtifactKind::StaticLibrary, format!("out/{}/lib{}.a", module, name))
    }

    type Modules = BTreeMap<String, ModuleDescriptor>;

    fn orchestrator(modules: Modules) -> ModuleOrchestrator<RecordingExecutor, Modules> {
        ModuleOrchestrator::new("debug", RecordingExecutor::default(), modules, "out/bin")
    }

    fn library_module(name: &str) -> ModuleDescriptor {
        ModuleDescriptor::default().with_library(LibraryDecl::new(name).with_sources([format!("{}.cc", name)]))
    }

    #[test]
    fn test_library_dependency_end_to_end() {
        let mut modules = Modules::new();
        modules.insert("lib1".to_string(), library_module("core"));
        modules.insert(
            "app".to_string(),
            ModuleDescriptor::default().with_program(
                ProgramDecl::new("tool")
                    .with_sources(["main.cc"])
                    .with_deps(["core"]),
            ),
        );
        let mut orchestrator = orchestrator(modules);

        orchestrator.process_modules(&["lib1", "app"]).unwrap();

        assert!(orchestrator.registry().contains("lib1::core"));
        assert!(orchestrator.registry().contains("app::tool"));
        let (_, sources) = &orchestrator.executor().programs[0];
        assert_eq!(
            sources,
            &vec![
                Source::file("main.cc"),
                Source::Artifact(static_lib("lib1", "core")),
            ]
        );

        let outcome = orchestrator.finish().unwrap();
        assert_eq!(outcome.installs.len(), 1);
        assert_eq!(outcome.installs[0].bin_name, "app.tool");
        assert_eq!(outcome.installs[0].destination, PathBuf::from("out/bin/app.tool"));
        assert_eq!(
            outcome.stats,
            BuildStats {
                modules: 2,
                libraries: 1,
                programs: 1,
                installs: 1,
                ..Default::default()
            }
        );

        let executor = orchestrator.into_executor();
        assert_eq!(executor.installs.len(), 1);
        assert_eq!(executor.installs[0].0, PathBuf::from("out/bin/app.tool"));
    }

    #[test]
    fn test_state_transitions() {
        let mut modules = Modules::new();
        modules.insert("lib1".to_string(), library_module("core"));
        let mut orchestrator = orchestrator(modules);
        assert_eq!(orchestrator.state(), OrchestratorState::Init);

        orchestrator.process_module(&ModulePath::new("lib1")).unwrap();
        assert_eq!(orchestrator.state(), OrchestratorState::ProcessingModules);

        orchestrator.finish().unwrap();
        assert_eq!(orchestrator.state(), OrchestratorState::Done);
        assert!(orchestrator.process_module(&ModulePath::new("lib1")).is_err());
        assert!(orchestrator.finish().is_err());
    }

    #[test]
    fn test_programs_can_use_libraries_of_their_module() {
        let mut modules = Modules::new();
        modules.insert(
            "net/http".to_string(),
            library_module("http").with_program(
                ProgramDecl::new("fetch")
                    .with_sources(["fetch.cc"])
                    .with_deps(["net.http::http"]),
            ),
        );
        let mut orchestrator = orchestrator(modules);

        orchestrator.process_modules(&["net/http"]).unwrap();
        let outcome = orchestrator.finish().unwrap();

        assert_eq!(outcome.installs[0].bin_name, "net.http.fetch");
        assert_eq!(
            outcome.registry.keys().collect::<Vec<_>>(),
            vec!["net.http::fetch", "net.http::http"]
        );
    }

    #[test]
    fn test_ambiguous_dependency_is_fatal() {
        let mut modules = Modules::new();
        modules.insert("a".to_string(), library_module("util"));
        modules.insert("b".to_string(), library_module("util"));
        modules.insert(
            "app".to_string(),
            ModuleDescriptor::default().with_program(
                ProgramDecl::new("tool")
                    .with_sources(["main.cc"])
                    .with_deps(["util"]),
            ),
        );
        let mut orchestrator = orchestrator(modules);

        let err = orchestrator.process_modules(&["a", "b", "app"]).unwrap_err();
        assert!(matches!(err, BuildError::AmbiguousLibrary { .. }));
        assert!(orchestrator.executor().programs.is_empty());
    }

    #[test]
    fn test_forward_reference_is_unknown_library() {
        let mut modules = Modules::new();
        modules.insert("lib1".to_string(), library_module("core"));
        modules.insert(
            "app".to_string(),
            ModuleDescriptor::default().with_program(
                ProgramDecl::new("tool")
                    .with_sources(["main.cc"])
                    .with_deps(["core"]),
            ),
        );
        let mut orchestrator = orchestrator(modules);

        let err = orchestrator.process_modules(&["app", "lib1"]).unwrap_err();
        assert!(matches!(err, BuildError::UnknownLibrary { ref name } if name == "core"));
    }

    #[test]
    fn test_program_colliding_with_library_is_fatal() {
        let mut modules = Modules::new();
        modules.insert(
            "tool".to_string(),
            library_module("tool").with_program(ProgramDecl::new("tool").with_sources(["main.cc"])),
        );
        let mut orchestrator = orchestrator(modules);

        let err = orchestrator.process_modules(&["tool"]).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateTarget { ref key, .. } if key == "tool::tool"));
    }

    #[traced_test]
    #[test]
    fn test_loose_target_queries_only_warn() {
        let mut modules = Modules::new();
        modules.insert("a".to_string(), library_module("proto"));
        modules.insert("b".to_string(), library_module("proto"));
        modules.insert(
            "app".to_string(),
            ModuleDescriptor::default().with_program(
                ProgramDecl::new("tool")
                    .with_sources(["main.cc"])
                    .with_targets(["proto", "missing"]),
            ),
        );
        let mut orchestrator = orchestrator(modules);

        orchestrator.process_modules(&["a", "b", "app"]).unwrap();

        let (_, sources) = &orchestrator.executor().programs[0];
        assert_eq!(sources.len(), 3);
        let outcome = orchestrator.finish().unwrap();
        assert_eq!(outcome.stats.warnings, 2);
        assert_eq!(
            outcome.warnings,
            vec![
                QueryWarning::MultipleMatches {
                    query: "proto".to_string(),
                    count: 2
                },
                QueryWarning::NoMatches {
                    query: "missing".to_string()
                },
            ]
        );
        assert!(logs_contain("target query had multiple matches"));
        assert!(logs_contain("target query had no matches"));
    }

    #[test]
    fn test_no_multi_warn_suppresses_ambiguity_warning() {
        let mut modules = Modules::new();
        modules.insert("a".to_string(), library_module("proto"));
        modules.insert("b".to_string(), library_module("proto"));
        let mut program = ProgramDecl::new("tool")
            .with_sources(["main.cc"])
            .with_targets(["proto"]);
        program.no_multi_warn = true;
        modules.insert("app".to_string(), ModuleDescriptor::default().with_program(program));
        let mut orchestrator = orchestrator(modules);

        orchestrator.process_modules(&["a", "b", "app"]).unwrap();
        let outcome = orchestrator.finish().unwrap();

        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_uninstalled_program_is_not_scheduled() {
        let mut modules = Modules::new();
        modules.insert(
            "tests".to_string(),
            ModuleDescriptor::default().with_program(
                ProgramDecl::new("unit")
                    .with_sources(["unit.cc"])
                    .with_install(false),
            ),
        );
        let mut orchestrator = orchestrator(modules);

        orchestrator.process_modules(&["tests"]).unwrap();
        let outcome = orchestrator.finish().unwrap();

        assert!(outcome.installs.is_empty());
        assert_eq!(outcome.stats.programs, 1);
        assert!(orchestrator.into_executor().installs.is_empty());
    }

    #[test]
    fn test_ext_libs_are_applied_to_options() {
        let mut modules = Modules::new();
        modules.insert(
            "AddressBook".to_string(),
            ModuleDescriptor::default().with_library(
                LibraryDecl::new("addressbook")
                    .with_sources(["addressbook.cc"])
                    .with_ext_libs(vec!["protobuf".to_string()]),
            ),
        );
        let mut ext_libs = BTreeMap::new();
        ext_libs.insert(
            "protobuf".to_string(),
            ExtLibConfig {
                include_paths: vec!["/opt/pb/include".to_string()],
                ..Default::default()
            },
        );

        let mut with_protobuf = orchestrator(modules.clone()).with_ext_libs(ext_libs);
        with_protobuf.process_modules(&["AddressBook"]).unwrap();
        assert_eq!(with_protobuf.executor().libraries.len(), 1);

        let mut missing = orchestrator(modules);
        let err = missing.process_modules(&["AddressBook"]).unwrap_err();
        match err {
            BuildError::UnknownExtLib { name, target } => {
                assert_eq!(name, "protobuf");
                assert_eq!(target, "AddressBook::addressbook");
            }
            other => panic!("expected unknown ext lib, got {other}"),
        }
    }

    #[test]
    fn test_missing_descriptor_is_fatal() {
        let mut orchestrator = orchestrator(Modules::new());
        assert!(matches!(
            orchestrator.process_modules(&["ghost"]),
            Err(BuildError::DescriptorNotFound { .. })
        ));
    }

    #[test]
    fn test_install_path() {
        let artifact = ArtifactHandle::new(ArtifactKind::Executable, "build/debug/Writer/writer");
        assert_eq!(
            install_path(Path::new("build/debug/bin"), &ModulePath::new("Writer"), &artifact),
            PathBuf::from("build/debug/bin/Writer.writer")
        );
    }
}
