//! Ostrich site build infrastructure
//!
//! Builds a list of modules once per flavor:
//! - Module descriptors declaring libraries and programs
//! - Per-flavor target registry with name, qualified and wildcard queries
//! - Strict library dependency resolution
//! - Pluggable build executors, with a command-plan executor
//! - Flavor selection and parallel flavor builds

pub mod builder;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod flavor;
pub mod names;
pub mod orchestrator;
pub mod plan;
pub mod query;
pub mod registry;
pub mod resolver;
pub mod targets;

// Re-export main types
pub use builder::{Builder, FlavorPlan};
pub use descriptor::{
    DescriptorSource, FsDescriptorSource, LibraryDecl, ModuleDescriptor, ProgramDecl,
    DESCRIPTOR_FILE,
};
pub use error::{BuildError, BuildResult};
pub use executor::{BuildExecutor, PlanExecutor, EXE_SUFFIX};
pub use flavor::{select_flavors, FlavorEnv, Toolchain, FLAVOR_ENV_VAR};
pub use names::{is_qualified, qualify, split_qualified, to_key, ModulePath, QUALIFIER};
pub use orchestrator::{
    install_name, BuildStats, FlavorOutcome, InstallEntry, ModuleOrchestrator, OrchestratorState,
};
pub use plan::{BuildPlan, BuildStep};
pub use query::{Query, QueryWarning};
pub use registry::{RegisteredTarget, Resolution, TargetRegistry};
pub use resolver::LibraryResolver;
pub use targets::{ArtifactHandle, ArtifactKind, Source, TargetKind, TargetOptions, TargetRequest};

// Re-export configuration types for convenience
pub use ostrich_config::{Config, ConfigLoader, SiteConfig};
