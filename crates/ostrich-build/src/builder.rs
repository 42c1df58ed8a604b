//! Site build orchestration
//!
//! Loads the site configuration, selects flavors and processes the module
//! list once per flavor. Flavors share nothing, so they are planned (and
//! built) in parallel unless disabled.

use crate::descriptor::FsDescriptorSource;
use crate::error::{BuildError, BuildResult};
use crate::executor::PlanExecutor;
use crate::flavor::{select_flavors, FlavorEnv, FLAVOR_ENV_VAR};
use crate::orchestrator::{FlavorOutcome, ModuleOrchestrator};
use crate::plan::{self, BuildPlan};
use ostrich_config::{Config, ConfigLoader};
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Everything produced for one flavor
#[derive(Debug, Clone)]
pub struct FlavorPlan {
    /// Resolved flavor settings
    pub env: FlavorEnv,
    /// Registry, installs, warnings and statistics
    pub outcome: FlavorOutcome,
    /// Commands producing the flavor's outputs
    pub plan: BuildPlan,
}

/// Main builder for a site
#[derive(Debug, Clone)]
pub struct Builder {
    config: Config,
    requested: Vec<String>,
    env_flavor: Option<String>,
    parallel: bool,
}

impl Builder {
    /// Create a builder for the project containing `project_path`.
    ///
    /// Reads the active flavor from `BUILD_FLAVOR` if set.
    pub fn new(project_path: impl AsRef<Path>) -> BuildResult<Self> {
        let config = ConfigLoader::new().load_from_directory(project_path.as_ref())?;
        let env_flavor = std::env::var(FLAVOR_ENV_VAR)
            .ok()
            .filter(|flavor| !flavor.is_empty());
        Ok(Self::from_config(config).with_env_flavor(env_flavor))
    }

    /// Create a builder from already loaded configuration
    pub fn from_config(config: Config) -> Self {
        let parallel = config.site.site.parallel;
        Self {
            config,
            requested: Vec::new(),
            env_flavor: None,
            parallel,
        }
    }

    /// Build only these flavors
    pub fn with_flavors<S: Into<String>>(mut self, flavors: impl IntoIterator<Item = S>) -> Self {
        self.requested = flavors.into_iter().map(Into::into).collect();
        self
    }

    /// Override the active flavor, as `BUILD_FLAVOR` would
    pub fn with_env_flavor(mut self, flavor: Option<String>) -> Self {
        self.env_flavor = flavor;
        self
    }

    /// Enable/disable building flavors in parallel
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Loaded configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Flavors this builder will process, in order
    pub fn selected_flavors(&self) -> BuildResult<Vec<String>> {
        select_flavors(&self.config.site, &self.requested, self.env_flavor.as_deref())
    }

    /// Process every module for every selected flavor without running anything
    pub fn plan(&self) -> BuildResult<Vec<FlavorPlan>> {
        let flavors = self.selected_flavors()?;
        if self.config.site.site.modules.is_empty() {
            return Err(BuildError::BuildFailed(
                "no modules listed in site.toml".to_string(),
            ));
        }

        info!(
            flavors = %flavors.join(", "),
            modules = self.config.site.site.modules.len(),
            parallel = self.parallel,
            "planning site build"
        );

        if self.parallel {
            flavors
                .par_iter()
                .map(|flavor| self.plan_flavor(flavor))
                .collect()
        } else {
            flavors.iter().map(|flavor| self.plan_flavor(flavor)).collect()
        }
    }

    /// Plan, then run every flavor's build steps
    pub fn build(&self) -> BuildResult<Vec<FlavorPlan>> {
        let plans = self.plan()?;

        let run = |flavor: &FlavorPlan| -> BuildResult<()> {
            let start = Instant::now();
            plan::execute(&flavor.plan)?;
            info!(
                flavor = %flavor.env.name,
                steps = flavor.plan.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "flavor built"
            );
            Ok(())
        };

        if self.parallel {
            plans.par_iter().try_for_each(run)?;
        } else {
            plans.iter().try_for_each(run)?;
        }
        Ok(plans)
    }

    /// Process the module list for a single flavor
    pub fn plan_flavor(&self, flavor: &str) -> BuildResult<FlavorPlan> {
        let start = Instant::now();
        let env = FlavorEnv::new(&self.config, flavor)?;

        let executor = PlanExecutor::new(env.clone());
        let descriptors = FsDescriptorSource::new(self.config.project_root());
        let mut orchestrator = ModuleOrchestrator::for_flavor(&env, executor, descriptors);

        orchestrator.process_modules(&self.config.site.site.modules)?;
        let mut outcome = orchestrator.finish()?;
        let plan = orchestrator.into_executor().into_plan();
        outcome.stats.elapsed = start.elapsed();

        Ok(FlavorPlan { env, outcome, plan })
    }
}
