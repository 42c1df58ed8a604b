//! Query command - resolve target queries against a flavor's registry

use anyhow::{Context, Result};
use ostrich_build::Builder;
use std::path::PathBuf;

/// Query command arguments
#[derive(Debug, Default)]
pub struct QueryArgs {
    /// Flavor to plan
    pub flavor: String,
    /// Queries, in order
    pub queries: Vec<String>,
    /// Suppress multiple-match warnings
    pub no_multi_warn: bool,
    /// JSON output
    pub json: bool,
    /// Project directory (defaults to current directory)
    pub project_dir: Option<PathBuf>,
}

/// Run the query command
pub fn run(args: QueryArgs) -> Result<()> {
    let project_dir = super::project_dir(args.project_dir.clone());
    // the flavor is explicit, so BUILD_FLAVOR does not apply
    let builder = Builder::new(&project_dir)
        .context("Failed to load site configuration")?
        .with_env_flavor(None)
        .with_flavors([args.flavor.clone()])
        .with_parallel(false);

    let plan = builder
        .plan()
        .with_context(|| format!("Failed to process modules for flavor '{}'", args.flavor))?
        .pop()
        .context("No flavor was processed")?;

    let resolution = plan
        .outcome
        .registry
        .resolve(&args.queries, args.no_multi_warn)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        for handle in &resolution.handles {
            println!("{}", handle);
        }
    }

    Ok(())
}
