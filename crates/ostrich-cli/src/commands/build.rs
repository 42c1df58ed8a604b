//! Build command - plan and run the site build for each flavor

use anyhow::{Context, Result};
use colored::Colorize;
use ostrich_build::{Builder, FlavorPlan};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// Build command arguments
#[derive(Debug, Default)]
pub struct BuildArgs {
    /// Flavors to build (empty: all)
    pub flavors: Vec<String>,
    /// Print steps instead of running them
    pub dry_run: bool,
    /// JSON output
    pub json: bool,
    /// Build flavors one after another
    pub sequential: bool,
    /// Quiet output (errors only)
    pub quiet: bool,
    /// Project directory (defaults to current directory)
    pub project_dir: Option<PathBuf>,
}

/// Run the build command
pub fn run(args: BuildArgs) -> Result<()> {
    let project_dir = super::project_dir(args.project_dir.clone());
    debug!(project = %project_dir.display(), dry_run = args.dry_run, "starting build");
    let mut builder = Builder::new(&project_dir)
        .context("Failed to load site configuration")?
        .with_flavors(args.flavors.clone());
    if args.sequential {
        builder = builder.with_parallel(false);
    }

    let start = Instant::now();
    let plans = if args.dry_run {
        builder.plan()
    } else {
        builder.build()
    }
    .context("Build failed")?;
    let elapsed = start.elapsed();

    if args.json {
        let flavors: Vec<Value> = plans
            .iter()
            .map(|plan| flavor_json(plan, args.dry_run))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "success": true,
                "dry_run": args.dry_run,
                "total_time": elapsed.as_secs_f64(),
                "flavors": flavors,
            }))?
        );
    } else if args.dry_run {
        for plan in &plans {
            print_plan(plan);
        }
    } else if !args.quiet {
        for plan in &plans {
            print_summary(plan);
        }
        println!(
            "{} {} flavor(s) in {:.2}s",
            "Finished".green().bold(),
            plans.len(),
            elapsed.as_secs_f64()
        );
    }

    Ok(())
}

/// JSON description of one flavor's results
pub fn flavor_json(plan: &FlavorPlan, include_steps: bool) -> Value {
    let stats = &plan.outcome.stats;
    let mut value = json!({
        "flavor": plan.env.name,
        "build_root": plan.env.build_root,
        "bin_dir": plan.env.bin_dir,
        "modules": stats.modules,
        "libraries": stats.libraries,
        "programs": stats.programs,
        "elapsed": stats.elapsed.as_secs_f64(),
        "installs": plan.outcome.installs,
        "warnings": plan.outcome.warnings,
    });
    if include_steps {
        value["steps"] = json!(plan.plan.steps);
    }
    value
}

fn print_plan(plan: &FlavorPlan) {
    println!(
        "{} {} ({})",
        "Flavor".cyan().bold(),
        plan.env.name,
        plan.env.build_root.display()
    );
    for step in plan.plan.iter() {
        match step.command() {
            Some(command) => println!("  {}", command.join(" ")),
            None => println!("  {}", step),
        }
    }
}

fn print_summary(plan: &FlavorPlan) {
    let stats = &plan.outcome.stats;
    println!(
        "{} {}: {} modules, {} libraries, {} programs, {} installed",
        "Built".green().bold(),
        plan.env.name,
        stats.modules,
        stats.libraries,
        stats.programs,
        stats.installs
    );
    if stats.warnings > 0 {
        println!("  {} {} query warning(s)", "warning:".yellow().bold(), stats.warnings);
    }
}
