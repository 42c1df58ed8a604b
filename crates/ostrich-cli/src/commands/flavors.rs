//! Flavors command - list selectable flavors

use anyhow::Result;
use colored::Colorize;
use ostrich_build::{FlavorEnv, FLAVOR_ENV_VAR};
use serde_json::json;
use std::path::PathBuf;

/// Run the flavors command
pub fn run(directory: Option<PathBuf>, json: bool) -> Result<()> {
    let config = super::load_config(directory)?;
    let active = std::env::var(FLAVOR_ENV_VAR).ok();

    let envs = config
        .site
        .flavor_names()
        .into_iter()
        .map(|name| FlavorEnv::new(&config, name))
        .collect::<Result<Vec<_>, _>>()?;

    if json {
        let flavors: Vec<_> = envs
            .iter()
            .map(|env| {
                json!({
                    "name": env.name,
                    "active": active.as_deref() == Some(env.name.as_str()),
                    "build_root": env.build_root,
                    "bin_dir": env.bin_dir,
                    "toolchain": env.toolchain,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&flavors)?);
        return Ok(());
    }

    for env in &envs {
        let marker = if active.as_deref() == Some(env.name.as_str()) {
            "*".green().bold().to_string()
        } else {
            " ".to_string()
        };
        println!("{} {:<12} {}", marker, env.name, env.build_root.display());
    }

    Ok(())
}
