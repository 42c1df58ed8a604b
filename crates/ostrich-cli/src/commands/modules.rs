//! Modules command - list modules in build order

use anyhow::Result;
use ostrich_build::ModulePath;
use serde_json::json;
use std::path::PathBuf;

/// Run the modules command
pub fn run(directory: Option<PathBuf>, json: bool) -> Result<()> {
    let config = super::load_config(directory)?;
    let modules: Vec<ModulePath> = config
        .site
        .site
        .modules
        .iter()
        .map(|module| ModulePath::new(module.as_str()))
        .collect();

    if json {
        let entries: Vec<_> = modules
            .iter()
            .map(|module| json!({ "path": module.as_str(), "key": module.key() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for module in &modules {
        println!("{} => {}", module, module.key());
    }

    Ok(())
}
