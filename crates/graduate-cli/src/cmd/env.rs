use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use graduate_core::environment;
use std::path::Path;

#[derive(Subcommand)]
pub enum EnvSubcommand {
    /// Register an environment
    Add {
        /// Environment name (e.g. staging, production)
        name: String,
        /// ssh address of the environment host (e.g. deploy@prod.example.com)
        url: String,
    },
    /// Remove an environment
    #[command(alias = "remove")]
    Rm {
        /// Environment name
        name: String,
    },
    /// List environments
    List,
}

pub fn run(root: &Path, subcmd: EnvSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        EnvSubcommand::Add { name, url } => add(root, &name, &url, json),
        EnvSubcommand::Rm { name } => remove(root, &name, json),
        EnvSubcommand::List => list(root, json),
    }
}

fn add(root: &Path, name: &str, url: &str, json: bool) -> anyhow::Result<()> {
    let env = environment::register(root, name, url)
        .with_context(|| format!("failed to add environment '{name}'"))?;
    if json {
        print_json(&env)?;
    } else {
        println!("Added environment '{}' ({})", env.name, env.url);
    }
    Ok(())
}

fn remove(root: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    environment::remove(root, name)?;
    if json {
        print_json(&serde_json::json!({ "removed": name }))?;
    } else {
        println!("Removed environment '{name}'");
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let envs = environment::list(root)?;
    if json {
        return print_json(&envs);
    }
    if envs.is_empty() {
        println!("No environments. Add one with: graduate env add <name> <url>");
        return Ok(());
    }
    let rows = envs.into_iter().map(|e| vec![e.name, e.url]).collect();
    print_table(&["NAME", "URL"], rows);
    Ok(())
}
