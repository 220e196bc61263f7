use crate::output::{print_json, print_table};
use clap::Subcommand;
use graduate_core::hooks::{self, HookPhase};
use std::path::Path;

#[derive(Subcommand)]
pub enum HookSubcommand {
    /// Append a shell command to a hook phase
    Add {
        /// pre or post
        phase: HookPhase,
        /// Command to run (joined with spaces)
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Remove a hook command by its position (see `hook list`)
    #[command(alias = "remove")]
    Rm {
        /// pre or post
        phase: HookPhase,
        /// 1-based position
        index: usize,
    },
    /// List the commands of one phase, or of both
    List {
        /// pre or post (default: both)
        phase: Option<HookPhase>,
    },
}

pub fn run(root: &Path, subcmd: HookSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        HookSubcommand::Add { phase, command } => add(root, phase, &command.join(" "), json),
        HookSubcommand::Rm { phase, index } => remove(root, phase, index, json),
        HookSubcommand::List { phase } => list(root, phase, json),
    }
}

fn add(root: &Path, phase: HookPhase, command: &str, json: bool) -> anyhow::Result<()> {
    let index = hooks::add(root, phase, command)?;
    if json {
        print_json(&serde_json::json!({ "phase": phase, "index": index, "command": command }))?;
    } else {
        println!("Added {phase} hook #{index}");
    }
    Ok(())
}

fn remove(root: &Path, phase: HookPhase, index: usize, json: bool) -> anyhow::Result<()> {
    let removed = hooks::remove(root, phase, index)?;
    if json {
        print_json(&serde_json::json!({ "phase": phase, "index": index, "removed": removed }))?;
    } else {
        println!("Removed {phase} hook #{index}: {removed}");
    }
    Ok(())
}

fn list(root: &Path, phase: Option<HookPhase>, json: bool) -> anyhow::Result<()> {
    let phases = match phase {
        Some(p) => vec![p],
        None => vec![HookPhase::Pre, HookPhase::Post],
    };

    let mut rows = Vec::new();
    let mut entries = Vec::new();
    for phase in phases {
        for hook in hooks::list(root, phase)? {
            rows.push(vec![
                phase.to_string(),
                hook.index.to_string(),
                hook.command.clone(),
            ]);
            entries.push(serde_json::json!({
                "phase": phase,
                "index": hook.index,
                "command": hook.command,
            }));
        }
    }

    if json {
        return print_json(&entries);
    }
    if rows.is_empty() {
        println!("No hooks.");
        return Ok(());
    }
    print_table(&["PHASE", "#", "COMMAND"], rows);
    Ok(())
}

