use crate::output::{print_json, print_table};
use anyhow::{bail, Context};
use graduate_core::config::Config;
use graduate_core::coordinator::{
    Coordinator, Decision, GraduationReport, GraduationRun, UnitOutcome,
};
use graduate_core::environment;
use graduate_core::history::{self, Changeset, History};
use graduate_core::hook_runner::ShellHookRunner;
use graduate_core::push::GitPushChannel;
use graduate_core::remote::SshRemote;
use graduate_core::units;
use std::path::Path;

pub fn run(root: &Path, env_name: &str, force: bool, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load .graduate/config.yaml")?;
    let env = environment::lookup(root, env_name)?;
    let units = units::discover(root, &config.apps_dir)?;

    let history = History::new(root, &config.git)?;
    history.ensure_clean()?;
    let changes = history::changeset(&history, &env.name)?;
    if changes.is_empty() && !force {
        if json {
            print_json(&serde_json::json!({
                "environment": env.name,
                "decision": "nothing_to_graduate",
            }))?;
        } else {
            println!("Nothing to graduate to '{}'.", env.name);
        }
        return Ok(());
    }
    if !json {
        print_changes(&env.name, &changes);
    }

    let graduation = GraduationRun::new(env.clone(), units)?;
    let mut coordinator = Coordinator::new(
        SshRemote::new(&config.ssh, &config.remote_command),
        GitPushChannel::new(&config),
        ShellHookRunner::new(root, &config.shell),
    )
    .with_drain_timeout(config.drain_timeout());

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(coordinator.run(graduation))?;

    let tag = if report.committed() {
        Some(history.record_graduation(&env.name)?)
    } else {
        None
    };

    if json {
        print_json(&serde_json::json!({ "report": report, "tag": tag }))?;
    } else {
        print_report(&report);
    }

    if let Decision::Aborted { reason } = &report.decision {
        bail!("graduation to '{}' aborted: {reason}", env.name);
    }
    if let (Some(tag), false) = (&tag, json) {
        println!("Graduated to '{}' ({tag}).", env.name);
    }
    Ok(())
}

fn print_changes(env: &str, changes: &Changeset) {
    match changes {
        Changeset::FirstGraduation => println!("First graduation to '{env}'."),
        Changeset::Since { tag, commits } if commits.is_empty() => {
            println!("No changes since {tag}; graduating anyway.")
        }
        Changeset::Since { tag, commits } => {
            println!("{} change(s) since {tag}:", commits.len());
            for commit in commits {
                println!("  {commit}");
            }
        }
    }
}

fn print_report(report: &GraduationReport) {
    let rows = report
        .units
        .iter()
        .map(|u| {
            let outcome = match &u.outcome {
                UnitOutcome::Skipped => "skipped".to_string(),
                UnitOutcome::UpToDate => "up to date".to_string(),
                UnitOutcome::Deployed => "deployed".to_string(),
                UnitOutcome::Failed(reason) => format!("failed: {reason}"),
            };
            let release = match (&u.release, u.release_delivered) {
                (Some(verb), Some(false)) => format!("{verb} (undelivered)"),
                (Some(verb), _) => verb.clone(),
                (None, _) => "-".to_string(),
            };
            let exit = u
                .transfer_exit
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            vec![u.name.clone(), outcome, release, exit]
        })
        .collect();
    print_table(&["UNIT", "OUTCOME", "RELEASE", "EXIT"], rows);
}
