use crate::output::print_json;
use anyhow::bail;
use clap::{Args, Subcommand};
use graduate_core::config::DEFAULT_SENTINEL;
use graduate_core::directive::Directive;
use graduate_core::paths;
use graduate_core::peer::{self, Release};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args)]
pub struct RemoteArgs {
    /// Status record (default: ~/.graduate/status)
    #[arg(long, env = "GRADUATE_STATUS_FILE")]
    status_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum RemoteSubcommand {
    /// Reset state left over from a previous graduation
    Clean,
    /// Mark a graduation as in progress
    Start,
    /// Mark the graduation as finished
    Finish,
    /// Release a unit parked at its barrier
    ContinueUnit {
        unit: String,
    },
    /// Reject a unit parked at its barrier
    AbortUnit {
        unit: String,
    },
    /// Print the current status token
    Status,
    /// Park at the barrier until this unit is released (run from a receive hook)
    Wait {
        unit: String,

        /// Line announcing the barrier to the pushing side
        #[arg(long, env = "GRADUATE_SENTINEL", default_value = DEFAULT_SENTINEL)]
        sentinel: String,

        /// Give up after this many seconds
        #[arg(long, env = "GRADUATE_WAIT_TIMEOUT_SECS", default_value_t = 3600)]
        timeout_secs: u64,
    },
}

pub fn run(args: RemoteArgs, subcmd: RemoteSubcommand, json: bool) -> anyhow::Result<()> {
    let status_file = match args.status_file {
        Some(p) => p,
        None => paths::default_status_file()?,
    };

    let directive = match subcmd {
        RemoteSubcommand::Clean => Directive::Clean,
        RemoteSubcommand::Start => Directive::Start,
        RemoteSubcommand::Finish => Directive::Finish,
        RemoteSubcommand::ContinueUnit { unit } => Directive::Continue(unit),
        RemoteSubcommand::AbortUnit { unit } => Directive::Abort(unit),
        RemoteSubcommand::Status => {
            let token = peer::read_status(&status_file)?;
            if json {
                print_json(&serde_json::json!({ "status": token.map(|t| t.to_string()) }))?;
            } else {
                match token {
                    Some(t) => println!("{t}"),
                    None => println!("no status"),
                }
            }
            return Ok(());
        }
        RemoteSubcommand::Wait {
            unit,
            sentinel,
            timeout_secs,
        } => return wait(status_file, &unit, &sentinel, timeout_secs),
    };

    let token = peer::apply(&status_file, &directive)?;
    tracing::debug!(%directive, %token, "directive applied");
    if json {
        print_json(&serde_json::json!({ "status": token.to_string() }))?;
    }
    Ok(())
}

fn wait(status_file: PathBuf, unit: &str, sentinel: &str, timeout_secs: u64) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let release = rt.block_on(peer::wait_for_release(
        &status_file,
        unit,
        sentinel,
        peer::DEFAULT_POLL_INTERVAL,
        Duration::from_secs(timeout_secs),
    ))?;

    match release {
        Release::Continue => {
            tracing::info!(%unit, "released");
            Ok(())
        }
        Release::Abort => bail!("graduation of '{unit}' aborted"),
        Release::TimedOut => bail!("gave up waiting for '{unit}' after {timeout_secs}s"),
    }
}
