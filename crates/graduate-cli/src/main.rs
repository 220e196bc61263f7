mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    env::EnvSubcommand,
    hook::HookSubcommand,
    remote::{RemoteArgs, RemoteSubcommand},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "graduate",
    about = "Promote every application to an environment together, or not at all",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .graduate/ or .git/)
    #[arg(long, global = true, env = "GRADUATE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Graduate every application to an environment
    Start {
        /// Environment name
        env: String,

        /// Graduate even if nothing changed since the last graduation
        #[arg(long)]
        force: bool,
    },

    /// Manage environments
    Env {
        #[command(subcommand)]
        subcommand: EnvSubcommand,
    },

    /// Manage pre/post graduation hooks
    Hook {
        #[command(subcommand)]
        subcommand: HookSubcommand,
    },

    /// Print the public key to authorize on a remote host
    Key,

    /// Remote-side commands, invoked over ssh and from receive hooks
    Remote {
        #[command(flatten)]
        args: RemoteArgs,

        #[command(subcommand)]
        subcommand: RemoteSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Start { .. }
        | Commands::Remote {
            subcommand: RemoteSubcommand::Wait { .. },
            ..
        } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Start { env, force } => cmd::start::run(&root, &env, force, cli.json),
        Commands::Env { subcommand } => cmd::env::run(&root, subcommand, cli.json),
        Commands::Hook { subcommand } => cmd::hook::run(&root, subcommand, cli.json),
        Commands::Key => cmd::key::run(cli.json),
        Commands::Remote { args, subcommand } => cmd::remote::run(args, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
