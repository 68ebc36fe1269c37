//! gitward CLI - SSH gateway and git hooks.

use clap::{Parser, Subcommand};
use gitward_cli::{hook, serv, Config, HookKind};
use std::path::PathBuf;

/// gitward - SSH access control and push policy for git repositories
#[derive(Parser, Debug)]
#[command(name = "gitward")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, env = "GITWARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Handle an SSH connection (run by the SSH server)
    Serv {
        /// Key that authenticated the connection, as `key-<id>`
        key_id: String,
    },

    /// Run a server-side git hook (run by git)
    Hook {
        #[command(subcommand)]
        command: HookCommands,
    },
}

#[derive(Subcommand, Debug)]
enum HookCommands {
    /// Check ref updates before any of them is accepted
    PreReceive,

    /// Per-ref hook
    Update {
        /// Ref name, old commit and new commit
        #[arg(num_args = 0.., allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Record pushes and notify the application
    PostReceive,
}

impl From<HookCommands> for HookKind {
    fn from(command: HookCommands) -> Self {
        match command {
            HookCommands::PreReceive => HookKind::PreReceive,
            HookCommands::Update { args } => HookKind::Update(args),
            HookCommands::PostReceive => HookKind::PostReceive,
        }
    }
}

fn run() -> i32 {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("gitward: Internal error");
            eprintln!("Failed to load configuration: {e:#}");
            return 1;
        }
    };

    match cli.command {
        Commands::Serv { key_id } => serv::run(&config, &key_id),
        Commands::Hook { command } => hook::run(&config, &command.into()),
    }
}

fn main() {
    // Exit only after `run` has dropped the log guard.
    std::process::exit(run());
}
