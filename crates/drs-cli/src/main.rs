use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use drs_reconcile::{HireOptions, TerminationOptions};

mod commands;
mod input;

#[derive(Parser)]
#[command(name = "drs")]
#[command(about = "Payroll roster to fleet driver directory sync", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (repeat the flag to add layers)
    #[arg(
        long = "config",
        global = true,
        action = ArgAction::Append,
        default_value = "config/base.yaml"
    )]
    config: Vec<PathBuf>,

    /// Debug logging unless RUST_LOG says otherwise
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create (or with --update, refresh/reactivate) drivers from a hire export
    Hire {
        /// CSV hire export
        file: PathBuf,

        /// Patch drivers that already exist
        #[arg(long, default_value_t = false)]
        update: bool,

        /// Report what would happen; write nothing
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Pull every directory username into the ledger first
        #[arg(long, default_value_t = false)]
        sync: bool,
    },

    /// Deactivate drivers from a termination export
    Terminate {
        /// CSV termination export
        file: PathBuf,

        /// Do not match by display name when the identity key misses
        #[arg(long, default_value_t = false)]
        no_fallback: bool,

        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Terminations, then a username sync, then hires
    Process {
        #[arg(long)]
        hires: PathBuf,

        #[arg(long)]
        terms: PathBuf,

        #[arg(long, default_value_t = false)]
        update: bool,

        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Show the identity key, directory match and next username for one person
    Check {
        first: String,
        last: String,
        /// MM-DD-YYYY, M/D/YYYY or YYYY-MM-DD
        hire_date: String,
    },

    /// Username ledger utilities
    Username {
        #[command(subcommand)]
        cmd: UsernameCmd,
    },

    /// Identity-key coverage and backfill
    ExternalIds {
        #[command(subcommand)]
        cmd: ExternalIdsCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> site...)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Subcommand)]
enum UsernameCmd {
    /// Add every directory username to the ledger
    Sync,
    /// Compare ledger and directory
    Status,
    /// Preview the username for a name (offline)
    Check { first: String, last: String },
    /// Ledger size (offline)
    Stats,
}

#[derive(Subcommand)]
enum ExternalIdsCmd {
    /// Report how many drivers carry the identity key
    Verify,
    /// Derive missing identity keys from driver notes
    Backfill {
        /// Write the keys; without this only the plan is printed
        #[arg(long, default_value_t = false)]
        execute: bool,
    },
}

fn main() -> Result<ExitCode> {
    // Dev-time bootstrap; real deployments set the variables directly.
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_slice();
    let ok = match cli.cmd {
        Commands::Hire {
            file,
            update,
            dry_run,
            sync,
        } => commands::sync::hire(
            config,
            &file,
            HireOptions {
                update_existing: update,
                dry_run,
            },
            sync,
        )?,

        Commands::Terminate {
            file,
            no_fallback,
            dry_run,
        } => commands::sync::terminate(
            config,
            &file,
            TerminationOptions {
                name_fallback: !no_fallback,
                dry_run,
            },
        )?,

        Commands::Process {
            hires,
            terms,
            update,
            dry_run,
        } => commands::sync::process(config, &hires, &terms, update, dry_run)?,

        Commands::Check {
            first,
            last,
            hire_date,
        } => {
            commands::sync::check(config, &first, &last, &hire_date)?;
            true
        }

        Commands::Username { cmd } => {
            match cmd {
                UsernameCmd::Sync => commands::username::sync(config)?,
                UsernameCmd::Status => commands::username::status(config)?,
                UsernameCmd::Check { first, last } => {
                    commands::username::check(config, &first, &last)?
                }
                UsernameCmd::Stats => commands::username::stats(config)?,
            }
            true
        }

        Commands::ExternalIds { cmd } => match cmd {
            ExternalIdsCmd::Verify => {
                commands::external_ids::verify(config)?;
                true
            }
            ExternalIdsCmd::Backfill { execute } => {
                commands::external_ids::backfill(config, execute)?
            }
        },

        Commands::ConfigHash { paths } => {
            let loaded = drs_config::load_layered_yaml(paths.as_slice())?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            true
        }
    };

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Logs go to stderr so stdout stays `key=value`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}
