mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, roster::RosterSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "agent-health",
    about = "Score agent health, diagnose weak spots and write improvement plans into agent definitions",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .agent-health/ or .git/)
    #[arg(long, global = true, env = "AGENT_HEALTH_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize agent-health in the current project
    Init,

    /// Inspect and validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Manage the agent roster
    Roster {
        #[command(subcommand)]
        subcommand: RosterSubcommand,
    },

    /// Produce synthetic metrics records for every roster agent
    Generate {
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Observation window length in days
        #[arg(long, default_value = "7")]
        days: i64,
        /// Write records here instead of stdout (.json, .yaml or .yml)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Score every agent in a records file
    Score {
        /// Metrics records (.json, .yaml or .yml)
        records: PathBuf,
    },

    /// Rank the team worst-first and bucket it by status
    Rank {
        /// Metrics records (.json, .yaml or .yml)
        records: PathBuf,
        /// Only show agents with this status: critical, warning or healthy
        #[arg(long)]
        status: Option<String>,
    },

    /// Preview the improvement plan for one agent without touching documents
    Diagnose {
        /// Metrics records (.json, .yaml or .yml)
        records: PathBuf,
        /// Agent key or slug
        #[arg(long)]
        agent: String,
    },

    /// Write improvement plans into agent definition documents
    Improve {
        /// Metrics records (.json, .yaml or .yml)
        records: PathBuf,
        /// Improve this agent (key or slug) instead of the lowest scorer
        #[arg(long, conflicts_with = "all")]
        agent: Option<String>,
        /// Improve every agent that needs it
        #[arg(long)]
        all: bool,
        /// Compute the changes without writing documents, history or roster
        #[arg(long)]
        dry_run: bool,
    },

    /// Show past improvement attempts
    History {
        /// Only show entries for this agent key
        #[arg(long)]
        agent: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Roster { subcommand } => cmd::roster::run(&root, subcommand, cli.json),
        Commands::Generate { seed, days, out } => {
            cmd::generate::run(&root, seed, days, out.as_deref())
        }
        Commands::Score { records } => cmd::score::run(&root, &records, cli.json),
        Commands::Rank { records, status } => {
            cmd::rank::run(&root, &records, status.as_deref(), cli.json)
        }
        Commands::Diagnose { records, agent } => {
            cmd::diagnose::run(&root, &records, &agent, cli.json)
        }
        Commands::Improve {
            records,
            agent,
            all,
            dry_run,
        } => {
            let target = match (agent, all) {
                (Some(needle), _) => cmd::improve::Target::Agent(needle),
                (None, true) => cmd::improve::Target::All,
                (None, false) => cmd::improve::Target::Worst,
            };
            cmd::improve::run(&root, &records, target, dry_run, cli.json)
        }
        Commands::History { agent } => cmd::history::run(&root, agent.as_deref(), cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
