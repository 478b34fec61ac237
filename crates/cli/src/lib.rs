pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use supportflow_core::config::{ConfigOverrides, LoadOptions};

use crate::commands::batch::BatchArgs;
use crate::commands::process::{ConversationSource, ProcessArgs};

#[derive(Debug, Parser)]
#[command(
    name = "supportflow",
    about = "Customer-support conversation analysis pipeline",
    long_about = "Run support conversations through summarization, action extraction, routing, \
                  resolution recommendation and time prediction, and inspect stored results.",
    after_help = "Examples:\n  supportflow seed\n  supportflow process --conversation password_reset --simulate\n  supportflow batch --directory transcripts --output-dir results\n  supportflow doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a supportflow.toml config file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ModelArgs {
    #[arg(long, help = "Use the offline simulated model backend")]
    simulate: bool,
    #[arg(long = "model-url", help = "Override the model server base URL")]
    model_url: Option<String>,
    #[arg(long, help = "Override the completion model name")]
    model: Option<String>,
    #[arg(long = "database-url", help = "Override the database URL")]
    database_url: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Process one conversation through every pipeline stage")]
    Process {
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        conversation: Option<String>,
        #[arg(long, help = "Transcript file (.txt) or conversation document (.json)")]
        file: Option<PathBuf>,
        #[arg(long, help = "Write the full result record to this path")]
        output: Option<PathBuf>,
        #[arg(long, help = "Log every stage at debug level")]
        verbose: bool,
        #[command(flatten)]
        model: ModelArgs,
    },
    #[command(about = "Process every .txt transcript in a directory concurrently")]
    Batch {
        #[arg(long)]
        directory: PathBuf,
        #[arg(long = "output-dir", default_value = "results")]
        output_dir: PathBuf,
        #[arg(long, help = "Maximum conversations in flight")]
        concurrency: Option<usize>,
        #[command(flatten)]
        model: ModelArgs,
    },
    #[command(about = "Print the stored result record for a conversation")]
    Show { conversation_id: String },
    #[command(about = "List historical tickets for an issue type")]
    History {
        #[arg(long = "issue-type")]
        issue_type: String,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load historical tickets and sample embeddings for similarity lookup")]
    Seed {
        #[arg(long, help = "Embed samples with the simulated backend")]
        simulate: bool,
    },
    #[command(about = "Validate config, database connectivity and model backend readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

impl ModelArgs {
    fn overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            database_url: self.database_url,
            llm_base_url: self.model_url,
            llm_model: self.model,
            llm_simulate: self.simulate.then_some(true),
            ..ConfigOverrides::default()
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let load = |overrides: ConfigOverrides| LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config.clone(),
        overrides,
    };

    let result = match cli.command {
        Command::Process { conversation, file, output, verbose, model } => {
            let mut overrides = model.overrides();
            if verbose {
                overrides.log_level = Some("debug".to_string());
            }
            let source = match (conversation, file) {
                (_, Some(path)) => ConversationSource::File(path),
                (Some(key), None) => ConversationSource::Sample(key),
                (None, None) => ConversationSource::Sample("password_reset".to_string()),
            };
            commands::process::run(load(overrides), ProcessArgs { source, output })
        }
        Command::Batch { directory, output_dir, concurrency, model } => {
            let mut overrides = model.overrides();
            overrides.max_concurrency = concurrency;
            commands::batch::run(load(overrides), BatchArgs { directory, output_dir })
        }
        Command::Show { conversation_id } => {
            commands::show::run(load(ConfigOverrides::default()), conversation_id)
        }
        Command::History { issue_type, limit } => {
            commands::history::run(load(ConfigOverrides::default()), issue_type, limit)
        }
        Command::Migrate => commands::migrate::run(load(ConfigOverrides::default())),
        Command::Seed { simulate } => commands::seed::run(load(ConfigOverrides {
            llm_simulate: simulate.then_some(true),
            ..ConfigOverrides::default()
        })),
        Command::Doctor { json } => commands::doctor::run(load(ConfigOverrides::default()), json),
        Command::Config => commands::config::run(load(ConfigOverrides::default())),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
