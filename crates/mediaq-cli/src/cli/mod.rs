//! CLI for the mediaq download bot.

mod commands;
mod console;
mod control_socket;
mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mediaq_core::config;

use commands::{run_bot, run_cancel, run_config, run_fetch, run_status};

/// Top-level CLI for mediaq.
#[derive(Debug, Parser)]
#[command(name = "mediaq")]
#[command(about = "mediaq: chat-driven media downloader with a bounded download queue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the bot loop: read chat messages from stdin, reply on stdout.
    Run {
        /// Maximum concurrent downloads (overrides config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Download one or more links directly and exit when all are done.
    Fetch {
        /// Links to download.
        #[arg(required = true)]
        urls: Vec<String>,
        /// Maximum concurrent downloads (overrides config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Cancel a running download in a `mediaq run` instance.
    Cancel {
        /// Task identifier.
        id: u64,
    },

    /// Show queue status of a `mediaq run` instance.
    Status,

    /// Show config file path and effective configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run { jobs } => {
                apply_jobs(&mut cfg, jobs);
                run_bot(cfg).await?;
            }
            CliCommand::Fetch { urls, jobs } => {
                apply_jobs(&mut cfg, jobs);
                run_fetch(cfg, &urls).await?;
            }
            CliCommand::Cancel { id } => run_cancel(id).await?,
            CliCommand::Status => run_status().await?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

fn apply_jobs(cfg: &mut config::MediaqConfig, jobs: Option<usize>) {
    if let Some(n) = jobs {
        cfg.max_concurrent_downloads = n;
    }
}

#[cfg(test)]
mod tests;
