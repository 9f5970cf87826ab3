use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use aam2mail::config::{Config, load_config, read_existing_config};
use aam2mail::daemon::{DaemonConfig, install_shutdown_handler, run_daemon, run_once};
use aam2mail::matching::{esub, hsub};
use aam2mail::retrieval::RunContext;

#[derive(Parser)]
#[command(name = "aam2mail")]
#[command(about = "Fetch anonymously addressed messages from a shared newsgroup", long_about = None)]
struct Cli {
    /// Override the config file location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll every source once
    Run,

    /// Poll repeatedly until interrupted
    Daemon {
        /// Seconds between cycles (defaults to fetch_interval from the config)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Validate the configuration and show what is active
    CheckConfig,

    /// Generate an hsub for TEXT
    Hsub {
        text: String,

        /// Hex digits, even, 48 to 80 (defaults to hsub_len from the config)
        #[arg(long)]
        len: Option<usize>,
    },

    /// Generate an esub for TEXT under a shared key
    Esub {
        text: String,

        #[arg(long)]
        key: String,
    },
}

fn init_logging(cfg: Option<&Config>) {
    let level = cfg.map(|c| c.log_level()).unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn log_rules(ctx: &RunContext) {
    for (scheme, n) in ctx.rules.describe() {
        info!("Checking {n} {scheme} Subjects");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Hsub { text, len } => {
            init_logging(None);
            let len = match len {
                Some(l) => l,
                // a config is optional here
                None => match read_existing_config(cli.config.as_deref())? {
                    Some(cfg) => cfg.hsub_len()?,
                    None => hsub::DEFAULT_DIGITS,
                },
            };
            println!("{}", hsub::generate_random(&text, len)?);
            Ok(())
        }

        Command::Esub { text, key } => {
            init_logging(None);
            println!("{}", esub::generate_random(&text, &key));
            Ok(())
        }

        Command::CheckConfig => {
            let cfg = load_config(cli.config.as_deref())
                .map_err(|e| anyhow!("Configuration error: {e}"))?;
            init_logging(Some(&cfg));
            let ctx = cfg.run_context()?;
            let router = cfg.mailbox_router()?;
            for (scheme, n) in ctx.rules.describe() {
                println!("Checking {n} {scheme} Subjects");
            }
            println!(
                "{} sources, {} mailboxes, group {}, fetch_limit {}, fetch_all {}",
                ctx.sources.len(),
                router.len(),
                ctx.settings.newsgroup,
                ctx.settings.fetch_limit,
                ctx.settings.fetch_all
            );
            Ok(())
        }

        Command::Run => {
            let cfg = load_config(cli.config.as_deref())
                .map_err(|e| anyhow!("Configuration error: {e}"))?;
            init_logging(Some(&cfg));
            let ctx = cfg.run_context()?;
            log_rules(&ctx);
            let mut router = cfg.mailbox_router()?;
            let store = cfg.watermark_store()?;
            let provider = cfg.spool_provider();
            let shutdown = install_shutdown_handler()?;

            let summary = run_once(&ctx, &provider, &store, &mut router, &shutdown)?;
            println!("{summary}");
            Ok(())
        }

        Command::Daemon { interval } => {
            let cfg = load_config(cli.config.as_deref())
                .map_err(|e| anyhow!("Configuration error: {e}"))?;
            init_logging(Some(&cfg));
            let ctx = cfg.run_context()?;
            log_rules(&ctx);
            let mut router = cfg.mailbox_router()?;
            let store = cfg.watermark_store()?;
            let provider = cfg.spool_provider();
            let shutdown = install_shutdown_handler()?;

            run_daemon(
                &ctx,
                &provider,
                &store,
                &mut router,
                &shutdown,
                DaemonConfig {
                    interval_secs: interval.unwrap_or_else(|| cfg.fetch_interval()),
                },
            )
        }
    }
}
