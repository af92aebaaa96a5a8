//! hangar - a mod manager for Kerbal Space Program

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hangar_cli::cmd;
use hangar_cli::cmd::config::ConfigChanges;
use hangar_cli::ops::Context;
use hangar_cli::ui::Output;
use hangar_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = cli.overrides();

    match cli.command {
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
        Commands::Config {
            repository_url,
            resolve_timeout,
            clean_on_failure,
        } => {
            let changes = ConfigChanges {
                overrides,
                repository_url,
                resolve_timeout,
                clean_on_failure,
            };
            cmd::config::config(&changes).await
        }
        command => {
            let ctx = Context::load(&overrides, Arc::new(Output::new())).await?;
            let result = match command {
                Commands::Update { url } => cmd::update::update(&ctx, url.as_deref()).await,
                Commands::List { all, installed } => cmd::list::list(&ctx, all, installed).await,
                Commands::Info { reference } => cmd::info::info(&ctx, &reference).await,
                Commands::Install {
                    reference,
                    choose,
                    yes,
                    clean_on_failure,
                } => cmd::install::install(&ctx, &reference, &choose, yes, clean_on_failure).await,
                Commands::Remove { mods, yes } => cmd::remove::remove(&ctx, &mods, yes).await,
                Commands::Status => cmd::status::status(&ctx).await,
                Commands::Completions { .. } | Commands::Config { .. } => Ok(()),
            };
            ctx.db.shutdown();
            result
        }
    }
}
