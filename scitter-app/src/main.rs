use anyhow::{Result, bail};
use clap::Parser;
use scitter_api::{QueryParam, Scitter, Timeline};
use scitter_common::observability::init_logging;
use scitter_config::{ScitterConfig, ScitterConfigLoader, default_config_path};

mod cli;
mod wiring;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let mut loader = ScitterConfigLoader::new();
    match (&cli.config, default_config_path()) {
        (Some(path), _) => loader = loader.with_file(path),
        (None, Some(path)) => loader = loader.with_optional_file(path),
        (None, None) => {}
    }
    let cfg: ScitterConfig = loader.load()?;

    // 2) Logging
    let log_path = init_logging(cfg.logging.to_log_config("scitter"))?;
    tracing::debug!(log_path = %log_path.display(), "scitter starting");

    // 3) Client
    let scitter = wiring::build_scitter(&cfg)?;

    run(&scitter, cli.command).await
}

async fn run(scitter: &Scitter, command: Command) -> Result<()> {
    match command {
        Command::Verify => {
            if scitter.verify_credentials().await? {
                println!("credentials accepted");
            } else {
                bail!("credentials rejected");
            }
        }
        Command::Friends(page) => {
            print_timeline(scitter.friends_timeline(&page.to_params()?).await?);
        }
        Command::User {
            screen_name,
            user_id,
            page,
        } => {
            let mut params = page.to_params()?;
            if let Some(name) = screen_name {
                params.push(QueryParam::ScreenName(name));
            }
            if let Some(id) = user_id {
                params.push(QueryParam::UserId(id));
            }
            print_timeline(scitter.user_timeline(&params).await?);
        }
        Command::Public => print_timeline(scitter.public_timeline().await?),
        Command::Show { id } => println!("{}", scitter.show_status(id).await?),
    }
    Ok(())
}

fn print_timeline(timeline: Timeline) {
    tracing::info!(statuses = timeline.len(), "timeline received");
    for status in timeline {
        println!("{status}");
    }
}
