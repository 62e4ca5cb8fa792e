use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use scitter_api::QueryParam;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "scitter", version, about = "Read your Scitter timelines from the terminal")]
pub struct Cli {
    /// Config file; defaults to <config dir>/scitter/scitter.yaml when present.
    #[arg(long, short, env = "SCITTER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the configured credentials are accepted.
    Verify,
    /// Statuses from the accounts you follow.
    Friends(PageArgs),
    /// Statuses of one user (yourself by default).
    User {
        #[arg(long, conflicts_with = "user_id")]
        screen_name: Option<String>,
        #[arg(long)]
        user_id: Option<u64>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// The public timeline.
    Public,
    /// A single status.
    Show { id: u64 },
}

#[derive(Debug, Default, Args)]
pub struct PageArgs {
    /// Maximum number of statuses.
    #[arg(long, short = 'n')]
    pub count: Option<u32>,
    #[arg(long)]
    pub since_id: Option<u64>,
    #[arg(long)]
    pub max_id: Option<u64>,
    #[arg(long)]
    pub page: Option<u32>,
}

impl PageArgs {
    pub fn to_params(&self) -> Result<Vec<QueryParam>> {
        let mut params = Vec::new();
        if let Some(n) = self.count {
            params.push(QueryParam::count(n)?);
        }
        if let Some(id) = self.since_id {
            params.push(QueryParam::SinceId(id));
        }
        if let Some(id) = self.max_id {
            params.push(QueryParam::MaxId(id));
        }
        if let Some(n) = self.page {
            params.push(QueryParam::page(n)?);
        }
        Ok(params)
    }
}
