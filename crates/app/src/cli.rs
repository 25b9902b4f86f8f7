//! Command-line definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use task_model::{EntityId, TaskStatus};

#[derive(Parser, Debug)]
#[command(name = "taskin")]
#[command(about = "Offline-first client for the Taskin task manager")]
pub struct Cli {
    /// Directory holding settings and the local cache
    #[arg(long, global = true, default_value = ".taskin")]
    pub data_dir: PathBuf,

    /// Override the API base URL from settings
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Act as if the network were down; changes are only queued
    #[arg(long, global = true)]
    pub offline: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show connection state and pending changes
    Status,
    /// List categories, recommended todos and one-offs
    List,
    /// Replay queued changes now
    Sync,
    /// Change the status of a regular todo
    TodoStatus {
        id: EntityId,
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },
    /// Manage one-off todos
    #[command(subcommand)]
    Oneoff(OneOffCommand),
    /// Keep syncing in the background until interrupted
    Run,
}

#[derive(Subcommand, Debug)]
pub enum OneOffCommand {
    /// Create a one-off todo
    Create(CreateArgs),
    /// Edit a one-off todo
    Update(UpdateArgs),
    /// Change the status of a one-off todo
    Status {
        #[arg(allow_negative_numbers = true)]
        id: EntityId,
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },
    /// Delete a one-off todo
    Delete {
        #[arg(allow_negative_numbers = true)]
        id: EntityId,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Negative ids refer to one-offs not yet created on the server
    #[arg(allow_negative_numbers = true)]
    pub id: EntityId,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_parser = parse_status)]
    pub status: Option<TaskStatus>,
}

fn parse_status(value: &str) -> Result<TaskStatus, String> {
    value.parse::<TaskStatus>().map_err(|e| e.to_string())
}
