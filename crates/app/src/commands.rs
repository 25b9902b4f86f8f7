//! Command implementations

use crate::cli::{Cli, Command, OneOffCommand};
use anyhow::Context;
use api_client::{ApiConfig, HttpTaskApi};
use chrono::Utc;
use offline_sync::{DrainOutcome, MutationOutcome, SyncConfig, SyncStatus, TaskClient};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use store::{FileStore, KeyValueStore, SettingsManager};
use task_model::{OneOffPatch, OneOffTodo};

type Client = TaskClient<HttpTaskApi>;

/// Build a client from settings in `data_dir`.
fn build_client(cli: &Cli) -> anyhow::Result<Client> {
    let mut settings = SettingsManager::new(cli.data_dir.clone());
    settings.load().context("Failed to read settings")?;
    if !settings.settings_path().exists() {
        settings.save().context("Failed to write default settings")?;
        tracing::info!("Wrote default settings to {}", settings.settings_path().display());
    }
    let settings = settings.apply_env_overrides().clone();

    let base_url = cli.api_url.clone().unwrap_or(settings.server.base_url);
    let api_config =
        ApiConfig::new(&base_url).with_request_timeout(Duration::from_secs(settings.server.request_timeout_secs));
    let api = HttpTaskApi::new(&api_config).context("Invalid API configuration")?;

    let store: Arc<dyn KeyValueStore> = Arc::new(open_store(&cli.data_dir)?);
    let client = TaskClient::new(api, store, SyncConfig::from_settings(&settings.sync));
    if cli.offline {
        client.set_browser_online(false);
    }
    tracing::debug!(base_url = %base_url, offline = cli.offline, "Client configured");
    Ok(client)
}

fn open_store(data_dir: &Path) -> anyhow::Result<FileStore> {
    FileStore::new(data_dir.join("cache")).context("Failed to open local cache")
}

/// Restore local state and try the server. A failed fetch is not fatal.
async fn load(client: &Client, offline: bool) {
    if offline {
        client.load_cached();
        return;
    }
    if let Err(e) = client.load().await {
        tracing::warn!("Working from local cache: {}", e);
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = build_client(&cli)?;
    load(&client, cli.offline).await;

    match &cli.command {
        Command::Status => print_status(&client.sync_status(), cli.json)?,
        Command::List => print_list(&client, cli.json)?,
        Command::Sync => {
            let outcome = client.sync_now().await;
            print_outcome(&outcome);
        }
        Command::TodoStatus { id, status } => {
            let outcome = client.change_todo_status(*id, *status).await?;
            println!("Todo {} set to {} ({})", id, status, describe(outcome));
            flush(&client, cli.offline, outcome).await;
        }
        Command::Oneoff(command) => run_oneoff(&client, command, cli.offline).await?,
        Command::Run => run_scheduler(&client).await?,
    }
    Ok(())
}

async fn run_oneoff(client: &Client, command: &OneOffCommand, offline: bool) -> anyhow::Result<()> {
    let outcome = match command {
        OneOffCommand::Create(args) => {
            let created = client.create_oneoff(&args.title, args.description.clone()).await?;
            if created.is_pending() {
                println!("Created \"{}\" with temporary id {}", created.title, created.id);
                MutationOutcome::Queued
            } else {
                println!("Created \"{}\" with id {}", created.title, created.id);
                MutationOutcome::Applied
            }
        }
        OneOffCommand::Update(args) => {
            let patch = OneOffPatch {
                title: args.title.clone(),
                description: args.description.clone(),
                status: args.status,
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to update; pass --title, --description or --status");
            }
            let outcome = client.update_oneoff(args.id, patch).await?;
            println!("Updated one-off {} ({})", args.id, describe(outcome));
            outcome
        }
        OneOffCommand::Status { id, status } => {
            let outcome = client.set_oneoff_status(*id, *status).await?;
            println!("One-off {} set to {} ({})", id, status, describe(outcome));
            outcome
        }
        OneOffCommand::Delete { id } => {
            let outcome = client.delete_oneoff(*id).await?;
            println!("Deleted one-off {} ({})", id, describe(outcome));
            outcome
        }
    };
    flush(client, offline, outcome).await;
    Ok(())
}

/// A one-shot process has no scheduler, so replay queued work before exit.
async fn flush(client: &Client, offline: bool, outcome: MutationOutcome) {
    if offline || outcome == MutationOutcome::Applied {
        return;
    }
    let drained = client.sync_now().await;
    print_outcome(&drained);
}

async fn run_scheduler(client: &Client) -> anyhow::Result<()> {
    let scheduler = client.start_scheduler();
    tracing::info!("Syncing in the background, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;

    tracing::info!("Shutting down");
    scheduler.stop().await;
    Ok(())
}

fn describe(outcome: MutationOutcome) -> &'static str {
    match outcome {
        MutationOutcome::Applied => "saved",
        MutationOutcome::Queued => "queued",
    }
}

fn print_outcome(outcome: &DrainOutcome) {
    match outcome {
        DrainOutcome::Skipped(reason) => println!("Sync skipped: {:?}", reason),
        DrainOutcome::Completed(report) => {
            println!(
                "Sync finished: {} applied, {} failed, {} not attempted",
                report.applied, report.failed, report.skipped
            );
            for (temporary, server) in &report.remapped {
                println!("  one-off {} is now {}", temporary, server);
            }
        }
    }
}

fn print_status(status: &SyncStatus, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(status)?);
        return Ok(());
    }
    println!("{}: {}", status.short_status(), status.status_message());
    if let Some(ago) = status.formatted_time_since_sync(Utc::now()) {
        println!("Last sync: {}", ago);
    }
    if let Some(error) = &status.load_error {
        println!("Last load failed: {}", error);
    }
    Ok(())
}

fn print_list(client: &Client, json: bool) -> anyhow::Result<()> {
    if json {
        let snapshot = client.snapshot();
        println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
        return Ok(());
    }

    for category in client.categories() {
        println!("{} ({}/{})", category.name, category.done_count(), category.todos.len());
        for todo in &category.todos {
            println!("  [{:>11}] {:>4}  {}", todo.status, todo.id, todo.title);
        }
    }

    let recommended = client.recommended_todos();
    if !recommended.is_empty() {
        println!("Recommended");
        for entry in recommended {
            println!(
                "  [{:>11}] {:>4}  {} ({})",
                entry.todo.status, entry.todo.id, entry.todo.title, entry.category.name
            );
        }
    }

    let oneoffs: Vec<OneOffTodo> = client.oneoffs();
    if !oneoffs.is_empty() {
        println!("One-offs");
        for item in oneoffs {
            let marker = if item.is_pending() { " (not yet synced)" } else { "" };
            println!("  [{:>11}] {:>4}  {}{}", item.status, item.id, item.title, marker);
        }
    }
    Ok(())
}
