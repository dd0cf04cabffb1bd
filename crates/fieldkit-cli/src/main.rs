//! Fieldkit CLI - capture audit fieldwork offline, sync it later
//!
//! Wraps the offline store, sync queue, and cache manager in operator
//! commands so a review can be worked end to end from a terminal.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;

use cli::{
    ChecklistCommands, Cli, Commands, EvidenceCommands, FindingCommands, SessionCommands,
    SyncCommands,
};
use commands::common::AppContext;
use error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fieldkit_core=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::resolve(cli.data_dir);

    match cli.command {
        Commands::Checklist { command } => match command {
            ChecklistCommands::Init { review } => commands::checklist::run_init(&ctx, &review).await,
            ChecklistCommands::Complete { id, user, notes } => {
                commands::checklist::run_complete(&ctx, &id, &user, notes.as_deref()).await
            }
            ChecklistCommands::Annotate { id, notes } => {
                commands::checklist::run_annotate(&ctx, &id, &notes).await
            }
            ChecklistCommands::List {
                review,
                phase,
                json,
            } => commands::checklist::run_list(&ctx, &review, phase.map(Into::into), json).await,
        },
        Commands::Evidence { command } => match command {
            EvidenceCommands::Add(args) => commands::evidence::run_add(&ctx, &args).await,
            EvidenceCommands::Delete { id } => commands::evidence::run_delete(&ctx, &id).await,
            EvidenceCommands::List { review, json } => {
                commands::evidence::run_list(&ctx, &review, json).await
            }
        },
        Commands::Finding { command } => match command {
            FindingCommands::Add(args) => commands::finding::run_add(&ctx, &args).await,
            FindingCommands::Discard { id } => commands::finding::run_discard(&ctx, &id).await,
            FindingCommands::List { review, json } => {
                commands::finding::run_list(&ctx, &review, json).await
            }
        },
        Commands::Session { command } => match command {
            SessionCommands::Start {
                review,
                user,
                device,
            } => commands::session::run_start(&ctx, &review, &user, &device).await,
            SessionCommands::End { id } => commands::session::run_end(&ctx, &id).await,
            SessionCommands::List { review, json } => {
                commands::session::run_list(&ctx, &review, json).await
            }
        },
        Commands::Sync { command } => match command {
            None => commands::sync::run_drain(&ctx).await,
            Some(SyncCommands::Status { json }) => commands::sync::run_status(&ctx, json).await,
            Some(SyncCommands::Retry) => commands::sync::run_retry(&ctx).await,
            Some(SyncCommands::Gc) => commands::sync::run_gc(&ctx).await,
            Some(SyncCommands::Watch { interval_secs }) => {
                commands::sync::run_watch(&ctx, interval_secs).await
            }
        },
        Commands::Cache { review } => commands::maintain::run_cache(&ctx, &review).await,
        Commands::Cached { json } => commands::maintain::run_cached(&ctx, json).await,
        Commands::Uncache { review } => commands::maintain::run_uncache(&ctx, &review).await,
        Commands::Cleanup { older_than_days } => {
            commands::maintain::run_cleanup(&ctx, older_than_days).await
        }
        Commands::Export { review, output } => {
            commands::maintain::run_export(&ctx, &review, output.as_deref()).await
        }
        Commands::Preflight { review } => commands::maintain::run_preflight(&ctx, &review).await,
        Commands::Completions { shell, output } => {
            commands::completions::run_completions(shell, output.as_deref())
        }
    }
}
