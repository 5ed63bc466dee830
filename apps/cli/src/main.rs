use std::{io::Write, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use client_core::{
    load_config, BackendConfig, InputForm, IntentOutcome, ListConfig, ListOrchestrator, RenderSink,
    StoreError,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

mod command;
mod render;

use command::{parse_command, Command, HELP};
use render::TerminalSink;

#[derive(Parser, Debug)]
struct Args {
    /// Configuration file (defaults to ./shopping.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Collection namespace.
    #[arg(long)]
    namespace: Option<String>,
    /// Document store URL; "none" or "local" forces local mode.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    auth_token: Option<String>,
    /// Start local mode with an empty list.
    #[arg(long)]
    no_mock_data: bool,
}

fn apply_args(mut config: ListConfig, args: Args) -> ListConfig {
    if let Some(namespace) = args.namespace.filter(|ns| !ns.trim().is_empty()) {
        config.namespace = namespace;
    }
    if args.server_url.is_some() || args.auth_token.is_some() {
        let (current_url, current_token) = match config.backend {
            BackendConfig::Local => (None, None),
            BackendConfig::Remote {
                server_url,
                auth_token,
            } => (Some(server_url), auth_token),
        };
        config.backend = BackendConfig::from_server_url(
            args.server_url.or(current_url).as_deref(),
            args.auth_token.or(current_token),
        );
    }
    if args.no_mock_data {
        config.seed_mock_data = false;
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = apply_args(load_config(args.config.as_deref()), args);
    info!(namespace = %config.namespace, mode = ?config.mode(), "starting shopping list");

    let sink: Arc<dyn RenderSink> = Arc::new(TerminalSink);
    let list = client_core::start(&config, sink).await?;
    println!(
        "{}",
        render::format_banner(&list.principal, &list.collection, list.orchestrator.mode())
    );
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&list.orchestrator).await;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if !handle(&list.orchestrator, parse_command(&line)).await {
            break;
        }
    }

    list.shutdown();
    Ok(())
}

async fn prompt(orchestrator: &ListOrchestrator) {
    let pending = orchestrator.in_flight().await;
    let mut out = std::io::stdout().lock();
    let _ = write!(out, "{}", render::format_prompt(pending));
    let _ = out.flush();
}

/// Returns `false` when the user asked to leave.
async fn handle(orchestrator: &Arc<ListOrchestrator>, command: Command) -> bool {
    match command {
        Command::Add { name, quantity } => {
            orchestrator.set_form(InputForm { name, quantity }).await;
            submit_form(orchestrator).await;
        }
        Command::Resubmit => submit_form(orchestrator).await,
        Command::Toggle(position) => match item_at(orchestrator, position).await {
            Some(item) => {
                let orchestrator = Arc::clone(orchestrator);
                tokio::spawn(async move {
                    orchestrator
                        .toggle_purchase(&item.id, item.is_purchased)
                        .await;
                });
            }
            None => println!("No item at position {position}."),
        },
        Command::Remove(position) => match item_at(orchestrator, position).await {
            Some(item) => {
                let orchestrator = Arc::clone(orchestrator);
                tokio::spawn(async move {
                    orchestrator.remove_item(&item.id, &item.name).await;
                });
            }
            None => println!("No item at position {position}."),
        },
        Command::List => {
            let items = orchestrator.items().await;
            for (idx, item) in items.iter().enumerate() {
                println!("{}", render::format_item(idx + 1, item));
            }
            println!("{}", render::format_status(&orchestrator.current_status().await));
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
        Command::Empty => {}
        Command::Unknown(line) => {
            warn!(%line, "unrecognised command");
            println!("Unknown command: {line}. Type 'help' for the list of commands.");
        }
    }
    true
}

async fn submit_form(orchestrator: &ListOrchestrator) {
    if let IntentOutcome::Rejected(StoreError::Validation(_)) = orchestrator.add_item().await {
        println!("{}", render::format_kept_form(&orchestrator.form().await));
    }
}

async fn item_at(orchestrator: &ListOrchestrator, position: usize) -> Option<shared::domain::Item> {
    orchestrator
        .items()
        .await
        .into_iter()
        .nth(position.checked_sub(1)?)
}
