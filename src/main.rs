use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;

use invitrack::cli::{Cli, Commands};
use invitrack::core::{Config, config, init_logger, install_panic_hook, liveness};
use invitrack::invites::{InviteIssuer, JoinApprover};
use invitrack::report::{GoogleEndpoints, GoogleSheetsSink, Reporter, ServiceAccountAuth};
use invitrack::storage::{LinkStore, SqliteLinkStore, create_pool, open_existing_pool};
use invitrack::telegram::{HandlerDeps, TelegramGateway, create_bot, schema, setup_bot_commands};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the selected subcommand; with no
/// subcommand the bot runs.
///
/// # Errors
/// Returns an error if initialization fails (logging, configuration, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present, before anything reads them
    let _ = dotenv();

    install_panic_hook();
    init_logger(&config::LOG_FILE_PATH, &config::LOG_LEVEL)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot().await,
        Commands::Links => print_links().await,
    }
}

/// Print stored invite links
async fn print_links() -> Result<()> {
    let Some(pool) = open_existing_pool(&config::DATABASE_PATH)? else {
        log::info!("No database at {}, no links stored", config::DATABASE_PATH.as_str());
        return Ok(());
    };
    let store = SqliteLinkStore::new(pool);

    for record in store.list().await? {
        println!("{}\t{}", record.inviter_id, record.link);
    }
    Ok(())
}

/// Run the bot dispatcher and the liveness server until Ctrl-C
async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");

    let config = Config::from_env()?;

    let pool = create_pool(&config::DATABASE_PATH)?;
    log::info!("Using database {}", config::DATABASE_PATH.as_str());
    let store: Arc<dyn LinkStore> = Arc::new(SqliteLinkStore::new(pool));

    let bot = create_bot(&config)?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }
    let gateway = Arc::new(TelegramGateway::new(bot.clone(), ChatId(config.group_id)));

    let http = reqwest::Client::builder()
        .timeout(config::network::timeout())
        .build()?;
    let auth = ServiceAccountAuth::new(http.clone(), config.google_credentials)?;
    let sink = GoogleSheetsSink::new(http, Arc::new(auth), config.spreadsheet, GoogleEndpoints::default());
    let reporter = Reporter::new(Arc::new(sink));

    let issuer = Arc::new(InviteIssuer::new(Arc::clone(&store), gateway.clone()));
    let approver = Arc::new(JoinApprover::new(Arc::clone(&store), gateway, reporter));
    let handler = schema(HandlerDeps::new(issuer, approver));

    // Liveness runs on its own task and shares nothing with the dispatcher
    let shutdown = CancellationToken::new();
    let liveness_task = tokio::spawn(liveness::run(config.liveness_addr, shutdown.clone()));

    log::info!("Telegram bot is running (group {})", config.group_id);
    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .error_handler(LoggingErrorHandler::with_custom_text("An error has occurred in the dispatcher"))
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher stopped, shutting down liveness server");
    shutdown.cancel();
    if let Err(e) = liveness_task.await {
        log::error!("Liveness task failed: {}", e);
    }

    Ok(())
}
