use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tg_dualpost::config;
use tg_dualpost::db::{self, PostStore, SqlitePostStore};
use tg_dualpost::gateway::{ChannelGateway, TelegramGateway};
use tg_dualpost::handlers::{self, HandlerContext};
use tg_dualpost::service::{BotService, ServiceSettings};
use tg_dualpost::translator::{GoogleTranslator, Translator};
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/posts.db", cfg.app.data_dir));

    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let bot = Bot::new(cfg.telegram.bot_token.clone());
    let gateway: Arc<dyn ChannelGateway> =
        Arc::new(TelegramGateway::new(bot.clone(), cfg.labels.clone()));
    let translator: Arc<dyn Translator> = Arc::new(GoogleTranslator::from_config(&cfg.translation)?);
    let store: Arc<dyn PostStore> = Arc::new(SqlitePostStore::new(pool));

    let settings = ServiceSettings::from_config(&cfg)?;
    let prune_every = settings.draft_ttl.min(Duration::from_secs(600)).max(Duration::from_secs(1));
    let service = Arc::new(BotService::new(gateway, translator, store, settings));

    // Sweep abandoned drafts in the background.
    let sweeper = service.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(prune_every).await;
            let dropped = sweeper.prune_sessions().await;
            if dropped > 0 {
                info!(dropped, "pruned idle draft sessions");
            }
        }
    });

    let ctx = Arc::new(HandlerContext::new(service, cfg.telegram.allowed_users.iter().copied()));
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handlers::on_message))
        .branch(Update::filter_callback_query().endpoint(handlers::on_callback));

    info!(channel = %cfg.telegram.channel, "starting telegram bot");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .distribution_function(handlers::worker_key)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
