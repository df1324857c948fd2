use std::path::Path;

use strider_bot::{Bot, BotConfig};
use strider_events::Listeners;
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = BotConfig::load(Path::new("config/bot.toml"))?;
    info!(
        "starting bot: host={}:{}, username={}",
        config.host, config.port, config.username
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, async move {
        let mut bot = Bot::new(config, Listeners::new());
        bot.run().await
    })
}
