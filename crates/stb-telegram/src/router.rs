use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio_util::sync::CancellationToken;
use tracing::info;

use stb_core::{
    config::Config,
    domain::ChatId,
    poller::PollWorker,
    ports::{CarrierClient, MessagingPort},
    snapshot::SnapshotFile,
    store::ShipmentStore,
    tracking::TrackingEngine,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ShipmentStore>,
    pub engine: TrackingEngine,
    pub messenger: Arc<dyn MessagingPort>,
}

/// Run the bot: spawn the poll-and-notify worker, then dispatch Telegram
/// updates until shutdown.
pub async fn run_polling(
    cfg: Arc<Config>,
    store: Arc<ShipmentStore>,
    engine: TrackingEngine,
    carrier: Arc<dyn CarrierClient>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!(username = me.username(), "stb started");
    }
    info!(database = %cfg.database_path.display(), "store ready");

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));

    let worker = PollWorker::new(
        carrier,
        messenger.clone(),
        SnapshotFile::new(cfg.snapshot_path.clone()),
        ChatId(cfg.notify_chat_id),
        cfg.carrier_tracking_number.clone(),
        cfg.track_url.clone(),
        cfg.poll_interval,
    );
    let cancel = CancellationToken::new();
    tokio::spawn(worker.run(cancel.clone()));

    let state = Arc::new(AppState {
        store,
        engine,
        messenger,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    cancel.cancel();
    Ok(())
}
