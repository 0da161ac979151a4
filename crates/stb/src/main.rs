use std::sync::Arc;

use stb_carrier::SpxCarrierClient;

use stb_core::{
    config::Config, ports::CarrierClient, store::ShipmentStore, tracking::TrackingEngine,
};

#[tokio::main]
async fn main() -> Result<(), stb_core::Error> {
    stb_core::logging::init("stb")?;

    let cfg = Arc::new(Config::load()?);

    let store = Arc::new(ShipmentStore::open(&cfg.database_path)?);
    let engine = TrackingEngine::new(store.clone());

    let carrier: Arc<dyn CarrierClient> =
        Arc::new(SpxCarrierClient::new(cfg.carrier_api_url.clone()));

    stb_telegram::router::run_polling(cfg, store, engine, carrier)
        .await
        .map_err(|e| stb_core::Error::Transport(format!("telegram bot failed: {e}")))?;

    Ok(())
}
