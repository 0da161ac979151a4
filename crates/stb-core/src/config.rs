use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

/// Default carrier endpoint (SPX fleet-order tracking search).
const DEFAULT_CARRIER_API_URL: &str = "https://spx.vn/api/v2/fleet_order/tracking/search";

/// Typed configuration, loaded once at startup.
///
/// Required values missing from the environment are a fatal startup error;
/// nothing at runtime re-reads the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub notify_chat_id: i64,

    // Carrier polling
    pub carrier_api_url: String,
    pub carrier_tracking_number: String,
    pub track_url: String,
    pub poll_interval: Duration,

    // Persistence
    pub database_path: PathBuf,
    pub snapshot_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = require_str("TELEGRAM_BOT_TOKEN")?;
        let notify_chat_id = require_str("NOTIFY_CHAT_ID")?
            .parse::<i64>()
            .map_err(|_| Error::Config("NOTIFY_CHAT_ID must be a numeric chat id".to_string()))?;
        let carrier_tracking_number = require_str("CARRIER_TRACKING_NUMBER")?;
        let track_url = require_str("TRACK_URL")?;

        let carrier_api_url =
            env_str("CARRIER_API_URL").unwrap_or_else(|| DEFAULT_CARRIER_API_URL.to_string());
        let poll_interval = Duration::from_secs(env_u64("POLL_INTERVAL_SECS").unwrap_or(10));

        let database_path =
            env_path("DATABASE_PATH").unwrap_or_else(|| PathBuf::from("./shipments.sqlite3"));
        let snapshot_path =
            env_path("SNAPSHOT_PATH").unwrap_or_else(|| PathBuf::from("./carrier-snapshot.json"));

        Ok(Self {
            telegram_bot_token,
            notify_chat_id,
            carrier_api_url,
            carrier_tracking_number,
            track_url,
            poll_interval,
            database_path,
            snapshot_path,
        })
    }
}

fn require_str(key: &str) -> Result<String> {
    env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}
