//! Hexagonal ports implemented by adapter crates.

use async_trait::async_trait;

use crate::{domain::ChatId, snapshot::TrackingEvent, Result};

/// Narrow outbound messaging contract (Telegram today).
///
/// The core only ever sends; inbound updates are handled entirely inside
/// the messenger adapter.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// Markdown-formatted variant for replies carrying code blocks.
    async fn send_markdown(&self, chat_id: ChatId, text: &str) -> Result<()>;
}

/// One fetch of the carrier's tracking state: the raw response body (kept
/// verbatim for the snapshot file) plus the parsed event list.
#[derive(Clone, Debug)]
pub struct CarrierFetch {
    pub raw: String,
    pub events: Vec<TrackingEvent>,
}

/// Port for the carrier tracking endpoint.
#[async_trait]
pub trait CarrierClient: Send + Sync {
    async fn fetch_tracking(&self, tracking_number: &str) -> Result<CarrierFetch>;
}
