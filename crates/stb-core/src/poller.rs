//! Poll-and-notify worker.
//!
//! A single perpetual loop: fetch the carrier's tracking state, diff it
//! against the persisted snapshot, and notify the configured chat when new
//! events appeared. A notification fires iff the fetched event list is
//! strictly longer than the persisted one.
//!
//! No single-cycle failure terminates the loop. A fetch failure aborts the
//! cycle before the snapshot is overwritten, so the next cycle retries
//! against the same baseline. The snapshot is persisted before notifying,
//! so a crash mid-cycle never replays an already-notified event (at the
//! cost of possibly missing one).

use std::{sync::Arc, time::Duration};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    domain::ChatId,
    ports::{CarrierClient, MessagingPort},
    snapshot::SnapshotFile,
    Result,
};

pub struct PollWorker {
    carrier: Arc<dyn CarrierClient>,
    messenger: Arc<dyn MessagingPort>,
    snapshot: SnapshotFile,
    chat_id: ChatId,
    tracking_number: String,
    track_url: String,
    interval: Duration,
}

impl PollWorker {
    pub fn new(
        carrier: Arc<dyn CarrierClient>,
        messenger: Arc<dyn MessagingPort>,
        snapshot: SnapshotFile,
        chat_id: ChatId,
        tracking_number: String,
        track_url: String,
        interval: Duration,
    ) -> Self {
        Self {
            carrier,
            messenger,
            snapshot,
            chat_id,
            tracking_number,
            track_url,
            interval,
        }
    }

    /// Run until cancelled. Process shutdown is the only expected exit.
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval = ?self.interval, "poll worker started");
        loop {
            if let Err(e) = self.cycle().await {
                warn!(error = %e, "poll cycle failed, retrying next cycle");
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }
        info!("poll worker stopped");
    }

    async fn cycle(&self) -> Result<()> {
        let old_events = self.snapshot.load_events();
        let fetch = self.carrier.fetch_tracking(&self.tracking_number).await?;
        self.snapshot.save_raw(&fetch.raw)?;

        if fetch.events.len() <= old_events.len() {
            return Ok(());
        }

        // The carrier lists events newest-first.
        let Some(newest) = fetch.events.first() else {
            return Ok(());
        };
        let message = format!(
            "New status on your shipment.\n{}\nPlease check: {}",
            newest.message, self.track_url
        );
        self.messenger.send_markdown(self.chat_id, &message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{
        collections::VecDeque,
        fs,
        path::PathBuf,
        sync::Mutex,
    };

    use async_trait::async_trait;

    use crate::{errors::Error, ports::CarrierFetch, snapshot::parse_tracking_response};

    fn tmp_path(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.json"))
    }

    fn payload(messages: &[&str]) -> String {
        let list: Vec<_> = messages
            .iter()
            .map(|m| serde_json::json!({ "message": m }))
            .collect();
        serde_json::json!({ "data": { "tracking_list": list } }).to_string()
    }

    fn fetch_of(messages: &[&str]) -> CarrierFetch {
        let raw = payload(messages);
        let events = parse_tracking_response(&raw).unwrap();
        CarrierFetch { raw, events }
    }

    struct FakeCarrier {
        responses: Mutex<VecDeque<Result<CarrierFetch>>>,
    }

    impl FakeCarrier {
        fn new(responses: Vec<Result<CarrierFetch>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl CarrierClient for FakeCarrier {
        async fn fetch_tracking(&self, _tracking_number: &str) -> Result<CarrierFetch> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Transport("fake exhausted".to_string())))
        }
    }

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<(ChatId, String)>>,
    }

    #[async_trait]
    impl MessagingPort for RecordingMessenger {
        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }

        async fn send_markdown(&self, chat_id: ChatId, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    fn worker(
        carrier: Arc<FakeCarrier>,
        messenger: Arc<RecordingMessenger>,
        path: PathBuf,
    ) -> PollWorker {
        PollWorker::new(
            carrier,
            messenger,
            SnapshotFile::new(path),
            ChatId(42),
            "SPX123".to_string(),
            "https://spx.vn/track".to_string(),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn no_notification_when_event_count_is_unchanged() {
        let path = tmp_path("stb-poll-same");
        fs::write(&path, payload(&["arrived at hub"])).unwrap();

        let carrier = FakeCarrier::new(vec![Ok(fetch_of(&["arrived at hub"]))]);
        let messenger = Arc::new(RecordingMessenger::default());
        worker(carrier, messenger.clone(), path.clone())
            .cycle()
            .await
            .unwrap();

        assert!(messenger.sent.lock().unwrap().is_empty());
        let _ = fs::remove_file(path);
    }

    #[tokio::test]
    async fn one_notification_with_newest_message_on_growth() {
        let path = tmp_path("stb-poll-grow");
        fs::write(&path, payload(&["arrived at hub"])).unwrap();

        let carrier =
            FakeCarrier::new(vec![Ok(fetch_of(&["out for delivery", "arrived at hub"]))]);
        let messenger = Arc::new(RecordingMessenger::default());
        worker(carrier, messenger.clone(), path.clone())
            .cycle()
            .await
            .unwrap();

        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChatId(42));
        assert!(sent[0].1.contains("out for delivery"));
        assert!(sent[0].1.contains("https://spx.vn/track"));
        let _ = fs::remove_file(path);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_snapshot_untouched_and_sends_nothing() {
        let path = tmp_path("stb-poll-fail");
        let before = payload(&["arrived at hub"]);
        fs::write(&path, &before).unwrap();

        let carrier = FakeCarrier::new(vec![Err(Error::Transport("connect refused".to_string()))]);
        let messenger = Arc::new(RecordingMessenger::default());
        let err = worker(carrier, messenger.clone(), path.clone())
            .cycle()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert!(messenger.sent.lock().unwrap().is_empty());
        let _ = fs::remove_file(path);
    }

    #[tokio::test]
    async fn corrupt_snapshot_counts_as_empty_baseline() {
        let path = tmp_path("stb-poll-corrupt");
        fs::write(&path, "%%garbage%%").unwrap();

        let carrier = FakeCarrier::new(vec![Ok(fetch_of(&["picked up"]))]);
        let messenger = Arc::new(RecordingMessenger::default());
        worker(carrier, messenger.clone(), path.clone())
            .cycle()
            .await
            .unwrap();

        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("picked up"));
        let _ = fs::remove_file(path);
    }

    #[tokio::test]
    async fn snapshot_is_overwritten_even_without_notification() {
        let path = tmp_path("stb-poll-overwrite");
        fs::write(&path, payload(&["a", "b"])).unwrap();

        // Shrinking list: no notification, but the snapshot still advances.
        let carrier = FakeCarrier::new(vec![Ok(fetch_of(&["a"]))]);
        let messenger = Arc::new(RecordingMessenger::default());
        worker(carrier, messenger.clone(), path.clone())
            .cycle()
            .await
            .unwrap();

        assert!(messenger.sent.lock().unwrap().is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), payload(&["a"]));
        let _ = fs::remove_file(path);
    }
}
