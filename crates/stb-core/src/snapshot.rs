//! Last-seen carrier snapshot, persisted between poll cycles.
//!
//! The file holds the carrier's response body verbatim and is only used as
//! a diff baseline. Recovery policy: a missing or unparseable file is an
//! empty baseline — the next successful fetch overwrites it, at worst
//! re-notifying once.

use std::{fs, path::PathBuf};

use serde::Deserialize;

use crate::Result;

/// One carrier tracking event. The payload carries more fields; only the
/// human-readable message is of interest here.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TrackingEvent {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
struct TrackingData {
    #[serde(default)]
    tracking_list: Vec<TrackingEvent>,
}

#[derive(Debug, Deserialize)]
struct TrackingResponse {
    #[serde(default)]
    data: TrackingData,
}

/// Parse a carrier response body into its event list, newest first.
pub fn parse_tracking_response(raw: &str) -> Result<Vec<TrackingEvent>> {
    let resp: TrackingResponse = serde_json::from_str(raw)?;
    Ok(resp.data.tracking_list)
}

#[derive(Clone, Debug)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Events from the last persisted snapshot; empty when the file is
    /// missing or corrupt.
    pub fn load_events(&self) -> Vec<TrackingEvent> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        parse_tracking_response(&raw).unwrap_or_default()
    }

    /// Overwrite the snapshot with a freshly fetched response body.
    pub fn save_raw(&self, raw: &str) -> Result<()> {
        fs::write(&self.path, raw)?;
        Ok(())
    }
}
