//! Carrier adapter (SPX tracking search endpoint).
//!
//! One GET with provider-specific headers and query parameters. The header
//! set mimics the carrier's own web frontend; it is placeholder
//! configuration for this provider, not domain logic.

use async_trait::async_trait;

use stb_core::{
    errors::Error,
    ports::{CarrierClient, CarrierFetch},
    snapshot::parse_tracking_response,
    Result,
};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

#[derive(Clone, Debug)]
pub struct SpxCarrierClient {
    endpoint: String,
    http: reqwest::Client,
}

impl SpxCarrierClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("reqwest client build");
        Self {
            endpoint: endpoint.into(),
            http,
        }
    }
}

#[async_trait]
impl CarrierClient for SpxCarrierClient {
    async fn fetch_tracking(&self, tracking_number: &str) -> Result<CarrierFetch> {
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[("sls_tracking_number", tracking_number)])
            .header("accept", "application/json, text/plain, */*")
            .header("user-agent", USER_AGENT)
            .header("x-language", "vi")
            .send()
            .await
            .map_err(|e| Error::Transport(format!("carrier request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "carrier fetch failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let raw = resp
            .text()
            .await
            .map_err(|e| Error::Transport(format!("carrier body error: {e}")))?;
        let events = parse_tracking_response(&raw)?;

        Ok(CarrierFetch { raw, events })
    }
}
