//! The provider HTTP client.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;

use crate::types::{PartPage, VehiclePage};

/// Request timeout for feed calls. Pages are large; give the provider room.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for the provider, loaded from the environment by the
/// API crate.
#[derive(Debug, Clone)]
pub struct SupplierConfig {
    /// Base URL of the warehouse API, e.g. `https://apis.example.com/Almacen`.
    pub base_url: String,
    /// API key sent in the `apikey` header.
    pub api_key: String,
    /// Channel/company identifier sent in the `idempresa` header.
    pub company_id: i64,
}

/// Errors that can occur when talking to the provider.
#[derive(Debug, thiserror::Error)]
pub enum SupplierError {
    /// Transport-level failure (DNS, connect, timeout, ...).
    #[error("supplier request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("supplier returned status {0}")]
    Status(StatusCode),

    /// The response body did not match the expected shape.
    #[error("supplier response could not be decoded: {0}")]
    Decode(String),
}

/// Client for the provider's change feeds.
pub struct SupplierClient {
    config: SupplierConfig,
    http: reqwest::Client,
}

impl SupplierClient {
    pub fn new(config: SupplierConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            // Building with static options cannot fail at runtime.
            .expect("reqwest client");
        Self { config, http }
    }

    pub fn config(&self) -> &SupplierConfig {
        &self.config
    }

    /// Fetch one page of the vehicle change feed.
    ///
    /// `since` bounds the feed to records changed after that instant;
    /// `last_id` is the pagination cursor from the previous page's
    /// `result_set`; `page_size` caps the page length.
    pub async fn vehicle_changes(
        &self,
        since: DateTime<Utc>,
        last_id: i64,
        page_size: i32,
    ) -> Result<VehiclePage, SupplierError> {
        self.fetch_page("RecuperarCambiosVehiculosCanal", since, last_id, page_size)
            .await
    }

    /// Fetch one page of the part change feed.
    pub async fn part_changes(
        &self,
        since: DateTime<Utc>,
        last_id: i64,
        page_size: i32,
    ) -> Result<PartPage, SupplierError> {
        self.fetch_page("RecuperarCambiosCanalEmpresa", since, last_id, page_size)
            .await
    }

    /// Total vehicles changed since `since`, read from a minimal page's
    /// `result_set`. Used for progress reporting only.
    pub async fn vehicle_count(&self, since: DateTime<Utc>) -> Result<i64, SupplierError> {
        let page = self.vehicle_changes(since, 0, 1).await?;
        Ok(page.result_set.total)
    }

    /// Total parts changed since `since`.
    pub async fn part_count(&self, since: DateTime<Utc>) -> Result<i64, SupplierError> {
        let page = self.part_changes(since, 0, 1).await?;
        Ok(page.result_set.total)
    }

    async fn fetch_page<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        since: DateTime<Utc>,
        last_id: i64,
        page_size: i32,
    ) -> Result<T, SupplierError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);

        let response = self
            .http
            .get(&url)
            .headers(self.feed_headers(since, last_id, page_size))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, %status, "Supplier feed request rejected");
            return Err(SupplierError::Status(status));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SupplierError::Decode(e.to_string()))
    }

    /// The provider takes auth and paging as headers, not query parameters.
    fn feed_headers(&self, since: DateTime<Utc>, last_id: i64, page_size: i32) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let entries = [
            ("apikey", self.config.api_key.clone()),
            ("idempresa", self.config.company_id.to_string()),
            ("fecha", format_feed_date(since)),
            ("lastid", last_id.to_string()),
            ("offset", page_size.to_string()),
        ];
        for (name, value) in entries {
            if let Ok(v) = value.parse() {
                headers.insert(name, v);
            }
        }
        headers
    }
}

/// Format an instant the way the provider expects: `dd/MM/yyyy HH:mm:ss`.
pub fn format_feed_date(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M:%S").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn feed_date_uses_provider_format() {
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 2, 5, 9).unwrap();
        assert_eq!(format_feed_date(at), "07/03/2025 02:05:09");
    }

    #[test]
    fn feed_headers_carry_auth_and_cursor() {
        let client = SupplierClient::new(SupplierConfig {
            base_url: "https://apis.example.com/Almacen".into(),
            api_key: "k-123".into(),
            company_id: 1236,
        });
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 0, 0, 0).unwrap();
        let headers = client.feed_headers(at, 42, 1000);

        assert_eq!(headers.get("apikey").unwrap(), "k-123");
        assert_eq!(headers.get("idempresa").unwrap(), "1236");
        assert_eq!(headers.get("fecha").unwrap(), "07/03/2025 00:00:00");
        assert_eq!(headers.get("lastid").unwrap(), "42");
        assert_eq!(headers.get("offset").unwrap(), "1000");
    }
}
