use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;

use super::{build_http, fetch_body, DEFAULT_TIMEOUT};
use crate::domain::format::{today_in, DEFAULT_TIMEZONE, NBK_REQUIRED};
use crate::domain::snapshot::{parse_decimal, Provider, RateSnapshot};
use crate::ports::{FetchError, RateSource};

pub const DEFAULT_NBK_URL: &str = "https://nationalbank.kz/rss/get_rates.cfm";

/// National Bank of Kazakhstan client; rates are tenge per one unit
#[derive(Debug, Clone)]
pub struct NbkClient {
    http: Client,
    url: String,
    tz: Tz,
}

impl NbkClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_url(DEFAULT_NBK_URL, DEFAULT_TIMEOUT, DEFAULT_TIMEZONE)
    }

    /// `tz` decides which calendar day is requested
    pub fn with_url(url: impl Into<String>, timeout: Duration, tz: Tz) -> Result<Self, FetchError> {
        Ok(Self {
            http: build_http(timeout)?,
            url: url.into(),
            tz,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the rates published for `date`
    pub async fn fetch_for(&self, date: NaiveDate) -> Result<RateSnapshot, FetchError> {
        let fdate = date.format("%d.%m.%Y").to_string();
        tracing::debug!("Fetching NBK rates for {} from {}", fdate, self.url);

        let request = self.http.get(&self.url).query(&[("fdate", fdate.as_str())]);
        let body = fetch_body(request).await?;
        Self::parse(&body)
    }

    /// Parse a `get_rates.cfm` XML body
    pub fn parse(body: &str) -> Result<RateSnapshot, FetchError> {
        let document: RatesDocument =
            quick_xml::de::from_str(body).map_err(|e| FetchError::parse(Provider::Nbk, e))?;

        // Rates are kept as published, including multi-unit quotes
        let mut rates = Vec::with_capacity(document.items.len());
        for item in document.items {
            let value = parse_decimal(&item.description)?;
            rates.push((item.title.trim().to_string(), value));
        }

        let snapshot = RateSnapshot::new(Provider::Nbk, rates)?;
        snapshot.require(&NBK_REQUIRED)?;
        Ok(snapshot)
    }
}

#[async_trait]
impl RateSource for NbkClient {
    fn provider(&self) -> Provider {
        Provider::Nbk
    }

    async fn fetch(&self) -> Result<RateSnapshot, FetchError> {
        self.fetch_for(today_in(self.tz, Utc::now())).await
    }
}

#[derive(Debug, Deserialize)]
struct RatesDocument {
    #[serde(rename = "item", default)]
    items: Vec<RateItem>,
}

#[derive(Debug, Deserialize)]
struct RateItem {
    title: String,
    description: String,
}
