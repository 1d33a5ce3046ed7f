use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{build_http, fetch_body, DEFAULT_TIMEOUT};
use crate::domain::format::CBR_REQUIRED;
use crate::domain::snapshot::{Provider, RateSnapshot};
use crate::ports::{FetchError, RateSource};

pub const DEFAULT_CBR_URL: &str = "https://www.cbr-xml-daily.ru/daily_json.js";

/// Central Bank of Russia client; rates are rubles per one unit
#[derive(Debug, Clone)]
pub struct CbrClient {
    http: Client,
    url: String,
}

impl CbrClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_url(DEFAULT_CBR_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            http: build_http(timeout)?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parse a `daily_json.js` body
    pub fn parse(body: &str) -> Result<RateSnapshot, FetchError> {
        // Served as application/javascript, so decode the text ourselves
        let response: DailyResponse =
            serde_json::from_str(body).map_err(|e| FetchError::parse(Provider::Cbr, e))?;

        let mut rates = Vec::with_capacity(response.valute.len());
        for (code, entry) in response.valute {
            if entry.nominal <= 0.0 {
                return Err(FetchError::parse(
                    Provider::Cbr,
                    format!("nominal for {} is {}", code, entry.nominal),
                ));
            }
            rates.push((code, entry.value / entry.nominal));
        }

        let snapshot = RateSnapshot::new(Provider::Cbr, rates)?;
        snapshot.require(&CBR_REQUIRED)?;
        Ok(snapshot)
    }
}

#[async_trait]
impl RateSource for CbrClient {
    fn provider(&self) -> Provider {
        Provider::Cbr
    }

    async fn fetch(&self) -> Result<RateSnapshot, FetchError> {
        tracing::debug!("Fetching CBR rates from {}", self.url);
        let body = fetch_body(self.http.get(&self.url)).await?;
        Self::parse(&body)
    }
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Valute")]
    valute: HashMap<String, ValuteEntry>,
}

#[derive(Debug, Deserialize)]
struct ValuteEntry {
    #[serde(rename = "Nominal", default = "default_nominal")]
    nominal: f64,
    #[serde(rename = "Value")]
    value: f64,
}

fn default_nominal() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::SnapshotError;
    use approx::assert_relative_eq;

    const SAMPLE: &str = r#"{
        "Date": "2025-03-07T11:30:00+03:00",
        "PreviousDate": "2025-03-06T11:30:00+03:00",
        "Timestamp": "2025-03-06T20:00:00+03:00",
        "Valute": {
            "USD": {"ID": "R01235", "NumCode": "840", "CharCode": "USD", "Nominal": 1,
                    "Name": "Доллар США", "Value": 89.1237, "Previous": 89.2911},
            "EUR": {"ID": "R01239", "NumCode": "978", "CharCode": "EUR", "Nominal": 1,
                    "Name": "Евро", "Value": 96.3244, "Previous": 95.6047},
            "KZT": {"ID": "R01335", "NumCode": "398", "CharCode": "KZT", "Nominal": 100,
                    "Name": "Казахстанских тенге", "Value": 17.9865, "Previous": 17.9511}
        }
    }"#;

    #[test]
    fn test_parse_normalizes_by_nominal() {
        let snapshot = CbrClient::parse(SAMPLE).unwrap();
        assert_eq!(snapshot.provider(), Provider::Cbr);
        assert_relative_eq!(snapshot.get("USD").unwrap(), 89.1237);
        assert_relative_eq!(snapshot.get("EUR").unwrap(), 96.3244);
        assert_relative_eq!(snapshot.get("KZT").unwrap(), 0.179865, epsilon = 1e-12);
    }

    #[test]
    fn test_parse_missing_required_currency() {
        let body = r#"{"Valute": {"USD": {"Nominal": 1, "Value": 89.0}, "EUR": {"Nominal": 1, "Value": 96.0}}}"#;
        let err = CbrClient::parse(body).unwrap_err();
        assert!(matches!(
            err,
            FetchError::Snapshot(SnapshotError::MissingCurrency(ref code)) if code == "KZT"
        ));
    }

    #[test]
    fn test_parse_rejects_zero_value() {
        let body = r#"{"Valute": {"USD": {"Value": 0}, "EUR": {"Value": 96.0}, "KZT": {"Nominal": 100, "Value": 18.0}}}"#;
        assert!(matches!(
            CbrClient::parse(body),
            Err(FetchError::Snapshot(SnapshotError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(
            CbrClient::parse("<html>502 Bad Gateway</html>"),
            Err(FetchError::Parse { provider: Provider::Cbr, .. })
        ));
    }

    #[test]
    fn test_client_creation() {
        let client = CbrClient::new().unwrap();
        assert_eq!(client.url(), DEFAULT_CBR_URL);
    }
}
