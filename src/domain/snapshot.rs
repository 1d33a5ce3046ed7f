//! Rate Snapshot
//!
//! One fetched, normalized set of currency rates. Snapshots are never cached:
//! each query or broadcast builds a fresh one from an upstream response.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Upstream rate provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Central Bank of Russia, rates in rubles (JSON)
    Cbr,
    /// National Bank of Kazakhstan, rates in tenge (XML)
    Nbk,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Cbr => "CBR",
            Provider::Nbk => "NBK",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("Invalid rate for {code}: {value}")]
    InvalidValue { code: String, value: f64 },

    #[error("Currency {0} missing from upstream response")]
    MissingCurrency(String),

    #[error("Cannot parse numeric rate '{0}'")]
    Unparseable(String),
}

/// Currency code -> rate per one unit of that currency
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    provider: Provider,
    rates: BTreeMap<String, f64>,
}

impl RateSnapshot {
    /// Build a snapshot, rejecting zero, negative or non-finite rates
    pub fn new<I, S>(provider: Provider, rates: I) -> Result<Self, SnapshotError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (code, value) in rates {
            let code = code.into();
            if !value.is_finite() || value <= 0.0 {
                return Err(SnapshotError::InvalidValue { code, value });
            }
            map.insert(code, value);
        }
        Ok(Self { provider, rates: map })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// Fail on the first code absent from the snapshot
    pub fn require(&self, codes: &[&str]) -> Result<(), SnapshotError> {
        match codes.iter().find(|code| !self.rates.contains_key(**code)) {
            Some(code) => Err(SnapshotError::MissingCurrency(code.to_string())),
            None => Ok(()),
        }
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Parse a decimal that may use a comma as the decimal separator ("470,5")
pub fn parse_decimal(raw: &str) -> Result<f64, SnapshotError> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| SnapshotError::Unparseable(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_snapshot_rejects_non_positive_rates() {
        let zero = RateSnapshot::new(Provider::Nbk, [("USD", 0.0)]);
        assert!(matches!(zero, Err(SnapshotError::InvalidValue { .. })));

        let negative = RateSnapshot::new(Provider::Nbk, [("USD", -1.0)]);
        assert!(negative.is_err());

        let nan = RateSnapshot::new(Provider::Cbr, [("EUR", f64::NAN)]);
        assert!(nan.is_err());
    }

    #[test]
    fn test_require_reports_first_missing_code() {
        let snapshot = RateSnapshot::new(Provider::Nbk, [("USD", 470.0), ("EUR", 510.0)]).unwrap();
        assert!(snapshot.require(&["USD", "EUR"]).is_ok());
        assert_eq!(
            snapshot.require(&["USD", "RUB", "KGS"]),
            Err(SnapshotError::MissingCurrency("RUB".to_string()))
        );
    }

    #[test]
    fn test_parse_decimal_comma() {
        assert_relative_eq!(parse_decimal("470,52").unwrap(), 470.52);
        assert_relative_eq!(parse_decimal(" 5.91 ").unwrap(), 5.91);
        assert!(parse_decimal("n/a").is_err());
    }

    #[test]
    fn test_codes_are_sorted() {
        let snapshot =
            RateSnapshot::new(Provider::Nbk, [("USD", 1.0), ("BYN", 2.0), ("EUR", 3.0)]).unwrap();
        let codes: Vec<_> = snapshot.codes().collect();
        assert_eq!(codes, vec!["BYN", "EUR", "USD"]);
        assert_eq!(snapshot.len(), 3);
    }
}
