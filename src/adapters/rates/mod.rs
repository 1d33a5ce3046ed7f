//! Rate Source Adapters
//!
//! HTTP clients for the two upstream providers:
//! - `CbrClient`: Central Bank of Russia daily JSON feed
//! - `NbkClient`: National Bank of Kazakhstan RSS/XML feed
//!
//! Both normalize to a per-unit `RateSnapshot` and never retry.

mod cbr;
mod nbk;

pub use cbr::{CbrClient, DEFAULT_CBR_URL};
pub use nbk::{NbkClient, DEFAULT_NBK_URL};

use std::time::Duration;
use reqwest::{Client, RequestBuilder};

use crate::ports::FetchError;

/// Default upstream request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_http(timeout: Duration) -> Result<Client, FetchError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Send once and return the body of a successful response
pub(crate) async fn fetch_body(request: RequestBuilder) -> Result<String, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(response.text().await?)
}
