use std::time::Duration;

use reqwest::Client;

use crate::config::ProxySettings;
use crate::error::{FetchError, RegionError};

/// Default per-request timeout for search and detail pages alike.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the per-region client: request timeout, TLS verification off (the
/// listing site fronts pages through hosts with mismatched certificates —
/// a documented insecurity, not something this crawler hardens), optional
/// upstream proxy with basic credentials.
pub fn build_client(
    proxy: Option<&ProxySettings>,
    timeout: Duration,
) -> Result<Client, RegionError> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(true);

    if let Some(settings) = proxy {
        let proxy = reqwest::Proxy::all(&settings.url)
            .map_err(RegionError::Client)?
            .basic_auth(&settings.user, &settings.password);
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(RegionError::Client)
}

/// GET one page and return its body.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, FetchError> {
    let body = client.get(url).send().await?.text().await?;
    Ok(body)
}
