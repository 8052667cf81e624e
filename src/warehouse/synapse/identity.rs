//! Managed identity access tokens for Azure SQL.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::warehouse::error::WarehouseError;
use crate::warehouse::target::IdentityEndpoint;

const SQL_RESOURCE: &str = "https://database.windows.net/";
const HOSTED_API_VERSION: &str = "2019-08-01";
const IMDS_API_VERSION: &str = "2018-02-01";
const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Requests an access token for `https://database.windows.net/`.
///
/// # Errors
///
/// Returns [`WarehouseError::AuthenticationFailed`] when the endpoint is
/// unreachable, answers with a non-success status, or returns no token.
pub fn fetch_access_token(identity: &IdentityEndpoint) -> Result<String, WarehouseError> {
    let failed = |message: String| WarehouseError::AuthenticationFailed { message };

    let client = Client::builder()
        .timeout(TOKEN_TIMEOUT)
        .build()
        .map_err(|error| failed(format!("failed to configure identity client: {error}")))?;

    let base_request = client
        .get(identity.url())
        .query(&[("resource", SQL_RESOURCE)]);
    let request = match identity.header() {
        Some(secret) => base_request
            .query(&[("api-version", HOSTED_API_VERSION)])
            .header("X-IDENTITY-HEADER", secret),
        None => base_request
            .query(&[("api-version", IMDS_API_VERSION)])
            .header("Metadata", "true"),
    };

    let response = request
        .send()
        .map_err(|error| failed(format!("identity endpoint unreachable: {error}")))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(failed(format!("identity endpoint returned {status}: {body}")));
    }

    let token = response
        .json::<TokenResponse>()
        .map_err(|error| failed(format!("invalid identity token response: {error}")))?;
    if token.access_token.trim().is_empty() {
        return Err(failed("identity endpoint returned an empty token".to_owned()));
    }
    Ok(token.access_token)
}
