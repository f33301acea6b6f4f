//! Request helpers shared by the source and store clients.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::{ClientError, Result};

const USER_AGENT: &str = concat!("vsfetch/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by all outbound calls. Timeouts are set per
/// request so each collaborator can use its own.
pub fn build_http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(ClientError::Builder)
}

/// Send a request, treating 4xx/5xx responses as failures.
pub(crate) async fn send(url: &str, request: RequestBuilder, timeout: Duration) -> Result<Response> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|source| ClientError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

pub(crate) async fn json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    response.json::<T>().await.map_err(|source| ClientError::Decode {
        url: url.to_string(),
        source,
    })
}

pub(crate) async fn text(url: &str, response: Response) -> Result<String> {
    response.text().await.map_err(|source| ClientError::Decode {
        url: url.to_string(),
        source,
    })
}

pub(crate) async fn get_text(client: &Client, url: &str, timeout: Duration) -> Result<String> {
    let response = send(url, client.get(url), timeout).await?;
    text(url, response).await
}
