//! HTTP client utilities for testing.

use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

/// Default timeout for HTTP requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn create_test_client() -> Client {
    Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .expect("Failed to build test HTTP client")
}

/// Build a URL for a server endpoint
pub fn build_url(addr: &SocketAddr, path: &str) -> Url {
    format!("http://{}{}", addr, path)
        .parse()
        .expect("Failed to parse URL")
}

pub async fn get(addr: &SocketAddr, path: &str) -> Result<Response, Box<dyn Error>> {
    Ok(create_test_client().get(build_url(addr, path)).send().await?)
}

/// POST a JSON body
pub async fn post_json<B: Serialize>(
    addr: &SocketAddr,
    path: &str,
    body: &B,
) -> Result<Response, Box<dyn Error>> {
    Ok(create_test_client()
        .post(build_url(addr, path))
        .json(body)
        .send()
        .await?)
}

/// GET and parse a JSON response, failing on any non-200 status
pub async fn get_json<T: DeserializeOwned>(
    addr: &SocketAddr,
    path: &str,
) -> Result<T, Box<dyn Error>> {
    let response = get(addr, path).await?;

    if response.status() != StatusCode::OK {
        return Err(format!(
            "Unexpected status code: {}, body: {:?}",
            response.status(),
            response.text().await
        )
        .into());
    }

    Ok(response.json::<T>().await?)
}

/// GET raw bytes, failing on any non-200 status
pub async fn get_bytes(addr: &SocketAddr, path: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    let response = get(addr, path).await?;

    if response.status() != StatusCode::OK {
        return Err(format!(
            "Unexpected status code: {}, body: {:?}",
            response.status(),
            response.text().await
        )
        .into());
    }

    Ok(response.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let addr: SocketAddr = ([127, 0, 0, 1], 8000).into();
        let url = build_url(&addr, "/legend.json?width=300");
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/legend.json?width=300");
    }
}
