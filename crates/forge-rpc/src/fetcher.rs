use async_trait::async_trait;
use forge_consensus::{ChainFetcher, FetchError, RemoteChain};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Reads a peer's chain from its `GET /chain` endpoint.
#[derive(Debug, Clone)]
pub struct HttpChainFetcher {
    client: reqwest::Client,
}

impl HttpChainFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<RemoteChain, FetchError> {
        let url = format!("http://{}/chain", peer);
        debug!("Fetching chain from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable {
                peer: peer.to_string(),
                reason: e.to_string(),
            })?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::BadStatus {
                peer: peer.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json::<RemoteChain>()
            .await
            .map_err(|e| FetchError::Malformed {
                peer: peer.to_string(),
                reason: e.to_string(),
            })
    }
}
