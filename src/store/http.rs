//! Binary cache client reading `<hash>.narinfo` over HTTP.

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{verify_store_path, StoreError, StoreRef, StoreResolver};
use crate::http::base_url;

#[derive(Debug, Clone)]
pub struct HttpStoreResolver {
    client: reqwest::Client,
}

impl HttpStoreResolver {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(
        &self,
        store_hash: &str,
        store_name: Option<&str>,
        cache_url: &str,
    ) -> Result<String, StoreError> {
        let url = base_url(cache_url)
            .map_err(|e| StoreError::Transport(e.to_string()))?
            .join(&format!("{store_hash}.narinfo"))
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        debug!(%url, "fetching narinfo");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(StoreError::Miss {
                    hash: store_hash.to_string(),
                })
            }
            status if !status.is_success() => {
                return Err(StoreError::Status {
                    status: status.as_u16(),
                    hash: store_hash.to_string(),
                })
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let path = narinfo_store_path(&body).ok_or_else(|| StoreError::MalformedNarinfo {
            hash: store_hash.to_string(),
        })?;
        verify_store_path(path, store_hash, store_name)?;
        Ok(path.to_string())
    }
}

#[async_trait]
impl StoreResolver for HttpStoreResolver {
    async fn resolve(
        &self,
        cancel: &CancellationToken,
        store_hash: &str,
        cache_url: &str,
    ) -> Result<String, StoreError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StoreError::Cancelled),
            result = self.fetch(store_hash, None, cache_url) => result,
        }
    }

    async fn resolve_ref(
        &self,
        cancel: &CancellationToken,
        store_ref: &StoreRef,
        cache_url: &str,
    ) -> Result<String, StoreError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StoreError::Cancelled),
            result = self.fetch(&store_ref.hash, Some(&store_ref.name), cache_url) => result,
        }
    }
}

/// Value of the `StorePath:` field of a narinfo document.
fn narinfo_store_path(body: &str) -> Option<&str> {
    body.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "StorePath").then(|| value.trim())
    })
}
