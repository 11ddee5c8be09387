//! HTTP client for the search service.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use super::{PackageVersion, ResolveResponse, SearchError, SearchService};
use crate::error::Result;
use crate::http::base_url;

#[derive(Debug, Clone)]
pub struct HttpSearchClient {
    client: reqwest::Client,
    base: Url,
}

impl HttpSearchClient {
    pub fn new(client: reqwest::Client, base: &str) -> Result<Self> {
        Ok(Self {
            client,
            base: base_url(base)?,
        })
    }

    fn endpoint(&self, path: &str, name: &str, version: &str) -> Result<Url, SearchError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("version", version);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SearchError> {
        debug!(%url, "querying search service");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        check_status(response.status(), &url)?;

        response
            .json::<T>()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SearchService for HttpSearchClient {
    #[instrument(skip(self))]
    async fn resolve_single(
        &self,
        name: &str,
        version: &str,
    ) -> Result<PackageVersion, SearchError> {
        let url = self.endpoint("v1/resolve", name, version)?;
        self.get_json(url).await
    }

    #[instrument(skip(self, cancel))]
    async fn resolve_versioned(
        &self,
        cancel: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<ResolveResponse, SearchError> {
        let url = self.endpoint("v2/resolve", name, version)?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SearchError::Cancelled),
            result = self.get_json(url) => result,
        }
    }
}

fn check_status(status: StatusCode, url: &Url) -> Result<(), SearchError> {
    if status == StatusCode::NOT_FOUND {
        return Err(SearchError::NotFound);
    }
    if !status.is_success() {
        return Err(SearchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(())
}
