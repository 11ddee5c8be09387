//! Release lookup against the GitHub REST API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use super::{RunXError, RunXRef, RunXResolver, DEFAULT_GITHUB_API_URL};
use crate::error::Result;
use crate::http::base_url;

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

#[derive(Debug, Clone)]
pub struct GithubRunXResolver {
    client: reqwest::Client,
    api: Url,
}

impl GithubRunXResolver {
    pub fn new(client: reqwest::Client, api: &str) -> Result<Self> {
        Ok(Self {
            client,
            api: base_url(api)?,
        })
    }

    fn release_url(&self, pkg: &RunXRef, tag: Option<&str>) -> Result<Url, RunXError> {
        let path = match tag {
            None => format!("repos/{}/{}/releases/latest", pkg.owner, pkg.repo),
            Some(tag) => format!("repos/{}/{}/releases/tags/{tag}", pkg.owner, pkg.repo),
        };
        self.api
            .join(&path)
            .map_err(|e| RunXError::Transport(e.to_string()))
    }

    /// Fetch one release. `Ok(None)` when GitHub has no such release.
    async fn fetch(&self, url: Url) -> Result<Option<Release>, RunXError> {
        debug!(%url, "querying release");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| RunXError::Transport(e.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => Err(RunXError::Status(status.as_u16())),
            _ => response
                .json::<Release>()
                .await
                .map(Some)
                .map_err(|e| RunXError::Transport(e.to_string())),
        }
    }

    async fn pin(&self, pkg: &RunXRef) -> Result<RunXRef, RunXError> {
        if pkg.is_latest() {
            if let Some(release) = self.fetch(self.release_url(pkg, None)?).await? {
                return Ok(pkg.with_version(release.tag_name));
            }
        } else {
            for tag in candidate_tags(&pkg.version) {
                if let Some(release) = self.fetch(self.release_url(pkg, Some(tag.as_str()))?).await? {
                    return Ok(pkg.with_version(release.tag_name));
                }
            }
        }
        Err(RunXError::ReleaseNotFound {
            owner: pkg.owner.clone(),
            repo: pkg.repo.clone(),
            version: pkg.version.clone(),
        })
    }
}

#[async_trait]
impl RunXResolver for GithubRunXResolver {
    #[instrument(skip(self, cancel))]
    async fn resolve(
        &self,
        cancel: &CancellationToken,
        reference: &str,
    ) -> Result<RunXRef, RunXError> {
        let pkg = RunXRef::parse(reference)?;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RunXError::Cancelled),
            result = self.pin(&pkg) => result,
        }
    }
}

/// Tags are usually `v`-prefixed while users often type bare versions.
fn candidate_tags(version: &str) -> Vec<String> {
    if version.starts_with('v') {
        vec![version.to_string()]
    } else {
        vec![version.to_string(), format!("v{version}")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver() -> GithubRunXResolver {
        GithubRunXResolver::new(reqwest::Client::new(), DEFAULT_GITHUB_API_URL).unwrap()
    }

    #[test]
    fn latest_release_url() {
        let pkg = RunXRef::parse("runx:cli/cli@latest").unwrap();
        let url = resolver().release_url(&pkg, None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/cli/cli/releases/latest"
        );
    }

    #[test]
    fn tagged_release_url() {
        let pkg = RunXRef::parse("runx:cli/cli@v2.40.0").unwrap();
        let url = resolver().release_url(&pkg, Some("v2.40.0")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/cli/cli/releases/tags/v2.40.0"
        );
    }

    #[test]
    fn bare_versions_also_try_v_prefix() {
        assert_eq!(candidate_tags("1.55.2"), vec!["1.55.2", "v1.55.2"]);
        assert_eq!(candidate_tags("v1.55.2"), vec!["v1.55.2"]);
    }

    #[tokio::test]
    async fn malformed_reference_fails_before_network() {
        let err = resolver()
            .resolve(&CancellationToken::new(), "runx:nope")
            .await
            .unwrap_err();
        assert!(matches!(err, RunXError::InvalidReference(_)));
    }

    async fn release(server: &MockServer, route: &str, tag: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tag_name": tag })))
            .expect(1)
            .mount(server)
            .await;
    }

    fn against(server: &MockServer) -> GithubRunXResolver {
        GithubRunXResolver::new(reqwest::Client::new(), &server.uri()).unwrap()
    }

    #[tokio::test]
    async fn pins_latest_release() {
        let server = MockServer::start().await;
        release(&server, "/repos/cli/cli/releases/latest", "v2.40.0").await;
        let pinned = against(&server)
            .resolve(&CancellationToken::new(), "runx:cli/cli@latest")
            .await
            .unwrap();
        assert_eq!(pinned.to_string(), "runx:cli/cli@v2.40.0");
    }

    #[tokio::test]
    async fn bare_version_falls_back_to_v_tag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/golangci/golangci-lint/releases/tags/1.55.2"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        release(
            &server,
            "/repos/golangci/golangci-lint/releases/tags/v1.55.2",
            "v1.55.2",
        )
        .await;

        let pinned = against(&server)
            .resolve(&CancellationToken::new(), "runx:golangci/golangci-lint@1.55.2")
            .await
            .unwrap();
        assert_eq!(pinned.version, "v1.55.2");
    }

    #[tokio::test]
    async fn bare_tag_wins_when_it_exists() {
        let server = MockServer::start().await;
        release(&server, "/repos/jqlang/jq/releases/tags/jq-1.7", "jq-1.7").await;
        let pinned = against(&server)
            .resolve(&CancellationToken::new(), "runx:jqlang/jq@jq-1.7")
            .await
            .unwrap();
        assert_eq!(pinned.version, "jq-1.7");
    }

    #[tokio::test]
    async fn missing_release_is_not_found() {
        let server = MockServer::start().await;
        let err = against(&server)
            .resolve(&CancellationToken::new(), "runx:cli/cli@9.9.9")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RunXError::ReleaseNotFound { ref version, .. } if version == "9.9.9"
        ));
    }

    #[tokio::test]
    async fn rate_limit_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        let err = against(&server)
            .resolve(&CancellationToken::new(), "runx:cli/cli@latest")
            .await
            .unwrap_err();
        assert!(matches!(err, RunXError::Status(403)));
    }
}
