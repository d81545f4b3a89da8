//! Configuration posts read from a Mastodon-compatible account.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

use super::ConfigProvider;
use crate::config::DynamicSettings;
use crate::error::{ConfigResolutionError, FetchError};
use crate::utils::fragment_text;

#[derive(Debug, Deserialize)]
struct Account {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    content: String,
}

/// Reads the newest original post of one account.
pub struct MastodonProvider {
    client: Client,
    instance: Url,
    account_id: Option<String>,
    access_token: String,
}

impl MastodonProvider {
    /// Build a provider from settings, sharing `client` for its requests.
    pub fn from_config(settings: &DynamicSettings, client: Client) -> Result<Self, ConfigResolutionError> {
        let instance = settings
            .instance
            .clone()
            .ok_or_else(|| ConfigResolutionError::NotConfigured("no instance URL".to_string()))?;
        let access_token = settings
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigResolutionError::NotConfigured("no access token".to_string()))?;
        Ok(Self {
            client,
            instance,
            account_id: settings.account_id.clone().filter(|id| !id.trim().is_empty()),
            access_token,
        })
    }

    fn credentials_url(&self) -> Result<Url, ConfigResolutionError> {
        self.endpoint("/api/v1/accounts/verify_credentials")
    }

    fn statuses_url(&self, account_id: &str) -> Result<Url, ConfigResolutionError> {
        let mut url = self.endpoint(&format!("/api/v1/accounts/{}/statuses", account_id.trim()))?;
        url.query_pairs_mut()
            .append_pair("limit", "1")
            .append_pair("exclude_replies", "true")
            .append_pair("exclude_reblogs", "true");
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ConfigResolutionError> {
        self.instance
            .join(path)
            .map_err(|e| ConfigResolutionError::NotConfigured(format!("bad instance URL: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ConfigResolutionError> {
        let request_error = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(ConfigResolutionError::Auth(format!("{url} answered HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let bytes = response.bytes().await.map_err(request_error)?;
        serde_json::from_slice(&bytes).map_err(|e| ConfigResolutionError::Response {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn resolve_account(&self) -> Result<String, ConfigResolutionError> {
        if let Some(id) = &self.account_id {
            return Ok(id.clone());
        }
        let account: Account = self.get_json(self.credentials_url()?).await?;
        debug!(account_id = %account.id, "Resolved account from credentials");
        Ok(account.id)
    }
}

impl ConfigProvider for MastodonProvider {
    #[instrument(level = "info", skip_all, fields(instance = %self.instance))]
    async fn latest_post(&self) -> Result<String, ConfigResolutionError> {
        let account_id = self.resolve_account().await?;
        let statuses: Vec<Status> = self.get_json(self.statuses_url(&account_id)?).await?;
        let status = statuses.into_iter().next().ok_or(ConfigResolutionError::NoPost)?;
        let text = fragment_text(&status.content);
        info!(%account_id, chars = text.len(), "Fetched configuration post");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::serve_once;

    fn provider_at(instance: Url) -> MastodonProvider {
        let settings = DynamicSettings {
            instance: Some(instance),
            ..settings(Some("42"))
        };
        MastodonProvider::from_config(&settings, Client::new()).unwrap()
    }

    fn settings(account_id: Option<&str>) -> DynamicSettings {
        DynamicSettings {
            instance: Some(Url::parse("https://social.example").unwrap()),
            account_id: account_id.map(String::from),
            access_token: Some("token".to_string()),
            ..DynamicSettings::default()
        }
    }

    #[test]
    fn test_requires_instance_and_token() {
        let missing_token = DynamicSettings {
            access_token: Some("  ".to_string()),
            ..settings(None)
        };
        assert!(matches!(
            MastodonProvider::from_config(&missing_token, Client::new()),
            Err(ConfigResolutionError::NotConfigured(_))
        ));
        assert!(matches!(
            MastodonProvider::from_config(&DynamicSettings::default(), Client::new()),
            Err(ConfigResolutionError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_endpoints() {
        let provider = MastodonProvider::from_config(&settings(Some("42")), Client::new()).unwrap();
        assert_eq!(
            provider.credentials_url().unwrap().as_str(),
            "https://social.example/api/v1/accounts/verify_credentials"
        );
        assert_eq!(
            provider.statuses_url("42").unwrap().as_str(),
            "https://social.example/api/v1/accounts/42/statuses?limit=1&exclude_replies=true&exclude_reblogs=true"
        );
    }

    #[tokio::test]
    async fn test_configured_account_skips_credentials_lookup() {
        let provider = MastodonProvider::from_config(&settings(Some("42")), Client::new()).unwrap();
        assert_eq!(provider.resolve_account().await.unwrap(), "42");
    }

    #[test]
    fn test_post_html_reduces_to_json() {
        let content = r#"<p>{&quot;general&quot;: [&quot;<a href="https://feeds.bbci.co.uk/news/rss.xml"><span class="invisible">https://</span><span class="ellipsis">feeds.bbci.co.uk/news/</span><span class="invisible">rss.xml</span></a>&quot;]}</p>"#;
        let status: Status = serde_json::from_value(serde_json::json!({ "content": content })).unwrap();
        assert_eq!(
            fragment_text(&status.content),
            r#"{"general": ["https://feeds.bbci.co.uk/news/rss.xml"]}"#
        );
    }

    #[tokio::test]
    async fn test_rejected_token_is_auth_error() {
        for status in ["401 Unauthorized", "403 Forbidden"] {
            let instance = serve_once(status, &[], br#"{"error":"The access token is invalid"}"#).await;
            assert!(
                matches!(provider_at(instance).latest_post().await, Err(ConfigResolutionError::Auth(_))),
                "{status}"
            );
        }
    }

    #[tokio::test]
    async fn test_server_error_is_fetch_status() {
        let instance = serve_once("503 Service Unavailable", &[], b"").await;
        assert!(matches!(
            provider_at(instance).latest_post().await,
            Err(ConfigResolutionError::Fetch(FetchError::Status { status: 503, .. }))
        ));
    }

    #[tokio::test]
    async fn test_latest_status_content_is_returned() {
        let body = br#"[{"id":"1","content":"<p>{&quot;general&quot;: []}</p>"}]"#;
        let instance = serve_once("200 OK", &[("Content-Type", "application/json")], body).await;
        assert_eq!(provider_at(instance).latest_post().await.unwrap(), r#"{"general": []}"#);
    }

    #[tokio::test]
    async fn test_no_statuses_and_bad_json() {
        let empty = serve_once("200 OK", &[("Content-Type", "application/json")], b"[]").await;
        assert!(matches!(
            provider_at(empty).latest_post().await,
            Err(ConfigResolutionError::NoPost)
        ));

        let garbage = serve_once("200 OK", &[], b"<html>maintenance</html>").await;
        assert!(matches!(
            provider_at(garbage).latest_post().await,
            Err(ConfigResolutionError::Response { .. })
        ));
    }
}
