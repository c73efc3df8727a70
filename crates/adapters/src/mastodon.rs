//! Mastodon adapter for publishing statuses

use async_trait::async_trait;
use hn_relay_domain::{PostError, PostReceipt, RenderedStatus, StoryPoster};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// Application and account credentials for the password grant
#[derive(Debug)]
pub struct MastodonCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub username: String,
    pub password: SecretString,
}

/// Mastodon poster holding a bearer token obtained at construction
pub struct MastodonPoster {
    client: Client,
    instance: String,
    access_token: SecretString,
    enabled: bool,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    id: String,
    url: Option<String>,
}

impl MastodonPoster {
    /// Authenticate against `instance` and return a ready poster
    pub async fn connect(
        instance: &str,
        credentials: &MastodonCredentials,
        timeout: Option<Duration>,
    ) -> Result<Self, PostError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PostError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let instance = instance.trim_end_matches('/').to_string();
        let access_token = authenticate(&client, &instance, credentials).await?;

        tracing::info!(instance = %instance, username = %credentials.username, "Authenticated with Mastodon");

        Ok(Self {
            client,
            instance,
            access_token,
            enabled: true,
        })
    }

    /// Create a disabled poster (for dry-run)
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            instance: String::new(),
            access_token: SecretString::new("".into()),
            enabled: false,
        }
    }
}

async fn authenticate(
    client: &Client,
    instance: &str,
    credentials: &MastodonCredentials,
) -> Result<SecretString, PostError> {
    let url = format!("{}/oauth/token", instance);

    let response = client
        .post(&url)
        .form(&[
            ("grant_type", "password"),
            ("scope", "write"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose_secret()),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.expose_secret()),
        ])
        .send()
        .await
        .map_err(|e| PostError::Network(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(PostError::Auth(format!("{}: {}", status, body)));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| PostError::Auth(format!("Malformed token response: {}", e)))?;

    Ok(SecretString::new(token.access_token.into()))
}

#[async_trait]
impl StoryPoster for MastodonPoster {
    async fn post(&self, status: &RenderedStatus) -> Result<PostReceipt, PostError> {
        if !self.enabled {
            return Err(PostError::Api("Poster is disabled".to_string()));
        }

        tracing::info!(story_id = %status.story_id, "Posting status");

        let url = format!("{}/api/v1/statuses", self.instance);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.access_token.expose_secret()),
            )
            .form(&[("status", status.text.as_str()), ("visibility", "unlisted")])
            .send()
            .await
            .map_err(|e| PostError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let code = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PostError::Api(format!(
                "Failed to create status: {}: {}",
                code, body
            )));
        }

        let created: StatusResponse = response
            .json()
            .await
            .map_err(|e| PostError::Api(e.to_string()))?;

        Ok(PostReceipt {
            id: created.id,
            url: created.url,
        })
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn platform(&self) -> &'static str {
        "mastodon"
    }
}
