//! Habits backend client
//!
//! Thin REST client for the three calls combat needs:
//! - load a character snapshot
//! - load the enemy catalog (falls back to the built-in table)
//! - submit an encounter's completion summary
//!
//! No retries: failures surface to the caller.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::combat::{Character, CharacterSnapshot, CombatSummary, EnemyCatalog, EnemyTemplate};
use crate::config::Settings;

/// Backend errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend URL not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// REST client for the Habits backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl BackendClient {
    /// Create a client against `base_url`
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    /// Create a client from settings; fails if no backend URL is set
    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        let base_url = settings
            .backend_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(BackendError::NotConfigured)?;
        Self::new(
            base_url,
            settings.auth_token.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("backend error: {} - {}", status, body);
            return Err(BackendError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    /// Fetch a character snapshot
    pub async fn fetch_character(&self, character_id: &str) -> Result<Character, BackendError> {
        let snapshot: CharacterSnapshot = self
            .get_json(&format!("/characters/{}", character_id))
            .await?;
        Ok(Character::from_snapshot(snapshot))
    }

    /// Fetch enemy records
    pub async fn fetch_enemy_catalog(&self) -> Result<EnemyCatalog, BackendError> {
        let templates: Vec<EnemyTemplate> = self.get_json("/enemies").await?;
        Ok(EnemyCatalog::from_templates(templates))
    }

    /// Fetch the enemy catalog, using the built-in table if the fetch fails
    pub async fn load_enemy_catalog(&self) -> EnemyCatalog {
        let catalog = EnemyCatalog::or_builtin(self.fetch_enemy_catalog().await);
        info!(enemies = catalog.len(), "enemy catalog ready");
        catalog
    }

    /// Hand an encounter's result to the backend
    pub async fn submit_combat_result(&self, summary: &CombatSummary) -> Result<(), BackendError> {
        let url = format!(
            "{}/characters/{}/combat-results",
            self.base_url, summary.character_id
        );
        debug!("POST {}", url);

        let response = self
            .authorize(self.client.post(&url))
            .json(summary)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("backend rejected combat result: {} - {}", status, body);
            return Err(BackendError::Status { status, body });
        }

        info!(
            character = %summary.character_id,
            victory = summary.victory,
            xp = summary.xp_gained,
            "combat result submitted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_requires_url() {
        let settings = Settings::default();
        assert!(matches!(
            BackendClient::from_settings(&settings),
            Err(BackendError::NotConfigured)
        ));

        let settings = Settings {
            backend_url: Some(String::new()),
            ..Settings::default()
        };
        assert!(matches!(
            BackendClient::from_settings(&settings),
            Err(BackendError::NotConfigured)
        ));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let settings = Settings {
            backend_url: Some("http://localhost:5000/api/".to_string()),
            ..Settings::default()
        };
        let client = BackendClient::from_settings(&settings).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000/api");
    }

    #[tokio::test]
    async fn test_unreachable_backend_falls_back() {
        let client =
            BackendClient::new("http://127.0.0.1:1", None, Duration::from_millis(500)).unwrap();
        assert!(client.fetch_enemy_catalog().await.is_err());
        assert_eq!(client.load_enemy_catalog().await, EnemyCatalog::builtin());
    }
}
