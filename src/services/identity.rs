use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::core::config::Settings;

#[derive(Debug, Error)]
pub(crate) enum IdentityError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub(crate) struct SignIn {
    pub(crate) user_id: String,
    pub(crate) access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SessionPayload {
    access_token: String,
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default, alias = "error_description", alias = "message")]
    msg: Option<String>,
}

/// Client for the hosted identity provider's auth API. Password storage and token issuance
/// happen there; this service only creates accounts and exchanges credentials for tokens.
#[derive(Debug, Clone)]
pub(crate) struct IdentityClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: String,
}

impl IdentityClient {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let identity = settings.identity();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(identity.request_timeout_seconds))
            .build()
            .context("Failed to build identity provider HTTP client")?;

        Ok(Self {
            client,
            base_url: format!("{}/auth/v1", identity.url.trim_end_matches('/')),
            anon_key: identity.anon_key.clone(),
            service_role_key: identity.service_role_key.clone(),
        })
    }

    /// Creates a confirmed account and returns its user id.
    pub(crate) async fn create_user(&self, email: &str, password: &str) -> Result<String, IdentityError> {
        let response = self
            .client
            .post(format!("{}/admin/users", self.base_url))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .json(&json!({ "email": email, "password": password, "email_confirm": true }))
            .send()
            .await
            .context("Identity provider request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(status, response).await);
        }

        let user: UserPayload =
            response.json().await.context("Invalid identity provider user payload")?;
        Ok(user.id)
    }

    /// Removes an account created by `create_user`. An account that is already gone counts as
    /// removed.
    pub(crate) async fn delete_user(&self, user_id: &str) -> Result<(), IdentityError> {
        let response = self
            .client
            .delete(format!("{}/admin/users/{user_id}", self.base_url))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .send()
            .await
            .context("Identity provider request failed")?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(rejection(status, response).await)
    }

    pub(crate) async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError> {
        let response = self
            .client
            .post(format!("{}/token?grant_type=password", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .context("Identity provider request failed")?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(IdentityError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(rejection(status, response).await);
        }

        let session: SessionPayload =
            response.json().await.context("Invalid identity provider session payload")?;
        Ok(SignIn { user_id: session.user.id, access_token: session.access_token })
    }
}

async fn rejection(status: StatusCode, response: reqwest::Response) -> IdentityError {
    let detail = response
        .json::<ErrorPayload>()
        .await
        .ok()
        .and_then(|payload| payload.msg)
        .unwrap_or_else(|| status.to_string());

    if status.is_client_error() {
        IdentityError::Rejected(detail)
    } else {
        IdentityError::Upstream(anyhow::anyhow!("identity provider returned {status}: {detail}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn delete_user_calls_admin_endpoint() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let (url, fake) = test_support::spawn_fake_identity("u-created").await;
        let client =
            IdentityClient::from_settings(&test_support::settings_with_identity(&url)).expect("client");

        let user_id = client.create_user("new@mnsk.edu", "secret123").await.expect("created");
        client.delete_user(&user_id).await.expect("deleted");

        assert_eq!(fake.deleted(), vec!["u-created".to_string()]);
    }

    #[tokio::test]
    async fn unreachable_provider_is_upstream_error() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let settings = crate::core::config::Settings::load().expect("settings");
        let client = IdentityClient::from_settings(&settings).expect("client");

        let result = client.delete_user("u-1").await;

        assert!(matches!(result, Err(IdentityError::Upstream(_))));
    }

    #[test]
    fn error_payload_reads_any_message_field() {
        let payload: ErrorPayload =
            serde_json::from_str(r#"{"error_description":"Invalid login credentials"}"#).unwrap();
        assert_eq!(payload.msg.as_deref(), Some("Invalid login credentials"));

        let payload: ErrorPayload =
            serde_json::from_str(r#"{"msg":"A user with this email address has already been registered"}"#)
                .unwrap();
        assert!(payload.msg.unwrap().contains("already been registered"));
    }

    #[test]
    fn session_payload_extracts_user_and_token() {
        let session: SessionPayload = serde_json::from_str(
            r#"{"access_token":"abc","token_type":"bearer","user":{"id":"u-1","email":"a@b.c"}}"#,
        )
        .unwrap();
        assert_eq!(session.access_token, "abc");
        assert_eq!(session.user.id, "u-1");
    }
}
