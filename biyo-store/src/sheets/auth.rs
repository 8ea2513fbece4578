//! Google service-account access tokens (JWT bearer grant).

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens are refreshed this many seconds before they expire.
const EXPIRY_SLACK_SECS: i64 = 60;
const ASSERTION_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

impl ServiceAccount {
    /// `private_key` may carry literal `\n` sequences, as it does when the
    /// PEM is pasted into a single-line environment variable.
    pub fn new(client_email: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            client_email: client_email.into(),
            private_key: private_key.into().replace("\\n", "\n"),
            token_uri: GOOGLE_TOKEN_URI.to_string(),
        }
    }

    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

struct CachedToken {
    token: String,
    expires_at: i64,
}

pub struct ServiceAccountAuth {
    account: ServiceAccount,
    scope: String,
    http: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(account: ServiceAccount, http: Client) -> Self {
        Self {
            account,
            scope: SHEETS_SCOPE.to_string(),
            http,
            cached: Mutex::new(None),
        }
    }

    /// Signed assertion for the token endpoint.
    pub(crate) fn assertion(&self, now: i64) -> StoreResult<String> {
        let claims = Claims {
            iss: &self.account.client_email,
            scope: &self.scope,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };

        let key = EncodingKey::from_rsa_pem(self.account.private_key.as_bytes())
            .map_err(|e| StoreError::auth(format!("invalid service account key: {e}")))?;

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| StoreError::auth(format!("signing assertion failed: {e}")))
    }

    pub async fn access_token(&self) -> StoreResult<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(c) = cached.as_ref() {
            if c.expires_at - EXPIRY_SLACK_SECS > now {
                return Ok(c.token.clone());
            }
        }

        let assertion = self.assertion(now)?;
        let res = self
            .http
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(StoreError::auth(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = res.json().await?;
        let expires_at = now + token.expires_in.unwrap_or(ASSERTION_TTL_SECS);
        debug!(email = %self.account.client_email, expires_at, "service account token refreshed");

        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }
}
