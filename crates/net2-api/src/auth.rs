// OAuth2 token handling
//
// Net2 issues bearer tokens from `POST /api/v1/authorization/tokens` using a
// password grant scoped to `offline_access`. The client keeps one token per
// site and renews it when it expires or when the server answers 401.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::client::Net2Client;
use crate::error::Error;

const TOKEN_PATH: &str = "api/v1/authorization/tokens";

/// Credentials used to obtain a token for one site.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub username: String,
    pub password: SecretString,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// A bearer token and its expiry, if the server reported one.
#[derive(Debug, Clone)]
pub(crate) struct AccessToken {
    pub(crate) value: SecretString,
    pub(crate) expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    fn from_response(resp: TokenResponse) -> Self {
        // Renew a minute early so in-flight requests don't race the expiry.
        let expires_at = resp
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(60));
        Self {
            value: SecretString::from(resp.access_token),
            expires_at,
        }
    }

    pub(crate) fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

/// Token slot shared by all requests of one client.
///
/// `generation` increments on every renewal so that callers which saw the
/// same rejected token trigger a single renewal between them.
#[derive(Debug, Default)]
pub(crate) struct TokenState {
    pub(crate) access: Option<AccessToken>,
    pub(crate) generation: u64,
}

impl Net2Client {
    /// Request a fresh token from the token endpoint.
    pub(crate) async fn fetch_token(&self) -> Result<AccessToken, Error> {
        let url = self.url(TOKEN_PATH)?;
        debug!("requesting token at {}", url);

        let creds = self.credentials();
        let form = [
            ("username", creds.username.as_str()),
            ("password", creds.password.expose_secret()),
            ("grant_type", "password"),
            ("client_id", creds.client_id.as_str()),
            ("scope", "offline_access"),
        ];

        let resp = self
            .http()
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("token request failed (HTTP {status}): {body}"),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: format!("invalid token response: {e}"),
                body,
            })?;

        debug!("token issued");
        Ok(AccessToken::from_response(token))
    }

    /// Current token and its generation, fetching one if none is held or
    /// the held one has expired.
    pub(crate) async fn current_token(&self) -> Result<(SecretString, u64), Error> {
        let mut state = self.token_state().lock().await;
        match &state.access {
            Some(token) if !token.is_expired() => {}
            _ => {
                state.access = Some(self.fetch_token().await?);
                state.generation += 1;
            }
        }
        let value = state
            .access
            .as_ref()
            .map(|t| t.value.clone())
            .ok_or_else(|| Error::Authentication {
                message: "no token available".into(),
            })?;
        Ok((value, state.generation))
    }

    /// Replace a token the server rejected.
    ///
    /// If another caller already renewed past `stale_generation`, the newer
    /// token is returned without contacting the token endpoint again.
    pub(crate) async fn renew_token(
        &self,
        stale_generation: u64,
    ) -> Result<SecretString, Error> {
        let mut state = self.token_state().lock().await;
        if state.generation == stale_generation || state.access.is_none() {
            debug!(generation = stale_generation, "renewing rejected token");
            state.access = Some(self.fetch_token().await?);
            state.generation += 1;
        }
        state
            .access
            .as_ref()
            .map(|t| t.value.clone())
            .ok_or_else(|| Error::Authentication {
                message: "no token available".into(),
            })
    }

    /// Eagerly obtain a token, verifying the configured credentials.
    pub async fn authenticate(&self) -> Result<(), Error> {
        let token = self.fetch_token().await?;
        let mut state = self.token_state().lock().await;
        state.access = Some(token);
        state.generation += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_without_expiry_never_expires() {
        let token = AccessToken::from_response(TokenResponse {
            access_token: "abc".into(),
            expires_in: None,
        });
        assert!(!token.is_expired());
    }

    #[test]
    fn short_lived_token_is_renewed_early() {
        let token = AccessToken::from_response(TokenResponse {
            access_token: "abc".into(),
            expires_in: Some(30),
        });
        assert!(token.is_expired());
    }
}
