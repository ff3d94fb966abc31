// Net2 HTTP client
//
// Wraps `reqwest::Client` with bearer-token auth, URL construction and
// response decoding. Endpoint groups (users, doors, access) are inherent
// methods implemented in their own files; this module only deals with
// transport mechanics and the one-shot re-authentication on 401.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{Credentials, TokenState};
use crate::error::Error;
use crate::transport::TransportConfig;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Authenticated HTTP client for one Net2 server.
///
/// Every request carries the current bearer token. A 401 triggers exactly
/// one token renewal and one retry of the same request; a second 401 is
/// reported as [`Error::Authentication`].
pub struct Net2Client {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    token: Mutex<TokenState>,
}

impl Net2Client {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the server root, e.g. `https://10.0.0.5:8443`.
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, credentials))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: Credentials) -> Self {
        Self {
            http,
            base_url,
            credentials,
            token: Mutex::new(TokenState::default()),
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub(crate) fn token_state(&self) -> &Mutex<TokenState> {
        &self.token
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for a server-relative path such as `api/v1/doors`.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Issue an authenticated request and return the raw response.
    ///
    /// Non-success statuses other than 401 are returned to the caller
    /// untouched so endpoints can apply their own expectations.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<reqwest::Response, Error> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        // Serialized up front so the body can be replayed after renewal.
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| Error::Deserialization {
                message: format!("failed to encode request body: {e}"),
                body: String::new(),
            })?;

        debug!("{} {}", method, url);

        let (token, generation) = self.current_token().await?;
        let resp = self
            .send_once(&method, &url, payload.as_deref(), &token)
            .await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        warn!(%url, "request unauthorized, renewing token");
        let token = self.renew_token(generation).await?;
        let resp = self
            .send_once(&method, &url, payload.as_deref(), &token)
            .await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: format!("{method} {} still unauthorized after token renewal", url.path()),
            });
        }
        Ok(resp)
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        payload: Option<&[u8]>,
        token: &SecretString,
    ) -> Result<reqwest::Response, Error> {
        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(token.expose_secret())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        if let Some(bytes) = payload {
            builder = builder.body(bytes.to_vec());
        }
        builder.send().await.map_err(Error::Transport)
    }

    /// GET a path and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let resp = self
            .request::<()>(Method::GET, path, query, None)
            .await?;
        let resp = ensure_success(resp).await?;
        parse_json(resp).await
    }

    /// Send a command and require one of the `accepted` statuses.
    pub(crate) async fn send_command<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        accepted: &[StatusCode],
    ) -> Result<(), Error> {
        let resp = self.request(method, path, &[], Some(body)).await?;
        let status = resp.status();
        if accepted.contains(&status) {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message: preview(&body),
        })
    }
}

/// Map a non-success response to `Error::Api`.
pub(crate) async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        message: preview(&body),
    })
}

/// Decode a JSON body, keeping the raw text on failure.
pub(crate) async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = resp.text().await.map_err(Error::Transport)?;
    serde_json::from_str(&body).map_err(|e| {
        let preview = preview(&body);
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
