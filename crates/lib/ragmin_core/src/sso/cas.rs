//! CAS provider client.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info};
use url::Url;

use super::profile::CasProfile;
use super::{CALLBACK_PATH, PROVIDER_TIMEOUT_SECS, SsoError};

const DEFAULT_LOGOUT_URL: &str = "https://account.zime.edu.cn/cas/logout";
const DEFAULT_EMAIL_DOMAIN: &str = "zime.edu.cn";

/// Provider endpoints and client credentials.
#[derive(Debug, Clone, Default)]
pub struct CasConfig {
    pub authorize_url: String,
    pub access_token_url: String,
    pub profile_url: String,
    pub logout_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Domain appended to the user code to form the account email.
    pub email_domain: String,
}

impl CasConfig {
    /// `CAS_AUTHORIZE_URL`, `CAS_ACCESS_TOKEN_URL`, `CAS_PROFILE_URL`,
    /// `CAS_LOGOUT_URL`, `CAS_CLIENT_ID`, `CAS_CLIENT_SECRET`,
    /// `CAS_REDIRECT_URI` and `SSO_EMAIL_DOMAIN` (default `zime.edu.cn`).
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).unwrap_or_default();
        Self {
            authorize_url: var("CAS_AUTHORIZE_URL"),
            access_token_url: var("CAS_ACCESS_TOKEN_URL"),
            profile_url: var("CAS_PROFILE_URL"),
            logout_url: std::env::var("CAS_LOGOUT_URL")
                .unwrap_or_else(|_| DEFAULT_LOGOUT_URL.to_string()),
            client_id: var("CAS_CLIENT_ID"),
            client_secret: var("CAS_CLIENT_SECRET"),
            redirect_uri: var("CAS_REDIRECT_URI"),
            email_domain: std::env::var("SSO_EMAIL_DOMAIN")
                .unwrap_or_else(|_| DEFAULT_EMAIL_DOMAIN.to_string()),
        }
    }

    /// Where the browser is sent to start a login.
    pub fn authorization_url(&self) -> Result<String, SsoError> {
        Url::parse_with_params(
            &self.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ],
        )
        .map(String::from)
        .map_err(|e| SsoError::Config(format!("authorize URL: {e}")))
    }

    /// Provider logout URL, returning the browser to our site root.
    pub fn logout_redirect_url(&self) -> String {
        let service = self.redirect_uri.replace(CALLBACK_PATH, "");
        if service.is_empty() {
            return self.logout_url.clone();
        }
        match Url::parse_with_params(&self.logout_url, &[("service", service.as_str())]) {
            Ok(url) => url.into(),
            Err(_) => format!("{}?service={service}", self.logout_url),
        }
    }
}

/// Interpret a token endpoint body.
pub fn parse_token_response(body: &Value) -> Result<String, SsoError> {
    if body.get("errorcode").is_some() {
        let message = body
            .get("errormsg")
            .and_then(Value::as_str)
            .unwrap_or("Token exchange failed");
        return Err(SsoError::TokenRejected(message.to_string()));
    }
    body.get("access_token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or(SsoError::MissingAccessToken)
}

/// HTTP client for the provider. One attempt per call, no retries.
#[derive(Debug, Clone)]
pub struct CasClient {
    http: reqwest::Client,
    config: CasConfig,
}

impl CasClient {
    pub fn new(config: CasConfig) -> Result<Self, SsoError> {
        Self::with_timeout(config, Duration::from_secs(PROVIDER_TIMEOUT_SECS))
    }

    /// Client whose provider calls give up after `timeout`.
    pub fn with_timeout(config: CasConfig, timeout: Duration) -> Result<Self, SsoError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SsoError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &CasConfig {
        &self.config
    }

    /// Trade an authorization code for a provider access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, SsoError> {
        let body = self
            .get_json(
                &self.config.access_token_url,
                &[
                    ("client_id", self.config.client_id.as_str()),
                    ("client_secret", self.config.client_secret.as_str()),
                    ("code", code),
                    ("redirect_uri", self.config.redirect_uri.as_str()),
                ],
            )
            .await
            .map_err(|detail| {
                error!(%detail, "CAS token exchange failed");
                SsoError::TokenExchange { detail }
            })?;

        parse_token_response(&body).inspect_err(|e| {
            error!(error = %e, "CAS token exchange rejected");
        })
    }

    /// Fetch and normalize the profile behind a provider access token.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<CasProfile, SsoError> {
        let body = self
            .get_json(&self.config.profile_url, &[("access_token", access_token)])
            .await
            .map_err(|detail| SsoError::ProfileFetch { detail })?;
        debug!(response = %body, "CAS profile response");

        let profile = CasProfile::from_payload(&body).inspect_err(|e| {
            if let SsoError::ProfileFetch { detail } = e {
                error!(%detail, "CAS user info fetch failed");
            }
        })?;
        info!(
            id = ?profile.id,
            code = ?profile.code(),
            department = ?profile.department(),
            "Parsed CAS profile"
        );
        Ok(profile)
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, String> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;
        resp.json::<Value>()
            .await
            .map_err(|e| format!("response parse error: {e}"))
    }
}
