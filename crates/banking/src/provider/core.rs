//! Shared behavior every institution adapter is built on.
//!
//! `ProviderCore` owns the HTTP client, the request pacer and the
//! credential material for one adapter. It is the only path to the
//! network: transport failures (timeout, connection, non-2xx) are
//! classified into the standard taxonomy here, so no raw transport error
//! ever reaches an adapter's translation logic.

use std::sync::Arc;

use log::{debug, warn};
use reqwest::{Client, Method};

use crate::config::InstitutionSettings;
use crate::errors::{ErrorCode, ProviderError};
use crate::models::{Envelope, Institution, ProviderResult};
use crate::token::TokenStore;

use super::pacing::RequestPacer;

pub struct ProviderCore {
    institution: Institution,
    settings: InstitutionSettings,
    client: Client,
    tokens: Arc<dyn TokenStore>,
    pacer: RequestPacer,
}

impl ProviderCore {
    pub fn new(settings: InstitutionSettings, tokens: Arc<dyn TokenStore>) -> Self {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        let pacer = RequestPacer::new(&settings.rate_limit);

        Self {
            institution: settings.institution,
            settings,
            client,
            tokens,
            pacer,
        }
    }

    pub fn institution(&self) -> Institution {
        self.institution
    }

    pub fn settings(&self) -> &InstitutionSettings {
        &self.settings
    }

    pub fn is_configured(&self) -> bool {
        self.settings.credentials.is_configured()
    }

    /// Build the success branch of the envelope.
    pub fn success<T>(&self, payload: T) -> ProviderResult<T> {
        Ok(Envelope::new(self.institution, payload))
    }

    /// Build the failure branch of the envelope.
    pub fn failure<T>(&self, code: ErrorCode, message: impl Into<String>) -> ProviderResult<T> {
        Err(ProviderError::new(self.institution, code, message))
    }

    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, ProviderError> {
        self.authenticated_request(Method::GET, path, query, None)
            .await
    }

    pub async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        self.authenticated_request(Method::POST, path, &[], Some(body))
            .await
    }

    /// Perform an authenticated call against the institution's backend.
    ///
    /// Acquires the pacer, attaches the institution's headers plus the
    /// bearer token from the token store, enforces the hard timeout and
    /// maps every transport-level failure into the taxonomy.
    async fn authenticated_request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, ProviderError> {
        self.pacer.acquire().await;

        let url = format!("{}{}", self.settings.base_url, path);
        debug!("{} {} {}", self.institution, method, url);

        let mut request = self
            .client
            .request(method, &url)
            .timeout(self.settings.timeout)
            .header("Content-Type", "application/json");

        for (name, value) in self.settings.extra_headers {
            request = request.header(*name, *value);
        }

        let bearer = self
            .tokens
            .bearer_token()
            .or_else(|| self.settings.credentials.bearer_token.clone());
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        if let (Some(key), Some(secret)) = (
            &self.settings.credentials.api_key,
            &self.settings.credentials.api_secret,
        ) {
            request = request.header("X-API-Key", key).header("X-API-Secret", secret);
        }

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classify_transport(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            ProviderError::new(
                self.institution,
                ErrorCode::ConnectionError,
                format!("failed to read response body: {e}"),
            )
        })?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                ProviderError::new(
                    self.institution,
                    ErrorCode::UnknownError,
                    format!("backend returned an unparseable body: {e}"),
                )
            })
        } else {
            warn!("{} returned HTTP {status} for {path}", self.institution);
            let details = serde_json::from_str(&text).ok();
            Err(ProviderError::from_status(
                self.institution,
                status.as_u16(),
                details,
            ))
        }
    }

    /// Deserialize a backend body into the adapter's wire model.
    pub fn parse<T: serde::de::DeserializeOwned>(
        &self,
        body: serde_json::Value,
    ) -> Result<T, ProviderError> {
        serde_json::from_value(body).map_err(|e| {
            ProviderError::new(
                self.institution,
                ErrorCode::UnknownError,
                format!("unexpected response shape: {e}"),
            )
        })
    }

    fn classify_transport(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            return ProviderError::timeout(self.institution);
        }
        if error.is_connect() {
            return ProviderError::new(
                self.institution,
                ErrorCode::ConnectionError,
                format!("connection failed: {error}"),
            );
        }
        ProviderError::new(
            self.institution,
            ErrorCode::UnknownError,
            format!("transport error: {error}"),
        )
    }
}
