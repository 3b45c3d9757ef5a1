//! HTTP transport for the Protectorium REST API
//!
//! Returns wire types unchanged; see [`super::mappers`] for conversion into
//! domain values.

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::config::ClientConfig;
use super::error::{ClientError, Result};
use crate::api::types::{
    IncidentDetailResponse, IncidentListItem, PortfolioItem, ProofStatusResponse,
};
use crate::domain::{CompanyId, IncidentId};

/// Typed REST client
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build HTTP client: {e}")))?;

        let mut base = Url::parse(&config.base_url).map_err(|e| {
            ClientError::Configuration(format!("invalid base URL {:?}: {e}", config.base_url))
        })?;
        {
            let mut segments = base.path_segments_mut().map_err(|_| {
                ClientError::Configuration(format!(
                    "base URL {:?} cannot carry a path",
                    config.base_url
                ))
            })?;
            segments.pop_if_empty();
            segments.extend(config.prefix.split('/').filter(|s| !s.is_empty()));
        }

        Ok(Self { http, base })
    }

    /// Build an endpoint URL. Segments are percent-encoded.
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    // ========================================================================
    // Policyholder endpoints
    // ========================================================================

    pub async fn list_incidents(&self) -> Result<Vec<IncidentListItem>> {
        self.fetch_json(Method::GET, &["incidents"]).await
    }

    pub async fn incident_details(&self, incident_id: &IncidentId) -> Result<IncidentDetailResponse> {
        self.fetch_json(Method::GET, &["incident", incident_id.as_str()])
            .await
    }

    pub async fn generate_proof(&self, incident_id: &IncidentId) -> Result<ProofStatusResponse> {
        self.fetch_json(
            Method::POST,
            &["incident", incident_id.as_str(), "generate-proof"],
        )
        .await
    }

    // ========================================================================
    // Insurer endpoints
    // ========================================================================

    pub async fn portfolio(&self) -> Result<Vec<PortfolioItem>> {
        self.fetch_json(Method::GET, &["company", "incidents", "list"])
            .await
    }

    pub async fn company_incidents(&self, company_id: &CompanyId) -> Result<Vec<IncidentListItem>> {
        self.fetch_json(Method::GET, &["company", company_id.as_str(), "incidents"])
            .await
    }

    pub async fn company_incident_details(
        &self,
        company_id: &CompanyId,
        incident_id: &IncidentId,
    ) -> Result<IncidentDetailResponse> {
        self.fetch_json(
            Method::GET,
            &[
                "company",
                company_id.as_str(),
                "incident",
                incident_id.as_str(),
            ],
        )
        .await
    }

    pub async fn verify_proof(
        &self,
        company_id: &CompanyId,
        incident_id: &IncidentId,
    ) -> Result<ProofStatusResponse> {
        self.fetch_json(
            Method::POST,
            &[
                "company",
                company_id.as_str(),
                "incident",
                incident_id.as_str(),
                "verify",
            ],
        )
        .await
    }

    // ========================================================================
    // Transport
    // ========================================================================

    #[instrument(skip(self), fields(path = %segments.join("/")))]
    async fn fetch_json<T: DeserializeOwned>(&self, method: Method, segments: &[&str]) -> Result<T> {
        let url = self.url(segments);
        let response = self
            .http
            .request(method, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Response received");

        if !status.is_success() {
            return Err(error_from_body(
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                &body,
            ));
        }

        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Error body shapes the backend (or a proxy in front of it) may send
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Structured { error: StructuredError },
    Message { error: String },
    Detail { detail: String },
}

#[derive(Deserialize)]
struct StructuredError {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// Turn a non-2xx response into [`ClientError::Api`]
pub(crate) fn error_from_body(status: u16, status_text: &str, body: &[u8]) -> ClientError {
    let (code, message) = match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody::Structured { error }) => (error.code, error.message),
        Ok(ErrorBody::Message { error }) => (None, error),
        Ok(ErrorBody::Detail { detail }) => (None, detail),
        Err(_) => (None, format!("API request failed: {status_text}")),
    };

    ClientError::Api {
        status,
        status_text: status_text.to_string(),
        code,
        message,
    }
}
