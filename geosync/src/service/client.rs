//! Feature service REST client and snapshot request builder.
//!
//! [`FeatureServiceClient`] talks to the remote feature service over a
//! pluggable [`AsyncHttpClient`]. It covers the three server surfaces
//! the sync flow needs:
//!
//! - the service descriptor (`GET {base}/descriptor`),
//! - parameter negotiation (`POST {base}/generate/defaults`),
//! - the long-running export job (`POST {base}/generate`, then
//!   `GET {base}/jobs/{id}/status` polls and
//!   `GET {base}/jobs/{id}/result` for the finished snapshot).

use super::http::{AsyncHttpClient, TransportError};
use super::types::{
    ExportJobId, ExportStatus, FeatureServiceDescriptor, SnapshotParameters,
};
use crate::extent::Extent;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Failure negotiating with the feature service before a job starts.
///
/// Recoverable: the caller may retry the whole sync attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NegotiationError {
    /// The round-trip itself failed.
    #[error("negotiation transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with something we could not parse.
    #[error("malformed server response: {0}")]
    Malformed(String),
}

/// Failure during the export job's server interaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// The request itself failed.
    #[error("export transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with something we could not parse.
    #[error("malformed export response: {0}")]
    Malformed(String),

    /// The server reported that snapshot generation failed.
    #[error("server-side generation failed: {0}")]
    Generation(String),
}

/// Wire shape of the server's negotiated defaults.
#[derive(Debug, Deserialize)]
struct GenerateDefaults {
    #[serde(rename = "layerIds")]
    layer_ids: Vec<u32>,
    #[serde(rename = "includeAttachments", default)]
    include_attachments: bool,
}

#[derive(Debug, Serialize)]
struct DefaultsRequest<'a> {
    extent: &'a Extent,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(rename = "jobId")]
    job_id: String,
}

/// Client for one remote feature service.
///
/// Holds the service base URL and the transport. Cloneable; all clones
/// share the transport.
#[derive(Clone)]
pub struct FeatureServiceClient<C> {
    base_url: String,
    http: C,
}

impl<C: AsyncHttpClient> FeatureServiceClient<C> {
    /// Creates a client for the service at `base_url`.
    ///
    /// A trailing slash on the URL is tolerated and stripped.
    pub fn new(base_url: impl Into<String>, http: C) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, http }
    }

    /// Returns the service base URL.
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Loads the service descriptor.
    ///
    /// Done once at session startup; the descriptor is read-only
    /// afterwards.
    pub async fn load_descriptor(&self) -> Result<FeatureServiceDescriptor, NegotiationError> {
        let url = format!("{}/descriptor", self.base_url);
        let body = self.http.get(&url).await?;
        let descriptor: FeatureServiceDescriptor = serde_json::from_slice(&body)
            .map_err(|e| NegotiationError::Malformed(e.to_string()))?;

        info!(
            service = %descriptor.name,
            layers = descriptor.layer_count(),
            "feature service descriptor loaded"
        );
        Ok(descriptor)
    }

    /// Negotiates snapshot parameters for the given extent.
    ///
    /// Round-trips to the server for its generation defaults, then
    /// applies client policy on top: every layer the server offered is
    /// kept, and attachments are excluded even when the server default
    /// would include them.
    pub async fn default_snapshot_parameters(
        &self,
        extent: Extent,
    ) -> Result<SnapshotParameters, NegotiationError> {
        let url = format!("{}/generate/defaults", self.base_url);
        let request = DefaultsRequest { extent: &extent };
        let body = serde_json::to_string(&request)
            .map_err(|e| NegotiationError::Malformed(e.to_string()))?;

        let response = self.http.post_json(&url, &body).await?;
        let defaults: GenerateDefaults = serde_json::from_slice(&response)
            .map_err(|e| NegotiationError::Malformed(e.to_string()))?;

        debug!(
            layers = defaults.layer_ids.len(),
            server_attachments = defaults.include_attachments,
            "snapshot defaults negotiated"
        );

        Ok(SnapshotParameters {
            extent,
            layer_ids: defaults.layer_ids,
            include_attachments: false,
        })
    }

    /// Submits a snapshot generation request.
    pub async fn begin_generate(
        &self,
        params: &SnapshotParameters,
    ) -> Result<ExportJobId, ExportError> {
        let url = format!("{}/generate", self.base_url);
        let body =
            serde_json::to_string(params).map_err(|e| ExportError::Malformed(e.to_string()))?;

        let response = self.http.post_json(&url, &body).await?;
        let generate: GenerateResponse = serde_json::from_slice(&response)
            .map_err(|e| ExportError::Malformed(e.to_string()))?;

        info!(job_id = %generate.job_id, extent = %params.extent, "export job started");
        Ok(ExportJobId(generate.job_id))
    }

    /// Polls the status of an export job.
    pub async fn export_status(&self, id: &ExportJobId) -> Result<ExportStatus, ExportError> {
        let url = format!("{}/jobs/{}/status", self.base_url, id.0);
        let body = self.http.get(&url).await?;
        serde_json::from_slice(&body).map_err(|e| ExportError::Malformed(e.to_string()))
    }

    /// Downloads the finished snapshot for an export job.
    pub async fn fetch_result(&self, id: &ExportJobId) -> Result<Vec<u8>, ExportError> {
        let url = format!("{}/jobs/{}/result", self.base_url, id.0);
        let bytes = self.http.get(&url).await?;
        debug!(job_id = %id, bytes = bytes.len(), "snapshot downloaded");
        Ok(bytes)
    }
}
