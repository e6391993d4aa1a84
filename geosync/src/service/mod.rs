//! Remote feature service: transport, data model, and REST client.
//!
//! The feature service is an external collaborator: it exposes a
//! descriptor with layer metadata, a parameter-negotiation endpoint,
//! and a long-running export job that produces a downloadable
//! geodatabase snapshot. Nothing in this module reimplements the
//! server; it only speaks its HTTP surface.

mod client;
mod http;
mod types;

pub use client::{ExportError, FeatureServiceClient, NegotiationError};
pub use http::{mock::MockHttpClient, AsyncHttpClient, ReqwestClient, TransportError, TrustPolicy};
pub use types::{
    ExportJobId, ExportState, ExportStatus, FeatureServiceDescriptor, LayerInfo,
    SnapshotParameters,
};
