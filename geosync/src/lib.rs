//! GeoSync - Offline geodatabase sync for feature services
//!
//! This library downloads a region-scoped snapshot of a remote feature
//! service into a local geodatabase file and swaps a map between its
//! online layers and the downloaded offline layers.
//!
//! # High-Level API
//!
//! The [`orchestrator`] module drives the whole flow for a session:
//!
//! ```ignore
//! use geosync::config::SyncConfig;
//! use geosync::orchestrator::SyncOrchestrator;
//! use geosync::scratch::ScratchDirectory;
//! use geosync::service::{FeatureServiceClient, ReqwestClient, TrustPolicy};
//!
//! let config = SyncConfig::new();
//! let http = ReqwestClient::new(config.http_timeout(), TrustPolicy::Strict)?;
//! let client = FeatureServiceClient::new(service_url, http);
//! let scratch = ScratchDirectory::prepare(scratch_path)?;
//!
//! let orchestrator = SyncOrchestrator::new(client, scratch, config);
//! let mut handle = orchestrator.start_sync(&map).await?;
//! let outcome = handle.wait().await;
//! ```

pub mod config;
pub mod extent;
pub mod job;
pub mod map;
pub mod orchestrator;
pub mod scratch;
pub mod service;
pub mod store;

/// Version of the GeoSync library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
