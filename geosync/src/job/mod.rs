//! Asynchronous snapshot download jobs.
//!
//! A job is started through [`DownloadJob::start`] and observed and
//! controlled through its [`JobHandle`]. Status transitions follow
//! `Created → Running → {Succeeded | Failed | Canceled}`, with
//! `Running ↔ Paused` while the transfer can be suspended.

mod download;
mod error;
mod handle;
mod status;

pub use download::DownloadJob;
pub use error::SyncError;
pub use handle::{JobHandle, JobOutcome};
pub use status::JobStatus;
