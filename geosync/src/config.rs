//! Sync session configuration.

use crate::service::TrustPolicy;
use crate::store::LayerOrder;
use std::time::Duration;

/// Default export status poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default overall download job deadline.
///
/// Snapshot generation can take minutes for large extents; the server
/// gives no guidance, so the deadline is a client policy.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(300);

/// Default per-request HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a sync session.
///
/// # Example
///
/// ```
/// use geosync::config::SyncConfig;
/// use std::time::Duration;
///
/// let config = SyncConfig::new()
///     .with_poll_interval(Duration::from_millis(250))
///     .with_job_timeout(Duration::from_secs(600));
/// assert_eq!(config.poll_interval(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    poll_interval: Duration,
    job_timeout: Duration,
    http_timeout: Duration,
    include_attachments: bool,
    layer_order: LayerOrder,
    trust_policy: TrustPolicy,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the export status poll interval. Default: 500 ms.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the overall job deadline. Default: 300 s.
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Sets the per-request HTTP timeout. Default: 30 s.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Overrides the attachment-exclusion policy. Default: false.
    ///
    /// Attachments are excluded by default to keep snapshots small.
    pub fn with_include_attachments(mut self, include: bool) -> Self {
        self.include_attachments = include;
        self
    }

    /// Sets the layer presentation order. Default: reverse declared.
    pub fn with_layer_order(mut self, order: LayerOrder) -> Self {
        self.layer_order = order;
        self
    }

    /// Sets the certificate trust policy. Default: strict validation.
    pub fn with_trust_policy(mut self, policy: TrustPolicy) -> Self {
        self.trust_policy = policy;
        self
    }

    /// Export status poll interval.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Overall job deadline.
    pub fn job_timeout(&self) -> Duration {
        self.job_timeout
    }

    /// Per-request HTTP timeout.
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    /// Whether snapshots include feature attachments.
    pub fn include_attachments(&self) -> bool {
        self.include_attachments
    }

    /// Layer presentation order.
    pub fn layer_order(&self) -> LayerOrder {
        self.layer_order
    }

    /// Certificate trust policy.
    pub fn trust_policy(&self) -> TrustPolicy {
        self.trust_policy
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            job_timeout: DEFAULT_JOB_TIMEOUT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            include_attachments: false,
            layer_order: LayerOrder::default(),
            trust_policy: TrustPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.poll_interval(), DEFAULT_POLL_INTERVAL);
        assert_eq!(config.job_timeout(), DEFAULT_JOB_TIMEOUT);
        assert_eq!(config.http_timeout(), DEFAULT_HTTP_TIMEOUT);
        assert!(!config.include_attachments());
        assert_eq!(config.layer_order(), LayerOrder::ReverseDeclared);
        assert_eq!(config.trust_policy(), TrustPolicy::Strict);
    }

    #[test]
    fn test_builder_chain() {
        let config = SyncConfig::new()
            .with_poll_interval(Duration::from_millis(100))
            .with_job_timeout(Duration::from_secs(60))
            .with_layer_order(LayerOrder::Declared)
            .with_trust_policy(TrustPolicy::TrustAnyHost);

        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.job_timeout(), Duration::from_secs(60));
        assert_eq!(config.layer_order(), LayerOrder::Declared);
        assert_eq!(config.trust_policy(), TrustPolicy::TrustAnyHost);
        // Untouched fields keep defaults.
        assert_eq!(config.http_timeout(), DEFAULT_HTTP_TIMEOUT);
    }

    #[test]
    fn test_copy_semantics() {
        let a = SyncConfig::new().with_job_timeout(Duration::from_secs(10));
        let b = a;
        assert_eq!(a, b);
    }
}
