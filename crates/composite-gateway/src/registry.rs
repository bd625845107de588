//! Backend registry with lazy, exactly-once bootstrap

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use composite_core::{
    BackendStatus, CompositeResult, Connector, DescriptorSource, SupervisorSettings,
};

use crate::supervisor::Supervisor;

/// Ordered set of supervisors, one per enabled backend
///
/// Nothing is connected until [`ensure_ready`](Registry::ensure_ready) is
/// first awaited. Bootstrap then runs exactly once, even when many callers
/// race for it.
pub struct Registry {
    source: Arc<dyn DescriptorSource>,
    connector: Arc<dyn Connector>,
    settings: SupervisorSettings,
    supervisors: OnceCell<Vec<Arc<Supervisor>>>,
}

impl Registry {
    pub fn new(
        source: Arc<dyn DescriptorSource>,
        connector: Arc<dyn Connector>,
        settings: SupervisorSettings,
    ) -> Self {
        Self {
            source,
            connector,
            settings,
            supervisors: OnceCell::new(),
        }
    }

    /// Bootstrap on first call; later calls return the same supervisors.
    ///
    /// A failure to read descriptors leaves the registry uninitialized so a
    /// later call can retry. Individual backends failing to connect is not
    /// an error.
    pub async fn ensure_ready(&self) -> CompositeResult<&[Arc<Supervisor>]> {
        let supervisors = self
            .supervisors
            .get_or_try_init(|| self.bootstrap())
            .await?;
        Ok(supervisors.as_slice())
    }

    async fn bootstrap(&self) -> CompositeResult<Vec<Arc<Supervisor>>> {
        let descriptors = self.source.load_descriptors()?;

        let mut seen = HashSet::new();
        let mut supervisors = Vec::new();
        for descriptor in descriptors.iter().filter(|d| d.enabled) {
            if !seen.insert(descriptor.name.clone()) {
                warn!(backend = %descriptor.name, "Duplicate backend name, skipping");
                continue;
            }
            supervisors.push(Arc::new(Supervisor::new(
                descriptor,
                self.connector.clone(),
                self.settings,
            )));
        }

        info!(
            backends = supervisors.len(),
            disabled = descriptors.iter().filter(|d| !d.enabled).count(),
            "Starting backends"
        );

        let outcomes = join_all(supervisors.iter().map(|s| s.start())).await;
        let connected = outcomes.iter().filter(|ok| **ok).count();
        info!("Connected to {}/{} backends", connected, supervisors.len());

        Ok(supervisors)
    }

    pub fn is_initialized(&self) -> bool {
        self.supervisors.initialized()
    }

    /// Supervisors in declaration order; empty before bootstrap
    pub fn supervisors(&self) -> &[Arc<Supervisor>] {
        self.supervisors.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, name: &str) -> Option<Arc<Supervisor>> {
        self.supervisors().iter().find(|s| s.name() == name).cloned()
    }

    pub fn statuses(&self) -> Vec<BackendStatus> {
        self.supervisors().iter().map(|s| s.status()).collect()
    }

    /// Stop every supervisor concurrently
    pub async fn shutdown(&self) {
        let supervisors = self.supervisors();
        if supervisors.is_empty() {
            return;
        }
        info!(backends = supervisors.len(), "Stopping backends");
        join_all(supervisors.iter().map(|s| s.stop())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBackend, MockConnector};
    use composite_core::{BackendDescriptor, CompositeConfig, CompositeError};
    use std::time::Duration;

    fn registry(config: CompositeConfig, connector: &MockConnector) -> Registry {
        Registry::new(
            Arc::new(config),
            Arc::new(connector.clone()),
            SupervisorSettings {
                start_timeout_ms: 200,
                stop_grace_ms: 200,
            },
        )
    }

    struct FailingSource;

    impl DescriptorSource for FailingSource {
        fn load_descriptors(&self) -> CompositeResult<Vec<BackendDescriptor>> {
            Err(CompositeError::ConfigMissing("nothing here".into()))
        }
    }

    #[tokio::test]
    async fn nothing_connects_before_first_demand() {
        let connector = MockConnector::new().with_backend("http://a/sse", MockBackend::new());
        let reg = registry(
            CompositeConfig::with_backends(vec![BackendDescriptor::new("a", "http://a/sse")]),
            &connector,
        );

        assert!(!reg.is_initialized());
        assert!(reg.supervisors().is_empty());
        assert!(connector.connect_attempts().is_empty());
    }

    #[tokio::test]
    async fn concurrent_first_demand_bootstraps_once() {
        let connector = MockConnector::new().with_backend(
            "http://a/sse",
            MockBackend::new().with_connect_delay(Duration::from_millis(20)),
        );
        let reg = registry(
            CompositeConfig::with_backends(vec![BackendDescriptor::new("a", "http://a/sse")]),
            &connector,
        );

        let results = join_all((0..8).map(|_| reg.ensure_ready())).await;
        assert!(results.iter().all(|r| matches!(r, Ok(s) if s.len() == 1)));
        assert_eq!(connector.connect_attempts().len(), 1);
    }

    #[tokio::test]
    async fn source_failure_is_retried() {
        let connector = MockConnector::new();
        let reg = Registry::new(
            Arc::new(FailingSource),
            Arc::new(connector),
            SupervisorSettings::default(),
        );

        assert!(matches!(
            reg.ensure_ready().await,
            Err(CompositeError::ConfigMissing(_))
        ));
        assert!(!reg.is_initialized());
    }

    #[tokio::test]
    async fn duplicate_names_keep_first() {
        let connector = MockConnector::new()
            .with_backend("http://a/sse", MockBackend::new())
            .with_backend("http://b/sse", MockBackend::new());
        let reg = registry(
            CompositeConfig::with_backends(vec![
                BackendDescriptor::new("a", "http://a/sse"),
                BackendDescriptor::new("a", "http://b/sse").with_prefix("b"),
            ]),
            &connector,
        );

        let supervisors = reg.ensure_ready().await.unwrap();
        assert_eq!(supervisors.len(), 1);
        assert_eq!(reg.get("a").unwrap().url(), "http://a/sse");
        assert!(!connector.was_contacted("http://b/sse"));
    }

    #[tokio::test]
    async fn shutdown_stops_everything() {
        let connector = MockConnector::new()
            .with_backend("http://a/sse", MockBackend::new())
            .with_backend("http://b/sse", MockBackend::new());
        let reg = registry(
            CompositeConfig::with_backends(vec![
                BackendDescriptor::new("a", "http://a/sse"),
                BackendDescriptor::new("b", "http://b/sse"),
            ]),
            &connector,
        );
        reg.ensure_ready().await.unwrap();

        reg.shutdown().await;
        assert!(reg.statuses().iter().all(|s| !s.connected));
        assert_eq!(connector.closed_sessions("http://a/sse"), 1);
        assert_eq!(connector.closed_sessions("http://b/sse"), 1);
    }
}
