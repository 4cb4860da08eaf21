//! Mock transport link for testing.
//!
//! Records activation requests and context updates, and allows forcing
//! failures. It never emits lifecycle events on its own; tests drive the
//! delegate callbacks directly.

use super::{LinkError, TransportLink};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tandem_sync_types::{ContextPayload, CounterpartStatus};

/// Mock transport link for testing.
///
/// Clones share state, so a test can keep a handle while the synchronizer
/// owns another.
#[derive(Debug, Default, Clone)]
pub struct MockLink {
    inner: Arc<Mutex<MockLinkInner>>,
}

#[derive(Debug, Default)]
struct MockLinkInner {
    activations: usize,
    sent_contexts: Vec<Vec<u8>>,
    counterpart: CounterpartStatus,
    fail_next_activate: Option<LinkError>,
    fail_next_update: Option<LinkError>,
}

impl MockLink {
    /// Create a mock link whose counterpart is not paired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock link with the given counterpart status.
    pub fn with_counterpart(counterpart: CounterpartStatus) -> Self {
        let link = Self::new();
        link.set_counterpart(counterpart);
        link
    }

    /// Change what `counterpart()` reports.
    pub fn set_counterpart(&self, counterpart: CounterpartStatus) {
        self.lock().counterpart = counterpart;
    }

    /// Number of `activate()` calls so far.
    pub fn activation_count(&self) -> usize {
        self.lock().activations
    }

    /// Raw payloads accepted by `update_context()`.
    pub fn sent_contexts(&self) -> Vec<Vec<u8>> {
        self.lock().sent_contexts.clone()
    }

    /// Decoded payloads accepted by `update_context()`.
    pub fn sent_payloads(&self) -> Vec<ContextPayload> {
        self.lock()
            .sent_contexts
            .iter()
            .filter_map(|bytes| ContextPayload::from_bytes(bytes).ok())
            .collect()
    }

    /// Number of context updates accepted so far.
    pub fn send_count(&self) -> usize {
        self.lock().sent_contexts.len()
    }

    /// Cause the next `activate()` to fail with the given error.
    pub fn fail_next_activate(&self, error: LinkError) {
        self.lock().fail_next_activate = Some(error);
    }

    /// Cause the next `update_context()` to fail with the given error.
    pub fn fail_next_update(&self, error: LinkError) {
        self.lock().fail_next_update = Some(error);
    }

    fn lock(&self) -> MutexGuard<'_, MockLinkInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TransportLink for MockLink {
    async fn activate(&self) -> Result<(), LinkError> {
        let mut inner = self.lock();
        inner.activations += 1;

        // Check for forced failure
        if let Some(error) = inner.fail_next_activate.take() {
            return Err(error);
        }
        Ok(())
    }

    async fn update_context(&self, payload: &[u8]) -> Result<(), LinkError> {
        let mut inner = self.lock();

        // Check for forced failure
        if let Some(error) = inner.fail_next_update.take() {
            return Err(error);
        }

        inner.sent_contexts.push(payload.to_vec());
        Ok(())
    }

    fn counterpart(&self) -> CounterpartStatus {
        self.lock().counterpart
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_link_records_activations() {
        let link = MockLink::new();
        link.activate().await.unwrap();
        link.activate().await.unwrap();
        assert_eq!(link.activation_count(), 2);
    }

    #[tokio::test]
    async fn mock_link_records_payloads() {
        let link = MockLink::new();
        let bytes = ContextPayload::raw(12).to_bytes().unwrap();
        link.update_context(&bytes).await.unwrap();

        assert_eq!(link.send_count(), 1);
        assert_eq!(link.sent_contexts(), vec![bytes]);
        assert_eq!(link.sent_payloads(), vec![ContextPayload::raw(12)]);
    }

    #[tokio::test]
    async fn forced_update_failure_applies_once() {
        let link = MockLink::new();
        link.fail_next_update(LinkError::CounterpartNotInstalled);

        let result = link.update_context(b"x").await;
        assert_eq!(result, Err(LinkError::CounterpartNotInstalled));
        assert_eq!(link.send_count(), 0);

        link.update_context(b"x").await.unwrap();
        assert_eq!(link.send_count(), 1);
    }

    #[tokio::test]
    async fn forced_activation_failure_still_counts() {
        let link = MockLink::new();
        link.fail_next_activate(LinkError::ActivationFailed("unsupported".into()));
        assert!(link.activate().await.is_err());
        assert_eq!(link.activation_count(), 1);
    }

    #[test]
    fn clone_shares_state() {
        let link = MockLink::new();
        let other = link.clone();
        other.set_counterpart(CounterpartStatus::available());
        assert_eq!(link.counterpart(), CounterpartStatus::available());
    }
}
