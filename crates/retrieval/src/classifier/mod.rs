//! Query classification: intent detection by a pluggable backend, then a
//! lookup in the [`LayerPolicy`] table.
//!
//! The backend only decides *what kind* of question this is. Which layers
//! that means, and how much each counts, is policy data owned here.

pub mod llm;
pub mod rules;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use recall_config::ClassifierConfig;
use recall_core::classification::{ClassificationResult, LayerPolicy, QueryType};
use recall_core::error::ClassificationError;
use tracing::{debug, info};

pub use llm::LlmBackend;
pub use rules::RuleBackend;

/// What a backend detected. `query_type: None` means it could not decide.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentVerdict {
    pub query_type: Option<QueryType>,
    pub confidence: f32,
    pub reasoning: String,
}

/// An intent-detection backend (local model, hosted API, rules).
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Establish whatever connection the backend needs. Called once.
    async fn init(&self) -> Result<(), ClassificationError>;

    async fn detect(&self, query: &str) -> Result<IntentVerdict, ClassificationError>;
}

pub struct QueryClassifier {
    backend: Arc<dyn ClassifierBackend>,
    policy: LayerPolicy,
    timeout: Duration,
    initialized: AtomicBool,
}

impl QueryClassifier {
    pub fn new(backend: Arc<dyn ClassifierBackend>, policy: LayerPolicy, timeout: Duration) -> Self {
        Self {
            backend,
            policy,
            timeout,
            initialized: AtomicBool::new(false),
        }
    }

    /// Build the configured backend. Does not call [`init`](Self::init).
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassificationError> {
        let backend: Arc<dyn ClassifierBackend> = match config.backend.as_str() {
            "rules" => Arc::new(RuleBackend::new()),
            "llm" => {
                let provider = recall_providers::build_from_config(config);
                Arc::new(LlmBackend::new(provider, &config.model).with_temperature(config.temperature))
            }
            other => {
                return Err(ClassificationError::InitFailed {
                    backend: other.to_string(),
                    reason: "unknown classifier backend (expected 'rules' or 'llm')".into(),
                });
            }
        };
        Ok(Self::new(backend, config.policy.clone(), config.timeout()))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn policy(&self) -> &LayerPolicy {
        &self.policy
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Connect the backend. Failure is returned to the caller, never retried.
    /// Calling it again after success is a no-op.
    pub async fn init(&self) -> Result<(), ClassificationError> {
        if self.is_initialized() {
            return Ok(());
        }

        match tokio::time::timeout(self.timeout, self.backend.init()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(ClassificationError::InitFailed {
                    backend: self.backend.name().to_string(),
                    reason: format!("init timed out after {}ms", self.timeout.as_millis()),
                });
            }
        }

        self.initialized.store(true, Ordering::Release);
        info!(backend = self.backend.name(), "Query classifier initialized");
        Ok(())
    }

    /// Classify `query`. Always yields at least one layer on success.
    pub async fn classify(&self, query: &str) -> Result<ClassificationResult, ClassificationError> {
        if !self.is_initialized() {
            return Err(ClassificationError::NotInitialized);
        }

        let verdict = tokio::time::timeout(self.timeout, self.backend.detect(query))
            .await
            .map_err(|_| ClassificationError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            })??;

        let result = self
            .policy
            .resolve(verdict.query_type, verdict.confidence, verdict.reasoning)?;

        debug!(
            backend = self.backend.name(),
            query_type = ?result.query_type,
            confidence = result.confidence,
            layers = ?result.layers,
            "Query classified"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for QueryClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClassifier")
            .field("backend", &self.backend.name())
            .field("timeout", &self.timeout)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FixedBackend, StalledBackend};
    use recall_core::classification::IntentRoute;
    use recall_core::layer::MemoryLayer;

    fn classifier(backend: impl ClassifierBackend + 'static) -> QueryClassifier {
        QueryClassifier::new(Arc::new(backend), LayerPolicy::default(), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn classify_before_init_fails() {
        let c = classifier(RuleBackend::new());
        let err = c.classify("continue the auth work").await.unwrap_err();
        assert!(matches!(err, ClassificationError::NotInitialized));
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let c = classifier(RuleBackend::new());
        c.init().await.unwrap();
        c.init().await.unwrap();
        assert!(c.is_initialized());
    }

    #[tokio::test]
    async fn init_failure_is_surfaced() {
        let c = classifier(FixedBackend::failing_init("model not pulled"));
        let err = c.init().await.unwrap_err();
        assert!(matches!(err, ClassificationError::InitFailed { .. }));
        assert!(!c.is_initialized());
    }

    #[tokio::test]
    async fn verdict_maps_through_policy() {
        let c = classifier(FixedBackend::new(Some(QueryType::Architectural), 0.9));
        c.init().await.unwrap();
        let result = c.classify("what imports auth").await.unwrap();
        assert_eq!(result.layers, vec![MemoryLayer::Graph, MemoryLayer::Vector]);
        assert_eq!(result.weight(MemoryLayer::Vector), 0.8);
    }

    #[tokio::test]
    async fn undecided_verdict_uses_fallback_route() {
        let c = classifier(FixedBackend::new(None, 0.1));
        c.init().await.unwrap();
        let result = c.classify("hmm").await.unwrap();
        assert!(result.is_fallback());
        assert!(!result.layers.is_empty());
    }

    #[tokio::test]
    async fn custom_policy_is_honoured() {
        let mut policy = LayerPolicy::default();
        policy.user = IntentRoute::new([(MemoryLayer::User, 0.6), (MemoryLayer::Session, 0.4)]);
        let c = QueryClassifier::new(
            Arc::new(FixedBackend::new(Some(QueryType::User), 0.9)),
            policy,
            Duration::from_millis(100),
        );
        c.init().await.unwrap();
        let result = c.classify("my preferred editor").await.unwrap();
        assert_eq!(result.layers, vec![MemoryLayer::User, MemoryLayer::Session]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let c = classifier(StalledBackend);
        c.init().await.unwrap();
        let err = c.classify("anything").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Timeout { timeout_ms: 100 }));
    }

    #[tokio::test]
    async fn backend_error_propagates() {
        let c = classifier(FixedBackend::failing_detect("connection refused"));
        c.init().await.unwrap();
        let err = c.classify("anything").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Backend(_)));
    }

    #[test]
    fn from_config_selects_backend() {
        let config = ClassifierConfig::default();
        assert_eq!(QueryClassifier::from_config(&config).unwrap().backend_name(), "rules");

        let config = ClassifierConfig {
            backend: "llm".into(),
            ..ClassifierConfig::default()
        };
        assert_eq!(QueryClassifier::from_config(&config).unwrap().backend_name(), "llm");

        let config = ClassifierConfig {
            backend: "magic".into(),
            ..ClassifierConfig::default()
        };
        assert!(QueryClassifier::from_config(&config).is_err());
    }
}
