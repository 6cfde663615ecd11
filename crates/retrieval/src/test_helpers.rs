//! Shared mocks for pipeline tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use recall_core::classification::QueryType;
use recall_core::error::{ClassificationError, LayerError, ProviderError};
use recall_core::item::MemoryItem;
use recall_core::layer::{LayerSource, MemoryLayer};
use recall_core::message::Message;
use recall_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

use crate::classifier::{ClassifierBackend, IntentVerdict};

// ── Layers ────────────────────────────────────────────────────────────────

/// Returns the same items for every query and counts calls.
pub struct StaticLayer {
    layer: MemoryLayer,
    items: Vec<MemoryItem>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StaticLayer {
    pub fn new(layer: MemoryLayer, texts: &[&str]) -> Self {
        Self {
            layer,
            items: texts.iter().map(|t| MemoryItem::new(layer, *t)).collect(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer only after `delay` (paused-clock friendly).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LayerSource for StaticLayer {
    fn layer(&self) -> MemoryLayer {
        self.layer
    }

    async fn query(&self, _text: &str) -> Result<Vec<MemoryItem>, LayerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.items.clone())
    }
}

/// Never answers. Records whether it was dropped mid-flight.
pub struct StalledLayer {
    layer: MemoryLayer,
    pub started: AtomicUsize,
    pub finished: AtomicUsize,
}

impl StalledLayer {
    pub fn new(layer: MemoryLayer) -> Self {
        Self {
            layer,
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LayerSource for StalledLayer {
    fn layer(&self) -> MemoryLayer {
        self.layer
    }

    async fn query(&self, _text: &str) -> Result<Vec<MemoryItem>, LayerError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Always errors.
pub struct FailingLayer {
    layer: MemoryLayer,
    reason: String,
}

impl FailingLayer {
    pub fn new(layer: MemoryLayer, reason: &str) -> Self {
        Self {
            layer,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LayerSource for FailingLayer {
    fn layer(&self) -> MemoryLayer {
        self.layer
    }

    async fn query(&self, _text: &str) -> Result<Vec<MemoryItem>, LayerError> {
        Err(LayerError::QueryFailed {
            layer: self.layer,
            reason: self.reason.clone(),
        })
    }
}

/// Panics inside the query future.
pub struct PanickingLayer(pub MemoryLayer);

#[async_trait]
impl LayerSource for PanickingLayer {
    fn layer(&self) -> MemoryLayer {
        self.0
    }

    async fn query(&self, _text: &str) -> Result<Vec<MemoryItem>, LayerError> {
        panic!("layer exploded");
    }
}

// ── Classifier backends ──────────────────────────────────────────────────

/// Always returns the same verdict, or a scripted failure.
pub struct FixedBackend {
    verdict: IntentVerdict,
    init_error: Option<String>,
    detect_error: Option<String>,
}

impl FixedBackend {
    pub fn new(query_type: Option<QueryType>, confidence: f32) -> Self {
        Self {
            verdict: IntentVerdict {
                query_type,
                confidence,
                reasoning: "fixed".into(),
            },
            init_error: None,
            detect_error: None,
        }
    }

    pub fn failing_init(reason: &str) -> Self {
        Self {
            init_error: Some(reason.into()),
            ..Self::new(None, 0.0)
        }
    }

    pub fn failing_detect(reason: &str) -> Self {
        Self {
            detect_error: Some(reason.into()),
            ..Self::new(None, 0.0)
        }
    }
}

#[async_trait]
impl ClassifierBackend for FixedBackend {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn init(&self) -> Result<(), ClassificationError> {
        match &self.init_error {
            Some(reason) => Err(ClassificationError::InitFailed {
                backend: "fixed".into(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn detect(&self, _query: &str) -> Result<IntentVerdict, ClassificationError> {
        match &self.detect_error {
            Some(reason) => Err(ProviderError::Network(reason.clone()).into()),
            None => Ok(self.verdict.clone()),
        }
    }
}

/// Initializes fine, then never answers.
pub struct StalledBackend;

#[async_trait]
impl ClassifierBackend for StalledBackend {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn init(&self) -> Result<(), ClassificationError> {
        Ok(())
    }

    async fn detect(&self, _query: &str) -> Result<IntentVerdict, ClassificationError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ClassificationError::Unparsable("unreachable".into()))
    }
}

// ── Providers ────────────────────────────────────────────────────────────

/// A provider returning scripted replies in order and recording requests.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedProvider {
    replies: Mutex<Vec<String>>,
    error: Option<ProviderError>,
    healthy: bool,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn replies(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
            error: None,
            healthy: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            error: Some(error),
            ..Self::replies(&[])
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::replies(&[])
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop()
            .expect("ScriptedProvider: no more replies");
        Ok(ProviderResponse {
            message: Message::assistant(reply),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(self.healthy)
    }
}
