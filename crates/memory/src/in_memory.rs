//! In-memory layer: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use recall_core::error::LayerError;
use recall_core::item::MemoryItem;
use recall_core::layer::{LayerSource, MemoryLayer};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::matching;

/// A layer that keeps its items in a Vec and answers by keyword match.
pub struct InMemoryLayer {
    layer: MemoryLayer,
    items: Arc<RwLock<Vec<MemoryItem>>>,
    limit: usize,
}

impl InMemoryLayer {
    pub fn new(layer: MemoryLayer) -> Self {
        Self {
            layer,
            items: Arc::new(RwLock::new(Vec::new())),
            limit: 50,
        }
    }

    /// Cap the number of items returned per query.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Add an item. Its layer is forced to this source's layer.
    pub async fn insert(&self, mut item: MemoryItem) {
        item.layer = self.layer;
        self.items.write().await.push(item);
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.items.write().await.clear();
    }
}

#[async_trait]
impl LayerSource for InMemoryLayer {
    fn layer(&self) -> MemoryLayer {
        self.layer
    }

    async fn query(&self, text: &str) -> Result<Vec<MemoryItem>, LayerError> {
        let items = self.items.read().await;
        Ok(matching::select(items.iter(), text, self.limit))
    }
}
