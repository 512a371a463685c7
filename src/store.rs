//! In-memory sheet store
//!
//! Process-lifetime mapping from sheet id to the saved JSON content.
//! Nothing is evicted or persisted; the map lives as long as the `AppState`.

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Shared `id -> content` mapping, last write wins
#[derive(Debug, Default)]
pub struct SheetStore {
    sheets: RwLock<HashMap<String, Value>>,
}

impl SheetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `content` under `id`, returning the value it replaced
    pub async fn save(&self, id: String, content: Value) -> Option<Value> {
        self.sheets.write().await.insert(id, content)
    }

    /// Clone of the content saved under `id`
    pub async fn load(&self, id: &str) -> Option<Value> {
        self.sheets.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sheets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sheets.read().await.is_empty()
    }
}
