// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::traits::StageHandler;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry mapping handler names to their implementations.
///
/// Stages reference handlers by name; the controller looks each one up here
/// when it wires the pipeline. Handlers are shared as `Arc<dyn StageHandler>`
/// across all of a stage's workers.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use stitch_pipeline::backends::local::DocumentSummaryHandler;
/// use stitch_pipeline::config::HandlerMap;
/// use stitch_pipeline::traits::StageHandler;
///
/// let mut handlers = HandlerMap::new();
/// let handler: Arc<dyn StageHandler> = Arc::new(DocumentSummaryHandler::new());
/// handlers.insert("document_summary".to_string(), handler);
///
/// assert!(handlers.contains_key("document_summary"));
/// assert_eq!(handlers.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct HandlerMap(pub HashMap<String, Arc<dyn StageHandler>>);

impl HandlerMap {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn insert(&mut self, name: String, handler: Arc<dyn StageHandler>) {
        self.0.insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn StageHandler>> {
        self.0.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, Arc<dyn StageHandler>>> for HandlerMap {
    fn from(map: HashMap<String, Arc<dyn StageHandler>>) -> Self {
        Self(map)
    }
}

impl std::fmt::Debug for HandlerMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.0.keys().collect();
        names.sort();
        f.debug_tuple("HandlerMap").field(&names).finish()
    }
}
