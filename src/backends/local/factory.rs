// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::handlers::*;
use crate::config::{HandlerMap, Topology};
use crate::traits::StageHandler;

/// Factory for creating local (in-process) stage handlers
pub struct LocalHandlerFactory;

impl LocalHandlerFactory {
    /// Create a handler by its registered name
    ///
    /// - "document_extraction" -> DocumentExtractionHandler
    /// - "block_standardization" -> BlockStandardizationHandler
    /// - "document_summary" -> DocumentSummaryHandler
    /// - "block_refinement" -> BlockRefinementHandler
    /// - "seed_questions" -> SeedQuestionsHandler
    /// - "feature_extraction" -> FeatureExtractionHandler
    pub fn create_handler(name: &str) -> Result<Arc<dyn StageHandler>, String> {
        match name {
            "document_extraction" => Ok(Arc::new(DocumentExtractionHandler::new())),
            "block_standardization" => Ok(Arc::new(BlockStandardizationHandler::new())),
            "document_summary" => Ok(Arc::new(DocumentSummaryHandler::new())),
            "block_refinement" => Ok(Arc::new(BlockRefinementHandler::new())),
            "seed_questions" => Ok(Arc::new(SeedQuestionsHandler::new())),
            "feature_extraction" => Ok(Arc::new(FeatureExtractionHandler::new())),
            _ => Err(format!("Unknown local handler implementation: '{}'", name)),
        }
    }

    /// List all available local handler implementations
    pub fn list_available_implementations() -> Vec<&'static str> {
        vec![
            "document_extraction",
            "block_standardization",
            "document_summary",
            "block_refinement",
            "seed_questions",
            "feature_extraction",
        ]
    }

    /// Check if an implementation is available
    pub fn is_implementation_available(name: &str) -> bool {
        Self::list_available_implementations().contains(&name)
    }

    /// Registry holding every local handler under its own name
    pub fn handler_map() -> HandlerMap {
        let mut handlers = HandlerMap::new();
        for name in Self::list_available_implementations() {
            if let Ok(handler) = Self::create_handler(name) {
                handlers.insert(name.to_string(), handler);
            }
        }
        handlers
    }

    /// Registry for the handlers a topology's enabled stages reference.
    ///
    /// Names with no local implementation are skipped; topology validation
    /// reports them.
    pub fn handlers_for(topology: &Topology) -> HandlerMap {
        let mut handlers = HandlerMap::new();
        for stage in topology.enabled_stages() {
            if let Ok(handler) = Self::create_handler(&stage.handler) {
                handlers.insert(stage.handler.clone(), handler);
            }
        }
        handlers
    }
}
