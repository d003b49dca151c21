//! Models and document engines offered by the AI gateway

use notebook_common::{Error, Result};
use serde::Serialize;

pub const DEFAULT_MODEL: &str = "anthropic/claude-3.7-sonnet";
pub const DEFAULT_ENGINE: &str = "pdf-text";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub capabilities: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EngineInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub best_for: &'static [&'static str],
}

const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "openai/gpt-4",
        name: "GPT-4",
        description: "Best for multimodal tasks and complex document processing",
        capabilities: &["multimodal", "complex-analysis", "detailed-summarization"],
    },
    ModelInfo {
        id: "anthropic/claude-3.7-sonnet",
        name: "Claude Sonnet 3.7",
        description: "Advanced reasoning and detailed content analysis",
        capabilities: &["reasoning", "content-analysis", "structured-output"],
    },
    ModelInfo {
        id: "google/gemini-2.5-flash-preview-05-20",
        name: "Gemini 2.5 Flash",
        description: "High performance in understanding and summarizing extensive documents",
        capabilities: &["document-understanding", "summarization", "key-points"],
    },
];

const ENGINES: &[EngineInfo] = &[
    EngineInfo {
        id: "pdf-text",
        name: "PDF Text Extractor",
        description: "For well-structured PDFs with clear text content",
        best_for: &["digital-pdfs", "text-based-content"],
    },
    EngineInfo {
        id: "mistral-ocr",
        name: "Mistral OCR",
        description: "For scanned documents or PDFs with images and complex layouts",
        best_for: &["scanned-documents", "image-based-content", "complex-layouts"],
    },
];

/// Static catalog of gateway models and engines
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelCatalog;

impl ModelCatalog {
    pub fn new() -> Self {
        Self
    }

    pub fn models(&self) -> &'static [ModelInfo] {
        MODELS
    }

    pub fn engines(&self) -> &'static [EngineInfo] {
        ENGINES
    }

    pub fn validate_model(&self, model: &str) -> Result<()> {
        if MODELS.iter().any(|m| m.id == model) {
            return Ok(());
        }
        let available: Vec<&str> = MODELS.iter().map(|m| m.id).collect();
        Err(Error::Validation(format!(
            "Invalid model. Available models: {}",
            available.join(", ")
        )))
    }

    pub fn validate_engine(&self, engine: &str) -> Result<()> {
        if ENGINES.iter().any(|e| e.id == engine) {
            return Ok(());
        }
        let available: Vec<&str> = ENGINES.iter().map(|e| e.id).collect();
        Err(Error::Validation(format!(
            "Invalid engine. Available engines: {}",
            available.join(", ")
        )))
    }
}
