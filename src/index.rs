// SPDX-License-Identifier: MPL-2.0

//! Write-only sink for the semantic index.

use crate::config::{HTTP_TIMEOUT_SECS, USER_AGENT};
use crate::context::{CONTEXT_DOCUMENT_TYPE, ContextDocument};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("network error: {0}")]
    Network(String),
    #[error("index rejected document with status {0}")]
    Rejected(u16),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Accepts context documents for later similarity search. Nothing is read
/// back; callers treat a failed submit as lost enrichment, not as an error.
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    async fn submit(&self, document: &ContextDocument) -> Result<(), IndexError>;
}

/// Used when no index endpoint is configured.
pub struct NoopSemanticIndex;

#[async_trait]
impl SemanticIndex for NoopSemanticIndex {
    async fn submit(&self, document: &ContextDocument) -> Result<(), IndexError> {
        debug!(resource_id = %document.resource_id, "no semantic index configured");
        Ok(())
    }
}

/// Request body for the index's add-documents endpoint.
#[derive(Debug, Serialize)]
struct AddDocuments<'a> {
    documents: [IndexDocument<'a>; 1],
}

#[derive(Debug, Serialize)]
struct IndexDocument<'a> {
    /// The context document as JSON text.
    content: String,
    metadata: IndexMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct IndexMetadata<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    resource_id: &'a str,
}

/// Posts documents to an HTTP index endpoint.
pub struct HttpSemanticIndex {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpSemanticIndex {
    pub fn new(endpoint: &str) -> Result<Self, IndexError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IndexError::Network(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }
}

fn request_body(document: &ContextDocument) -> Result<AddDocuments<'_>, IndexError> {
    Ok(AddDocuments {
        documents: [IndexDocument {
            content: document.to_json()?,
            metadata: IndexMetadata {
                kind: CONTEXT_DOCUMENT_TYPE,
                resource_id: &document.resource_id,
            },
        }],
    })
}

#[async_trait]
impl SemanticIndex for HttpSemanticIndex {
    async fn submit(&self, document: &ContextDocument) -> Result<(), IndexError> {
        let body = request_body(document)?;
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::Rejected(status.as_u16()));
        }
        debug!(resource_id = %document.resource_id, "submitted to semantic index");
        Ok(())
    }
}
