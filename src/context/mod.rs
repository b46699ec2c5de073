// SPDX-License-Identifier: MPL-2.0

mod document;
mod service;

pub use document::{CONTEXT_DOCUMENT_TYPE, ContextDocument, ContextRecord, PostSummary, assemble};
pub use service::{ContextError, ContextService, CreateContextRequest, PublishRequest};
