// SPDX-License-Identifier: MPL-2.0

//! The resource context document and the record it is persisted in.
//!
//! A [`ContextDocument`] serializes as:
//!
//! ```json
//! {
//!   "type": "resource_context",
//!   "resource_id": "123",
//!   "resource_name": "Acme Bakery",
//!   "category": "Bakery",
//!   "about": "Fresh bread daily",
//!   "description": null,
//!   "website": "https://acme.example",
//!   "posts": [
//!     {
//!       "id": "123_456",
//!       "resource_id": "123",
//!       "message": "Sourdough is back",
//!       "created_time": "2024-03-01T10:00:00Z",
//!       "image_urls": ["https://cdn.example/1.jpg"]
//!     }
//!   ]
//! }
//! ```
//!
//! `image_urls` is omitted when empty. Field order is fixed, so the same
//! inputs always produce byte-identical JSON.

use crate::graph::{Post, ResourceMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value of the `type` tag on every context document.
pub const CONTEXT_DOCUMENT_TYPE: &str = "resource_context";

/// Identity of a page plus a stable projection of its recent posts. Stored
/// as `ContextRecord::content` and submitted to the semantic index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "resource_context")]
pub struct ContextDocument {
    pub resource_id: String,
    pub resource_name: String,
    pub category: Option<String>,
    pub about: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub posts: Vec<PostSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: String,
    pub resource_id: String,
    pub message: Option<String>,
    pub created_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
}

impl From<&Post> for PostSummary {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.clone(),
            resource_id: post.resource_id.clone(),
            message: post.message.clone(),
            created_time: post.created_time,
            image_urls: post.image_urls.clone(),
        }
    }
}

impl ContextDocument {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Persisted context for one (resource, user) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    /// Assigned by the store on first save.
    pub id: Option<String>,
    pub resource_id: String,
    pub resource_name: String,
    pub username: String,
    /// JSON of the [`ContextDocument`].
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Post ids in fetch order.
    pub post_ids: Vec<String>,
    pub posts_count: usize,
}

impl ContextRecord {
    /// Parse `content` back into its document.
    pub fn document(&self) -> Result<ContextDocument, serde_json::Error> {
        serde_json::from_str(&self.content)
    }
}

/// Build the record and the index projection for `resource` from `posts`.
///
/// `updated_at` is left empty; the store sets it when the record is written.
pub fn assemble(
    resource: &ResourceMetadata,
    posts: &[Post],
    username: &str,
    now: DateTime<Utc>,
) -> Result<(ContextRecord, ContextDocument), serde_json::Error> {
    let document = ContextDocument {
        resource_id: resource.id.clone(),
        resource_name: resource.name.clone(),
        category: resource.category.clone(),
        about: resource.about.clone(),
        description: resource.description.clone(),
        website: resource.website.clone(),
        posts: posts.iter().map(PostSummary::from).collect(),
    };

    let post_ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
    let record = ContextRecord {
        id: None,
        resource_id: resource.id.clone(),
        resource_name: resource.name.clone(),
        username: username.to_string(),
        content: document.to_json()?,
        created_at: now,
        updated_at: None,
        posts_count: post_ids.len(),
        post_ids,
    };

    Ok((record, document))
}
