// SPDX-License-Identifier: MPL-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of a Graph API connection (`/feed`, `/me/accounts`).
#[derive(Debug, Clone, Deserialize)]
pub struct GraphPage<T> {
    #[serde(default)]
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paging {
    /// Absolute URL of the following page; absent on the last page.
    #[serde(default)]
    pub next: Option<String>,
}

/// Graph error envelope returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorBody {
    pub error: GraphErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorDetail {
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
}

/// Reply to a publish call: only the new object's id.
#[derive(Debug, Clone, Deserialize)]
pub struct Published {
    pub id: String,
}

/// Page object as the Graph API returns it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub picture: Option<RawPicture>,
    #[serde(default)]
    pub fan_count: Option<u64>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPicture {
    #[serde(default)]
    pub data: Option<RawPictureData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPictureData {
    #[serde(default)]
    pub url: Option<String>,
}

/// Feed entry as the Graph API returns it. Nothing is required at this
/// layer; `graph::normalize` decides what a usable post needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub permalink_url: Option<String>,
    #[serde(default)]
    pub likes: Option<RawSummaryEdge>,
    #[serde(default)]
    pub comments: Option<RawSummaryEdge>,
    #[serde(default)]
    pub shares: Option<RawShares>,
    #[serde(default)]
    pub attachments: Option<RawAttachments>,
}

/// Edge requested with `.summary(true)`; only the total is read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSummaryEdge {
    #[serde(default)]
    pub summary: Option<RawSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSummary {
    #[serde(default)]
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawShares {
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAttachments {
    #[serde(default)]
    pub data: Vec<RawAttachment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAttachment {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub media: Option<RawMedia>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMedia {
    #[serde(default)]
    pub image: Option<RawImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawImage {
    #[serde(default)]
    pub src: Option<String>,
}

/// Snapshot of a page's identity, decoupled from the Graph wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    /// Page-scoped token; never rendered.
    #[serde(skip_serializing, default)]
    pub delegated_credential: Option<String>,
    pub picture_url: Option<String>,
    pub follower_count: Option<u64>,
    pub about: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
}

impl From<RawResource> for ResourceMetadata {
    fn from(raw: RawResource) -> Self {
        Self {
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            category: raw.category,
            delegated_credential: raw.access_token,
            picture_url: raw.picture.and_then(|p| p.data).and_then(|d| d.url),
            follower_count: raw.fan_count,
            about: raw.about,
            description: raw.description,
            website: raw.website,
        }
    }
}

/// Canonical post, whatever attachment shape it arrived with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub resource_id: String,
    pub message: Option<String>,
    pub created_time: DateTime<Utc>,
    /// photo, video, status, link, ...
    pub kind: Option<String>,
    pub permalink: Option<String>,
    pub like_count: u64,
    pub comment_count: u64,
    pub share_count: u64,
    pub image_urls: Vec<String>,
    pub video_url: Option<String>,
    pub link_url: Option<String>,
    pub link_title: Option<String>,
    pub link_description: Option<String>,
}
