// SPDX-License-Identifier: MPL-2.0

//! Maps Graph feed entries onto the canonical [`Post`].

use crate::graph::types::{Post, RawAttachment, RawPost, RawSummaryEdge};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Attachment type Graph uses for natively hosted video.
const VIDEO_INLINE: &str = "video_inline";

/// Graph's own timestamp shape: RFC 3339 except the offset has no colon.
const GRAPH_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// A feed entry that cannot become a [`Post`]. Carries the offending record
/// so the caller can log it, skip it, or abort the batch.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("malformed post {id}: {reason}", id = .raw.id.as_deref().unwrap_or("<no id>"))]
pub struct NormalizeError {
    pub reason: String,
    pub raw: Box<RawPost>,
}

impl NormalizeError {
    fn new(raw: &RawPost, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            raw: Box::new(raw.clone()),
        }
    }
}

/// Normalize one raw feed entry belonging to `resource_id`.
///
/// Only the first attachment is consulted. Engagement counts default to zero
/// when Graph omits the summaries. A missing id or creation time is an error;
/// no substitute value is invented.
pub fn normalize(raw: &RawPost, resource_id: &str) -> Result<Post, NormalizeError> {
    let id = raw
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| NormalizeError::new(raw, "missing id"))?;

    let created_raw = raw
        .created_time
        .as_deref()
        .ok_or_else(|| NormalizeError::new(raw, "missing created_time"))?;
    let created_time = parse_graph_time(created_raw)
        .ok_or_else(|| NormalizeError::new(raw, format!("unparseable created_time {created_raw:?}")))?;

    let summary_total = |edge: &Option<RawSummaryEdge>| {
        edge.as_ref()
            .and_then(|e| e.summary.as_ref())
            .and_then(|s| s.total_count)
            .unwrap_or(0)
    };

    let mut post = Post {
        id,
        resource_id: resource_id.to_string(),
        message: raw.message.clone(),
        created_time,
        kind: raw.kind.clone(),
        permalink: raw.permalink_url.clone(),
        like_count: summary_total(&raw.likes),
        comment_count: summary_total(&raw.comments),
        share_count: raw.shares.as_ref().and_then(|s| s.count).unwrap_or(0),
        image_urls: Vec::new(),
        video_url: None,
        link_url: None,
        link_title: None,
        link_description: None,
    };

    if let Some(attachment) = raw.attachments.as_ref().and_then(|a| a.data.first()) {
        apply_attachment(&mut post, attachment);
    }

    Ok(post)
}

fn apply_attachment(post: &mut Post, attachment: &RawAttachment) {
    if let Some(src) = attachment
        .media
        .as_ref()
        .and_then(|m| m.image.as_ref())
        .and_then(|i| i.src.clone())
    {
        post.image_urls.push(src);
    }

    if attachment.kind.as_deref() == Some(VIDEO_INLINE) {
        post.video_url = attachment.url.clone();
    } else if let Some(url) = &attachment.url {
        post.link_url = Some(url.clone());
    }

    post.link_title = attachment.title.clone();
    post.link_description = attachment.description.clone();
}

/// Accepts RFC 3339 as well as Graph's `+0000` offset form.
pub fn parse_graph_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, GRAPH_TIME_FORMAT))
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::{RawAttachments, RawImage, RawMedia, RawShares, RawSummary};
    use chrono::TimeZone;

    fn bare(id: &str) -> RawPost {
        RawPost {
            id: Some(id.to_string()),
            message: Some("hello".to_string()),
            created_time: Some("2024-03-01T10:00:00+0000".to_string()),
            ..Default::default()
        }
    }

    fn with_attachment(attachment: RawAttachment) -> RawPost {
        RawPost {
            attachments: Some(RawAttachments {
                data: vec![attachment],
            }),
            ..bare("p1")
        }
    }

    #[test]
    fn test_bare_post_has_empty_media_and_zero_counts() {
        let post = normalize(&bare("p1"), "page-1").unwrap();
        assert_eq!(post.id, "p1");
        assert_eq!(post.resource_id, "page-1");
        assert_eq!(post.message.as_deref(), Some("hello"));
        assert_eq!(
            post.created_time,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
        assert!(post.image_urls.is_empty());
        assert!(post.video_url.is_none());
        assert!(post.link_url.is_none());
        assert!(post.link_title.is_none());
        assert!(post.link_description.is_none());
        assert_eq!((post.like_count, post.comment_count, post.share_count), (0, 0, 0));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let raw = with_attachment(RawAttachment {
            kind: Some("share".to_string()),
            url: Some("https://example.com".to_string()),
            ..Default::default()
        });
        assert_eq!(normalize(&raw, "page-1"), normalize(&raw, "page-1"));
    }

    #[test]
    fn test_engagement_counts() {
        let raw = RawPost {
            likes: Some(RawSummaryEdge {
                summary: Some(RawSummary {
                    total_count: Some(12),
                }),
            }),
            comments: Some(RawSummaryEdge {
                summary: Some(RawSummary {
                    total_count: Some(3),
                }),
            }),
            shares: Some(RawShares { count: Some(1) }),
            ..bare("p1")
        };
        let post = normalize(&raw, "page-1").unwrap();
        assert_eq!((post.like_count, post.comment_count, post.share_count), (12, 3, 1));
    }

    #[test]
    fn test_photo_attachment() {
        let raw = with_attachment(RawAttachment {
            kind: Some("photo".to_string()),
            url: Some("https://facebook.com/photo/1".to_string()),
            title: Some("Launch".to_string()),
            media: Some(RawMedia {
                image: Some(RawImage {
                    src: Some("https://cdn.example/1.jpg".to_string()),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        });
        let post = normalize(&raw, "page-1").unwrap();
        assert_eq!(post.image_urls, vec!["https://cdn.example/1.jpg".to_string()]);
        assert_eq!(post.link_url.as_deref(), Some("https://facebook.com/photo/1"));
        assert_eq!(post.link_title.as_deref(), Some("Launch"));
        assert!(post.video_url.is_none());
    }

    #[test]
    fn test_video_inline_attachment_sets_video_not_link() {
        let raw = with_attachment(RawAttachment {
            kind: Some("video_inline".to_string()),
            url: Some("https://facebook.com/video/9".to_string()),
            description: Some("clip".to_string()),
            ..Default::default()
        });
        let post = normalize(&raw, "page-1").unwrap();
        assert_eq!(post.video_url.as_deref(), Some("https://facebook.com/video/9"));
        assert!(post.link_url.is_none());
        assert_eq!(post.link_description.as_deref(), Some("clip"));
    }

    #[test]
    fn test_only_first_attachment_is_used() {
        let raw = RawPost {
            attachments: Some(RawAttachments {
                data: vec![
                    RawAttachment {
                        url: Some("https://first.example".to_string()),
                        ..Default::default()
                    },
                    RawAttachment {
                        kind: Some("video_inline".to_string()),
                        url: Some("https://second.example".to_string()),
                        ..Default::default()
                    },
                ],
            }),
            ..bare("p1")
        };
        let post = normalize(&raw, "page-1").unwrap();
        assert_eq!(post.link_url.as_deref(), Some("https://first.example"));
        assert!(post.video_url.is_none());
    }

    #[test]
    fn test_missing_created_time_is_error() {
        let raw = RawPost {
            created_time: None,
            ..bare("p1")
        };
        let err = normalize(&raw, "page-1").unwrap_err();
        assert_eq!(err.raw.id.as_deref(), Some("p1"));
        assert!(err.reason.contains("created_time"));
    }

    #[test]
    fn test_garbage_created_time_is_error() {
        let raw = RawPost {
            created_time: Some("yesterday".to_string()),
            ..bare("p1")
        };
        assert!(normalize(&raw, "page-1").is_err());
    }

    #[test]
    fn test_missing_id_is_error() {
        let raw = RawPost {
            id: None,
            ..bare("p1")
        };
        assert!(normalize(&raw, "page-1").is_err());
    }

    #[test]
    fn test_parse_graph_time_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(parse_graph_time("2024-03-01T10:00:00+0200"), Some(expected));
        assert_eq!(parse_graph_time("2024-03-01T08:00:00Z"), Some(expected));
        assert_eq!(parse_graph_time("2024-03-01"), None);
    }
}
