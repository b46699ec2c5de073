// SPDX-License-Identifier: MPL-2.0

use crate::graph::normalize::normalize;
use crate::graph::transport::GraphTransport;
use crate::graph::types::{GraphPage, Post, Published, RawPost, RawResource, ResourceMetadata};
use serde::de::DeserializeOwned;
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),
    #[error("graph api returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid graph url: {0}")]
    InvalidUrl(String),
}

/// Fields requested for every page object, single or enumerated.
const RESOURCE_FIELDS: &str =
    "id,name,category,access_token,picture,fan_count,about,description,website";

const POST_FIELDS: &str = "id,message,created_time,type,permalink_url,attachments,\
                           likes.summary(true),comments.summary(true),shares";

/// Graph refuses page sizes above this.
const MAX_PAGE_SIZE: usize = 100;

/// Graph API client. Owns no credentials; every call is given the token it
/// should act with.
pub struct GraphClient {
    transport: Arc<dyn GraphTransport>,
    /// Base URL including the API version segment.
    base_url: Url,
}

impl GraphClient {
    pub fn new(
        transport: Arc<dyn GraphTransport>,
        graph_url: &str,
        version: &str,
    ) -> Result<Self, ClientError> {
        let mut base_url =
            Url::parse(graph_url).map_err(|e| ClientError::InvalidUrl(format!("{graph_url}: {e}")))?;
        base_url
            .path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(graph_url.to_string()))?
            .pop_if_empty()
            .push(version);
        Ok(Self {
            transport,
            base_url,
        })
    }

    /// Fetch one page's identity snapshot with its delegated token.
    pub async fn fetch_resource_metadata(
        &self,
        resource_id: &str,
        credential: &str,
    ) -> Result<ResourceMetadata, ClientError> {
        info!(resource_id, "fetching resource metadata");
        let url = self.endpoint(&[resource_id], RESOURCE_FIELDS, credential, None)?;
        let raw: RawResource = self.get(&url).await?;
        Ok(raw.into())
    }

    /// Fetch up to `limit` feed entries, newest first.
    ///
    /// Stops as soon as `limit` entries are held: surplus items on the last
    /// page are dropped and no further page is requested. Returns fewer
    /// entries, without error, once Graph runs out of pages.
    pub async fn fetch_posts(
        &self,
        resource_id: &str,
        credential: &str,
        limit: NonZeroUsize,
    ) -> Result<Vec<RawPost>, ClientError> {
        let limit = limit.get();
        let mut posts: Vec<RawPost> = Vec::with_capacity(limit.min(MAX_PAGE_SIZE));
        let mut next = Some(self.endpoint(
            &[resource_id, "feed"],
            POST_FIELDS,
            credential,
            Some(page_size(limit)),
        )?);
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            let page: GraphPage<RawPost> = self.get(&url).await?;
            pages += 1;
            debug!(resource_id, page = pages, items = page.data.len(), "received feed page");

            if page.data.is_empty() {
                break;
            }

            let remaining = limit - posts.len();
            posts.extend(page.data.into_iter().take(remaining));
            if posts.len() >= limit {
                break;
            }

            next = match page.paging.and_then(|p| p.next) {
                Some(next_url) => Some(continuation(&next_url, limit - posts.len())?),
                None => None,
            };
        }

        info!(resource_id, count = posts.len(), pages, "fetched posts");
        Ok(posts)
    }

    /// Enumerate every page the primary token can act for, across all pages
    /// of the listing. No cap: an inventory is only useful when complete.
    pub async fn list_resources(
        &self,
        primary_credential: &str,
    ) -> Result<Vec<ResourceMetadata>, ClientError> {
        let mut resources = Vec::new();
        let mut next = Some(self.endpoint(
            &["me", "accounts"],
            RESOURCE_FIELDS,
            primary_credential,
            None,
        )?);

        while let Some(url) = next.take() {
            let page: GraphPage<RawResource> = self.get(&url).await?;
            if page.data.is_empty() {
                break;
            }
            resources.extend(page.data.into_iter().map(ResourceMetadata::from));

            next = match page.paging.and_then(|p| p.next) {
                Some(next_url) => Some(
                    Url::parse(&next_url)
                        .map_err(|e| ClientError::InvalidResponse(format!("paging.next: {e}")))?,
                ),
                None => None,
            };
        }

        info!(count = resources.len(), "listed delegated resources");
        Ok(resources)
    }

    /// Publish a text post, optionally sharing `link`, to the page's feed and
    /// return it as Graph now reports it.
    ///
    /// Graph answers a publish with the new id only, so the post is read back
    /// with the same fields a feed fetch uses.
    pub async fn publish_post(
        &self,
        resource_id: &str,
        credential: &str,
        message: &str,
        link: Option<&str>,
    ) -> Result<Post, ClientError> {
        info!(resource_id, with_link = link.is_some(), "publishing post");
        let url = self.path(&[resource_id, "feed"])?;
        let mut form = vec![("message", message)];
        if let Some(link) = link {
            form.push(("link", link));
        }
        form.push(("access_token", credential));

        let value = self.transport.post_form(&url, &form).await?;
        let published: Published = serde_json::from_value(value)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        debug!(resource_id, post_id = %published.id, "post published");

        let url = self.endpoint(&[published.id.as_str()], POST_FIELDS, credential, None)?;
        let raw: RawPost = self.get(&url).await?;
        normalize(&raw, resource_id).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    fn path(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn endpoint(
        &self,
        segments: &[&str],
        fields: &str,
        token: &str,
        limit: Option<usize>,
    ) -> Result<Url, ClientError> {
        let mut url = self.path(segments)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("fields", fields);
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
            query.append_pair("access_token", token);
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ClientError> {
        let value = self.transport.get_json(url).await?;
        serde_json::from_value(value).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

fn page_size(remaining: usize) -> usize {
    remaining.min(MAX_PAGE_SIZE)
}

/// Rewrite Graph's `paging.next` so the next page asks only for what is still needed.
fn continuation(next: &str, remaining: usize) -> Result<Url, ClientError> {
    let mut url =
        Url::parse(next).map_err(|e| ClientError::InvalidResponse(format!("paging.next: {e}")))?;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "limit")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("limit", &page_size(remaining).to_string());
    Ok(url)
}
