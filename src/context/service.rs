// SPDX-License-Identifier: MPL-2.0

use crate::config::DEFAULT_POST_LIMIT;
use crate::context::{ContextRecord, assemble};
use crate::graph::{ClientError, GraphClient, NormalizeError, Post, RawPost, ResourceMetadata, normalize};
use crate::index::SemanticIndex;
use crate::state::MalformedPostPolicy;
use crate::store::{ContextStore, Db, Session, SessionStore, StoreError};
use chrono::{Duration, Utc};
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("no valid session for user {0}")]
    Unauthorized(String),
    #[error("no delegated credential for resource {resource_id}; list resources first")]
    MissingDelegatedCredential { resource_id: String },
    #[error("post limit must be a positive integer")]
    InvalidPostLimit,
    #[error("a post needs a message or a link")]
    EmptyPost,
    #[error("external service unavailable: {0}")]
    ExternalService(#[from] ClientError),
    #[error(transparent)]
    MalformedExternalData(#[from] NormalizeError),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("failed to encode context: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Inbound request to build a context for one page.
#[derive(Debug, Clone, Default)]
pub struct CreateContextRequest {
    pub username: String,
    pub resource_id: String,
    /// Used when Graph reports no name for the page
    pub resource_name: Option<String>,
    /// Posts to fetch; the service default when `None`
    pub post_limit: Option<usize>,
}

/// Inbound request to publish a post on one page.
#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
    pub username: String,
    pub resource_id: String,
    pub message: String,
    /// Shared as the post's link attachment
    pub link: Option<String>,
}

/// Session handling plus the fetch, normalize, assemble, persist, forward
/// pipeline. Each call runs its steps strictly in sequence.
pub struct ContextService {
    db: Db,
    graph: GraphClient,
    index: Arc<dyn SemanticIndex>,
    default_post_limit: NonZeroUsize,
    malformed_posts: MalformedPostPolicy,
    session_ttl: Option<Duration>,
}

impl ContextService {
    pub fn new(db: Db, graph: GraphClient, index: Arc<dyn SemanticIndex>) -> Self {
        Self {
            db,
            graph,
            index,
            default_post_limit: NonZeroUsize::new(DEFAULT_POST_LIMIT).unwrap_or(NonZeroUsize::MIN),
            malformed_posts: MalformedPostPolicy::default(),
            session_ttl: None,
        }
    }

    pub fn with_default_post_limit(mut self, limit: NonZeroUsize) -> Self {
        self.default_post_limit = limit;
        self
    }

    pub fn with_malformed_post_policy(mut self, policy: MalformedPostPolicy) -> Self {
        self.malformed_posts = policy;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn create_session(
        &self,
        username: &str,
        primary_credential: &str,
    ) -> Result<Session, ContextError> {
        let session = SessionStore::new(&self.db)
            .with_ttl(self.session_ttl)
            .create_or_update(username, primary_credential)?;
        Ok(session)
    }

    pub fn validate_session(
        &self,
        username: &str,
        primary_credential: &str,
    ) -> Result<bool, ContextError> {
        Ok(SessionStore::new(&self.db).validate(username, primary_credential)?)
    }

    pub fn delete_session(&self, username: &str) -> Result<bool, ContextError> {
        info!(username, "deleting session");
        Ok(SessionStore::new(&self.db).delete(username)?)
    }

    /// Enumerate the pages the user's primary credential can act for and
    /// remember each page's delegated credential in the session.
    pub async fn list_delegated_resources(
        &self,
        username: &str,
    ) -> Result<Vec<ResourceMetadata>, ContextError> {
        info!(username, "listing delegated resources");
        let mut session = self.valid_session(username)?;
        let resources = self.graph.list_resources(&session.primary_credential).await?;

        let entries: Vec<(String, String)> = resources
            .iter()
            .filter_map(|r| Some((r.id.clone(), r.delegated_credential.clone()?)))
            .collect();
        SessionStore::new(&self.db).record_delegated_credentials(&mut session, entries)?;

        info!(username, count = resources.len(), "found delegated resources");
        Ok(resources)
    }

    /// Build, persist, and index the context for one page.
    ///
    /// The post limit, session, and delegated credential are all checked
    /// before any request leaves the process. An index failure is logged and
    /// otherwise ignored: the record is already saved by then.
    pub async fn create_context(
        &self,
        request: CreateContextRequest,
    ) -> Result<ContextRecord, ContextError> {
        let CreateContextRequest {
            username,
            resource_id,
            resource_name,
            post_limit,
        } = request;
        info!(username = %username, resource_id = %resource_id, "creating context");

        let limit = match post_limit {
            Some(n) => NonZeroUsize::new(n).ok_or(ContextError::InvalidPostLimit)?,
            None => self.default_post_limit,
        };
        let credential = self.delegated_credential(&username, &resource_id)?;

        let mut resource = self
            .graph
            .fetch_resource_metadata(&resource_id, &credential)
            .await?;
        // Records are keyed by the requested id, which may be an alias.
        if resource.id != resource_id {
            debug!(requested = %resource_id, reported = %resource.id, "graph reported a different page id");
            resource.id = resource_id.clone();
        }
        if resource.name.is_empty()
            && let Some(name) = resource_name
        {
            resource.name = name;
        }

        let raw_posts = self
            .graph
            .fetch_posts(&resource_id, &credential, limit)
            .await?;
        let posts = self.normalize_all(&raw_posts, &resource_id)?;

        let now = Utc::now();
        let (record, document) = assemble(&resource, &posts, &username, now)?;
        let record = ContextStore::new(&self.db).upsert(record, now)?;

        if let Err(e) = self.index.submit(&document).await {
            warn!(resource_id = %resource_id, "semantic index submission failed: {e}");
        }

        info!(
            id = record.id.as_deref().unwrap_or_default(),
            posts = record.posts_count,
            "context saved"
        );
        Ok(record)
    }

    /// Publish a post to a page with the page's delegated credential.
    ///
    /// Needs the same valid session and delegated credential as
    /// [`Self::create_context`]; both are checked before any request is made.
    pub async fn publish_post(&self, request: PublishRequest) -> Result<Post, ContextError> {
        let PublishRequest {
            username,
            resource_id,
            message,
            link,
        } = request;
        info!(username = %username, resource_id = %resource_id, "publishing post");

        if message.trim().is_empty() && link.is_none() {
            return Err(ContextError::EmptyPost);
        }
        let credential = self.delegated_credential(&username, &resource_id)?;

        let post = self
            .graph
            .publish_post(&resource_id, &credential, &message, link.as_deref())
            .await?;
        info!(post_id = %post.id, "post published");
        Ok(post)
    }

    pub fn get_context(&self, id: &str) -> Result<Option<ContextRecord>, ContextError> {
        Ok(ContextStore::new(&self.db).find_by_id(id)?)
    }

    pub fn context_for_resource(
        &self,
        username: &str,
        resource_id: &str,
    ) -> Result<Option<ContextRecord>, ContextError> {
        Ok(ContextStore::new(&self.db).find_by_resource_id_and_username(resource_id, username)?)
    }

    /// Every context the user has built; requires a valid session.
    pub fn contexts_for_user(&self, username: &str) -> Result<Vec<ContextRecord>, ContextError> {
        self.valid_session(username)?;
        Ok(ContextStore::new(&self.db).find_by_username(username)?)
    }

    fn valid_session(&self, username: &str) -> Result<Session, ContextError> {
        match SessionStore::new(&self.db).get_by_username(username)? {
            Some(session) if session.is_valid() => Ok(session),
            Some(_) => {
                warn!(username, "session expired");
                Err(ContextError::Unauthorized(username.to_string()))
            }
            None => {
                warn!(username, "session not found");
                Err(ContextError::Unauthorized(username.to_string()))
            }
        }
    }

    fn delegated_credential(&self, username: &str, resource_id: &str) -> Result<String, ContextError> {
        let session = self.valid_session(username)?;
        session
            .delegated_credential(resource_id)
            .map(str::to_string)
            .ok_or_else(|| {
                warn!(username, resource_id, "no delegated credential");
                ContextError::MissingDelegatedCredential {
                    resource_id: resource_id.to_string(),
                }
            })
    }

    fn normalize_all(&self, raw_posts: &[RawPost], resource_id: &str) -> Result<Vec<Post>, ContextError> {
        let mut posts = Vec::with_capacity(raw_posts.len());
        for raw in raw_posts {
            match normalize(raw, resource_id) {
                Ok(post) => posts.push(post),
                Err(e) if self.malformed_posts == MalformedPostPolicy::Skip => {
                    warn!(resource_id, "skipping post: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(posts)
    }
}
