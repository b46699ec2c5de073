// SPDX-License-Identifier: MPL-2.0

use crate::store::{Db, StoreError};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A user's umbrella session: one primary credential plus the page tokens
/// it has been delegated so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub primary_credential: String,
    /// resource id -> delegated credential
    #[serde(skip_serializing)]
    pub delegated_credentials: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    /// `None` means the session never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires| now < expires)
    }

    pub fn delegated_credential(&self, resource_id: &str) -> Option<&str> {
        self.delegated_credentials.get(resource_id).map(String::as_str)
    }
}

/// Session persistence, keyed by username
pub struct SessionStore<'a> {
    db: &'a Db,
    ttl: Option<Duration>,
}

impl<'a> SessionStore<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db, ttl: None }
    }

    /// Sessions created from here on expire `ttl` after creation.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Create the session for `username`, or replace its primary credential
    /// and refresh `last_accessed_at`. Delegated credentials and expiry of an
    /// existing session are left alone.
    pub fn create_or_update(
        &self,
        username: &str,
        primary_credential: &str,
    ) -> Result<Session, StoreError> {
        info!(username, "creating or updating session");
        let conn = self.db.conn();
        let now = Utc::now();
        // A TTL past chrono's range means the session never expires.
        let expires_at = self.ttl.and_then(|ttl| now.checked_add_signed(ttl));

        conn.execute(
            r#"
            INSERT INTO sessions (
                id, username, primary_credential, created_at, last_accessed_at, expires_at
            ) VALUES (?1, ?2, ?3, ?4, ?4, ?5)
            ON CONFLICT(username) DO UPDATE SET
                primary_credential = excluded.primary_credential,
                last_accessed_at = excluded.last_accessed_at
            "#,
            params![
                uuid::Uuid::new_v4().to_string(),
                username,
                primary_credential,
                now,
                expires_at,
            ],
        )?;

        Self::load(&conn, "username", username)?.ok_or(StoreError::NotFound)
    }

    /// Get session by username
    pub fn get_by_username(&self, username: &str) -> Result<Option<Session>, StoreError> {
        debug!(username, "getting session");
        let conn = self.db.conn();
        Self::load(&conn, "username", username)
    }

    /// Get session by its primary credential
    pub fn get_by_primary_credential(
        &self,
        credential: &str,
    ) -> Result<Option<Session>, StoreError> {
        let conn = self.db.conn();
        Self::load(&conn, "primary_credential", credential)
    }

    /// Merge one delegated credential into the session.
    ///
    /// Each entry is its own row, so concurrent merges for different
    /// resources of the same user never overwrite each other.
    pub fn record_delegated_credential(
        &self,
        session: &mut Session,
        resource_id: &str,
        credential: &str,
    ) -> Result<(), StoreError> {
        self.record_delegated_credentials(
            session,
            [(resource_id.to_string(), credential.to_string())],
        )
    }

    /// Merge several delegated credentials in one transaction
    pub fn record_delegated_credentials(
        &self,
        session: &mut Session,
        entries: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), StoreError> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        let now = Utc::now();
        let mut recorded = Vec::new();

        for (resource_id, credential) in entries {
            tx.execute(
                r#"
                INSERT INTO delegated_credentials (session_id, resource_id, credential, recorded_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(session_id, resource_id) DO UPDATE SET
                    credential = excluded.credential,
                    recorded_at = excluded.recorded_at
                "#,
                params![session.id, resource_id, credential, now],
            )?;
            recorded.push((resource_id, credential));
        }

        tx.commit()?;
        debug!(username = %session.username, count = recorded.len(), "recorded delegated credentials");
        session.delegated_credentials.extend(recorded);
        Ok(())
    }

    /// True iff a session exists for `username`, has not expired, and holds
    /// `primary_credential`. A successful check refreshes `last_accessed_at`.
    pub fn validate(&self, username: &str, primary_credential: &str) -> Result<bool, StoreError> {
        debug!(username, "validating session");
        let conn = self.db.conn();
        let Some(session) = Self::load(&conn, "username", username)? else {
            return Ok(false);
        };

        let valid = session.is_valid() && session.primary_credential == primary_credential;
        if valid {
            Self::touch(&conn, &session.id)?;
        }
        Ok(valid)
    }

    /// Remove a session and everything delegated to it
    pub fn delete(&self, username: &str) -> Result<bool, StoreError> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM delegated_credentials WHERE session_id IN \
             (SELECT id FROM sessions WHERE username = ?)",
            [username],
        )?;
        let removed = tx.execute("DELETE FROM sessions WHERE username = ?", [username])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn touch(conn: &Connection, session_id: &str) -> Result<(), StoreError> {
        let updated = conn.execute(
            "UPDATE sessions SET last_accessed_at = ? WHERE id = ?",
            params![Utc::now(), session_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// `column` is one of our own key columns, never caller input.
    fn load(conn: &Connection, column: &str, value: &str) -> Result<Option<Session>, StoreError> {
        let query = format!(
            r#"
            SELECT id, username, primary_credential, created_at, last_accessed_at, expires_at
            FROM sessions
            WHERE {column} = ?
            LIMIT 1
            "#
        );

        let session = conn
            .query_row(&query, [value], |row| {
                Ok(Session {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    primary_credential: row.get(2)?,
                    delegated_credentials: BTreeMap::new(),
                    created_at: row.get(3)?,
                    last_accessed_at: row.get(4)?,
                    expires_at: row.get(5)?,
                })
            })
            .optional()?;

        let Some(mut session) = session else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT resource_id, credential FROM delegated_credentials WHERE session_id = ?",
        )?;
        let entries = stmt
            .query_map([&session.id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<BTreeMap<String, String>, _>>()?;
        session.delegated_credentials = entries;

        Ok(Some(session))
    }
}
