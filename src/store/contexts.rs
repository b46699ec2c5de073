// SPDX-License-Identifier: MPL-2.0

use crate::context::ContextRecord;
use crate::store::{Db, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

const SELECT_COLUMNS: &str = r#"
    SELECT id, resource_id, resource_name, username, content,
           created_at, updated_at, post_ids_json, posts_count
    FROM contexts
"#;

/// Persistence for context records
pub struct ContextStore<'a> {
    db: &'a Db,
}

impl<'a> ContextStore<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Store a record as-is, assigning an id when it has none. A record that
    /// already has an id overwrites the stored row with that id.
    pub fn save(&self, record: ContextRecord) -> Result<ContextRecord, StoreError> {
        let conn = self.db.conn();
        let mut record = record;
        if record.id.is_none() {
            record.id = Some(uuid::Uuid::new_v4().to_string());
        }
        Self::write(&conn, &record)?;
        Ok(record)
    }

    /// Keep one record per (resource, user).
    ///
    /// On a hit the existing row is overwritten in place: its id and
    /// `created_at` survive and `updated_at` becomes `now`. On a miss the
    /// record is inserted with `updated_at == created_at`.
    pub fn upsert(
        &self,
        record: ContextRecord,
        now: DateTime<Utc>,
    ) -> Result<ContextRecord, StoreError> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        let mut record = record;

        let existing = tx
            .query_row(
                r#"
                SELECT id, created_at FROM contexts
                WHERE resource_id = ?1 AND username = ?2
                ORDER BY created_at ASC
                LIMIT 1
                "#,
                params![record.resource_id, record.username],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, DateTime<Utc>>(1)?)),
            )
            .optional()?;

        match existing {
            Some((id, created_at)) => {
                debug!(id = %id, resource_id = %record.resource_id, "overwriting context");
                record.id = Some(id);
                record.created_at = created_at;
                record.updated_at = Some(now);
            }
            None => {
                record.id = Some(uuid::Uuid::new_v4().to_string());
                record.updated_at = Some(record.created_at);
            }
        }

        Self::write(&tx, &record)?;
        tx.commit()?;
        Ok(record)
    }

    /// Get record by id
    pub fn find_by_id(&self, id: &str) -> Result<Option<ContextRecord>, StoreError> {
        let conn = self.db.conn();
        Self::query_one(&conn, "WHERE id = ?1", params![id])
    }

    /// Latest record for a resource, whichever user built it
    pub fn find_by_resource_id(
        &self,
        resource_id: &str,
    ) -> Result<Option<ContextRecord>, StoreError> {
        let conn = self.db.conn();
        Self::query_one(
            &conn,
            "WHERE resource_id = ?1 ORDER BY COALESCE(updated_at, created_at) DESC LIMIT 1",
            params![resource_id],
        )
    }

    /// All records built by a user, newest first
    pub fn find_by_username(&self, username: &str) -> Result<Vec<ContextRecord>, StoreError> {
        let conn = self.db.conn();
        let query = format!("{SELECT_COLUMNS} WHERE username = ?1 ORDER BY created_at DESC");
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map([username], Self::read_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(Self::finish(row?)?);
        }
        Ok(records)
    }

    pub fn find_by_resource_id_and_username(
        &self,
        resource_id: &str,
        username: &str,
    ) -> Result<Option<ContextRecord>, StoreError> {
        let conn = self.db.conn();
        Self::query_one(
            &conn,
            "WHERE resource_id = ?1 AND username = ?2 ORDER BY created_at ASC LIMIT 1",
            params![resource_id, username],
        )
    }

    /// Delete by id; false when nothing matched
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.db.conn();
        let removed = conn.execute("DELETE FROM contexts WHERE id = ?", [id])?;
        Ok(removed > 0)
    }

    fn write(conn: &Connection, record: &ContextRecord) -> Result<(), StoreError> {
        let post_ids_json = serde_json::to_string(&record.post_ids)?;

        conn.execute(
            r#"
            INSERT INTO contexts (
                id, resource_id, resource_name, username, content,
                created_at, updated_at, post_ids_json, posts_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                resource_id = excluded.resource_id,
                resource_name = excluded.resource_name,
                username = excluded.username,
                content = excluded.content,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                post_ids_json = excluded.post_ids_json,
                posts_count = excluded.posts_count
            "#,
            params![
                record.id,
                record.resource_id,
                record.resource_name,
                record.username,
                record.content,
                record.created_at,
                record.updated_at,
                post_ids_json,
                record.posts_count as i64,
            ],
        )?;
        Ok(())
    }

    fn query_one(
        conn: &Connection,
        clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Option<ContextRecord>, StoreError> {
        let query = format!("{SELECT_COLUMNS} {clause}");
        let row = conn
            .query_row(&query, params, Self::read_row)
            .optional()?;
        row.map(Self::finish).transpose()
    }

    /// Row with `post_ids_json` still encoded
    fn read_row(row: &rusqlite::Row) -> Result<(ContextRecord, String), rusqlite::Error> {
        let posts_count: i64 = row.get(8)?;
        let record = ContextRecord {
            id: row.get(0)?,
            resource_id: row.get(1)?,
            resource_name: row.get(2)?,
            username: row.get(3)?,
            content: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            post_ids: Vec::new(),
            posts_count: posts_count.max(0) as usize,
        };
        Ok((record, row.get(7)?))
    }

    fn finish(
        (mut record, post_ids_json): (ContextRecord, String),
    ) -> Result<ContextRecord, StoreError> {
        record.post_ids = serde_json::from_str(&post_ids_json)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(resource_id: &str, username: &str, post_ids: &[&str]) -> ContextRecord {
        ContextRecord {
            id: None,
            resource_id: resource_id.to_string(),
            resource_name: "Acme".to_string(),
            username: username.to_string(),
            content: "{}".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            updated_at: None,
            post_ids: post_ids.iter().map(|s| s.to_string()).collect(),
            posts_count: post_ids.len(),
        }
    }

    #[test]
    fn test_save_assigns_id_and_round_trips() {
        let db = Db::open_in_memory().unwrap();
        let store = ContextStore::new(&db);
        let saved = store.save(record("page-1", "alice", &["a", "b"])).unwrap();

        let id = saved.id.clone().unwrap();
        let loaded = store.find_by_id(&id).unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.post_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_save_with_id_overwrites() {
        let db = Db::open_in_memory().unwrap();
        let store = ContextStore::new(&db);
        let saved = store.save(record("page-1", "alice", &["a"])).unwrap();

        let mut changed = saved.clone();
        changed.content = "{\"v\":2}".to_string();
        store.save(changed).unwrap();

        assert_eq!(store.find_by_username("alice").unwrap().len(), 1);
        let loaded = store.find_by_id(saved.id.as_deref().unwrap()).unwrap().unwrap();
        assert_eq!(loaded.content, "{\"v\":2}");
    }

    #[test]
    fn test_plain_save_allows_duplicates() {
        let db = Db::open_in_memory().unwrap();
        let store = ContextStore::new(&db);
        store.save(record("page-1", "alice", &[])).unwrap();
        store.save(record("page-1", "alice", &[])).unwrap();
        assert_eq!(store.find_by_username("alice").unwrap().len(), 2);
    }

    #[test]
    fn test_upsert_keeps_one_record_per_pair() {
        let db = Db::open_in_memory().unwrap();
        let store = ContextStore::new(&db);
        let first_time = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let later = first_time + Duration::hours(5);

        let first = store.upsert(record("page-1", "alice", &["a"]), first_time).unwrap();
        assert_eq!(first.updated_at, Some(first.created_at));

        let mut again = record("page-1", "alice", &["b", "c"]);
        again.created_at = later;
        let second = store.upsert(again, later).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.updated_at, Some(later));
        assert_eq!(second.posts_count, 2);

        let all = store.find_by_username("alice").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].post_ids, vec!["b", "c"]);
    }

    #[test]
    fn test_upsert_scope_is_resource_and_user() {
        let db = Db::open_in_memory().unwrap();
        let store = ContextStore::new(&db);
        let now = Utc::now();
        let alice = store.upsert(record("page-1", "alice", &[]), now).unwrap();
        let bob = store.upsert(record("page-1", "bob", &[]), now).unwrap();
        let other = store.upsert(record("page-2", "alice", &[]), now).unwrap();

        assert_ne!(alice.id, bob.id);
        assert_ne!(alice.id, other.id);
        assert_eq!(store.find_by_username("alice").unwrap().len(), 2);
    }

    #[test]
    fn test_finders() {
        let db = Db::open_in_memory().unwrap();
        let store = ContextStore::new(&db);
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let alice = store.upsert(record("page-1", "alice", &[]), t0).unwrap();
        let mut bobs = record("page-1", "bob", &[]);
        bobs.created_at = t0 + Duration::hours(1);
        let bob = store.upsert(bobs, t0 + Duration::hours(1)).unwrap();

        assert_eq!(store.find_by_resource_id("page-1").unwrap(), Some(bob.clone()));
        assert_eq!(
            store
                .find_by_resource_id_and_username("page-1", "alice")
                .unwrap(),
            Some(alice)
        );
        assert!(store.find_by_resource_id("page-9").unwrap().is_none());
        assert!(store.find_by_id("missing").unwrap().is_none());
        assert!(store.find_by_username("carol").unwrap().is_empty());

        assert!(store.delete(bob.id.as_deref().unwrap()).unwrap());
        assert!(!store.delete(bob.id.as_deref().unwrap()).unwrap());
    }
}
