// SPDX-License-Identifier: MPL-2.0

mod contexts;
mod db;
mod schema;
mod sessions;

pub use contexts::ContextStore;
pub use db::Db;
pub use sessions::{Session, SessionStore};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found")]
    NotFound,
    #[error("database path error: {0}")]
    Path(String),
}
