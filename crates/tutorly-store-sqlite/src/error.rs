//! Error type for `tutorly-store-sqlite`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tutorly_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// The database file does not exist. The store is never created
  /// implicitly by [`crate::SqliteStore::open`].
  #[error("store not found at {0}")]
  StoreMissing(PathBuf),

  #[error("store is not connected")]
  Disconnected,

  /// A column held a value of a storage class the entity model never uses.
  #[error("unsupported value in {table}.{column}: {found}")]
  UnsupportedValue {
    table:  &'static str,
    column: &'static str,
    found:  &'static str,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
