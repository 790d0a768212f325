//! [`SqliteStore`]: the SQLite implementation of [`Store`].

use std::{
  collections::BTreeSet,
  path::{Path, PathBuf},
  sync::Arc,
};

use rusqlite::OptionalExtension as _;
use tokio::sync::Mutex;
use tracing::debug;

use tutorly_core::{
  entity::Id,
  store::Store,
  table::{EntityKind, Record},
};

use crate::{
  Error, Result,
  encode::{
    RawRow, delete_sql, encode_value, exists_sql, insert_sql, reset_sequence_sql,
    select_all_sql, select_ids_sql, update_sql,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Where the database lives.
#[derive(Debug, Clone)]
enum Location {
  File(PathBuf),
  /// A private in-memory database. Its contents do not survive a
  /// disconnect; every reconnect starts from an empty schema.
  Memory,
}

/// A Tutorly store backed by a single SQLite file.
///
/// Clones share one connection slot, so a disconnect
/// through any clone disconnects them all.
#[derive(Clone)]
pub struct SqliteStore {
  location: Location,
  conn:     Arc<Mutex<Option<tokio_rusqlite::Connection>>>,
}

impl SqliteStore {
  /// Open an existing store at `path`.
  ///
  /// Fails with [`Error::StoreMissing`] if the file does not exist; the
  /// schema is assumed to be provisioned already.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let store = Self::disconnected(path);
    store.connect().await?;
    Ok(store)
  }

  /// A store handle for `path` that has not connected yet.
  pub fn disconnected(path: impl AsRef<Path>) -> Self {
    Self {
      location: Location::File(path.as_ref().to_path_buf()),
      conn:     Arc::new(Mutex::new(None)),
    }
  }

  /// Create (or open) the file at `path` and provision the schema.
  pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    init_schema(&conn).await?;
    debug!(path = %path.display(), "created store");
    Ok(Self {
      location: Location::File(path),
      conn:     Arc::new(Mutex::new(Some(conn))),
    })
  }

  /// Open an in-memory store, mainly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let store = Self {
      location: Location::Memory,
      conn:     Arc::new(Mutex::new(None)),
    };
    store.connect().await?;
    Ok(store)
  }

  /// The live connection, or [`Error::Disconnected`].
  pub(crate) async fn conn(&self) -> Result<tokio_rusqlite::Connection> {
    self.conn.lock().await.clone().ok_or(Error::Disconnected)
  }

  async fn do_connect(&self) -> Result<()> {
    let mut slot = self.conn.lock().await;
    if slot.is_some() {
      return Ok(());
    }

    let conn = match &self.location {
      Location::File(path) => {
        if !path.exists() {
          return Err(Error::StoreMissing(path.clone()));
        }
        tokio_rusqlite::Connection::open(path).await?
      }
      Location::Memory => {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        init_schema(&conn).await?;
        conn
      }
    };

    debug!(location = ?self.location, "connected");
    *slot = Some(conn);
    Ok(())
  }

  async fn do_disconnect(&self) -> Result<()> {
    let taken = self.conn.lock().await.take();
    if let Some(conn) = taken {
      conn.close().await?;
      debug!(location = ?self.location, "disconnected");
    }
    Ok(())
  }

  async fn write<R: Record>(&self, record: R, with_id: bool) -> Result<Id> {
    let table = R::KIND.table();
    let sql = insert_sql(table, with_id);
    let id = record.id();
    let mut params: Vec<_> = Vec::with_capacity(table.columns.len() + 1);
    if with_id {
      params.push(rusqlite::types::Value::Integer(id));
    }
    params.extend(record.values().into_iter().map(encode_value));

    let assigned = self
      .conn()
      .await?
      .call(move |conn| {
        conn.execute(&sql, rusqlite::params_from_iter(params))?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    debug!(table = table.name, id = assigned, "inserted");
    Ok(assigned)
  }
}

async fn init_schema(conn: &tokio_rusqlite::Connection) -> Result<()> {
  conn
    .call(|conn| {
      conn.execute_batch(SCHEMA)?;
      Ok(())
    })
    .await?;
  Ok(())
}

// ─── Store impl ──────────────────────────────────────────────────────────────

impl Store for SqliteStore {
  type Error = Error;

  // ── Connection ────────────────────────────────────────────────────────────

  async fn connect(&self) -> Result<()> { self.do_connect().await }

  async fn disconnect(&self) -> Result<()> { self.do_disconnect().await }

  async fn is_connected(&self) -> bool { self.conn.lock().await.is_some() }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn select_all<R: Record>(&self) -> Result<Vec<R>> {
    self
      .select_rows::<R>()
      .await?
      .into_iter()
      .map(|(_, row)| row)
      .collect()
  }

  async fn select_rows<R: Record>(&self) -> Result<Vec<(Id, Result<R>)>> {
    let table = R::KIND.table();
    let sql = select_all_sql(table);
    let columns = table.columns.len();

    let raws: Vec<RawRow> = self
      .conn()
      .await?
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| RawRow::from_row(row, columns))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let rows = raws
      .into_iter()
      .map(|raw| {
        let id = raw.id;
        let decoded = raw
          .decode(table)
          .and_then(|(id, values)| {
            R::from_values(id, values).map_err(Error::from)
          });
        (id, decoded)
      })
      .collect();
    Ok(rows)
  }

  async fn select_ids(&self, kind: EntityKind) -> Result<BTreeSet<Id>> {
    let sql = select_ids_sql(kind.table());

    let ids = self
      .conn()
      .await?
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
          .query_map([], |row| row.get::<_, Id>(0))?
          .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(ids)
      })
      .await?;

    Ok(ids)
  }

  async fn exists(&self, kind: EntityKind, id: Id) -> Result<bool> {
    let sql = exists_sql(kind.table());

    let found = self
      .conn()
      .await?
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], |_| Ok(true))
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    Ok(found)
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert<R: Record>(&self, record: R) -> Result<Id> {
    self.write(record, false).await
  }

  async fn insert_with_id<R: Record>(&self, record: R) -> Result<()> {
    self.write(record, true).await?;
    Ok(())
  }

  async fn update<R: Record>(&self, record: R) -> Result<()> {
    let table = R::KIND.table();
    let sql = update_sql(table);
    let id = record.id();
    let mut params: Vec<_> =
      record.values().into_iter().map(encode_value).collect();
    params.push(rusqlite::types::Value::Integer(id));

    self
      .conn()
      .await?
      .call(move |conn| {
        conn.execute(&sql, rusqlite::params_from_iter(params))?;
        Ok(())
      })
      .await?;

    debug!(table = table.name, id, "updated");
    Ok(())
  }

  async fn delete(&self, kind: EntityKind, id: Id) -> Result<()> {
    let table = kind.table();
    let sql = delete_sql(table);

    self
      .conn()
      .await?
      .call(move |conn| {
        conn.execute(&sql, rusqlite::params![id])?;
        Ok(())
      })
      .await?;

    debug!(table = table.name, id, "deleted");
    Ok(())
  }

  async fn reset_sequence(&self, kind: EntityKind) -> Result<()> {
    let table = kind.table();
    let sql = reset_sequence_sql(table);
    let name = table.name;

    self
      .conn()
      .await?
      .call(move |conn| {
        // sqlite_sequence only exists once an AUTOINCREMENT table has been
        // created.
        let has_sequence: bool = conn
          .query_row(
            "SELECT 1 FROM sqlite_master
             WHERE type = 'table' AND name = 'sqlite_sequence'",
            [],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if has_sequence {
          conn.execute(&sql, rusqlite::params![name])?;
        }
        Ok(())
      })
      .await?;

    debug!(table = name, "reset identity sequence");
    Ok(())
  }
}
