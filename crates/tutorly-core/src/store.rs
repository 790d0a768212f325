//! The `Store` trait, the persistence contract the reconciler relies on.
//!
//! The trait is implemented by storage backends (e.g. `tutorly-store-sqlite`).
//! The loader and reconciler in `tutorly-sync` depend on this abstraction, not
//! on any concrete backend.

use std::{collections::BTreeSet, future::Future};

use crate::{
  entity::Id,
  table::{EntityKind, Record},
};

/// Abstraction over a relational store with one table per entity kind.
///
/// Every write method issues exactly one statement, so a failure never
/// leaves a half-written row behind. There are no multi-statement
/// transactions: callers that issue several writes must tolerate partial
/// application.
///
/// The connection is a single shared resource. `connect` and `disconnect`
/// are idempotent but callers must serialize them.
pub trait Store: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Connection ────────────────────────────────────────────────────────

  /// Open the connection. A no-op when already connected; reopens a
  /// previously closed connection.
  fn connect(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Close the connection. A no-op when already disconnected.
  fn disconnect(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn is_connected(&self) -> impl Future<Output = bool> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Every row of `R`'s table, ordered by identity.
  fn select_all<R: Record>(
    &self,
  ) -> impl Future<Output = Result<Vec<R>, Self::Error>> + Send + '_;

  /// Every row of `R`'s table, ordered by identity, decoded one at a time.
  ///
  /// The outer error means the table could not be read at all; an inner
  /// error marks a single row whose columns do not decode into `R`.
  fn select_rows<R: Record>(
    &self,
  ) -> impl Future<Output = Result<Vec<(Id, Result<R, Self::Error>)>, Self::Error>>
  + Send
  + '_;

  /// The set of persisted identities in `kind`'s table.
  fn select_ids(
    &self,
    kind: EntityKind,
  ) -> impl Future<Output = Result<BTreeSet<Id>, Self::Error>> + Send + '_;

  /// Whether a row with `id` exists in `kind`'s table.
  fn exists(
    &self,
    kind: EntityKind,
    id: Id,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert `record`, letting the store assign its identity. Returns the
  /// assigned identity; `record.id()` is ignored.
  fn insert<R: Record>(
    &self,
    record: R,
  ) -> impl Future<Output = Result<Id, Self::Error>> + Send + '_;

  /// Insert `record` under its own identity.
  fn insert_with_id<R: Record>(
    &self,
    record: R,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Overwrite every column of the row sharing `record`'s identity.
  fn update<R: Record>(
    &self,
    record: R,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete the row with `id`. Deleting an absent row is not an error.
  fn delete(
    &self,
    kind: EntityKind,
    id: Id,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Rewind the identity counter of `kind`'s table to its current maximum
  /// identity, so the next store-assigned identity follows directly.
  fn reset_sequence(
    &self,
    kind: EntityKind,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
