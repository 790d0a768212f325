//! Error type for `tutorly-sync`.

use strum::Display;
use thiserror::Error;
use tutorly_core::table::EntityKind;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Op {
  Select,
  Insert,
  Update,
  Delete,
  ResetSequence,
}

#[derive(Debug, Error)]
pub enum Error {
  /// The catalog could not be applied; nothing was changed.
  #[error("invalid catalog: {0}")]
  Catalog(#[from] tutorly_core::Error),

  /// Opening or closing the store failed.
  #[error("store connection error: {0}")]
  Connection(#[source] BoxError),

  /// A single statement failed; the rest of the pass was abandoned.
  #[error("{op} on {kind} failed: {source}")]
  Store {
    op:     Op,
    kind:   EntityKind,
    #[source]
    source: BoxError,
  },
}

impl Error {
  pub(crate) fn store<E>(op: Op, kind: EntityKind) -> impl FnOnce(E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    move |e| Self::Store { op, kind, source: Box::new(e) }
  }

  pub(crate) fn connection<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Connection(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
