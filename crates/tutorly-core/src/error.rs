//! Error types for `tutorly-core`.

use thiserror::Error;

use crate::{entity::Id, table::EntityKind};

#[derive(Debug, Error)]
pub enum Error {
  /// A stored column could not be turned back into a field value.
  #[error("cannot decode {kind} row {id}: {reason}")]
  Decode {
    kind:   EntityKind,
    id:     Id,
    reason: String,
  },

  #[error("catalog {kind} entry has non-positive id {id}")]
  NonPositiveId { kind: EntityKind, id: Id },

  #[error("catalog lists {kind} id {id} more than once")]
  DuplicateId { kind: EntityKind, id: Id },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
