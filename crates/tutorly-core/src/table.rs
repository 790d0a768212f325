//! Table descriptors and the backend-neutral row representation.
//!
//! Every entity kind maps to exactly one table with an integer identity
//! column. Backends build their statements from a [`Table`] instead of
//! hand-writing SQL per kind, so insert/update/delete behave identically for
//! all six tables.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::{
  Error, Result,
  entity::{Entity, Id},
};

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// The six entity kinds, in dependency order (referenced kinds first).
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Status,
  Student,
  StartTime,
  Subject,
  Lesson,
  Message,
}

impl EntityKind {
  /// The table descriptor backing this kind.
  pub const fn table(self) -> &'static Table {
    match self {
      Self::Status => &STATUSES,
      Self::Student => &STUDENTS,
      Self::StartTime => &START_TIMES,
      Self::Subject => &SUBJECTS,
      Self::Lesson => &LESSONS,
      Self::Message => &MESSAGES,
    }
  }

  /// Whether the catalog, not the database, owns this kind.
  pub const fn is_config_governed(self) -> bool {
    matches!(self, Self::Subject | Self::StartTime)
  }
}

// ─── Descriptors ─────────────────────────────────────────────────────────────

/// Static description of one table: its name, identity column, and the
/// remaining columns in the order [`Record::values`] produces them.
#[derive(Debug, PartialEq, Eq)]
pub struct Table {
  pub name:      &'static str,
  pub id_column: &'static str,
  pub columns:   &'static [&'static str],
}

pub const STUDENTS: Table = Table {
  name:      "students",
  id_column: "id",
  columns:   &["first_name", "last_name", "class_label", "email"],
};

pub const SUBJECTS: Table = Table {
  name:      "subjects",
  id_column: "id",
  columns:   &["name", "short_code", "teacher", "description"],
};

pub const START_TIMES: Table = Table {
  name:      "start_times",
  id_column: "id",
  columns:   &["time"],
};

pub const STATUSES: Table = Table {
  name:      "statuses",
  id_column: "id",
  columns:   &["name"],
};

pub const LESSONS: Table = Table {
  name:      "lessons",
  id_column: "id",
  columns:   &[
    "date",
    "start_time_id",
    "subject_id",
    "student_id",
    "status_id",
  ],
};

pub const MESSAGES: Table = Table {
  name:      "messages",
  id_column: "id",
  columns:   &["title", "body", "student_id", "lesson_id"],
};

// ─── Values ──────────────────────────────────────────────────────────────────

/// A single column value as it crosses the store boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
  Integer(i64),
  Text(String),
  Null,
}

impl From<&str> for Value {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<i64> for Value {
  fn from(i: i64) -> Self { Self::Integer(i) }
}

impl From<Option<i64>> for Value {
  fn from(i: Option<i64>) -> Self { i.map_or(Self::Null, Self::Integer) }
}

/// Sequential reader over the column values of one row, used by
/// [`Record::from_values`] implementations.
pub struct Fields {
  kind:   EntityKind,
  id:     Id,
  column: usize,
  values: std::vec::IntoIter<Value>,
}

impl Fields {
  pub fn new(kind: EntityKind, id: Id, values: Vec<Value>) -> Self {
    Self { kind, id, column: 0, values: values.into_iter() }
  }

  fn next(&mut self) -> Result<Value> {
    let table = self.kind.table();
    let name = table.columns.get(self.column).copied().unwrap_or("?");
    self.column += 1;
    self
      .values
      .next()
      .ok_or_else(|| self.error(format!("missing column {name:?}")))
  }

  fn error(&self, reason: String) -> Error {
    Error::Decode { kind: self.kind, id: self.id, reason }
  }

  pub fn text(&mut self) -> Result<String> {
    match self.next()? {
      Value::Text(s) => Ok(s),
      other => Err(self.error(format!("expected text, found {other:?}"))),
    }
  }

  pub fn integer(&mut self) -> Result<i64> {
    match self.next()? {
      Value::Integer(i) => Ok(i),
      other => Err(self.error(format!("expected integer, found {other:?}"))),
    }
  }

  pub fn optional_integer(&mut self) -> Result<Option<i64>> {
    match self.next()? {
      Value::Integer(i) => Ok(Some(i)),
      Value::Null => Ok(None),
      other => Err(self.error(format!("expected integer, found {other:?}"))),
    }
  }

  pub fn date(&mut self) -> Result<chrono::NaiveDate> {
    let raw = self.text()?;
    chrono::NaiveDate::parse_from_str(&raw, crate::entity::DATE_FORMAT)
      .map_err(|e| self.error(format!("bad date {raw:?}: {e}")))
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// An entity that maps one-to-one onto a row of its kind's table.
pub trait Record:
  Entity + Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static
{
  const KIND: EntityKind;

  /// Column values in [`Table::columns`] order, identity excluded.
  fn values(&self) -> Vec<Value>;

  /// Rebuild a record from its identity and column values.
  fn from_values(id: Id, values: Vec<Value>) -> Result<Self>;
}
