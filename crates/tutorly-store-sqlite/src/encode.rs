//! Statement building and value conversion between [`tutorly_core::table`]
//! descriptors and SQLite.
//!
//! One builder per statement kind, driven entirely by the [`Table`]
//! descriptor. Identifiers come from static descriptors only; every value is
//! bound as a parameter.

use rusqlite::types::Value as SqlValue;
use tutorly_core::table::{Table, Value};

use crate::{Error, Result};

// ─── Statements ──────────────────────────────────────────────────────────────

/// `SELECT id, c1, c2, … FROM t ORDER BY id`
pub fn select_all_sql(table: &Table) -> String {
  format!(
    "SELECT {}, {} FROM {} ORDER BY {}",
    table.id_column,
    table.columns.join(", "),
    table.name,
    table.id_column,
  )
}

pub fn select_ids_sql(table: &Table) -> String {
  format!("SELECT {} FROM {}", table.id_column, table.name)
}

pub fn exists_sql(table: &Table) -> String {
  format!("SELECT 1 FROM {} WHERE {} = ?1", table.name, table.id_column)
}

/// `INSERT INTO t (c1, c2, …) VALUES (?1, ?2, …)`, or with the identity
/// column prepended when `with_id` is set.
pub fn insert_sql(table: &Table, with_id: bool) -> String {
  let mut columns: Vec<&str> = Vec::with_capacity(table.columns.len() + 1);
  if with_id {
    columns.push(table.id_column);
  }
  columns.extend_from_slice(table.columns);

  let placeholders: Vec<String> =
    (1..=columns.len()).map(|i| format!("?{i}")).collect();

  format!(
    "INSERT INTO {} ({}) VALUES ({})",
    table.name,
    columns.join(", "),
    placeholders.join(", "),
  )
}

/// `UPDATE t SET c1 = ?1, c2 = ?2, … WHERE id = ?N`; the identity binds last.
pub fn update_sql(table: &Table) -> String {
  let assignments: Vec<String> = table
    .columns
    .iter()
    .enumerate()
    .map(|(i, c)| format!("{c} = ?{}", i + 1))
    .collect();

  format!(
    "UPDATE {} SET {} WHERE {} = ?{}",
    table.name,
    assignments.join(", "),
    table.id_column,
    table.columns.len() + 1,
  )
}

pub fn delete_sql(table: &Table) -> String {
  format!("DELETE FROM {} WHERE {} = ?1", table.name, table.id_column)
}

/// Rewinds the `AUTOINCREMENT` counter to the current maximum identity.
pub fn reset_sequence_sql(table: &Table) -> String {
  format!(
    "UPDATE sqlite_sequence
     SET seq = (SELECT COALESCE(MAX({id}), 0) FROM {name})
     WHERE name = ?1",
    id = table.id_column,
    name = table.name,
  )
}

// ─── Values ──────────────────────────────────────────────────────────────────

pub fn encode_value(v: Value) -> SqlValue {
  match v {
    Value::Integer(i) => SqlValue::Integer(i),
    Value::Text(s) => SqlValue::Text(s),
    Value::Null => SqlValue::Null,
  }
}

pub fn decode_value(
  table: &'static Table,
  column: usize,
  v: SqlValue,
) -> Result<Value> {
  match v {
    SqlValue::Integer(i) => Ok(Value::Integer(i)),
    SqlValue::Text(s) => Ok(Value::Text(s)),
    SqlValue::Null => Ok(Value::Null),
    SqlValue::Real(_) => Err(unsupported(table, column, "real")),
    SqlValue::Blob(_) => Err(unsupported(table, column, "blob")),
  }
}

fn unsupported(table: &'static Table, column: usize, found: &'static str) -> Error {
  Error::UnsupportedValue {
    table: table.name,
    column: table.columns.get(column).copied().unwrap_or(table.id_column),
    found,
  }
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Identity plus raw column values read directly from a row.
pub struct RawRow {
  pub id:     i64,
  pub values: Vec<SqlValue>,
}

impl RawRow {
  pub fn from_row(row: &rusqlite::Row<'_>, columns: usize) -> rusqlite::Result<Self> {
    let id = row.get(0)?;
    let values = (1..=columns)
      .map(|i| row.get::<_, SqlValue>(i))
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Self { id, values })
  }

  pub fn decode(self, table: &'static Table) -> Result<(i64, Vec<Value>)> {
    let values = self
      .values
      .into_iter()
      .enumerate()
      .map(|(i, v)| decode_value(table, i, v))
      .collect::<Result<Vec<_>>>()?;
    Ok((self.id, values))
  }
}

#[cfg(test)]
mod tests {
  use tutorly_core::table::{LESSONS, STATUSES, SUBJECTS};

  use super::*;

  #[test]
  fn insert_statement_with_and_without_id() {
    assert_eq!(
      insert_sql(&STATUSES, false),
      "INSERT INTO statuses (name) VALUES (?1)"
    );
    assert_eq!(
      insert_sql(&STATUSES, true),
      "INSERT INTO statuses (id, name) VALUES (?1, ?2)"
    );
  }

  #[test]
  fn update_binds_identity_last() {
    assert_eq!(
      update_sql(&SUBJECTS),
      "UPDATE subjects SET name = ?1, short_code = ?2, teacher = ?3, \
       description = ?4 WHERE id = ?5"
    );
  }

  #[test]
  fn select_lists_identity_first() {
    assert_eq!(
      select_all_sql(&LESSONS),
      "SELECT id, date, start_time_id, subject_id, student_id, status_id \
       FROM lessons ORDER BY id"
    );
  }

  #[test]
  fn real_values_are_rejected() {
    let err = decode_value(&LESSONS, 1, SqlValue::Real(1.5)).unwrap_err();
    assert!(matches!(
      err,
      Error::UnsupportedValue { table: "lessons", column: "start_time_id", .. }
    ));
  }
}
