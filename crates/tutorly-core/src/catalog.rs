//! The catalog: configuration-owned definitions of subjects and start times.
//!
//! For these two kinds the catalog is the single source of truth: after a
//! convergence pass the working set and the store hold exactly the entries
//! listed here, with exactly these identities.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  entity::{Entity, StartTime, Subject},
  table::{EntityKind, Record},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
  #[serde(default)]
  pub subjects:    Vec<Subject>,
  #[serde(default)]
  pub start_times: Vec<StartTime>,
}

impl Catalog {
  /// Reject entries that cannot be applied: identities must be positive and
  /// unique within a kind.
  pub fn validate(&self) -> Result<()> {
    check_ids(&self.subjects)?;
    check_ids(&self.start_times)
  }
}

fn check_ids<R: Record>(entries: &[R]) -> Result<()> {
  let kind: EntityKind = R::KIND;
  let mut seen = BTreeSet::new();
  for entry in entries {
    let id = entry.id();
    if id <= 0 {
      return Err(Error::NonPositiveId { kind, id });
    }
    if !seen.insert(id) {
      return Err(Error::DuplicateId { kind, id });
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn catalog() -> Catalog {
    serde_json::from_value(serde_json::json!({
      "subjects": [
        { "id": 1, "name": "Mathematics", "short_code": "M", "teacher": "Huber" },
        { "id": 2, "name": "English", "short_code": "E", "teacher": "Lang",
          "description": "Conversation practice" }
      ],
      "start_times": [
        { "id": 1, "time": "07:45" },
        { "id": 2, "time": "09:35" }
      ]
    }))
    .unwrap()
  }

  #[test]
  fn deserializes_with_default_description() {
    let c = catalog();
    assert_eq!(c.subjects[0].description, "");
    assert_eq!(c.subjects[1].description, "Conversation practice");
    assert!(c.validate().is_ok());
  }

  #[test]
  fn rejects_duplicate_ids() {
    let mut c = catalog();
    c.start_times[1].id = 1;
    let err = c.validate().unwrap_err();
    assert!(matches!(
      err,
      Error::DuplicateId { kind: EntityKind::StartTime, id: 1 }
    ));
  }

  #[test]
  fn rejects_non_positive_ids() {
    let mut c = catalog();
    c.subjects[0].id = 0;
    assert!(matches!(
      c.validate().unwrap_err(),
      Error::NonPositiveId { kind: EntityKind::Subject, id: 0 }
    ));
  }

  #[test]
  fn empty_catalog_is_valid() {
    assert!(Catalog::default().validate().is_ok());
  }
}
