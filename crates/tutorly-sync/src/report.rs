//! Per-kind accounting of what a reconciliation pass did to the store.

use std::{
  collections::{BTreeMap, BTreeSet},
  fmt,
};

use tutorly_core::table::EntityKind;

/// Store operations issued for one entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
  pub inserted:  usize,
  pub updated:   usize,
  pub deleted:   usize,
  /// Rows that already matched and needed no statement.
  pub unchanged: usize,
}

impl Counts {
  pub fn changes(&self) -> usize { self.inserted + self.updated + self.deleted }
}

/// The outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
  kinds:           BTreeMap<EntityKind, Counts>,
  sequences_reset: BTreeSet<EntityKind>,
}

impl SyncReport {
  pub fn counts(&self, kind: EntityKind) -> Counts {
    self.kinds.get(&kind).copied().unwrap_or_default()
  }

  pub(crate) fn entry(&mut self, kind: EntityKind) -> &mut Counts {
    self.kinds.entry(kind).or_default()
  }

  pub(crate) fn mark_sequence_reset(&mut self, kind: EntityKind) {
    self.sequences_reset.insert(kind);
  }

  /// Whether the identity counter of `kind` was rewound during the pass.
  pub fn sequence_reset(&self, kind: EntityKind) -> bool {
    self.sequences_reset.contains(&kind)
  }

  /// Whether any insert, update or delete was issued.
  pub fn has_changes(&self) -> bool {
    self.kinds.values().any(|c| c.changes() > 0)
  }

  /// Fold `other` into `self`.
  pub fn merge(&mut self, other: SyncReport) {
    for (kind, c) in other.kinds {
      let e = self.entry(kind);
      e.inserted += c.inserted;
      e.updated += c.updated;
      e.deleted += c.deleted;
      e.unchanged += c.unchanged;
    }
    self.sequences_reset.extend(other.sequences_reset);
  }
}

impl fmt::Display for SyncReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if !self.has_changes() {
      return f.write_str("no changes");
    }
    let mut first = true;
    for (kind, c) in self.kinds.iter().filter(|(_, c)| c.changes() > 0) {
      if !first {
        f.write_str(", ")?;
      }
      first = false;
      write!(f, "{kind} +{} ~{} -{}", c.inserted, c.updated, c.deleted)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_lists_only_changed_kinds() {
    let mut r = SyncReport::default();
    r.entry(EntityKind::Student).inserted = 2;
    r.entry(EntityKind::Status).unchanged = 3;
    r.entry(EntityKind::Subject).deleted = 1;
    assert_eq!(r.to_string(), "student +2 ~0 -0, subject +0 ~0 -1");
  }

  #[test]
  fn empty_report_has_no_changes() {
    let mut r = SyncReport::default();
    r.entry(EntityKind::Lesson).unchanged = 10;
    assert!(!r.has_changes());
    assert_eq!(r.to_string(), "no changes");
  }

  #[test]
  fn merge_adds_counts() {
    let mut a = SyncReport::default();
    a.entry(EntityKind::Message).updated = 1;
    let mut b = SyncReport::default();
    b.entry(EntityKind::Message).updated = 2;
    b.mark_sequence_reset(EntityKind::StartTime);
    a.merge(b);
    assert_eq!(a.counts(EntityKind::Message).updated, 3);
    assert!(a.sequence_reset(EntityKind::StartTime));
  }
}
