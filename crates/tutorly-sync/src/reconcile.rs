//! Reconciliation: working set → store.
//!
//! Two passes exist:
//!
//! - [`synchronize`] pushes the database-governed kinds (statuses, students,
//!   lessons, messages). It inserts and updates but never deletes: an entity
//!   dropped from the working set keeps its row.
//! - [`apply_catalog`] converges the config-governed kinds (subjects, start
//!   times) onto the catalog, deleting whatever the catalog does not list.
//!
//! Neither pass is transactional. The first failing statement aborts the
//! pass; everything before it stays applied, and rerunning the pass against
//! an unchanged working set completes the rest.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};
use tutorly_core::{
  catalog::Catalog,
  entity::{Entity, Id, Lesson, LessonRow, Message, MessageRow, Ref},
  store::Store,
  table::{EntityKind, Record},
  working_set::{Collection, WorkingSet},
};

use crate::{
  Result,
  error::{Error, Op},
  report::SyncReport,
};

/// Tunables for [`synchronize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
  /// Write store-assigned identities back into the working set after
  /// inserting new entities.
  ///
  /// Off by default: new entities keep their non-positive identity until the
  /// next load, and a second pass before then inserts them again.
  pub adopt_assigned_ids: bool,
}

// ─── Full pass ───────────────────────────────────────────────────────────────

/// Converge the catalog kinds, then push the database-governed kinds.
///
/// Catalog kinds go first so lesson rows never reference a subject or start
/// time that is not yet persisted.
pub async fn synchronize_all<S: Store>(
  store: &S,
  catalog: &Catalog,
  ws: &mut WorkingSet,
  options: SyncOptions,
) -> Result<SyncReport> {
  let mut report = apply_catalog(store, catalog, ws).await?;
  report.merge(synchronize(store, ws, options).await?);
  Ok(report)
}

// ─── Database-governed kinds ─────────────────────────────────────────────────

/// Push statuses, students, lessons and messages to the store, in that
/// order.
///
/// Per entity: identity ≤ 0 is inserted with a store-assigned identity;
/// a stored identity is updated when any column differs; an identity the
/// store does not know is inserted under that exact identity.
pub async fn synchronize<S: Store>(
  store: &S,
  ws: &mut WorkingSet,
  options: SyncOptions,
) -> Result<SyncReport> {
  let mut report = SyncReport::default();

  let rows = ws.statuses.as_slice().to_vec();
  let assigned = push(store, rows, &mut report).await?;
  adopt(&mut ws.statuses, assigned, options);

  let rows = ws.students.as_slice().to_vec();
  let assigned = push(store, rows, &mut report).await?;
  adopt(&mut ws.students, assigned, options);

  let rows: Vec<LessonRow> = ws.lessons.iter().map(Lesson::to_row).collect();
  let assigned = push(store, rows, &mut report).await?;
  adopt(&mut ws.lessons, assigned, options);

  let rows: Vec<MessageRow> =
    ws.messages.iter().map(Message::to_row).collect();
  let assigned = push(store, rows, &mut report).await?;
  adopt(&mut ws.messages, assigned, options);

  info!(%report, "synchronized working set");
  Ok(report)
}

/// Push `rows` of one kind. Returns `(index, identity)` for every row the
/// store assigned an identity to.
async fn push<S: Store, R: Record>(
  store: &S,
  rows: Vec<R>,
  report: &mut SyncReport,
) -> Result<Vec<(usize, Id)>> {
  let kind = R::KIND;
  let stored = stored_rows::<S, R>(store).await?;

  let mut assigned = Vec::new();
  for (index, row) in rows.into_iter().enumerate() {
    let id = row.id();
    if !row.is_persisted() {
      let new_id = store
        .insert(row)
        .await
        .map_err(Error::store(Op::Insert, kind))?;
      report.entry(kind).inserted += 1;
      assigned.push((index, new_id));
      continue;
    }

    match stored.get(&id) {
      Some(Some(current)) if *current == row => {
        report.entry(kind).unchanged += 1;
      }
      Some(_) => {
        store
          .update(row)
          .await
          .map_err(Error::store(Op::Update, kind))?;
        report.entry(kind).updated += 1;
      }
      None => {
        debug!(%kind, id, "restoring row under its own identity");
        store
          .insert_with_id(row)
          .await
          .map_err(Error::store(Op::Insert, kind))?;
        report.entry(kind).inserted += 1;
      }
    }
  }
  Ok(assigned)
}

fn adopt<T: Entity>(
  collection: &mut Collection<T>,
  assigned: Vec<(usize, Id)>,
  options: SyncOptions,
) {
  if !options.adopt_assigned_ids {
    return;
  }
  for (index, id) in assigned {
    collection.assign_id(index, id);
  }
}

// ─── Config-governed kinds ───────────────────────────────────────────────────

/// Make subjects and start times in both the working set and the store
/// match `catalog` exactly.
///
/// Entries are replaced in place when their fields differ and created under
/// the catalog identity when missing. Anything the catalog does not list is
/// removed and its row deleted; after any deletion the table's identity
/// counter is rewound. Lesson references to subjects and start times are
/// then re-resolved against the converged lists, so they match what a fresh
/// load would produce.
pub async fn apply_catalog<S: Store>(
  store: &S,
  catalog: &Catalog,
  ws: &mut WorkingSet,
) -> Result<SyncReport> {
  catalog.validate()?;
  let mut report = SyncReport::default();

  converge(store, &catalog.subjects, &mut ws.subjects, &mut report).await?;
  relink_lessons(&mut ws.lessons, EntityKind::Subject, &ws.subjects.ids());

  converge(store, &catalog.start_times, &mut ws.start_times, &mut report).await?;
  relink_lessons(&mut ws.lessons, EntityKind::StartTime, &ws.start_times.ids());

  info!(%report, "applied catalog");
  Ok(report)
}

async fn converge<S: Store, R: Record>(
  store: &S,
  desired: &[R],
  current: &mut Collection<R>,
  report: &mut SyncReport,
) -> Result<()> {
  let kind = R::KIND;
  let stored = stored_rows::<S, R>(store).await?;

  for entry in desired {
    let id = entry.id();

    match current.get(id) {
      Some(existing) if existing == entry => {}
      Some(_) => {
        debug!(%kind, id, "replacing from catalog");
        current.replace(entry.clone());
      }
      None => current.add(entry.clone()),
    }

    match stored.get(&id) {
      Some(Some(row)) if row == entry => report.entry(kind).unchanged += 1,
      Some(_) => {
        store
          .update(entry.clone())
          .await
          .map_err(Error::store(Op::Update, kind))?;
        report.entry(kind).updated += 1;
      }
      None => {
        store
          .insert_with_id(entry.clone())
          .await
          .map_err(Error::store(Op::Insert, kind))?;
        report.entry(kind).inserted += 1;
      }
    }
  }

  let wanted: BTreeSet<Id> = desired.iter().map(Entity::id).collect();
  current.retain(|e| wanted.contains(&e.id()));

  let mut deleted = 0;
  for id in stored.keys().filter(|id| !wanted.contains(id)) {
    debug!(%kind, id, "deleting row absent from catalog");
    store
      .delete(kind, *id)
      .await
      .map_err(Error::store(Op::Delete, kind))?;
    deleted += 1;
  }
  report.entry(kind).deleted += deleted;

  if deleted > 0 {
    store
      .reset_sequence(kind)
      .await
      .map_err(Error::store(Op::ResetSequence, kind))?;
    report.mark_sequence_reset(kind);
  }

  Ok(())
}

/// Re-resolve lesson references of `kind` against the identities now
/// `present` in the working set.
fn relink_lessons(
  lessons: &mut Collection<Lesson>,
  kind: EntityKind,
  present: &BTreeSet<Id>,
) {
  for lesson in lessons.iter_mut() {
    let slot = match kind {
      EntityKind::Subject => &mut lesson.subject,
      EntityKind::StartTime => &mut lesson.start_time,
      _ => return,
    };
    match *slot {
      Ref::Linked(id) if !present.contains(&id) => {
        warn!(lesson = lesson.id, %kind, id, "catalog removed a referenced entity");
        *slot = Ref::Dangling(id);
      }
      Ref::Dangling(id) if present.contains(&id) => {
        debug!(lesson = lesson.id, %kind, id, "catalog supplied a referenced entity");
        *slot = Ref::Linked(id);
      }
      _ => {}
    }
  }
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// Stored rows of `R` keyed by identity. A row that exists but does not
/// decode maps to `None`; writing the working-set entity over it repairs it.
async fn stored_rows<S: Store, R: Record>(
  store: &S,
) -> Result<BTreeMap<Id, Option<R>>> {
  let rows = store
    .select_rows::<R>()
    .await
    .map_err(Error::store(Op::Select, R::KIND))?;

  Ok(
    rows
      .into_iter()
      .map(|(id, row)| {
        let row = row
          .inspect_err(|e| {
            debug!(kind = %R::KIND, id, error = %e, "stored row does not decode")
          })
          .ok();
        (id, row)
      })
      .collect(),
  )
}
