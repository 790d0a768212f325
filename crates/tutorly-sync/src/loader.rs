//! Startup load: store → working set.
//!
//! Tables are read in dependency order so every foreign reference can be
//! checked against an already-loaded set. A reference that does not resolve
//! never fails the load; it is logged and kept as [`Ref::Dangling`]. A row
//! whose columns do not decode is logged and skipped.

use std::collections::BTreeSet;

use tracing::{info, warn};
use tutorly_core::{
  catalog::Catalog,
  entity::{
    Entity, Id, Lesson, LessonRow, Message, MessageRow, Ref, StartTime, Status,
    Student, Subject,
  },
  store::Store,
  table::{EntityKind, Record},
  working_set::{Collection, WorkingSet},
};

use crate::{
  Result,
  error::{Error, Op},
  reconcile,
};

/// Load the working set and converge the config-governed kinds onto
/// `catalog`, persisting the convergence.
pub async fn load<S: Store>(store: &S, catalog: &Catalog) -> Result<WorkingSet> {
  catalog.validate()?;
  let mut ws = load_tables(store).await?;
  let report = reconcile::apply_catalog(store, catalog, &mut ws).await?;
  info!(
    entities = ws.len(),
    catalog = %report,
    "loaded working set"
  );
  Ok(ws)
}

/// Load every table as stored, without consulting the catalog.
pub async fn load_tables<S: Store>(store: &S) -> Result<WorkingSet> {
  let statuses: Vec<Status> = select(store).await?;
  let students: Vec<Student> = select(store).await?;
  let start_times: Vec<StartTime> = select(store).await?;
  let subjects: Vec<Subject> = select(store).await?;

  let known = Known {
    statuses:    ids(&statuses),
    students:    ids(&students),
    start_times: ids(&start_times),
    subjects:    ids(&subjects),
    lessons:     BTreeSet::new(),
  };

  let lesson_rows: Vec<LessonRow> = select(store).await?;
  let lessons: Vec<Lesson> =
    lesson_rows.into_iter().map(|row| known.lesson(row)).collect();

  let known = Known { lessons: ids(&lessons), ..known };

  let message_rows: Vec<MessageRow> = select(store).await?;
  let messages: Vec<Message> =
    message_rows.into_iter().map(|row| known.message(row)).collect();

  Ok(WorkingSet {
    statuses:    Collection::from(statuses),
    students:    Collection::from(students),
    start_times: Collection::from(start_times),
    subjects:    Collection::from(subjects),
    lessons:     Collection::from(lessons),
    messages:    Collection::from(messages),
  })
}

/// Every decodable row of `R`. A row that does not decode is logged and
/// left out of the working set; its stored row is kept as is.
async fn select<S: Store, R: Record>(store: &S) -> Result<Vec<R>> {
  let rows = store
    .select_rows::<R>()
    .await
    .map_err(Error::store(Op::Select, R::KIND))?;

  let mut loaded = Vec::with_capacity(rows.len());
  for (id, row) in rows {
    match row {
      Ok(row) => loaded.push(row),
      Err(e) => warn!(
        kind = %R::KIND,
        id,
        error = %e,
        "undecodable row skipped"
      ),
    }
  }
  Ok(loaded)
}

fn ids<T: Entity>(entities: &[T]) -> BTreeSet<Id> {
  entities.iter().map(Entity::id).collect()
}

// ─── Reference resolution ────────────────────────────────────────────────────

/// Identities already loaded, per referenced kind.
struct Known {
  statuses:    BTreeSet<Id>,
  students:    BTreeSet<Id>,
  start_times: BTreeSet<Id>,
  subjects:    BTreeSet<Id>,
  lessons:     BTreeSet<Id>,
}

impl Known {
  /// Loaded identities of `kind`; `None` for kinds nothing references.
  fn set(&self, kind: EntityKind) -> Option<&BTreeSet<Id>> {
    match kind {
      EntityKind::Status => Some(&self.statuses),
      EntityKind::Student => Some(&self.students),
      EntityKind::StartTime => Some(&self.start_times),
      EntityKind::Subject => Some(&self.subjects),
      EntityKind::Lesson => Some(&self.lessons),
      EntityKind::Message => None,
    }
  }

  fn link(&self, owner: EntityKind, owner_id: Id, target: EntityKind, id: Id) -> Ref {
    if self.set(target).is_some_and(|known| known.contains(&id)) {
      Ref::Linked(id)
    } else {
      warn!(
        %owner,
        owner_id,
        %target,
        target_id = id,
        "unresolved reference; row kept with a dangling link"
      );
      Ref::Dangling(id)
    }
  }

  fn lesson(&self, row: LessonRow) -> Lesson {
    let link = |target, id| self.link(EntityKind::Lesson, row.id, target, id);
    Lesson {
      id:         row.id,
      date:       row.date,
      start_time: link(EntityKind::StartTime, row.start_time_id),
      subject:    link(EntityKind::Subject, row.subject_id),
      student:    link(EntityKind::Student, row.student_id),
      status:     link(EntityKind::Status, row.status_id),
    }
  }

  fn message(&self, row: MessageRow) -> Message {
    let link = |target, id| self.link(EntityKind::Message, row.id, target, id);
    Message {
      id:      row.id,
      student: link(EntityKind::Student, row.student_id),
      lesson:  row.lesson_id.map(|id| link(EntityKind::Lesson, id)),
      title:   row.title,
      body:    row.body,
    }
  }
}
