//! The working set: the in-process collection of every entity list.
//!
//! One [`WorkingSet`] is loaded at startup and then mutated by the serving
//! layer between synchronization passes. It is an ordinary owned value; the
//! holder is responsible for serializing access to it.

use std::collections::BTreeSet;

use crate::entity::{
  Entity, Id, Lesson, Message, Ref, StartTime, Status, Student, Subject,
};

// ─── Collection ──────────────────────────────────────────────────────────────

/// An ordered list of entities of one kind, addressed by identity.
///
/// Unpersisted entities (identity ≤ 0) may share an identity; lookups by id
/// are only meaningful for persisted entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection<T> {
  items: Vec<T>,
}

impl<T> Default for Collection<T> {
  fn default() -> Self { Self { items: Vec::new() } }
}

impl<T> From<Vec<T>> for Collection<T> {
  fn from(items: Vec<T>) -> Self { Self { items } }
}

impl<T: Entity> Collection<T> {
  pub fn add(&mut self, entity: T) { self.items.push(entity); }

  /// Remove the first entity with `id`, returning it.
  pub fn remove(&mut self, id: Id) -> Option<T> {
    let pos = self.position(id)?;
    Some(self.items.remove(pos))
  }

  /// Swap in `entity` for the one sharing its identity, keeping its
  /// position. Returns the previous value, or `None` if there was none (in
  /// which case nothing changes).
  pub fn replace(&mut self, entity: T) -> Option<T> {
    let pos = self.position(entity.id())?;
    Some(std::mem::replace(&mut self.items[pos], entity))
  }

  pub fn get(&self, id: Id) -> Option<&T> {
    self.items.iter().find(|e| e.id() == id)
  }

  pub fn contains(&self, id: Id) -> bool { self.position(id).is_some() }

  /// Record the identity the store assigned to the entity at `index`.
  ///
  /// Returns `false` if `index` is out of bounds.
  pub fn assign_id(&mut self, index: usize, id: Id) -> bool {
    match self.items.get_mut(index) {
      Some(entity) => {
        entity.set_id(id);
        true
      }
      None => false,
    }
  }

  /// Identities of all persisted entities.
  pub fn ids(&self) -> BTreeSet<Id> {
    self
      .items
      .iter()
      .map(Entity::id)
      .filter(|id| *id > 0)
      .collect()
  }

  fn position(&self, id: Id) -> Option<usize> {
    self.items.iter().position(|e| e.id() == id)
  }
}

impl<T> Collection<T> {
  pub fn iter(&self) -> std::slice::Iter<'_, T> { self.items.iter() }

  pub fn len(&self) -> usize { self.items.len() }

  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  pub fn as_slice(&self) -> &[T] { &self.items }

  pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
    self.items.iter_mut()
  }

  /// Keep only the entities for which `keep` returns `true`.
  pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
    self.items.retain(keep);
  }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
  type IntoIter = std::slice::Iter<'a, T>;
  type Item = &'a T;

  fn into_iter(self) -> Self::IntoIter { self.items.iter() }
}

// ─── WorkingSet ──────────────────────────────────────────────────────────────

/// All six entity lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
  pub statuses:    Collection<Status>,
  pub students:    Collection<Student>,
  pub start_times: Collection<StartTime>,
  pub subjects:    Collection<Subject>,
  pub lessons:     Collection<Lesson>,
  pub messages:    Collection<Message>,
}

impl WorkingSet {
  pub fn lesson_start_time(&self, lesson: &Lesson) -> Option<&StartTime> {
    lookup(&self.start_times, lesson.start_time)
  }

  pub fn lesson_subject(&self, lesson: &Lesson) -> Option<&Subject> {
    lookup(&self.subjects, lesson.subject)
  }

  pub fn lesson_student(&self, lesson: &Lesson) -> Option<&Student> {
    lookup(&self.students, lesson.student)
  }

  pub fn lesson_status(&self, lesson: &Lesson) -> Option<&Status> {
    lookup(&self.statuses, lesson.status)
  }

  pub fn message_student(&self, message: &Message) -> Option<&Student> {
    lookup(&self.students, message.student)
  }

  pub fn message_lesson(&self, message: &Message) -> Option<&Lesson> {
    message.lesson.and_then(|r| lookup(&self.lessons, r))
  }

  /// Total entity count across all kinds.
  pub fn len(&self) -> usize {
    self.statuses.len()
      + self.students.len()
      + self.start_times.len()
      + self.subjects.len()
      + self.lessons.len()
      + self.messages.len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

fn lookup<T: Entity>(collection: &Collection<T>, r: Ref) -> Option<&T> {
  collection.get(r.linked()?)
}
