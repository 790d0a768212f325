//! Entity types: the six record kinds the backend administers.
//!
//! Identities are assigned by the store on first insertion. An entity whose
//! identity is zero or negative has not been persisted yet.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  table::{EntityKind, Fields, Record, Value},
};

/// Store-assigned integer identity.
pub type Id = i64;

/// Storage format of [`Lesson::date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── Entity ──────────────────────────────────────────────────────────────────

/// Anything with an integer identity.
pub trait Entity {
  fn id(&self) -> Id;

  fn set_id(&mut self, id: Id);

  fn is_persisted(&self) -> bool { self.id() > 0 }
}

macro_rules! impl_entity {
  ($($ty:ty),+ $(,)?) => {
    $(
      impl Entity for $ty {
        fn id(&self) -> Id { self.id }

        fn set_id(&mut self, id: Id) { self.id = id; }
      }
    )+
  };
}

impl_entity!(Student, Subject, StartTime, Status, Lesson, Message, LessonRow, MessageRow);

// ─── References ──────────────────────────────────────────────────────────────

/// A foreign reference from a lesson or message to another entity.
///
/// References that did not resolve at load time are kept as
/// [`Ref::Dangling`] with the raw foreign id, so writing the row back leaves
/// the stored value untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "id", rename_all = "snake_case")]
pub enum Ref {
  Linked(Id),
  Dangling(Id),
}

impl Ref {
  /// The identity consumers historically received for an unresolved
  /// reference.
  pub const SENTINEL_ID: Id = -1;

  /// The raw foreign id, resolved or not.
  pub fn raw_id(self) -> Id {
    match self {
      Self::Linked(id) | Self::Dangling(id) => id,
    }
  }

  /// The id if the reference resolved, `None` otherwise.
  pub fn linked(self) -> Option<Id> {
    match self {
      Self::Linked(id) => Some(id),
      Self::Dangling(_) => None,
    }
  }

  pub fn is_dangling(self) -> bool { matches!(self, Self::Dangling(_)) }

  /// The linked id, or [`Ref::SENTINEL_ID`] for a dangling reference.
  pub fn sentinel_id(self) -> Id { self.linked().unwrap_or(Self::SENTINEL_ID) }
}

// ─── Database-governed kinds ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub id:          Id,
  pub first_name:  String,
  pub last_name:   String,
  /// School class, e.g. "10b".
  pub class_label: String,
  pub email:       String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
  pub id:   Id,
  pub name: String,
}

/// A scheduled lesson with its four resolved references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
  pub id:         Id,
  pub date:       NaiveDate,
  pub start_time: Ref,
  pub subject:    Ref,
  pub student:    Ref,
  pub status:     Ref,
}

impl Lesson {
  /// The persisted shape of this lesson.
  pub fn to_row(&self) -> LessonRow {
    LessonRow {
      id:            self.id,
      date:          self.date,
      start_time_id: self.start_time.raw_id(),
      subject_id:    self.subject.raw_id(),
      student_id:    self.student.raw_id(),
      status_id:     self.status.raw_id(),
    }
  }

  pub fn has_dangling_refs(&self) -> bool {
    [self.start_time, self.subject, self.student, self.status]
      .into_iter()
      .any(Ref::is_dangling)
  }
}

/// A note addressed to a student, optionally about a specific lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub id:      Id,
  pub title:   String,
  pub body:    String,
  pub student: Ref,
  pub lesson:  Option<Ref>,
}

impl Message {
  pub fn to_row(&self) -> MessageRow {
    MessageRow {
      id:         self.id,
      title:      self.title.clone(),
      body:       self.body.clone(),
      student_id: self.student.raw_id(),
      lesson_id:  self.lesson.map(Ref::raw_id),
    }
  }
}

// ─── Config-governed kinds ───────────────────────────────────────────────────

/// A taught subject. Membership and fields come from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub id:          Id,
  pub name:        String,
  pub short_code:  String,
  pub teacher:     String,
  #[serde(default)]
  pub description: String,
}

/// A slot at which lessons may begin, e.g. `"07:45"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartTime {
  pub id:   Id,
  pub time: String,
}

// ─── Row shapes ──────────────────────────────────────────────────────────────

/// A `lessons` row with raw foreign identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonRow {
  pub id:            Id,
  pub date:          NaiveDate,
  pub start_time_id: Id,
  pub subject_id:    Id,
  pub student_id:    Id,
  pub status_id:     Id,
}

/// A `messages` row with raw foreign identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
  pub id:         Id,
  pub title:      String,
  pub body:       String,
  pub student_id: Id,
  pub lesson_id:  Option<Id>,
}

// ─── Record impls ────────────────────────────────────────────────────────────

impl Record for Student {
  const KIND: EntityKind = EntityKind::Student;

  fn values(&self) -> Vec<Value> {
    vec![
      self.first_name.as_str().into(),
      self.last_name.as_str().into(),
      self.class_label.as_str().into(),
      self.email.as_str().into(),
    ]
  }

  fn from_values(id: Id, values: Vec<Value>) -> Result<Self> {
    let mut f = Fields::new(Self::KIND, id, values);
    Ok(Self {
      id,
      first_name: f.text()?,
      last_name: f.text()?,
      class_label: f.text()?,
      email: f.text()?,
    })
  }
}

impl Record for Subject {
  const KIND: EntityKind = EntityKind::Subject;

  fn values(&self) -> Vec<Value> {
    vec![
      self.name.as_str().into(),
      self.short_code.as_str().into(),
      self.teacher.as_str().into(),
      self.description.as_str().into(),
    ]
  }

  fn from_values(id: Id, values: Vec<Value>) -> Result<Self> {
    let mut f = Fields::new(Self::KIND, id, values);
    Ok(Self {
      id,
      name: f.text()?,
      short_code: f.text()?,
      teacher: f.text()?,
      description: f.text()?,
    })
  }
}

impl Record for StartTime {
  const KIND: EntityKind = EntityKind::StartTime;

  fn values(&self) -> Vec<Value> { vec![self.time.as_str().into()] }

  fn from_values(id: Id, values: Vec<Value>) -> Result<Self> {
    let mut f = Fields::new(Self::KIND, id, values);
    Ok(Self { id, time: f.text()? })
  }
}

impl Record for Status {
  const KIND: EntityKind = EntityKind::Status;

  fn values(&self) -> Vec<Value> { vec![self.name.as_str().into()] }

  fn from_values(id: Id, values: Vec<Value>) -> Result<Self> {
    let mut f = Fields::new(Self::KIND, id, values);
    Ok(Self { id, name: f.text()? })
  }
}

impl Record for LessonRow {
  const KIND: EntityKind = EntityKind::Lesson;

  fn values(&self) -> Vec<Value> {
    vec![
      Value::Text(self.date.format(DATE_FORMAT).to_string()),
      self.start_time_id.into(),
      self.subject_id.into(),
      self.student_id.into(),
      self.status_id.into(),
    ]
  }

  fn from_values(id: Id, values: Vec<Value>) -> Result<Self> {
    let mut f = Fields::new(Self::KIND, id, values);
    Ok(Self {
      id,
      date: f.date()?,
      start_time_id: f.integer()?,
      subject_id: f.integer()?,
      student_id: f.integer()?,
      status_id: f.integer()?,
    })
  }
}

impl Record for MessageRow {
  const KIND: EntityKind = EntityKind::Message;

  fn values(&self) -> Vec<Value> {
    vec![
      self.title.as_str().into(),
      self.body.as_str().into(),
      self.student_id.into(),
      self.lesson_id.into(),
    ]
  }

  fn from_values(id: Id, values: Vec<Value>) -> Result<Self> {
    let mut f = Fields::new(Self::KIND, id, values);
    Ok(Self {
      id,
      title: f.text()?,
      body: f.text()?,
      student_id: f.integer()?,
      lesson_id: f.optional_integer()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sentinel_id_for_dangling_ref() {
    assert_eq!(Ref::Dangling(42).sentinel_id(), -1);
    assert_eq!(Ref::Linked(42).sentinel_id(), 42);
    assert_eq!(Ref::Dangling(42).raw_id(), 42);
  }

  #[test]
  fn lesson_row_keeps_dangling_raw_ids() {
    let lesson = Lesson {
      id:         5,
      date:       NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
      start_time: Ref::Linked(1),
      subject:    Ref::Dangling(99),
      student:    Ref::Linked(2),
      status:     Ref::Linked(3),
    };
    assert!(lesson.has_dangling_refs());
    let row = lesson.to_row();
    assert_eq!(row.subject_id, 99);

    let rebuilt = LessonRow::from_values(row.id, row.values()).unwrap();
    assert_eq!(rebuilt, row);
  }

  #[test]
  fn message_row_null_lesson() {
    let row = MessageRow {
      id:         0,
      title:      "Homework".into(),
      body:       "Bring the workbook.".into(),
      student_id: 4,
      lesson_id:  None,
    };
    assert_eq!(row.values()[3], Value::Null);
  }

  #[test]
  fn bad_lesson_date_is_a_decode_error() {
    let values = vec![
      Value::Text("yesterday".into()),
      Value::Integer(1),
      Value::Integer(1),
      Value::Integer(1),
      Value::Integer(1),
    ];
    let err = LessonRow::from_values(8, values).unwrap_err();
    assert!(err.to_string().contains("yesterday"), "{err}");
  }

  #[test]
  fn unpersisted_entities() {
    let status = Status { id: 0, name: "planned".into() };
    assert!(!status.is_persisted());
  }
}
