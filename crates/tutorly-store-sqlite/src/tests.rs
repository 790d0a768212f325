//! Integration tests for `SqliteStore` against in-memory and file databases.

use chrono::NaiveDate;
use tutorly_core::{
  entity::{LessonRow, MessageRow, StartTime, Status, Student, Subject},
  store::Store,
  table::EntityKind,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn lesson_row(id: i64) -> LessonRow {
  LessonRow {
    id,
    date: NaiveDate::from_ymd_opt(2024, 11, id as u32).unwrap(),
    start_time_id: 1,
    subject_id: 1,
    student_id: 1,
    status_id: 1,
  }
}

fn student(id: i64, first: &str) -> Student {
  Student {
    id,
    first_name:  first.into(),
    last_name:   "Berger".into(),
    class_label: "9a".into(),
    email:       format!("{}@school.example", first.to_lowercase()),
  }
}

fn subject(id: i64, code: &str) -> Subject {
  Subject {
    id,
    name:        format!("Subject {code}"),
    short_code:  code.into(),
    teacher:     "Huber".into(),
    description: String::new(),
  }
}

// ─── Connection ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn connect_and_disconnect_are_idempotent() {
  let s = store().await;
  assert!(s.is_connected().await);

  s.connect().await.unwrap();
  assert!(s.is_connected().await);

  s.disconnect().await.unwrap();
  s.disconnect().await.unwrap();
  assert!(!s.is_connected().await);
}

#[tokio::test]
async fn operations_fail_while_disconnected() {
  let s = store().await;
  s.disconnect().await.unwrap();

  let err = s.select_ids(EntityKind::Student).await.unwrap_err();
  assert!(matches!(err, Error::Disconnected));
}

#[tokio::test]
async fn reconnect_reopens_file_store() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("tutorly.db");

  let s = SqliteStore::create(&path).await.unwrap();
  let id = s.insert(student(0, "Anna")).await.unwrap();
  s.disconnect().await.unwrap();

  s.connect().await.unwrap();
  assert!(s.exists(EntityKind::Student, id).await.unwrap());
}

#[tokio::test]
async fn open_missing_file_is_store_missing() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("absent.db");

  let err = SqliteStore::open(&path).await.err().unwrap();
  assert!(matches!(err, Error::StoreMissing(p) if p == path));
  assert!(!path.exists(), "open must not create the file");
}

#[tokio::test]
async fn open_existing_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("tutorly.db");
  {
    let created = SqliteStore::create(&path).await.unwrap();
    created.insert(Status { id: 0, name: "planned".into() }).await.unwrap();
    created.disconnect().await.unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  let statuses: Vec<Status> = s.select_all().await.unwrap();
  assert_eq!(statuses.len(), 1);
  assert_eq!(statuses[0].name, "planned");
}

// ─── Inserts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_assigns_identity() {
  let s = store().await;

  let a = s.insert(student(0, "Anna")).await.unwrap();
  let b = s.insert(student(-4, "Ben")).await.unwrap();
  assert!(a > 0);
  assert_eq!(b, a + 1);

  let all: Vec<Student> = s.select_all().await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[1].id, b);
  assert_eq!(all[1].first_name, "Ben");
}

#[tokio::test]
async fn insert_with_id_keeps_identity() {
  let s = store().await;

  s.insert_with_id(student(42, "Clara")).await.unwrap();

  let ids = s.select_ids(EntityKind::Student).await.unwrap();
  assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![42]);

  // The counter follows the explicit identity.
  let next = s.insert(student(0, "Dora")).await.unwrap();
  assert_eq!(next, 43);
}

#[tokio::test]
async fn insert_with_taken_id_fails() {
  let s = store().await;
  s.insert_with_id(student(1, "Anna")).await.unwrap();

  let err = s.insert_with_id(student(1, "Ben")).await.unwrap_err();
  assert!(matches!(err, Error::Database(_)));
}

// ─── Updates and deletes ─────────────────────────────────────────────────────

#[tokio::test]
async fn update_overwrites_all_columns() {
  let s = store().await;
  s.insert_with_id(subject(3, "M")).await.unwrap();

  let changed = Subject {
    id:          3,
    name:        "Mathematics".into(),
    short_code:  "MA".into(),
    teacher:     "Lang".into(),
    description: "Algebra and geometry".into(),
  };
  s.update(changed.clone()).await.unwrap();

  let all: Vec<Subject> = s.select_all().await.unwrap();
  assert_eq!(all, vec![changed]);
}

#[tokio::test]
async fn delete_removes_row_and_tolerates_absent() {
  let s = store().await;
  s.insert_with_id(StartTime { id: 1, time: "07:45".into() })
    .await
    .unwrap();

  s.delete(EntityKind::StartTime, 1).await.unwrap();
  s.delete(EntityKind::StartTime, 1).await.unwrap();

  assert!(!s.exists(EntityKind::StartTime, 1).await.unwrap());
}

#[tokio::test]
async fn reset_sequence_closes_gap() {
  let s = store().await;
  for id in 1..=4 {
    s.insert_with_id(subject(id, &format!("S{id}"))).await.unwrap();
  }
  s.delete(EntityKind::Subject, 4).await.unwrap();
  s.delete(EntityKind::Subject, 3).await.unwrap();

  s.reset_sequence(EntityKind::Subject).await.unwrap();

  let next = s.insert(subject(0, "NEW")).await.unwrap();
  assert_eq!(next, 3);
}

// ─── Rows with references ────────────────────────────────────────────────────

#[tokio::test]
async fn lesson_and_message_rows_roundtrip() {
  let s = store().await;

  let lesson = LessonRow {
    id:            7,
    date:          NaiveDate::from_ymd_opt(2024, 11, 4).unwrap(),
    start_time_id: 2,
    subject_id:    3,
    student_id:    4,
    status_id:     5,
  };
  s.insert_with_id(lesson.clone()).await.unwrap();

  let with_lesson = MessageRow {
    id:         1,
    title:      "Rescheduled".into(),
    body:       "Moved to Thursday.".into(),
    student_id: 4,
    lesson_id:  Some(7),
  };
  let without_lesson = MessageRow {
    id:         2,
    title:      "Welcome".into(),
    body:       "Glad to have you.".into(),
    student_id: 4,
    lesson_id:  None,
  };
  s.insert_with_id(with_lesson.clone()).await.unwrap();
  s.insert_with_id(without_lesson.clone()).await.unwrap();

  let lessons: Vec<LessonRow> = s.select_all().await.unwrap();
  assert_eq!(lessons, vec![lesson]);

  let messages: Vec<MessageRow> = s.select_all().await.unwrap();
  assert_eq!(messages, vec![with_lesson, without_lesson]);
}

#[tokio::test]
async fn malformed_lesson_date_is_core_error() {
  let s = store().await;
  s.conn()
    .await
    .unwrap()
    .call(|conn| {
      conn.execute(
        "INSERT INTO lessons (id, date, start_time_id, subject_id, student_id, status_id)
         VALUES (1, 'not-a-date', 1, 1, 1, 1)",
        [],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.select_all::<LessonRow>().await.unwrap_err();
  assert!(matches!(err, Error::Core(_)));
}

#[tokio::test]
async fn select_rows_isolates_undecodable_rows() {
  let s = store().await;
  s.insert_with_id(lesson_row(1)).await.unwrap();
  s.conn()
    .await
    .unwrap()
    .call(|conn| {
      conn.execute(
        "INSERT INTO lessons (id, date, start_time_id, subject_id, student_id, status_id)
         VALUES (2, '2024-13-40', 1, 1, 1, 1)",
        [],
      )?;
      Ok(())
    })
    .await
    .unwrap();
  s.insert_with_id(lesson_row(3)).await.unwrap();

  let rows = s.select_rows::<LessonRow>().await.unwrap();

  assert_eq!(rows.len(), 3);
  assert_eq!(rows[0].1.as_ref().unwrap(), &lesson_row(1));
  assert_eq!(rows[1].0, 2);
  assert!(matches!(rows[1].1, Err(Error::Core(_))));
  assert_eq!(rows[2].1.as_ref().unwrap(), &lesson_row(3));
}
