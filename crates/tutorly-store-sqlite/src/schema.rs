//! SQL schema for the Tutorly SQLite store.
//!
//! Production stores are provisioned ahead of time; this DDL is executed only
//! by [`crate::SqliteStore::create`] and for in-memory stores.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Foreign identity columns carry no `REFERENCES` clause: rows whose
/// references do not resolve are tolerated on load and written back
/// unchanged.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS statuses (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL,
    class_label TEXT NOT NULL,
    email       TEXT NOT NULL
);

-- Config-governed: membership is dictated by the catalog.
CREATE TABLE IF NOT EXISTS start_times (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    time TEXT NOT NULL              -- time of day, e.g. '07:45'
);

-- Config-governed: membership is dictated by the catalog.
CREATE TABLE IF NOT EXISTS subjects (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    short_code  TEXT NOT NULL,
    teacher     TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS lessons (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    date          TEXT    NOT NULL,  -- YYYY-MM-DD
    start_time_id INTEGER NOT NULL,
    subject_id    INTEGER NOT NULL,
    student_id    INTEGER NOT NULL,
    status_id     INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    title      TEXT    NOT NULL,
    body       TEXT    NOT NULL,
    student_id INTEGER NOT NULL,
    lesson_id  INTEGER               -- NULL when not about a lesson
);

CREATE INDEX IF NOT EXISTS lessons_student_idx  ON lessons(student_id);
CREATE INDEX IF NOT EXISTS messages_student_idx ON messages(student_id);

PRAGMA user_version = 1;
";
