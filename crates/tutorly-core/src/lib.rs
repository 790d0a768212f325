//! Core types and trait definitions for the Tutorly administrative backend.
//!
//! This crate is deliberately free of database dependencies. It defines the
//! six entity kinds, the in-memory working set, the config-governed catalog
//! and the [`store::Store`] abstraction implemented by storage backends.

pub mod catalog;
pub mod entity;
pub mod error;
pub mod store;
pub mod table;
pub mod working_set;

pub use error::{Error, Result};
