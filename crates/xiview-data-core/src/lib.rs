//! # xiVIEW Data Core
//!
//! Storage-agnostic logic for serving cross-linking identification results:
//! composite `(upload_id, local_id)` keys, the batching plan used to build
//! per-upload queries, the data models, the peaklist codec, the store
//! abstraction, and the assembler that walks matches → peptides → proteins.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. The application
//! crate supplies a SQLite-backed [`store::Store`]; tests use
//! [`store::memory::InMemoryStore`].

pub mod assemble;
pub mod compose;
pub mod error;
pub mod keys;
pub mod models;
pub mod peaklist;
pub mod store;
