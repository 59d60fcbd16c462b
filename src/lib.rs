//! # xiVIEW Data
//!
//! Read-only service that assembles cross-linking identification results
//! for the xiVIEW network viewer from the database written by the
//! mzIdentML converter.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────┐
//! │ CLI / HTTP   │──▶│ xiview-data-core  │──▶│  SQLite   │
//! │ (xiview)     │   │ resolve+assemble │   │ read-only │
//! └──────────────┘   └──────────────────┘   └──────────┘
//! ```
//!
//! A request resolves its uploads, then fetches metadata, matches,
//! peptides and proteins in that order on one connection. Peptide and
//! protein lookups are batched by upload (see
//! [`xiview_data_core::compose`]).
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Connection pools |
//! | [`schema`] | Development schema bootstrap |
//! | [`query`] | Rendering batched predicates into SQL |
//! | [`sqlite_store`] | SQLite implementation of the store |
//! | [`network`] | Network data retrieval |
//! | [`peaklist`] | Peaklist retrieval |
//! | [`server`] | HTTP server |

pub mod config;
pub mod db;
pub mod network;
pub mod peaklist;
pub mod query;
pub mod schema;
pub mod server;
pub mod sqlite_store;
