//! Storage abstraction.
//!
//! A [`Store`] hands out [`ReadSession`]s. One session wraps exactly one
//! storage connection (inside a read transaction for SQL backends) and
//! issues every query of a request serially on it. Dropping a session on
//! any path releases its connection; [`ReadSession::finish`] ends it
//! cleanly on success.
//!
//! Sessions never write. The schema and its contents belong to the
//! ingestion pipeline.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::compose::ScopedIdSet;
use crate::keys::{SpectrumKey, UploadId};
use crate::models::{
    AnalysisCollectionRecord, MatchRecord, PeptideRecord, ProteinRecord, ProtocolRecord,
    RawSpectrum, UploadRecord,
};

/// Source of per-request read sessions.
#[async_trait]
pub trait Store: Send + Sync {
    /// Acquire one connection and open a read-only unit of work on it.
    async fn begin(&self) -> Result<Box<dyn ReadSession>>;
}

/// All reads needed to assemble a network document or a peaklist.
///
/// # Operations
///
/// | Method | Scope | Notes |
/// |--------|-------|-------|
/// | [`resolve_uploads`](ReadSession::resolve_uploads) | project / file | most recent upload per file |
/// | [`uploads`](ReadSession::uploads) | upload set | at most one row per id |
/// | [`analysis_collections`](ReadSession::analysis_collections) | upload set | |
/// | [`protocols`](ReadSession::protocols) | upload set | |
/// | [`matches`](ReadSession::matches) | upload set | passing, both peptides linked |
/// | [`peptides`](ReadSession::peptides) | scoped ids | evidence aggregated per peptide |
/// | [`proteins`](ReadSession::proteins) | scoped ids | |
/// | [`spectrum`](ReadSession::spectrum) | exact triple | |
#[async_trait]
pub trait ReadSession: Send {
    /// Most recent upload(s) for a dataset accession, optionally narrowed to
    /// one identification file. Unknown projects resolve to an empty list.
    async fn resolve_uploads(&mut self, project: &str, file: Option<&str>)
        -> Result<Vec<UploadId>>;

    async fn uploads(&mut self, ids: &[UploadId]) -> Result<Vec<UploadRecord>>;

    async fn analysis_collections(
        &mut self,
        ids: &[UploadId],
    ) -> Result<Vec<AnalysisCollectionRecord>>;

    async fn protocols(&mut self, ids: &[UploadId]) -> Result<Vec<ProtocolRecord>>;

    /// Matches that pass threshold and whose two peptides both exist in the
    /// same upload with a positive link site.
    async fn matches(&mut self, ids: &[UploadId]) -> Result<Vec<MatchRecord>>;

    /// One row per existing peptide in `keys`, evidence arrays aggregated.
    async fn peptides(&mut self, keys: &ScopedIdSet<i64>) -> Result<Vec<PeptideRecord>>;

    /// One row per existing protein in `keys`.
    async fn proteins(&mut self, keys: &ScopedIdSet<String>) -> Result<Vec<ProteinRecord>>;

    async fn spectrum(&mut self, key: &SpectrumKey) -> Result<Option<RawSpectrum>>;

    /// End the unit of work. Dropping an unfinished session discards it.
    async fn finish(&mut self) -> Result<()>;
}
