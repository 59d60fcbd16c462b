//! In-memory [`Store`] implementation for tests.
//!
//! Rows live in `Vec`s behind `std::sync::RwLock`. Derived-key fetches go
//! through [`ScopedIdSet::batches`] exactly like the SQL backend, one logged
//! "statement" per batch, so tests can observe both the rows returned and
//! the queries issued.
//!
//! Failure injection ([`InMemoryStore::fail_on`]) and an open-session
//! counter ([`InMemoryStore::open_sessions`]) let tests check the error
//! path and connection release.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::compose::ScopedIdSet;
use crate::keys::{SpectrumKey, UploadId};
use crate::models::{
    AnalysisCollectionRecord, MatchRecord, PeptideRecord, ProteinRecord, ProtocolRecord,
    RawSpectrum, UploadRecord,
};

use super::{ReadSession, Store};

/// A `modifiedpeptide` row before evidence aggregation.
#[derive(Debug, Clone)]
pub struct StoredPeptide {
    pub upload_id: UploadId,
    pub id: i64,
    pub base_sequence: String,
    pub link_site: Option<i64>,
    pub mod_accessions: Value,
    pub mod_positions: Value,
    pub mod_masses: Value,
    pub crosslinker_modmass: Option<f64>,
}

/// A `peptideevidence` row.
#[derive(Debug, Clone)]
pub struct StoredEvidence {
    pub upload_id: UploadId,
    pub peptide_id: i64,
    pub dbsequence_id: String,
    pub pep_start: Option<i64>,
    pub is_decoy: Option<bool>,
}

struct StoredUpload {
    record: UploadRecord,
    upload_time: String,
}

#[derive(Default)]
struct Tables {
    uploads: Vec<StoredUpload>,
    analysis_collections: Vec<AnalysisCollectionRecord>,
    protocols: Vec<ProtocolRecord>,
    matches: Vec<MatchRecord>,
    peptides: Vec<StoredPeptide>,
    evidence: Vec<StoredEvidence>,
    proteins: Vec<ProteinRecord>,
    spectra: Vec<(SpectrumKey, RawSpectrum)>,
}

struct Inner {
    tables: RwLock<Tables>,
    max_binds: usize,
    queries: Mutex<Vec<&'static str>>,
    fail_on: Mutex<Option<&'static str>>,
    open_sessions: AtomicUsize,
}

/// In-memory store for tests.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    /// `max_binds` bounds the simulated statement size for derived-key fetches.
    pub fn new(max_binds: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: RwLock::new(Tables::default()),
                max_binds,
                queries: Mutex::new(Vec::new()),
                fail_on: Mutex::new(None),
                open_sessions: AtomicUsize::new(0),
            }),
        }
    }

    pub fn insert_upload(&self, record: UploadRecord, upload_time: &str) {
        self.inner.tables.write().unwrap().uploads.push(StoredUpload {
            record,
            upload_time: upload_time.to_string(),
        });
    }

    pub fn insert_analysis_collection(&self, record: AnalysisCollectionRecord) {
        let mut tables = self.inner.tables.write().unwrap();
        tables.analysis_collections.push(record);
    }

    pub fn insert_protocol(&self, record: ProtocolRecord) {
        self.inner.tables.write().unwrap().protocols.push(record);
    }

    pub fn insert_match(&self, record: MatchRecord) {
        self.inner.tables.write().unwrap().matches.push(record);
    }

    pub fn insert_peptide(&self, peptide: StoredPeptide) {
        self.inner.tables.write().unwrap().peptides.push(peptide);
    }

    pub fn insert_evidence(&self, evidence: StoredEvidence) {
        self.inner.tables.write().unwrap().evidence.push(evidence);
    }

    pub fn insert_protein(&self, record: ProteinRecord) {
        self.inner.tables.write().unwrap().proteins.push(record);
    }

    pub fn insert_spectrum(&self, key: SpectrumKey, raw: RawSpectrum) {
        self.inner.tables.write().unwrap().spectra.push((key, raw));
    }

    /// Make every subsequent call of the named session method fail.
    pub fn fail_on(&self, operation: &'static str) {
        *self.inner.fail_on.lock().unwrap() = Some(operation);
    }

    /// Session methods called so far, one entry per statement.
    pub fn queries(&self) -> Vec<&'static str> {
        self.inner.queries.lock().unwrap().clone()
    }

    /// Sessions begun and not yet dropped.
    pub fn open_sessions(&self) -> usize {
        self.inner.open_sessions.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn ReadSession>> {
        if *self.inner.fail_on.lock().unwrap() == Some("begin") {
            bail!("injected failure in begin");
        }
        self.inner.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemorySession {
            inner: self.inner.clone(),
        }))
    }
}

struct InMemorySession {
    inner: Arc<Inner>,
}

impl InMemorySession {
    fn record(&self, operation: &'static str) -> Result<()> {
        if *self.inner.fail_on.lock().unwrap() == Some(operation) {
            bail!("injected failure in {}", operation);
        }
        self.inner.queries.lock().unwrap().push(operation);
        Ok(())
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.inner.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

fn link_site_positive(peptides: &[StoredPeptide], upload_id: UploadId, id: i64) -> bool {
    peptides
        .iter()
        .any(|p| p.upload_id == upload_id && p.id == id && p.link_site.is_some_and(|s| s > 0))
}

#[async_trait]
impl ReadSession for InMemorySession {
    async fn resolve_uploads(
        &mut self,
        project: &str,
        file: Option<&str>,
    ) -> Result<Vec<UploadId>> {
        self.record("resolve_uploads")?;
        let tables = self.inner.tables.read().unwrap();

        let mut latest: Vec<&StoredUpload> = Vec::new();
        for upload in tables.uploads.iter().filter(|u| {
            u.record.project_id == project
                && file.map_or(true, |f| u.record.identification_file_name == f)
        }) {
            let newer = |u: &StoredUpload, than: &StoredUpload| {
                (u.upload_time.as_str(), u.record.id) > (than.upload_time.as_str(), than.record.id)
            };
            match latest.iter_mut().find(|l| {
                l.record.identification_file_name == upload.record.identification_file_name
            }) {
                Some(slot) => {
                    if newer(upload, *slot) {
                        *slot = upload;
                    }
                }
                None => latest.push(upload),
            }
        }

        let mut ids: Vec<UploadId> = latest.iter().map(|u| u.record.id).collect();
        ids.sort();
        Ok(ids)
    }

    async fn uploads(&mut self, ids: &[UploadId]) -> Result<Vec<UploadRecord>> {
        self.record("uploads")?;
        let tables = self.inner.tables.read().unwrap();
        Ok(tables
            .uploads
            .iter()
            .filter(|u| ids.contains(&u.record.id))
            .map(|u| u.record.clone())
            .collect())
    }

    async fn analysis_collections(
        &mut self,
        ids: &[UploadId],
    ) -> Result<Vec<AnalysisCollectionRecord>> {
        self.record("analysis_collections")?;
        let tables = self.inner.tables.read().unwrap();
        Ok(tables
            .analysis_collections
            .iter()
            .filter(|ac| ids.contains(&ac.upload_id))
            .cloned()
            .collect())
    }

    async fn protocols(&mut self, ids: &[UploadId]) -> Result<Vec<ProtocolRecord>> {
        self.record("protocols")?;
        let tables = self.inner.tables.read().unwrap();
        Ok(tables
            .protocols
            .iter()
            .filter(|p| ids.contains(&p.upload_id))
            .cloned()
            .collect())
    }

    async fn matches(&mut self, ids: &[UploadId]) -> Result<Vec<MatchRecord>> {
        self.record("matches")?;
        let tables = self.inner.tables.read().unwrap();
        Ok(tables
            .matches
            .iter()
            .filter(|m| {
                ids.contains(&m.upload_id)
                    && m.pass_threshold
                    && link_site_positive(&tables.peptides, m.upload_id, m.pep1_id)
                    && m.pep2_id
                        .is_some_and(|p2| link_site_positive(&tables.peptides, m.upload_id, p2))
            })
            .cloned()
            .collect())
    }

    async fn peptides(&mut self, keys: &ScopedIdSet<i64>) -> Result<Vec<PeptideRecord>> {
        let mut out = Vec::new();
        for batch in keys.batches(self.inner.max_binds) {
            self.record("peptides")?;
            let tables = self.inner.tables.read().unwrap();
            for peptide in tables
                .peptides
                .iter()
                .filter(|p| batch.matches(p.upload_id, &p.id))
            {
                let evidence: Vec<&StoredEvidence> = tables
                    .evidence
                    .iter()
                    .filter(|e| e.upload_id == peptide.upload_id && e.peptide_id == peptide.id)
                    .collect();
                out.push(PeptideRecord {
                    id: peptide.id,
                    upload_id: peptide.upload_id,
                    base_sequence: peptide.base_sequence.clone(),
                    protein_refs: evidence.iter().map(|e| e.dbsequence_id.clone()).collect(),
                    positions: evidence.iter().map(|e| e.pep_start).collect(),
                    is_decoy: evidence.iter().map(|e| e.is_decoy).collect(),
                    link_site: peptide.link_site,
                    mod_accessions: peptide.mod_accessions.clone(),
                    mod_positions: peptide.mod_positions.clone(),
                    mod_masses: peptide.mod_masses.clone(),
                    crosslinker_modmass: peptide.crosslinker_modmass,
                });
            }
        }
        Ok(out)
    }

    async fn proteins(&mut self, keys: &ScopedIdSet<String>) -> Result<Vec<ProteinRecord>> {
        let mut out = Vec::new();
        for batch in keys.batches(self.inner.max_binds) {
            self.record("proteins")?;
            let tables = self.inner.tables.read().unwrap();
            out.extend(
                tables
                    .proteins
                    .iter()
                    .filter(|p| batch.matches(p.upload_id, &p.id))
                    .cloned(),
            );
        }
        Ok(out)
    }

    async fn spectrum(&mut self, key: &SpectrumKey) -> Result<Option<RawSpectrum>> {
        self.record("spectrum")?;
        let tables = self.inner.tables.read().unwrap();
        Ok(tables
            .spectra
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, raw)| raw.clone()))
    }

    async fn finish(&mut self) -> Result<()> {
        self.record("finish")
    }
}
