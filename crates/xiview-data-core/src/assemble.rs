//! Network document assembly.
//!
//! [`fetch_network_data`] walks the identification graph outward from the
//! resolved uploads, one stage at a time on a single [`ReadSession`]:
//!
//! ```text
//! Resolving → FetchingMetadata → FetchingMatches → FetchingPeptides
//!           → FetchingProteins → Assembled
//! ```
//!
//! Each stage's query depends on the previous stage's output, so stages run
//! strictly in order. Peptide keys are derived from the matches and protein
//! keys from the peptides' evidence arrays, always scoped by upload.
//!
//! The session is owned by this function. A storage failure in any stage
//! returns [`FetchError::Storage`] tagged with that stage; the session is
//! dropped on the way out, which releases its connection and discards the
//! unit of work. No partial document is ever returned and nothing is
//! retried.

use tracing::{debug, info, warn};

use crate::compose::ScopedIdSet;
use crate::error::{FetchError, Stage};
use crate::keys::{SpectrumKey, UploadId};
use crate::models::{MatchRecord, Metadata, NetworkData, PeptideRecord, Peaklist};
use crate::peaklist;
use crate::store::{ReadSession, Store};

/// Which uploads a network request covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSelection {
    /// Resolve a dataset accession, optionally narrowed to one file.
    Project {
        project: String,
        file: Option<String>,
    },
    /// Explicit upload ids, skipping resolution.
    Uploads(Vec<UploadId>),
}

/// Peptide keys referenced by the matches: each match's first peptide and,
/// if present, its second, under the match's own upload.
pub fn peptide_keys(matches: &[MatchRecord]) -> ScopedIdSet<i64> {
    matches.iter().flat_map(MatchRecord::peptide_keys).collect()
}

/// Protein keys referenced by any evidence entry of the peptides.
pub fn protein_keys(peptides: &[PeptideRecord]) -> ScopedIdSet<String> {
    peptides.iter().flat_map(PeptideRecord::protein_keys).collect()
}

/// Assemble the network document for `selection`.
///
/// An empty upload set yields an empty document without issuing any
/// metadata, match, peptide or protein query.
pub async fn fetch_network_data(
    store: &dyn Store,
    selection: &UploadSelection,
) -> Result<NetworkData, FetchError> {
    let mut session = store
        .begin()
        .await
        .map_err(FetchError::storage(Stage::Resolving))
        .inspect_err(|e| warn!(error = %e, "could not open read session"))?;

    let data = assemble(session.as_mut(), selection)
        .await
        .inspect_err(|e| warn!(error = ?e, "network assembly failed"))?;

    session
        .finish()
        .await
        .map_err(FetchError::storage(Stage::Assembled))?;

    info!(
        matches = data.matches.len(),
        peptides = data.peptides.len(),
        proteins = data.proteins.len(),
        "network data assembled"
    );
    Ok(data)
}

async fn assemble(
    session: &mut dyn ReadSession,
    selection: &UploadSelection,
) -> Result<NetworkData, FetchError> {
    let uploads = match selection {
        UploadSelection::Project { project, file } => session
            .resolve_uploads(project, file.as_deref())
            .await
            .map_err(FetchError::storage(Stage::Resolving))?,
        UploadSelection::Uploads(ids) => ids.clone(),
    };
    debug!(uploads = ?uploads, "resolved uploads");

    if uploads.is_empty() {
        return Ok(NetworkData::default());
    }

    let metadata = fetch_metadata(session, &uploads)
        .await
        .map_err(FetchError::storage(Stage::FetchingMetadata))?;
    debug!(files = metadata.uploads.len(), "fetched metadata");

    let matches = session
        .matches(&uploads)
        .await
        .map_err(FetchError::storage(Stage::FetchingMatches))?;
    debug!(count = matches.len(), "fetched matches");

    let peptide_ids = peptide_keys(&matches);
    let peptides = if peptide_ids.is_empty() {
        Vec::new()
    } else {
        session
            .peptides(&peptide_ids)
            .await
            .map_err(FetchError::storage(Stage::FetchingPeptides))?
    };
    debug!(requested = peptide_ids.len(), count = peptides.len(), "fetched peptides");

    let protein_ids = protein_keys(&peptides);
    let proteins = if protein_ids.is_empty() {
        Vec::new()
    } else {
        session
            .proteins(&protein_ids)
            .await
            .map_err(FetchError::storage(Stage::FetchingProteins))?
    };
    debug!(requested = protein_ids.len(), count = proteins.len(), "fetched proteins");

    Ok(NetworkData {
        metadata,
        matches,
        peptides,
        proteins,
    })
}

async fn fetch_metadata(
    session: &mut dyn ReadSession,
    uploads: &[UploadId],
) -> anyhow::Result<Metadata> {
    Ok(Metadata {
        uploads: session.uploads(uploads).await?,
        analysis_collections: session.analysis_collections(uploads).await?,
        spectrum_identification_protocols: session.protocols(uploads).await?,
    })
}

/// Fetch and decode one spectrum's peaklist.
///
/// A missing row is [`FetchError::SpectrumNotFound`] and a malformed blob is
/// [`FetchError::Decode`]; neither is reported as an empty peaklist.
pub async fn fetch_peaklist(store: &dyn Store, key: &SpectrumKey) -> Result<Peaklist, FetchError> {
    let storage = FetchError::storage(Stage::FetchingSpectrum);
    let mut session = store.begin().await.map_err(storage)?;

    let raw = session
        .spectrum(key)
        .await
        .map_err(FetchError::storage(Stage::FetchingSpectrum))?
        .ok_or_else(|| FetchError::SpectrumNotFound(key.clone()))?;
    session
        .finish()
        .await
        .map_err(FetchError::storage(Stage::FetchingSpectrum))?;

    let peaks = peaklist::decode_spectrum(&raw)?;
    debug!(%key, peaks = peaks.mz.len(), "decoded peaklist");
    Ok(peaks)
}
