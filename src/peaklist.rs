//! Peaklist retrieval for a single spectrum.
//!
//! Used by both the `xiview peaklist` CLI command and `GET /get_peaklist`.

use anyhow::Result;
use xiview_data_core::assemble::fetch_peaklist;
use xiview_data_core::error::FetchError;
use xiview_data_core::keys::{SpectrumKey, UploadId};
use xiview_data_core::models::Peaklist;
use xiview_data_core::store::Store;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Core peaklist lookup (used by CLI and server).
pub async fn get_peaklist(
    store: &dyn Store,
    spectrum_id: &str,
    spectra_data_ref: &str,
    upload_id: i64,
) -> Result<Peaklist, FetchError> {
    let key = SpectrumKey {
        spectrum_id: spectrum_id.to_string(),
        spectra_data_ref: spectra_data_ref.to_string(),
        upload_id: UploadId::new(upload_id),
    };
    fetch_peaklist(store, &key).await
}

/// CLI entry point: prints `{"intensity": [...], "mz": [...]}`.
pub async fn run_peaklist(
    config: &Config,
    spectrum_id: &str,
    spectra_data_ref: &str,
    upload_id: i64,
) -> Result<()> {
    let store = SqliteStore::connect(config).await?;
    let result = get_peaklist(&store, spectrum_id, spectra_data_ref, upload_id).await;
    store.close().await;

    let peaks = result?;
    println!("{}", serde_json::to_string(&peaks)?);
    Ok(())
}
