//! SQLite-backed [`Store`] implementation.
//!
//! [`SqliteStore::begin`] takes one connection from the pool and opens a
//! transaction on it; the resulting [`ReadSession`] runs every query of the
//! request serially on that transaction. Dropping the session rolls back and
//! returns the connection to the pool, so a failed or cancelled request
//! never leaks it.
//!
//! Derived-key fetches (peptides, proteins) render one statement per
//! [`KeyBatch`](xiview_data_core::compose::KeyBatch), bounded by
//! `db.max_bind_params`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;

use xiview_data_core::compose::ScopedIdSet;
use xiview_data_core::keys::{SpectrumKey, UploadId};
use xiview_data_core::models::{
    AnalysisCollectionRecord, MatchRecord, PeptideRecord, ProteinRecord, ProtocolRecord,
    RawSpectrum, UploadRecord,
};
use xiview_data_core::store::{ReadSession, Store};

use crate::config::Config;
use crate::db;
use crate::query::{push_scoped_filter, push_upload_filter};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
    max_bind_params: usize,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, max_bind_params: usize) -> Self {
        Self {
            pool,
            max_bind_params,
        }
    }

    /// Open the configured database read-only.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        Ok(Self::new(pool, config.db.max_bind_params))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn ReadSession>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteSession {
            tx: Some(tx),
            max_bind_params: self.max_bind_params,
        }))
    }
}

struct SqliteSession {
    tx: Option<Transaction<'static, Sqlite>>,
    max_bind_params: usize,
}

impl SqliteSession {
    fn conn(&mut self) -> Result<&mut SqliteConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| anyhow!("read session already finished"))
    }
}

/// Parse a JSON text column, passing non-JSON text through as a string.
fn json_column(row: &SqliteRow, column: &str) -> Result<Value> {
    let text: Option<String> = row.try_get(column)?;
    Ok(parse_json_text(column, text))
}

fn parse_json_text(column: &str, text: Option<String>) -> Value {
    let Some(text) = text else {
        return Value::Null;
    };
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            debug!(column, error = %e, "column is not JSON, passing through as text");
            Value::String(text)
        }
    }
}

/// Parse a `json_group_array` aggregate.
fn aggregated<T: serde::de::DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<Vec<T>> {
    let text: String = row.try_get(column)?;
    serde_json::from_str(&text).with_context(|| format!("malformed aggregate in column {}", column))
}

fn upload_from_row(row: &SqliteRow) -> Result<UploadRecord> {
    Ok(UploadRecord {
        id: UploadId::new(row.try_get("id")?),
        project_id: row.try_get("project_id")?,
        identification_file_name: row.try_get("identification_file_name")?,
        provider: json_column(row, "provider")?,
        audits: json_column(row, "audits")?,
        samples: json_column(row, "samples")?,
        bib: json_column(row, "bib")?,
        spectra_formats: json_column(row, "spectra_formats")?,
        contains_crosslinks: row.try_get("contains_crosslinks")?,
        warnings: json_column(row, "warnings")?,
    })
}

fn analysis_collection_from_row(row: &SqliteRow) -> Result<AnalysisCollectionRecord> {
    Ok(AnalysisCollectionRecord {
        upload_id: UploadId::new(row.try_get("upload_id")?),
        spectrum_identification_list_ref: row.try_get("spectrum_identification_list_ref")?,
        spectrum_identification_protocol_ref: row.try_get("spectrum_identification_protocol_ref")?,
        spectra_data_ref: row.try_get("spectra_data_ref")?,
    })
}

fn protocol_from_row(row: &SqliteRow) -> Result<ProtocolRecord> {
    Ok(ProtocolRecord {
        id: row.try_get("id")?,
        upload_id: UploadId::new(row.try_get("upload_id")?),
        frag_tol: json_column(row, "frag_tol")?,
        search_params: json_column(row, "search_params")?,
        analysis_software: json_column(row, "analysis_software")?,
        threshold: json_column(row, "threshold")?,
    })
}

fn match_from_row(row: &SqliteRow) -> Result<MatchRecord> {
    Ok(MatchRecord {
        id: row.try_get("id")?,
        pep1_id: row.try_get("pep1_id")?,
        pep2_id: row.try_get("pep2_id")?,
        scores: json_column(row, "scores")?,
        upload_id: UploadId::new(row.try_get("upload_id")?),
        calc_mz: row.try_get("calc_mz")?,
        charge_state: row.try_get("charge_state")?,
        exp_mz: row.try_get("exp_mz")?,
        spectrum_id: row.try_get("spectrum_id")?,
        spectra_data_ref: row.try_get("spectra_data_ref")?,
        pass_threshold: row.try_get("pass_threshold")?,
        rank: row.try_get("rank")?,
        sil_id: row.try_get("sil_id")?,
    })
}

fn peptide_from_row(row: &SqliteRow) -> Result<PeptideRecord> {
    let is_decoy: Vec<Option<i64>> = aggregated(row, "is_decoy")?;
    Ok(PeptideRecord {
        id: row.try_get("id")?,
        upload_id: UploadId::new(row.try_get("upload_id")?),
        base_sequence: row.try_get("base_sequence")?,
        protein_refs: aggregated(row, "prt")?,
        positions: aggregated(row, "pos")?,
        is_decoy: is_decoy.into_iter().map(|d| d.map(|v| v != 0)).collect(),
        link_site: row.try_get("link_site1")?,
        mod_accessions: json_column(row, "mod_accessions")?,
        mod_positions: json_column(row, "mod_positions")?,
        mod_masses: json_column(row, "mod_monoiso_mass_deltas")?,
        crosslinker_modmass: row.try_get("crosslinker_modmass")?,
    })
}

fn protein_from_row(row: &SqliteRow) -> Result<ProteinRecord> {
    Ok(ProteinRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        accession: row.try_get("accession")?,
        sequence: row.try_get("sequence")?,
        upload_id: UploadId::new(row.try_get("upload_id")?),
        description: row.try_get("description")?,
    })
}

#[async_trait]
impl ReadSession for SqliteSession {
    async fn resolve_uploads(
        &mut self,
        project: &str,
        file: Option<&str>,
    ) -> Result<Vec<UploadId>> {
        let conn = self.conn()?;
        let ids: Vec<i64> = match file {
            Some(file) => {
                sqlx::query_scalar(
                    r#"
                    SELECT id FROM upload
                    WHERE project_id = ? AND identification_file_name = ?
                    ORDER BY upload_time DESC, id DESC
                    LIMIT 1
                    "#,
                )
                .bind(project)
                .bind(file)
                .fetch_all(conn)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    r#"
                    SELECT u.id FROM upload u
                    WHERE u.project_id = ?
                      AND u.id = (
                          SELECT u2.id FROM upload u2
                          WHERE u2.project_id = u.project_id
                            AND u2.identification_file_name = u.identification_file_name
                          ORDER BY u2.upload_time DESC, u2.id DESC
                          LIMIT 1
                      )
                    ORDER BY u.id
                    "#,
                )
                .bind(project)
                .fetch_all(conn)
                .await?
            }
        };
        Ok(ids.into_iter().map(UploadId::new).collect())
    }

    async fn uploads(&mut self, ids: &[UploadId]) -> Result<Vec<UploadRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            r#"SELECT u.id, u.project_id, u.identification_file_name, u.provider, u.audits,
                u.samples, u.bib, u.spectra_formats, u.contains_crosslinks,
                u.upload_warnings AS warnings
            FROM upload u WHERE "#,
        );
        push_upload_filter(&mut builder, "u.id", ids);
        builder.push(" ORDER BY u.id");
        let rows = builder.build().fetch_all(self.conn()?).await?;
        rows.iter().map(upload_from_row).collect()
    }

    async fn analysis_collections(
        &mut self,
        ids: &[UploadId],
    ) -> Result<Vec<AnalysisCollectionRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            r#"SELECT ac.upload_id, ac.spectrum_identification_list_ref,
                ac.spectrum_identification_protocol_ref, ac.spectra_data_ref
            FROM analysiscollection ac WHERE "#,
        );
        push_upload_filter(&mut builder, "ac.upload_id", ids);
        builder.push(" ORDER BY ac.upload_id, ac.spectrum_identification_list_ref");
        let rows = builder.build().fetch_all(self.conn()?).await?;
        rows.iter().map(analysis_collection_from_row).collect()
    }

    async fn protocols(&mut self, ids: &[UploadId]) -> Result<Vec<ProtocolRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            r#"SELECT sip.id, sip.upload_id, sip.frag_tol, sip.search_params,
                sip.analysis_software, sip.threshold
            FROM spectrumidentificationprotocol sip WHERE "#,
        );
        push_upload_filter(&mut builder, "sip.upload_id", ids);
        builder.push(" ORDER BY sip.upload_id, sip.id");
        let rows = builder.build().fetch_all(self.conn()?).await?;
        rows.iter().map(protocol_from_row).collect()
    }

    async fn matches(&mut self, ids: &[UploadId]) -> Result<Vec<MatchRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            r#"SELECT si.id, si.pep1_id, si.pep2_id, si.scores, si.upload_id,
                si.calc_mz, si.charge_state, si.exp_mz, si.spectrum_id,
                si.spectra_data_ref, si.pass_threshold, si.rank, si.sil_id
            FROM spectrumidentification si
            INNER JOIN modifiedpeptide mp1
                ON si.pep1_id = mp1.id AND si.upload_id = mp1.upload_id
            INNER JOIN modifiedpeptide mp2
                ON si.pep2_id = mp2.id AND si.upload_id = mp2.upload_id
            WHERE "#,
        );
        push_upload_filter(&mut builder, "si.upload_id", ids);
        builder.push(
            r#"
              AND si.pass_threshold = 1
              AND mp1.link_site1 > 0
              AND mp2.link_site1 > 0
            ORDER BY si.upload_id, si.id"#,
        );
        let rows = builder.build().fetch_all(self.conn()?).await?;
        rows.iter().map(match_from_row).collect()
    }

    async fn peptides(&mut self, keys: &ScopedIdSet<i64>) -> Result<Vec<PeptideRecord>> {
        let max_binds = self.max_bind_params;
        let mut out = Vec::with_capacity(keys.len());
        for batch in keys.batches(max_binds) {
            let mut builder = QueryBuilder::<Sqlite>::new(
                r#"SELECT mp.id, mp.upload_id, mp.base_sequence,
                    json_group_array(pe.dbsequence_id) FILTER (WHERE pe.dbsequence_id IS NOT NULL) AS prt,
                    json_group_array(pe.pep_start) FILTER (WHERE pe.dbsequence_id IS NOT NULL) AS pos,
                    json_group_array(pe.is_decoy) FILTER (WHERE pe.dbsequence_id IS NOT NULL) AS is_decoy,
                    mp.link_site1, mp.mod_accessions, mp.mod_positions,
                    mp.mod_monoiso_mass_deltas, mp.crosslinker_modmass
                FROM modifiedpeptide mp
                LEFT JOIN peptideevidence pe
                    ON mp.id = pe.peptide_id AND mp.upload_id = pe.upload_id
                WHERE "#,
            );
            push_scoped_filter(&mut builder, "mp.upload_id", "mp.id", &batch);
            builder.push(" GROUP BY mp.upload_id, mp.id");
            debug!(sql = builder.sql(), binds = batch.bind_count(), "peptide batch");

            let rows = builder.build().fetch_all(self.conn()?).await?;
            for row in &rows {
                out.push(peptide_from_row(row)?);
            }
        }
        Ok(out)
    }

    async fn proteins(&mut self, keys: &ScopedIdSet<String>) -> Result<Vec<ProteinRecord>> {
        let max_binds = self.max_bind_params;
        let mut out = Vec::with_capacity(keys.len());
        for batch in keys.batches(max_binds) {
            let mut builder = QueryBuilder::<Sqlite>::new(
                "SELECT id, name, accession, sequence, upload_id, description FROM dbsequence WHERE ",
            );
            push_scoped_filter(&mut builder, "upload_id", "id", &batch);
            debug!(sql = builder.sql(), binds = batch.bind_count(), "protein batch");

            let rows = builder.build().fetch_all(self.conn()?).await?;
            for row in &rows {
                out.push(protein_from_row(row)?);
            }
        }
        Ok(out)
    }

    async fn spectrum(&mut self, key: &SpectrumKey) -> Result<Option<RawSpectrum>> {
        let row = sqlx::query(
            "SELECT intensity, mz FROM spectrum WHERE id = ? AND spectra_data_ref = ? AND upload_id = ?",
        )
        .bind(&key.spectrum_id)
        .bind(&key.spectra_data_ref)
        .bind(key.upload_id.get())
        .fetch_optional(self.conn()?)
        .await?;

        row.map(|row| {
            Ok(RawSpectrum {
                intensity: row.try_get("intensity")?,
                mz: row.try_get("mz")?,
            })
        })
        .transpose()
    }

    async fn finish(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_text_is_parsed() {
        let value = parse_json_text("scores", Some(r#"{"score": 10.5}"#.to_string()));
        assert_eq!(value, json!({"score": 10.5}));
    }

    #[test]
    fn test_null_column_is_null() {
        assert_eq!(parse_json_text("bib", None), Value::Null);
    }

    #[test]
    fn test_malformed_json_passes_through_as_text() {
        let value = parse_json_text("frag_tol", Some("20 ppm".to_string()));
        assert_eq!(value, Value::String("20 ppm".to_string()));
    }
}
