//! Development schema bootstrap.
//!
//! In production the tables below are created and filled by the mzIdentML
//! converter. `xiview init` creates the same tables in an empty SQLite file
//! so the service and its tests can run against a local fixture.
//!
//! JSON-valued columns hold JSON text; booleans are `INTEGER` 0/1; peak
//! arrays are little-endian `f64` blobs.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS upload (
        id INTEGER PRIMARY KEY,
        project_id TEXT NOT NULL,
        identification_file_name TEXT NOT NULL,
        provider TEXT,
        audits TEXT,
        samples TEXT,
        bib TEXT,
        spectra_formats TEXT,
        contains_crosslinks INTEGER,
        upload_warnings TEXT,
        upload_time TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS analysiscollection (
        upload_id INTEGER NOT NULL REFERENCES upload(id),
        spectrum_identification_list_ref TEXT NOT NULL,
        spectrum_identification_protocol_ref TEXT NOT NULL,
        spectra_data_ref TEXT NOT NULL,
        PRIMARY KEY (upload_id, spectrum_identification_list_ref, spectra_data_ref)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS spectrumidentificationprotocol (
        id TEXT NOT NULL,
        upload_id INTEGER NOT NULL REFERENCES upload(id),
        frag_tol TEXT,
        search_params TEXT,
        analysis_software TEXT,
        threshold TEXT,
        PRIMARY KEY (id, upload_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS modifiedpeptide (
        id INTEGER NOT NULL,
        upload_id INTEGER NOT NULL REFERENCES upload(id),
        base_sequence TEXT NOT NULL,
        mod_accessions TEXT,
        mod_positions TEXT,
        mod_monoiso_mass_deltas TEXT,
        link_site1 INTEGER,
        crosslinker_modmass REAL,
        PRIMARY KEY (id, upload_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dbsequence (
        id TEXT NOT NULL,
        upload_id INTEGER NOT NULL REFERENCES upload(id),
        accession TEXT NOT NULL,
        name TEXT,
        description TEXT,
        sequence TEXT,
        PRIMARY KEY (id, upload_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS peptideevidence (
        upload_id INTEGER NOT NULL REFERENCES upload(id),
        peptide_id INTEGER NOT NULL,
        dbsequence_id TEXT NOT NULL,
        pep_start INTEGER NOT NULL,
        is_decoy INTEGER,
        PRIMARY KEY (upload_id, peptide_id, dbsequence_id, pep_start),
        FOREIGN KEY (peptide_id, upload_id) REFERENCES modifiedpeptide(id, upload_id),
        FOREIGN KEY (dbsequence_id, upload_id) REFERENCES dbsequence(id, upload_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS spectrumidentification (
        id TEXT NOT NULL,
        upload_id INTEGER NOT NULL REFERENCES upload(id),
        spectrum_id TEXT NOT NULL,
        spectra_data_ref TEXT NOT NULL,
        pep1_id INTEGER NOT NULL,
        pep2_id INTEGER,
        charge_state INTEGER,
        pass_threshold INTEGER NOT NULL,
        rank INTEGER,
        scores TEXT,
        exp_mz REAL,
        calc_mz REAL,
        sil_id TEXT,
        PRIMARY KEY (id, upload_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS spectrum (
        id TEXT NOT NULL,
        spectra_data_ref TEXT NOT NULL,
        upload_id INTEGER NOT NULL REFERENCES upload(id),
        intensity BLOB NOT NULL,
        mz BLOB NOT NULL,
        PRIMARY KEY (id, spectra_data_ref, upload_id)
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_peptideevidence_upload_peptide ON peptideevidence(upload_id, peptide_id)",
    "CREATE INDEX IF NOT EXISTS idx_spectrumidentification_upload ON spectrumidentification(upload_id)",
    "CREATE INDEX IF NOT EXISTS idx_upload_project ON upload(project_id, identification_file_name)",
];

/// Create every table and index the service reads. Idempotent.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    for ddl in TABLES.iter().chain(INDEXES) {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}

/// `xiview init`: create the schema in the configured database file.
pub async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect_writable(config).await?;
    create_tables(&pool).await?;
    pool.close().await;
    Ok(())
}
