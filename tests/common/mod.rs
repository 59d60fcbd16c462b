#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use tempfile::TempDir;
use xiview_data::config::{load_config, Config};
use xiview_data::{db, schema};
use xiview_data_core::peaklist::encode;

pub const PROJECT: &str = "PXD000001";

/// Write a config into a fresh temp dir. The database file does not exist yet.
pub fn setup_test_env(max_bind_params: usize) -> (TempDir, PathBuf, Config) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/xiview.sqlite"
max_connections = 2
max_bind_params = {}

[server]
bind = "127.0.0.1:0"

[logging]
filter = "warn"
"#,
        root.display(),
        max_bind_params
    );

    let config_path = config_dir.join("xiview.toml");
    fs::write(&config_path, config_content).unwrap();
    let config = load_config(&config_path).unwrap();

    (tmp, config_path, config)
}

/// Create the schema and load the fixture below.
///
/// Project `PXD000001`:
/// - upload 1: `a.mzid`, superseded by upload 2
/// - upload 2: `a.mzid`, latest
/// - upload 3: `b.mzid`
///
/// Project `PXD000002`:
/// - upload 4: `a.mzid`
///
/// Uploads 2 and 3 reuse the same local peptide ids and the protein id
/// `P1` for different rows.
pub async fn seed(config: &Config) {
    let pool = db::connect_writable(config).await.unwrap();
    schema::create_tables(&pool).await.unwrap();

    insert_upload(&pool, 1, PROJECT, "a.mzid", "2024-01-01 10:00:00").await;
    insert_upload(&pool, 2, PROJECT, "a.mzid", "2024-02-01 10:00:00").await;
    insert_upload(&pool, 3, PROJECT, "b.mzid", "2024-01-15 10:00:00").await;
    insert_upload(&pool, 4, "PXD000002", "a.mzid", "2024-03-01 10:00:00").await;

    for upload in 1..=4 {
        sqlx::query(
            "INSERT INTO analysiscollection VALUES (?, 'SIL_1', 'SIP_1', 'SD_1')",
        )
        .bind(upload)
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            r#"INSERT INTO spectrumidentificationprotocol VALUES
               ('SIP_1', ?, '{"value": 20, "unit": "ppm"}', '{"crosslinker": "BS3"}',
                '{"name": "xiSEARCH"}', '[{"name": "FDR", "value": 0.05}]')"#,
        )
        .bind(upload)
        .execute(&pool)
        .await
        .unwrap();
    }

    // upload 1 (superseded)
    insert_peptide(&pool, 1, 1, "OLDPEPK", Some(2)).await;
    insert_peptide(&pool, 1, 2, "OLDLINKK", Some(3)).await;
    insert_protein(&pool, 1, "P1", "Q_OLD").await;
    insert_evidence(&pool, 1, 1, "P1", 1, false).await;
    insert_match(&pool, 1, "SII_1", 1, Some(2), true).await;

    // upload 2
    insert_peptide(&pool, 2, 1, "PEPTIDEK", Some(3)).await;
    insert_peptide(&pool, 2, 2, "LINKERK", Some(2)).await;
    insert_peptide(&pool, 2, 3, "NOLINK", Some(0)).await;
    insert_peptide(&pool, 2, 4, "ORPHANK", Some(1)).await;
    insert_protein(&pool, 2, "P1", "Q2_A").await;
    insert_protein(&pool, 2, "P2", "Q2_B").await;
    insert_protein(&pool, 2, "P3", "Q2_UNUSED").await;
    insert_evidence(&pool, 2, 1, "P1", 10, false).await;
    insert_evidence(&pool, 2, 1, "P2", 40, true).await;
    insert_evidence(&pool, 2, 2, "P2", 5, false).await;
    insert_match(&pool, 2, "SII_1", 1, Some(2), true).await;
    insert_match(&pool, 2, "SII_2", 1, Some(3), true).await;
    insert_match(&pool, 2, "SII_3", 1, Some(2), false).await;
    insert_match(&pool, 2, "SII_4", 1, None, true).await;

    // upload 3
    insert_peptide(&pool, 3, 1, "SAMEIDK", Some(1)).await;
    insert_peptide(&pool, 3, 2, "OTHERK", Some(4)).await;
    insert_protein(&pool, 3, "P1", "Q3_A").await;
    insert_protein(&pool, 3, "P9", "Q3_B").await;
    insert_evidence(&pool, 3, 1, "P1", 7, false).await;
    insert_evidence(&pool, 3, 2, "P9", 70, false).await;
    insert_match(&pool, 3, "SII_1", 1, Some(2), true).await;

    // upload 4 (other project)
    insert_peptide(&pool, 4, 1, "FOREIGNK", Some(1)).await;
    insert_peptide(&pool, 4, 2, "FOREIGNR", Some(1)).await;
    insert_match(&pool, 4, "SII_1", 1, Some(2), true).await;

    insert_spectrum(
        &pool,
        2,
        "index=1",
        encode(&[1.0, 2.5]),
        encode(&[100.5, 200.25]),
    )
    .await;
    insert_spectrum(&pool, 2, "index=2", encode(&[1.0]), vec![0u8; 12]).await;

    pool.close().await;
}

async fn insert_upload(pool: &SqlitePool, id: i64, project: &str, file: &str, time: &str) {
    sqlx::query(
        r#"INSERT INTO upload
           (id, project_id, identification_file_name, provider, audits, samples, bib,
            spectra_formats, contains_crosslinks, upload_warnings, upload_time)
           VALUES (?, ?, ?, '{"id": "PROVIDER"}', '{}', '{}', '[]', '[]', 1, '[]', ?)"#,
    )
    .bind(id)
    .bind(project)
    .bind(file)
    .bind(time)
    .execute(pool)
    .await
    .unwrap();
}

async fn insert_peptide(
    pool: &SqlitePool,
    upload: i64,
    id: i64,
    sequence: &str,
    link_site: Option<i64>,
) {
    sqlx::query(
        r#"INSERT INTO modifiedpeptide
           (id, upload_id, base_sequence, mod_accessions, mod_positions,
            mod_monoiso_mass_deltas, link_site1, crosslinker_modmass)
           VALUES (?, ?, ?, '[]', '[]', '[]', ?, 138.068)"#,
    )
    .bind(id)
    .bind(upload)
    .bind(sequence)
    .bind(link_site)
    .execute(pool)
    .await
    .unwrap();
}

async fn insert_protein(pool: &SqlitePool, upload: i64, id: &str, accession: &str) {
    sqlx::query(
        "INSERT INTO dbsequence (id, upload_id, accession, name, description, sequence) \
         VALUES (?, ?, ?, NULL, NULL, 'MKPEPTIDEK')",
    )
    .bind(id)
    .bind(upload)
    .bind(accession)
    .execute(pool)
    .await
    .unwrap();
}

async fn insert_evidence(
    pool: &SqlitePool,
    upload: i64,
    peptide: i64,
    protein: &str,
    start: i64,
    decoy: bool,
) {
    sqlx::query(
        "INSERT INTO peptideevidence (upload_id, peptide_id, dbsequence_id, pep_start, is_decoy) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(upload)
    .bind(peptide)
    .bind(protein)
    .bind(start)
    .bind(decoy)
    .execute(pool)
    .await
    .unwrap();
}

async fn insert_match(
    pool: &SqlitePool,
    upload: i64,
    id: &str,
    pep1: i64,
    pep2: Option<i64>,
    pass: bool,
) {
    sqlx::query(
        r#"INSERT INTO spectrumidentification
           (id, upload_id, spectrum_id, spectra_data_ref, pep1_id, pep2_id, charge_state,
            pass_threshold, rank, scores, exp_mz, calc_mz, sil_id)
           VALUES (?, ?, 'index=1', 'SD_1', ?, ?, 3, ?, 1, '{"score": 10.5}', 512.26, 512.25, 'SIL_1')"#,
    )
    .bind(id)
    .bind(upload)
    .bind(pep1)
    .bind(pep2)
    .bind(pass)
    .execute(pool)
    .await
    .unwrap();
}

async fn insert_spectrum(pool: &SqlitePool, upload: i64, id: &str, intensity: Vec<u8>, mz: Vec<u8>) {
    sqlx::query(
        "INSERT INTO spectrum (id, spectra_data_ref, upload_id, intensity, mz) VALUES (?, 'SD_1', ?, ?, ?)",
    )
    .bind(id)
    .bind(upload)
    .bind(intensity)
    .bind(mz)
    .execute(pool)
    .await
    .unwrap();
}

pub fn xiview_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("xiview");
    path
}

pub fn config_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}
