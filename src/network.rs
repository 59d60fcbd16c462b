//! Network data retrieval for a project.
//!
//! Used by both the `xiview network` CLI command and `GET /get_data`.

use anyhow::Result;
use xiview_data_core::assemble::{fetch_network_data, UploadSelection};
use xiview_data_core::error::FetchError;
use xiview_data_core::models::NetworkData;
use xiview_data_core::store::Store;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Assemble the network data for `project`, narrowed to one file if given.
pub async fn get_network_data(
    store: &dyn Store,
    project: &str,
    file: Option<&str>,
) -> Result<NetworkData, FetchError> {
    let selection = UploadSelection::Project {
        project: project.to_string(),
        file: file.map(str::to_string),
    };
    fetch_network_data(store, &selection).await
}

/// CLI entry point: prints the assembled result as one line of JSON.
pub async fn run_network(config: &Config, project: &str, file: Option<&str>) -> Result<()> {
    let store = SqliteStore::connect(config).await?;
    let result = get_network_data(&store, project, file).await;
    store.close().await;

    let data = result?;
    println!("{}", serde_json::to_string(&data)?);
    Ok(())
}
