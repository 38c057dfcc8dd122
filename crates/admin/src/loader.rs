//! JSON input files for the admin tool.

use std::path::Path;

use anyhow::{Context, Result};
use hazseg_core::catalog::ReferenceData;
use hazseg_core::seeder::{CompatibilityMatrix, RegulatoryTable};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// A shipment file: either a bare list of UN numbers or an object with a
/// `un_numbers` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ShipmentFile {
    List(Vec<String>),
    Manifest { un_numbers: Vec<String> },
}

pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

pub async fn load_reference_data(path: &Path) -> Result<ReferenceData> {
    let data: ReferenceData = load_json(path).await?;
    tracing::debug!(
        path = %path.display(),
        groups = data.groups.len(),
        items = data.items.len(),
        "Loaded reference data"
    );
    Ok(data)
}

pub async fn load_matrix(path: &Path) -> Result<CompatibilityMatrix> {
    load_json(path).await
}

pub async fn load_regulatory_table(path: &Path) -> Result<RegulatoryTable> {
    load_json(path).await
}

pub async fn load_shipment(path: &Path) -> Result<Vec<String>> {
    let file: ShipmentFile = load_json(path).await?;
    Ok(match file {
        ShipmentFile::List(un_numbers) | ShipmentFile::Manifest { un_numbers } => un_numbers,
    })
}
