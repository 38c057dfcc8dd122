//! One admin run: import, seed, publish, plan, report.

use anyhow::{Context, Result};
use chrono::Utc;
use hazseg_core::catalog::{ImportSummary, ItemCatalog};
use hazseg_core::planner::{BatchSegregationPlanner, ShipmentReport};
use hazseg_core::seeder::{RuleSeeder, SeedSummary};
use hazseg_core::store::SharedRuleStore;
use hazseg_core::types::Timestamp;
use serde::Serialize;

use crate::config::AdminConfig;
use crate::loader;

/// What seeding did to the rule store.
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub groups: SeedSummary,
    /// Source of the seeded matrix, absent when none was seeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<SeedSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regulatory: Option<SeedSummary>,
    /// Rules created or updated across all seeding steps.
    pub rules_changed: usize,
    pub rule_store_version: u64,
    pub rule_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminReport {
    pub generated_at: Timestamp,
    pub catalog: ImportSummary,
    pub seed: SeedReport,
    pub shipment: ShipmentReport,
}

/// Run every step against fresh state. Any load or seeding failure aborts
/// the run before a report is produced.
pub async fn generate(config: &AdminConfig) -> Result<AdminReport> {
    let reference = loader::load_reference_data(&config.reference_data_path).await?;
    let mut catalog = ItemCatalog::new();
    let imported = catalog
        .import(&reference)
        .with_context(|| format!("importing {}", config.reference_data_path.display()))?;

    let shared = SharedRuleStore::default();
    let seeder = RuleSeeder::new(&shared);

    let (_, groups) = seeder
        .register_groups(catalog.groups())
        .context("registering catalog segregation groups")?;

    let matrix = match &config.matrix_path {
        Some(path) => Some(loader::load_matrix(path).await?),
        None if config.skip_canonical_matrix => {
            tracing::info!("Skipping canonical matrix");
            None
        }
        None => Some(hazseg_core::seeder::canonical_matrix()),
    };
    let matrix_source = matrix.as_ref().map(|m| {
        m.source_regulation
            .clone()
            .unwrap_or_else(|| "unspecified".to_string())
    });
    let matrix_summary = match &matrix {
        Some(matrix) => Some(seeder.seed(matrix).context("seeding compatibility matrix")?.1),
        None => None,
    };

    let regulatory_summary = match &config.regulatory_table_path {
        Some(path) => {
            let table = loader::load_regulatory_table(path).await?;
            let (_, summary) = seeder
                .seed_regulatory(&table)
                .with_context(|| format!("seeding regulatory table {}", path.display()))?;
            Some(summary)
        }
        None => None,
    };

    let store = shared.snapshot()?;
    let seed = SeedReport {
        groups,
        matrix_source,
        matrix: matrix_summary,
        regulatory: regulatory_summary,
        rules_changed: [matrix_summary, regulatory_summary]
            .iter()
            .flatten()
            .map(SeedSummary::changed)
            .sum(),
        rule_store_version: store.version(),
        rule_count: store.len(),
    };

    let un_numbers = match &config.shipment_path {
        Some(path) => loader::load_shipment(path).await?,
        None => catalog.items().map(|item| item.un_number.clone()).collect(),
    };
    let shipment = BatchSegregationPlanner::new(store).plan_shipment(&catalog, &un_numbers);

    tracing::info!(
        items = shipment.items,
        pairs = shipment.pairs_evaluated,
        prohibited = shipment.prohibited_pairs,
        caveated = shipment.caveated_pairs,
        unresolved = shipment.unresolved.len(),
        compatible = shipment.is_compatible,
        version = seed.rule_store_version,
        "Shipment planned"
    );

    Ok(AdminReport {
        generated_at: Utc::now(),
        catalog: imported,
        seed,
        shipment,
    })
}
