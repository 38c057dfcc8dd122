//! `hazseg-admin` -- seeds a segregation rule store and plans a shipment.
//!
//! Imports reference data, seeds the canonical (or a file) compatibility
//! matrix, overlays an optional regulatory table, and prints a JSON report
//! of every incompatible or caveated pair in the shipment.
//!
//! # Environment variables
//!
//! | Variable                | Required | Default               | Description                          |
//! |-------------------------|----------|-----------------------|--------------------------------------|
//! | `REFERENCE_DATA_PATH`   | no       | `data/reference.json` | Items and segregation groups         |
//! | `MATRIX_PATH`           | no       | --                    | Matrix seeded instead of the built-in one |
//! | `REGULATORY_TABLE_PATH` | no       | --                    | Regulatory table overlay             |
//! | `SHIPMENT_PATH`         | no       | --                    | UN numbers to plan (default: all items) |
//! | `SKIP_CANONICAL_MATRIX` | no       | `false`               | Seed no matrix when `MATRIX_PATH` is unset |

use hazseg_admin::config::AdminConfig;
use hazseg_admin::report;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hazseg_admin=info,hazseg_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AdminConfig::from_env();
    tracing::info!(
        reference_data = %config.reference_data_path.display(),
        matrix = ?config.matrix_path,
        regulatory_table = ?config.regulatory_table_path,
        shipment = ?config.shipment_path,
        "Starting admin run"
    );

    let report = match report::generate(&config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Admin run failed: {e:#}");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize report");
            std::process::exit(1);
        }
    }
}
