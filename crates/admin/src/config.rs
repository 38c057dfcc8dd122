use std::path::PathBuf;

/// Default reference-data file, relative to the working directory.
pub const DEFAULT_REFERENCE_DATA_PATH: &str = "data/reference.json";

/// Admin tool configuration loaded from environment variables.
///
/// All fields have defaults suitable for local use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    /// Items and segregation groups to import.
    pub reference_data_path: PathBuf,
    /// Matrix file seeded instead of the built-in canonical matrix.
    pub matrix_path: Option<PathBuf>,
    /// Regulatory table overlaid after the matrix.
    pub regulatory_table_path: Option<PathBuf>,
    /// UN numbers to plan. When unset every catalog item forms one batch.
    pub shipment_path: Option<PathBuf>,
    /// Skip the canonical matrix when no `MATRIX_PATH` is given.
    pub skip_canonical_matrix: bool,
}

impl AdminConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                |
    /// |-------------------------|------------------------|
    /// | `REFERENCE_DATA_PATH`   | `data/reference.json`  |
    /// | `MATRIX_PATH`           | built-in matrix        |
    /// | `REGULATORY_TABLE_PATH` | no overlay             |
    /// | `SHIPMENT_PATH`         | whole catalog          |
    /// | `SKIP_CANONICAL_MATRIX` | `false`                |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let skip_canonical_matrix = match var("SKIP_CANONICAL_MATRIX") {
            None => false,
            Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "SKIP_CANONICAL_MATRIX is not a boolean, using false");
                false
            }),
        };

        Self {
            reference_data_path: var("REFERENCE_DATA_PATH")
                .unwrap_or_else(|| DEFAULT_REFERENCE_DATA_PATH.into())
                .into(),
            matrix_path: var("MATRIX_PATH").map(PathBuf::from),
            regulatory_table_path: var("REGULATORY_TABLE_PATH").map(PathBuf::from),
            shipment_path: var("SHIPMENT_PATH").map(PathBuf::from),
            skip_canonical_matrix,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AdminConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AdminConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]);
        assert_eq!(config.reference_data_path, PathBuf::from("data/reference.json"));
        assert_eq!(config.matrix_path, None);
        assert_eq!(config.regulatory_table_path, None);
        assert_eq!(config.shipment_path, None);
        assert!(!config.skip_canonical_matrix);
    }

    #[test]
    fn overrides_and_blank_values() {
        let config = config(&[
            ("REFERENCE_DATA_PATH", "/srv/ref.json"),
            ("MATRIX_PATH", "  "),
            ("SHIPMENT_PATH", "ship.json"),
            ("SKIP_CANONICAL_MATRIX", "Yes"),
        ]);
        assert_eq!(config.reference_data_path, PathBuf::from("/srv/ref.json"));
        assert_eq!(config.matrix_path, None);
        assert_eq!(config.shipment_path, Some(PathBuf::from("ship.json")));
        assert!(config.skip_canonical_matrix);
    }

    #[test]
    fn unparseable_flag_falls_back() {
        assert!(!config(&[("SKIP_CANONICAL_MATRIX", "maybe")]).skip_canonical_matrix);
    }
}
