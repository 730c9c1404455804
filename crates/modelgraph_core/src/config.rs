//! Store configuration.
//!
//! # Responsibility
//! - Hold layout allocation constants and notification bounds.
//! - Parse partial JSON configuration with every field defaulted.

use serde::Deserialize;

/// Default grid column count used for automatic node placement.
pub const DEFAULT_COLUMNS: u32 = 4;
/// Default follow-up mutation budget per entry-point call.
pub const DEFAULT_FOLLOW_UP_LIMIT: usize = 64;

/// Automatic node placement settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Nodes per row before wrapping.
    pub columns: u32,
    /// Offset of the first cell from the view origin.
    pub margin: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    pub node_width: f64,
    pub node_height: f64,
    /// Junction connectors are drawn as small squares.
    pub connector_size: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            margin: 20.0,
            cell_width: 200.0,
            cell_height: 120.0,
            node_width: 120.0,
            node_height: 55.0,
            connector_size: 15.0,
        }
    }
}

/// Top-level store settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    pub layout: LayoutConfig,
    /// Maximum number of follow-up mutations subscribers may enqueue while
    /// one entry-point call drains its notifications.
    pub follow_up_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            follow_up_limit: DEFAULT_FOLLOW_UP_LIMIT,
        }
    }
}

impl StoreConfig {
    /// Parses a (possibly partial) JSON configuration.
    ///
    /// # Errors
    /// - Returns the JSON error when the text is not a valid config object.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::{StoreConfig, DEFAULT_COLUMNS, DEFAULT_FOLLOW_UP_LIMIT};

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config = StoreConfig::from_json_str(r#"{"layout":{"columns":6}}"#)
            .expect("partial config should parse");
        assert_eq!(config.layout.columns, 6);
        assert_eq!(config.layout.margin, 20.0);
        assert_eq!(config.follow_up_limit, DEFAULT_FOLLOW_UP_LIMIT);
    }

    #[test]
    fn empty_object_is_default() {
        let config = StoreConfig::from_json_str("{}").expect("empty config should parse");
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.layout.columns, DEFAULT_COLUMNS);
    }
}
