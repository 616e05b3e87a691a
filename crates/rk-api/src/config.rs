//! Identity layer configuration
//!
//! Settings can be serialized and loaded from RON configuration files.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// How collections compare names in `item_by_name`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NameMatching {
    /// Byte-for-byte comparison
    #[default]
    Exact,
    /// ASCII letters compare case-insensitively
    AsciiCaseInsensitive,
}

impl NameMatching {
    /// Whether `candidate` matches `wanted`
    pub fn matches(&self, candidate: &str, wanted: &str) -> bool {
        match self {
            NameMatching::Exact => candidate == wanted,
            NameMatching::AsciiCaseInsensitive => candidate.eq_ignore_ascii_case(wanted),
        }
    }
}

/// Identity layer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Name comparison used by collections
    pub name_matching: NameMatching,
    /// Whether a proxy may be placed into a further assembly context
    pub allow_recontext: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            name_matching: NameMatching::Exact,
            allow_recontext: true,
        }
    }
}

impl ApiConfig {
    /// Parse a configuration from RON; missing fields take their defaults
    pub fn from_ron(content: &str) -> ApiResult<Self> {
        ron::from_str(content).map_err(|e| ApiError::Config(e.to_string()))
    }

    /// Serialize the configuration to RON
    pub fn to_ron(&self) -> ApiResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ApiError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_matching() {
        assert!(NameMatching::Exact.matches("Sketch1", "Sketch1"));
        assert!(!NameMatching::Exact.matches("Sketch1", "sketch1"));
        assert!(NameMatching::AsciiCaseInsensitive.matches("Sketch1", "sketch1"));
        assert!(!NameMatching::AsciiCaseInsensitive.matches("Sketch1", "Sketch2"));
    }

    #[test]
    fn test_from_ron_partial() {
        let config = ApiConfig::from_ron("(allow_recontext: false)").unwrap();
        assert!(!config.allow_recontext);
        assert_eq!(config.name_matching, NameMatching::Exact);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = ApiConfig {
            name_matching: NameMatching::AsciiCaseInsensitive,
            allow_recontext: false,
        };
        let text = config.to_ron().unwrap();
        assert_eq!(ApiConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn test_from_ron_invalid() {
        assert!(matches!(
            ApiConfig::from_ron("(allow_recontext: 3)"),
            Err(ApiError::Config(_))
        ));
    }
}
