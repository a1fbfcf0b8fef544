//! # Archive Configuration
//!
//! Tunables for a [`ComponentArchive`](crate::ComponentArchive), parsed once at
//! startup from TOML text handed in by the application.
//!
//! ```toml
//! expected_entities = 100000
//! expected_archetypes = 64
//! defragment_before_shrink = true
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Archive tunables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Initial capacity of the entity record map.
    pub expected_entities: usize,
    /// Initial capacity of the archetype table.
    pub expected_archetypes: usize,
    /// Whether [`compact`](crate::ComponentArchive::compact) defragments
    /// before reclaiming empty chunks.
    pub defragment_before_shrink: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            expected_entities: 1024,
            expected_archetypes: 32,
            defragment_before_shrink: true,
        }
    }
}

impl ArchiveConfig {
    /// Parses a configuration from TOML text. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::InvalidValue`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        // Index 0 is always the empty archetype.
        if self.expected_archetypes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "expected_archetypes",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = ArchiveConfig::from_toml_str("").unwrap();
        assert_eq!(config, ArchiveConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = ArchiveConfig::from_toml_str("defragment_before_shrink = false").unwrap();
        assert!(!config.defragment_before_shrink);
        assert_eq!(config.expected_entities, 1024);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ArchiveConfig::from_toml_str("chunk_bytes = 4096").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_archetypes_rejected() {
        let err = ArchiveConfig::from_toml_str("expected_archetypes = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "expected_archetypes", .. }
        ));
    }
}
