//! Part catalog - keywords, parameter fields, and static model paths
//!
//! The catalog is a TOML document. A built-in copy is compiled into the crate;
//! deployments can replace it with their own file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::params::{FieldSpec, ParamSet};

/// Catalog compiled into the crate
pub const BUILTIN_CATALOG: &str = include_str!("../catalog/default.toml");

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize catalog: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Keyword {phrase:?} points at unknown part {part:?}")]
    UnknownPart { phrase: String, part: String },
    #[error("Field {field} of part {part} has min > max or a default outside its range")]
    InvalidField { part: String, field: String },
}

/// A trigger phrase and the part type it selects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub phrase: String,
    pub part: String,
}

/// One part type the backend can generate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartEntry {
    /// Part type identifier sent to and returned by the backend (e.g., "gear")
    pub id: String,
    /// Human-readable name
    pub label: String,
    /// Static model path relative to the viewer, if one is shipped
    #[serde(default)]
    pub model: Option<String>,
    /// Editable parameters
    #[serde(default)]
    pub field: Vec<FieldSpec>,
}

impl PartEntry {
    /// Default values for all fields of this part
    pub fn default_params(&self) -> ParamSet {
        self.field
            .iter()
            .map(|f| (f.name.clone(), f.default))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartCatalog {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub keyword: Vec<Keyword>,
    #[serde(default)]
    pub part: Vec<PartEntry>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for PartCatalog {
    /// The built-in catalog
    fn default() -> Self {
        match Self::from_toml(BUILTIN_CATALOG) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!("Built-in catalog is invalid: {}", e);
                Self::empty()
            }
        }
    }
}

impl PartCatalog {
    /// A catalog with no keywords and no parts
    pub fn empty() -> Self {
        Self {
            version: default_version(),
            keyword: Vec::new(),
            part: Vec::new(),
        }
    }

    /// Load a catalog from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a catalog from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        let catalog: PartCatalog = toml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, CatalogError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Every keyword must point at a known part and every field must be consistent
    pub fn validate(&self) -> Result<(), CatalogError> {
        for keyword in &self.keyword {
            if self.get(&keyword.part).is_none() {
                return Err(CatalogError::UnknownPart {
                    phrase: keyword.phrase.clone(),
                    part: keyword.part.clone(),
                });
            }
        }

        for part in &self.part {
            for field in &part.field {
                if field.min > field.max || field.check(field.default).is_err() {
                    return Err(CatalogError::InvalidField {
                        part: part.id.clone(),
                        field: field.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Look up a part by type identifier
    pub fn get(&self, part_type: &str) -> Option<&PartEntry> {
        self.part.iter().find(|p| p.id == part_type)
    }

    /// Static model path for a part type
    pub fn model_path(&self, part_type: &str) -> Option<&str> {
        self.get(part_type).and_then(|p| p.model.as_deref())
    }

    /// Parts that ship a static model
    pub fn static_parts(&self) -> impl Iterator<Item = &PartEntry> {
        self.part.iter().filter(|p| p.model.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_catalog() {
        let catalog = PartCatalog::default();

        let gear = catalog.get("gear").unwrap();
        assert_eq!(gear.field.len(), 4);
        assert_eq!(gear.field[0].name, "teeth");
        assert_eq!(gear.field[0].min, 5.0);
        assert_eq!(gear.field[0].max, 200.0);
        assert_eq!(catalog.model_path("gear"), Some("models/spur_gear.glb"));

        assert!(catalog.get("cube").is_some());
        assert!(catalog.get("cylinder").is_some());
        assert!(catalog.model_path("cube").is_none());
        assert_eq!(catalog.static_parts().count(), 1);
    }

    #[test]
    fn test_default_params() {
        let catalog = PartCatalog::default();
        let params = catalog.get("gear").unwrap().default_params();
        assert_eq!(params["teeth"], 20.0);
        assert_eq!(params["module"], 1.0);
        assert_eq!(params["width"], 5.0);
        assert_eq!(params["bore_diameter"], 3.0);
    }

    #[test]
    fn test_unknown_part_rejected() {
        let toml = r#"
[[keyword]]
phrase = "sprocket"
part = "sprocket"
"#;
        let err = PartCatalog::from_toml(toml).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownPart { .. }));
    }

    #[test]
    fn test_invalid_field_rejected() {
        let toml = r#"
[[part]]
id = "plate"
label = "Plate"

[[part.field]]
name = "holes"
label = "Holes"
min = 1.0
max = 8.0
default = 12.0
"#;
        let err = PartCatalog::from_toml(toml).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidField { .. }));
    }

    #[test]
    fn test_round_trip_through_file() {
        let catalog = PartCatalog::default();
        let content = catalog.to_toml().unwrap();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let loaded = PartCatalog::from_file(file.path()).unwrap();
        assert_eq!(loaded, catalog);
    }
}
