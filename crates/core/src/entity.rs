//! Input records - one per glacier to process.

use crate::error::{GdirError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Identifiers double as directory names.
static RGI_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid glacier id regex")
});

/// Check that an identifier can safely key a glacier directory.
pub fn validate_rgi_id(id: &str) -> Result<()> {
    if RGI_ID_PATTERN.is_match(id) {
        Ok(())
    } else {
        Err(GdirError::InvalidId(id.to_string()))
    }
}

/// One input record describing a glacier outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RgiEntity {
    /// Unique identifier, keys the glacier directory
    #[serde(alias = "RGIId", alias = "RGI_ID")]
    pub rgi_id: String,

    /// Glacier name
    #[serde(default)]
    pub name: Option<String>,

    /// Centroid longitude
    #[serde(default)]
    pub cenlon: Option<f64>,

    /// Centroid latitude
    #[serde(default)]
    pub cenlat: Option<f64>,

    /// Outline area
    #[serde(default)]
    pub area_km2: Option<f64>,

    /// Any other attribute carried by the record
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl RgiEntity {
    /// Create a record with only an identifier.
    pub fn new(rgi_id: impl Into<String>) -> Self {
        Self {
            rgi_id: rgi_id.into(),
            name: None,
            cenlon: None,
            cenlat: None,
            area_km2: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Set the glacier name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the centroid.
    pub fn with_center(mut self, cenlon: f64, cenlat: f64) -> Self {
        self.cenlon = Some(cenlon);
        self.cenlat = Some(cenlat);
        self
    }

    /// Load an ordered list of records from a JSON array file.
    pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| GdirError::io(path, e))?;
        serde_json::from_str(&json).map_err(|e| GdirError::json(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rgi_id() {
        assert!(validate_rgi_id("RGI40-11.00897").is_ok());
        assert!(validate_rgi_id("A").is_ok());
        assert!(validate_rgi_id("").is_err());
        assert!(validate_rgi_id("..").is_err());
        assert!(validate_rgi_id("a/b").is_err());
        assert!(validate_rgi_id("-leading").is_err());
    }

    #[test]
    fn test_load_all_keeps_order_and_extra_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgi.json");
        std::fs::write(
            &path,
            r#"[
                {"RGIId": "RGI40-11.00897", "name": "Hintereisferner", "Aspect": 42},
                {"rgi_id": "RGI40-11.00719", "cenlon": 10.7, "cenlat": 46.8}
            ]"#,
        )
        .unwrap();

        let entities = RgiEntity::load_all(&path).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].rgi_id, "RGI40-11.00897");
        assert_eq!(entities[0].name.as_deref(), Some("Hintereisferner"));
        assert_eq!(entities[0].attributes.get("Aspect"), Some(&serde_json::json!(42)));
        assert_eq!(entities[1].rgi_id, "RGI40-11.00719");
        assert_eq!(entities[1].cenlat, Some(46.8));
    }

    #[test]
    fn test_builders_match_loaded_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgi.json");
        std::fs::write(
            &path,
            r#"[{"RGI_ID": "RGI40-11.00897", "name": "Hintereisferner", "cenlon": 10.76, "cenlat": 46.8}]"#,
        )
        .unwrap();

        let built = RgiEntity::new("RGI40-11.00897")
            .with_name("Hintereisferner")
            .with_center(10.76, 46.8);
        assert_eq!(RgiEntity::load_all(&path).unwrap(), vec![built]);
    }

    #[test]
    fn test_load_all_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RgiEntity::load_all(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, GdirError::Io { .. }));
    }
}
