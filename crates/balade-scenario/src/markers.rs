//! Interactive marker configuration.
//!
//! Markers are declared in a JSON file: each has an id, an optional group,
//! an optional parent marker, and optionally the step and scene object it is
//! associated with. Validation is fail-fast — a broken config is a startup
//! error, not a runtime surprise.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum MarkerConfigError {
    #[error("Failed to read marker config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse marker config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate marker id '{0}'")]
    DuplicateId(String),
    #[error("Marker '{id}' references unknown parent '{parent}'")]
    UnknownParent { id: String, parent: String },
    #[error("Marker '{id}' references unknown group '{group}'")]
    UnknownGroup { id: String, group: String },
}

/// One interactive marker
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerDef {
    pub id: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    /// The walk step this marker belongs to
    #[serde(default)]
    pub step: Option<String>,
    /// Scene object the marker attaches to
    #[serde(default)]
    pub object_key: Option<String>,
    #[serde(default)]
    pub position: Option<[f32; 3]>,
}

/// The full marker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    #[serde(default)]
    pub groups: Vec<String>,
    pub markers: Vec<MarkerDef>,
}

impl MarkerConfig {
    /// Parse and validate a JSON document
    pub fn parse_str(src: &str) -> Result<Self, MarkerConfigError> {
        let config: MarkerConfig = serde_json::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, MarkerConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_str(&text)
    }

    fn validate(&self) -> Result<(), MarkerConfigError> {
        let mut ids = HashSet::new();
        for marker in &self.markers {
            if !ids.insert(marker.id.as_str()) {
                return Err(MarkerConfigError::DuplicateId(marker.id.clone()));
            }
        }
        let groups: HashSet<&str> = self.groups.iter().map(String::as_str).collect();
        for marker in &self.markers {
            if let Some(parent) = &marker.parent {
                if !ids.contains(parent.as_str()) {
                    return Err(MarkerConfigError::UnknownParent {
                        id: marker.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
            if let Some(group) = &marker.group {
                if !groups.contains(group.as_str()) {
                    return Err(MarkerConfigError::UnknownGroup {
                        id: marker.id.clone(),
                        group: group.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn marker(&self, id: &str) -> Option<&MarkerDef> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn markers_for_step(&self, step: &str) -> Vec<&MarkerDef> {
        self.markers
            .iter()
            .filter(|m| m.step.as_deref() == Some(step))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "groups": ["path", "clues"],
        "markers": [
            { "id": "firstStop-marker", "group": "path", "step": "firstStop",
              "object_key": "TrunkLargeInteractive", "position": [0.0, 0.5, 3.0] },
            { "id": "thirdStop-marker", "group": "clues", "step": "thirdStop" },
            { "id": "thirdStop-marker-hint", "parent": "thirdStop-marker" }
        ]
    }"#;

    #[test]
    fn parses_valid_config() {
        let config = MarkerConfig::parse_str(VALID).unwrap();
        assert_eq!(config.markers.len(), 3);
        assert_eq!(
            config.marker("firstStop-marker").and_then(|m| m.object_key.as_deref()),
            Some("TrunkLargeInteractive")
        );
        assert_eq!(config.markers_for_step("thirdStop").len(), 1);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let src = r#"{ "markers": [ { "id": "a" }, { "id": "a" } ] }"#;
        assert!(matches!(
            MarkerConfig::parse_str(src),
            Err(MarkerConfigError::DuplicateId(id)) if id == "a"
        ));
    }

    #[test]
    fn rejects_unknown_parent() {
        let src = r#"{ "markers": [ { "id": "a", "parent": "ghost" } ] }"#;
        assert!(matches!(
            MarkerConfig::parse_str(src),
            Err(MarkerConfigError::UnknownParent { parent, .. }) if parent == "ghost"
        ));
    }

    #[test]
    fn rejects_unknown_group() {
        let src = r#"{ "groups": ["path"], "markers": [ { "id": "a", "group": "clues" } ] }"#;
        assert!(matches!(
            MarkerConfig::parse_str(src),
            Err(MarkerConfigError::UnknownGroup { group, .. }) if group == "clues"
        ));
    }

    #[test]
    fn rejects_bad_json() {
        assert!(matches!(
            MarkerConfig::parse_str("not json"),
            Err(MarkerConfigError::Json(_))
        ));
    }
}
