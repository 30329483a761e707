// config.rs — renderer settings loaded from JSON and the environment

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RendererError, Result};
use crate::mesh::DEFAULT_SPHERE_BANDS;
use crate::shader::ColorMapping;

/// Path of a JSON file holding a `RendererConfig`.
pub const CONFIG_PATH_VAR: &str = "VOUT_CONFIG";
/// Overrides `dump_shaders` when set to `1`/`true`/`0`/`false`.
pub const DUMP_SHADERS_VAR: &str = "VOUT_DUMP_SHADERS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Log synthesized shader source at debug level.
    pub dump_shaders: bool,
    /// Latitude and longitude band count of the sphere mesh.
    pub sphere_bands: u32,
    pub clear_color: [f32; 4],
    /// Tone and gamut mapping for HDR sources. `None` shows them unmapped.
    pub color_mapping: Option<ColorMapping>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            dump_shaders: false,
            sphere_bands: DEFAULT_SPHERE_BANDS,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            color_mapping: None,
        }
    }
}

impl RendererConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: RendererConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(&path)?;
        Self::from_json_str(&json)
    }

    /// Reads `VOUT_CONFIG` (if set) then applies `VOUT_DUMP_SHADERS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match get(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(flag) = get(DUMP_SHADERS_VAR) {
            config.dump_shaders = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                other => {
                    return Err(RendererError::InvalidParameter(format!(
                        "{DUMP_SHADERS_VAR}={other} is not a boolean"
                    )))
                }
            };
        }
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sphere_bands == 0 || self.sphere_bands > 255 {
            return Err(RendererError::InvalidParameter(format!(
                "sphere_bands must be in 1..=255, got {}",
                self.sphere_bands
            )));
        }
        if self.clear_color.iter().any(|c| !c.is_finite()) {
            return Err(RendererError::InvalidParameter("clear_color must be finite".into()));
        }
        if let Some(mapping) = &self.color_mapping {
            mapping.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::ToneMapping;

    #[test]
    fn missing_fields_take_defaults() {
        let config = RendererConfig::from_json_str(r#"{ "dump_shaders": true }"#).unwrap();
        assert!(config.dump_shaders);
        assert_eq!(config.sphere_bands, DEFAULT_SPHERE_BANDS);
        assert_eq!(config.color_mapping, None);
    }

    #[test]
    fn color_mapping_parses() {
        let config = RendererConfig::from_json_str(
            r#"{ "color_mapping": { "tone_mapping": "reinhard", "target_peak": 100.0 } }"#,
        )
        .unwrap();
        let mapping = config.color_mapping.unwrap();
        assert_eq!(mapping.tone_mapping, ToneMapping::Reinhard);
        assert_eq!(mapping.target_peak, 100.0);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            RendererConfig::from_json_str(r#"{ "sphere_bands": 0 }"#),
            Err(RendererError::InvalidParameter(_))
        ));
        for mapping in [
            r#"{ "color_mapping": { "target_peak": 0.0 } }"#,
            r#"{ "color_mapping": { "source_peak": -400.0 } }"#,
            r#"{ "color_mapping": { "dither_depth": 0 } }"#,
            r#"{ "color_mapping": { "dither_depth": 24 } }"#,
        ] {
            assert!(
                matches!(RendererConfig::from_json_str(mapping), Err(RendererError::InvalidParameter(_))),
                "{mapping} accepted"
            );
        }
        assert!(matches!(
            RendererConfig::from_json_str("{ not json"),
            Err(RendererError::Config(_))
        ));
    }

    #[test]
    fn environment_overrides_dump_flag() {
        let config = RendererConfig::from_lookup(|key| (key == DUMP_SHADERS_VAR).then(|| "1".to_string())).unwrap();
        assert!(config.dump_shaders);

        let err = RendererConfig::from_lookup(|key| (key == DUMP_SHADERS_VAR).then(|| "maybe".to_string()));
        assert!(err.is_err());

        let missing = RendererConfig::from_lookup(|key| (key == CONFIG_PATH_VAR).then(|| "/nonexistent/vout.json".into()));
        assert!(matches!(missing, Err(RendererError::Io(_))));
    }
}
