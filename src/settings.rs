//! Settings management for the light-field viewer
//!
//! Handles loading/saving of viewer settings as XML. Every field has a default,
//! so a missing file or a partial file both produce a usable configuration.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::assets::NUM_LAYERS;

/// Default location of the welder light-field capture.
pub const DEFAULT_BASE_URL: &str =
    "https://storage.googleapis.com/immersive-lf-video-siggraph2020/welder/lmta";

/// Viewer settings stored in `.xml` files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "LightFieldViewer")]
pub struct ViewerSettings {
    /// Base location of the assets (https URL, file:// URL or directory path)
    #[serde(rename = "baseUrl", default = "default_base_url")]
    pub base_url: String,

    /// File name of the texture atlas under the base location
    #[serde(rename = "atlasName", default = "default_atlas_name")]
    pub atlas_name: String,

    /// Prefix shared by all layer mesh file names
    #[serde(rename = "meshPrefix", default = "default_mesh_prefix")]
    pub mesh_prefix: String,

    /// Extension of the layer mesh files (without the dot)
    #[serde(rename = "meshExtension", default = "default_mesh_extension")]
    pub mesh_extension: String,

    /// Number of depth layers to fetch
    #[serde(rename = "layerCount", default = "default_layer_count")]
    pub layer_count: usize,

    /// Optional per-request timeout in seconds (no timeout when absent)
    #[serde(rename = "requestTimeoutSecs", default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Initial window width in logical pixels
    #[serde(rename = "windowWidth", default = "default_window_width")]
    pub window_width: u32,

    /// Initial window height in logical pixels
    #[serde(rename = "windowHeight", default = "default_window_height")]
    pub window_height: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_atlas_name() -> String {
    "texture_atlas_rgba.png".to_string()
}

fn default_mesh_prefix() -> String {
    "mdi_rig_space_mesh".to_string()
}

fn default_mesh_extension() -> String {
    "ply".to_string()
}

fn default_layer_count() -> usize {
    NUM_LAYERS
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    720
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            atlas_name: default_atlas_name(),
            mesh_prefix: default_mesh_prefix(),
            mesh_extension: default_mesh_extension(),
            layer_count: default_layer_count(),
            request_timeout_secs: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl ViewerSettings {
    /// Load settings from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        let mut settings: Self = from_str(&contents)?;

        // Ensure sane minimums.
        settings.layer_count = settings.layer_count.max(1);
        settings.window_width = settings.window_width.max(1);
        settings.window_height = settings.window_height.max(1);
        settings.base_url = settings.base_url.trim_end_matches('/').to_string();

        Ok(settings)
    }

    /// Save settings to an XML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        let xml = to_string(self)?;
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);
        fs::write(path, formatted)?;
        Ok(())
    }
}

/// Settings-related errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::DeError),
    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::SeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ViewerSettings::default();
        assert_eq!(settings.layer_count, 16);
        assert_eq!(settings.atlas_name, "texture_atlas_rgba.png");
        assert_eq!(settings.mesh_prefix, "mdi_rig_space_mesh");
        assert_eq!(settings.mesh_extension, "ply");
        assert!(settings.request_timeout_secs.is_none());
        assert!(settings.base_url.starts_with("https://"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.xml");

        let settings = ViewerSettings {
            base_url: "/srv/lightfield/welder".to_string(),
            layer_count: 4,
            request_timeout_secs: Some(15),
            ..Default::default()
        };
        settings.save_to_file(&path).unwrap();

        let loaded = ViewerSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.xml");
        fs::write(
            &path,
            "<LightFieldViewer><baseUrl>https://example.com/lf/</baseUrl><layerCount>0</layerCount></LightFieldViewer>",
        )
        .unwrap();

        let loaded = ViewerSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded.base_url, "https://example.com/lf");
        assert_eq!(loaded.layer_count, 1);
        assert_eq!(loaded.mesh_prefix, "mdi_rig_space_mesh");
        assert_eq!(loaded.window_width, 1280);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ViewerSettings::load_from_file(&dir.path().join("absent.xml"));
        assert!(matches!(result, Err(SettingsError::Io(_))));
    }
}
