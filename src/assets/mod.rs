//! Asset acquisition for the light-field frame
//!
//! One texture atlas and `NUM_LAYERS` layer meshes are fetched concurrently
//! and joined into a single [`LoadedAssets`] value, or the first failure.

pub mod fetcher;
pub mod join;
pub mod ply;
pub mod source;
pub mod texture;

pub use fetcher::{LoadError, LoadedAssets, ResourceFetcher};
pub use join::join_ordered;
pub use ply::{LayerGeometry, PlyError};
pub use source::{source_for, AssetSource, FetchError, FileSource, HttpSource};
pub use texture::{TextureAtlas, TextureSettings};

use crate::settings::ViewerSettings;

/// Number of depth layers in the light-field capture
pub const NUM_LAYERS: usize = 16;

/// Resolved locations of every asset in a light-field frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    base_url: String,
    atlas_name: String,
    mesh_prefix: String,
    mesh_extension: String,
    layer_count: usize,
}

impl AssetManifest {
    /// Build a manifest with the default file naming for `layer_count` layers
    pub fn new(base_url: impl Into<String>, layer_count: usize) -> Self {
        let defaults = ViewerSettings::default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            atlas_name: defaults.atlas_name,
            mesh_prefix: defaults.mesh_prefix,
            mesh_extension: defaults.mesh_extension,
            layer_count,
        }
    }

    /// Build a manifest from viewer settings
    pub fn from_settings(settings: &ViewerSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            atlas_name: settings.atlas_name.clone(),
            mesh_prefix: settings.mesh_prefix.clone(),
            mesh_extension: settings.mesh_extension.clone(),
            layer_count: settings.layer_count,
        }
    }

    /// Base location shared by every asset
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of layer meshes
    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// Location of the texture atlas
    pub fn atlas_url(&self) -> String {
        format!("{}/{}", self.base_url, self.atlas_name)
    }

    /// Location of the mesh for layer `index`, zero-padded to three digits
    pub fn layer_url(&self, index: usize) -> String {
        format!(
            "{}/{}_{:03}.{}",
            self.base_url, self.mesh_prefix, index, self.mesh_extension
        )
    }

    /// Locations of every layer mesh in ascending index order
    pub fn layer_urls(&self) -> Vec<String> {
        (0..self.layer_count).map(|i| self.layer_url(i)).collect()
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self::from_settings(&ViewerSettings::default())
    }
}
