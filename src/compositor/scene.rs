//! Scene assembly from loaded assets

use std::sync::Arc;

use super::layer::{Layer, LayerMaterial};
use crate::assets::{LayerGeometry, LoadedAssets, TextureAtlas};

/// Ordered list of layers sharing one material
#[derive(Debug)]
pub struct Scene {
    layers: Vec<Layer>,
    material: Arc<LayerMaterial>,
}

impl Scene {
    /// Layers in draw order
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The material every layer references
    pub fn material(&self) -> &Arc<LayerMaterial> {
        &self.material
    }

    /// The shared texture atlas
    pub fn atlas(&self) -> &TextureAtlas {
        self.material.atlas()
    }
}

/// Builds a [`Scene`] from a texture atlas and per-layer geometry
pub struct LayerCompositor;

impl LayerCompositor {
    /// Wrap each geometry in a layer, in the order given, all sharing one material
    pub fn build(atlas: TextureAtlas, geometries: Vec<LayerGeometry>) -> Scene {
        let material = Arc::new(LayerMaterial::new(Arc::new(atlas)));

        let layers: Vec<Layer> = geometries
            .into_iter()
            .enumerate()
            .map(|(index, geometry)| Layer::new(index, geometry, material.clone()))
            .collect();

        let triangles: usize = layers.iter().map(|l| l.geometry().triangle_count()).sum();
        tracing::info!(layers = layers.len(), triangles, "Scene built");

        Scene { layers, material }
    }

    /// Build a scene from the result of a successful load
    pub fn from_assets(assets: LoadedAssets) -> Scene {
        Self::build(assets.atlas, assets.geometries)
    }
}
