//! Layer and shared material definitions

use std::sync::Arc;

use super::blend::{LAYER_BLEND, LAYER_CULL_MODE};
use crate::assets::{LayerGeometry, TextureAtlas};

/// Shading configuration shared by all layers.
///
/// The shading program itself is fixed; the material parameterises it with
/// the atlas and the blend/raster state it is drawn with.
#[derive(Debug)]
pub struct LayerMaterial {
    atlas: Arc<TextureAtlas>,
    blend: wgpu::BlendState,
    cull_mode: Option<wgpu::Face>,
}

impl LayerMaterial {
    /// Material sampling `atlas` with the layer blend policy
    pub fn new(atlas: Arc<TextureAtlas>) -> Self {
        Self {
            atlas,
            blend: LAYER_BLEND,
            cull_mode: LAYER_CULL_MODE,
        }
    }

    pub fn atlas(&self) -> &Arc<TextureAtlas> {
        &self.atlas
    }

    pub fn blend(&self) -> wgpu::BlendState {
        self.blend
    }

    pub fn cull_mode(&self) -> Option<wgpu::Face> {
        self.cull_mode
    }
}

/// One depth layer: a mesh bound to the shared material
#[derive(Debug)]
pub struct Layer {
    index: usize,
    geometry: LayerGeometry,
    material: Arc<LayerMaterial>,
    /// Layer meshes extend past the view frustum at the rig edges, never cull them
    frustum_culled: bool,
}

impl Layer {
    pub fn new(index: usize, geometry: LayerGeometry, material: Arc<LayerMaterial>) -> Self {
        Self {
            index,
            geometry,
            material,
            frustum_culled: false,
        }
    }

    /// Layer index in the capture, also its draw position
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn geometry(&self) -> &LayerGeometry {
        &self.geometry
    }

    pub fn material(&self) -> &Arc<LayerMaterial> {
        &self.material
    }

    pub fn frustum_culled(&self) -> bool {
        self.frustum_culled
    }
}
