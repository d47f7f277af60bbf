//! Resource fetcher: one atlas plus N layer meshes, joined fail-fast
//!
//! The atlas request and every mesh request are in flight at the same time.
//! Mesh results are returned in ascending layer order regardless of which
//! request finishes first. The first failure abandons the whole load.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::join::{join_ordered, JoinFailure};
use super::ply::LayerGeometry;
use super::source::{source_for, AssetSource, FetchError};
use super::texture::TextureAtlas;
use super::AssetManifest;
use crate::settings::ViewerSettings;

/// Everything required to build the scene
#[derive(Debug, Clone)]
pub struct LoadedAssets {
    /// The shared texture atlas
    pub atlas: TextureAtlas,
    /// One mesh per layer, index 0 first
    pub geometries: Vec<LayerGeometry>,
}

/// Fatal asset loading failure
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The atlas could not be fetched or decoded
    #[error("resource not found: {url} ({reason})")]
    ResourceNotFound { url: String, reason: String },
    /// A layer mesh could not be fetched or decoded
    #[error("failed to load layer {index} from {url}: {reason}")]
    GeometryLoadFailure {
        index: usize,
        url: String,
        reason: String,
    },
    /// A fetch task panicked or was cancelled
    #[error("asset task did not complete: {0}")]
    TaskFailed(String),
    /// No transport could be created for the base location
    #[error("asset source unavailable: {0}")]
    Source(#[from] FetchError),
}

/// Loads the atlas and layer meshes described by an [`AssetManifest`]
pub struct ResourceFetcher {
    source: Arc<dyn AssetSource>,
    manifest: AssetManifest,
}

impl ResourceFetcher {
    /// Create a fetcher over an explicit source
    pub fn new(source: Arc<dyn AssetSource>, manifest: AssetManifest) -> Self {
        Self { source, manifest }
    }

    /// Create a fetcher whose transport matches the configured base location
    pub fn from_settings(settings: &ViewerSettings) -> Result<Self, LoadError> {
        let timeout = settings.request_timeout_secs.map(Duration::from_secs);
        let source = source_for(&settings.base_url, timeout)?;
        Ok(Self::new(source, AssetManifest::from_settings(settings)))
    }

    /// The manifest being loaded
    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    /// Fetch and decode every asset.
    ///
    /// Resolves once all `layer_count + 1` requests have succeeded, or with the
    /// first failure among them. Must be polled within a tokio runtime.
    pub async fn load_all(&self) -> Result<LoadedAssets, LoadError> {
        let started = Instant::now();
        info!(
            base_url = self.manifest.base_url(),
            layers = self.manifest.layer_count(),
            "Loading light-field assets"
        );

        let atlas = load_atlas(self.source.clone(), self.manifest.atlas_url());

        let mesh_loads: Vec<_> = self
            .manifest
            .layer_urls()
            .into_iter()
            .enumerate()
            .map(|(index, url)| load_geometry(self.source.clone(), index, url))
            .collect();
        let geometries = async move {
            join_ordered(mesh_loads).await.map_err(|failure| match failure {
                JoinFailure::Failed { error, .. } => error,
                JoinFailure::Incomplete(message) => LoadError::TaskFailed(message),
            })
        };

        let (atlas, geometries) = tokio::try_join!(atlas, geometries).inspect_err(|e| {
            warn!(error = %e, "Asset loading failed");
        })?;

        info!(
            layers = geometries.len(),
            atlas_width = atlas.width(),
            atlas_height = atlas.height(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "All assets loaded"
        );

        Ok(LoadedAssets { atlas, geometries })
    }
}

async fn load_atlas(source: Arc<dyn AssetSource>, url: String) -> Result<TextureAtlas, LoadError> {
    let bytes = source
        .fetch(&url)
        .await
        .map_err(|e| LoadError::ResourceNotFound {
            url: url.clone(),
            reason: e.to_string(),
        })?;
    debug!(url = %url, bytes = bytes.len(), "Atlas fetched");

    TextureAtlas::decode(&bytes).map_err(|e| LoadError::ResourceNotFound {
        url,
        reason: e.to_string(),
    })
}

async fn load_geometry(
    source: Arc<dyn AssetSource>,
    index: usize,
    url: String,
) -> Result<LayerGeometry, LoadError> {
    let bytes = source
        .fetch(&url)
        .await
        .map_err(|e| LoadError::GeometryLoadFailure {
            index,
            url: url.clone(),
            reason: e.to_string(),
        })?;

    let geometry = LayerGeometry::from_ply(&bytes).map_err(|e| LoadError::GeometryLoadFailure {
        index,
        url: url.clone(),
        reason: e.to_string(),
    })?;
    debug!(
        index,
        url = %url,
        vertices = geometry.vertex_count(),
        triangles = geometry.triangle_count(),
        "Layer mesh loaded"
    );

    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::NUM_LAYERS;
    use bytes::Bytes;
    use futures_util::future::BoxFuture;
    use image::{ImageFormat, RgbaImage};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    const BASE: &str = "https://assets.test/welder";

    enum Entry {
        Ready(Bytes),
        Missing,
        Gated(oneshot::Receiver<Bytes>),
        Never,
    }

    /// In-memory source; each location may be fetched once
    #[derive(Default)]
    struct MockSource {
        entries: Mutex<HashMap<String, Entry>>,
    }

    impl MockSource {
        fn insert(&self, location: String, entry: Entry) {
            self.entries.lock().unwrap().insert(location, entry);
        }
    }

    impl AssetSource for MockSource {
        fn fetch(&self, location: &str) -> BoxFuture<'static, Result<Bytes, FetchError>> {
            let entry = self.entries.lock().unwrap().remove(location);
            let location = location.to_string();
            Box::pin(async move {
                match entry {
                    Some(Entry::Ready(bytes)) => Ok(bytes),
                    Some(Entry::Gated(rx)) => rx
                        .await
                        .map_err(|_| FetchError::Http("gate dropped".to_string())),
                    Some(Entry::Never) => std::future::pending().await,
                    Some(Entry::Missing) | None => Err(FetchError::Status {
                        status: 404,
                        url: location,
                    }),
                }
            })
        }
    }

    fn atlas_png() -> Bytes {
        let image = RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        Bytes::from(bytes)
    }

    /// Single triangle whose x coordinate encodes the layer index
    fn layer_ply(index: usize) -> Bytes {
        Bytes::from(format!(
            "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nproperty float s\nproperty float t\nelement face 1\nproperty list uchar uint vertex_indices\nend_header\n{i} 0 0 0 0\n{i} 1 0 0 1\n{i} 0 1 1 0\n3 0 1 2\n",
            i = index
        ))
    }

    fn fetcher_with(source: Arc<MockSource>) -> ResourceFetcher {
        ResourceFetcher::new(source, AssetManifest::new(BASE, NUM_LAYERS))
    }

    fn layer_marker(geometry: &LayerGeometry) -> usize {
        geometry.positions[0][0] as usize
    }

    #[tokio::test]
    async fn test_load_all_success() {
        let source = Arc::new(MockSource::default());
        let manifest = AssetManifest::new(BASE, NUM_LAYERS);
        source.insert(manifest.atlas_url(), Entry::Ready(atlas_png()));
        for i in 0..NUM_LAYERS {
            source.insert(manifest.layer_url(i), Entry::Ready(layer_ply(i)));
        }

        let assets = fetcher_with(source).load_all().await.unwrap();
        assert_eq!(assets.atlas.width(), 4);
        assert_eq!(assets.atlas.height(), 2);
        assert_eq!(assets.geometries.len(), NUM_LAYERS);
        for (i, geometry) in assets.geometries.iter().enumerate() {
            assert_eq!(layer_marker(geometry), i);
            assert_eq!(geometry.triangle_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_layer_order_independent_of_completion_order() {
        let source = Arc::new(MockSource::default());
        let manifest = AssetManifest::new(BASE, NUM_LAYERS);

        let (atlas_tx, atlas_rx) = oneshot::channel();
        source.insert(manifest.atlas_url(), Entry::Gated(atlas_rx));
        let mut gates = Vec::new();
        for i in 0..NUM_LAYERS {
            let (tx, rx) = oneshot::channel();
            source.insert(manifest.layer_url(i), Entry::Gated(rx));
            gates.push(Some(tx));
        }

        let fetcher = fetcher_with(source);
        let release = async move {
            // Layer 5 first, then 2, then the rest backwards, atlas last.
            let mut order = vec![5, 2];
            order.extend((0..NUM_LAYERS).rev().filter(|i| *i != 5 && *i != 2));
            for i in order {
                let tx = gates[i].take().unwrap();
                tx.send(layer_ply(i)).unwrap();
                tokio::task::yield_now().await;
            }
            atlas_tx.send(atlas_png()).unwrap();
        };

        let (result, ()) = tokio::join!(fetcher.load_all(), release);
        let assets = result.unwrap();
        let markers: Vec<usize> = assets.geometries.iter().map(layer_marker).collect();
        assert_eq!(markers, (0..NUM_LAYERS).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_missing_atlas_fails_fast_with_url() {
        let source = Arc::new(MockSource::default());
        let manifest = AssetManifest::new(BASE, NUM_LAYERS);
        source.insert(manifest.atlas_url(), Entry::Missing);
        for i in 0..NUM_LAYERS {
            source.insert(manifest.layer_url(i), Entry::Never);
        }

        let result = tokio::time::timeout(Duration::from_secs(5), fetcher_with(source).load_all())
            .await
            .expect("join must short-circuit on the atlas failure");

        match result {
            Err(LoadError::ResourceNotFound { url, .. }) => assert_eq!(url, manifest.atlas_url()),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_layer_fails_fast_with_index() {
        let source = Arc::new(MockSource::default());
        let manifest = AssetManifest::new(BASE, NUM_LAYERS);
        source.insert(manifest.atlas_url(), Entry::Never);
        for i in 0..NUM_LAYERS {
            let entry = if i == 5 { Entry::Missing } else { Entry::Never };
            source.insert(manifest.layer_url(i), entry);
        }

        let result = tokio::time::timeout(Duration::from_secs(5), fetcher_with(source).load_all())
            .await
            .expect("join must short-circuit on the layer failure");

        match result {
            Err(LoadError::GeometryLoadFailure { index, url, .. }) => {
                assert_eq!(index, 5);
                assert_eq!(url, manifest.layer_url(5));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_undecodable_layer_is_geometry_failure() {
        let source = Arc::new(MockSource::default());
        let manifest = AssetManifest::new(BASE, 2);
        source.insert(manifest.atlas_url(), Entry::Ready(atlas_png()));
        source.insert(manifest.layer_url(0), Entry::Ready(layer_ply(0)));
        source.insert(manifest.layer_url(1), Entry::Ready(Bytes::from_static(b"not a mesh\n")));

        let result = ResourceFetcher::new(source, manifest).load_all().await;
        assert!(matches!(
            result,
            Err(LoadError::GeometryLoadFailure { index: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_oversized_vertex_count_is_geometry_failure() {
        let source = Arc::new(MockSource::default());
        let manifest = AssetManifest::new(BASE, 3);
        source.insert(manifest.atlas_url(), Entry::Ready(atlas_png()));
        source.insert(manifest.layer_url(0), Entry::Ready(layer_ply(0)));
        source.insert(
            manifest.layer_url(1),
            Entry::Ready(Bytes::from_static(
                b"ply\nformat ascii 1.0\nelement vertex 2305843009213693951\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n",
            )),
        );
        source.insert(manifest.layer_url(2), Entry::Ready(layer_ply(2)));

        let result = ResourceFetcher::new(source, manifest.clone()).load_all().await;
        match result {
            Err(LoadError::GeometryLoadFailure { index, url, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(url, manifest.layer_url(1));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_undecodable_atlas_is_resource_not_found() {
        let source = Arc::new(MockSource::default());
        let manifest = AssetManifest::new(BASE, 1);
        source.insert(manifest.atlas_url(), Entry::Ready(Bytes::from_static(b"garbage")));
        source.insert(manifest.layer_url(0), Entry::Ready(layer_ply(0)));

        let result = ResourceFetcher::new(source, manifest).load_all().await;
        assert!(matches!(result, Err(LoadError::ResourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_from_settings_with_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("texture_atlas_rgba.png"), atlas_png()).unwrap();
        for i in 0..3 {
            let name = format!("mdi_rig_space_mesh_{:03}.ply", i);
            std::fs::write(dir.path().join(name), layer_ply(i)).unwrap();
        }

        let settings = ViewerSettings {
            base_url: dir.path().display().to_string(),
            layer_count: 3,
            ..Default::default()
        };
        let assets = ResourceFetcher::from_settings(&settings)
            .unwrap()
            .load_all()
            .await
            .unwrap();
        assert_eq!(assets.geometries.len(), 3);
        assert_eq!(layer_marker(&assets.geometries[2]), 2);
    }
}
