//! Layer identity, kinds and in-memory layer records.

use serde::{Deserialize, Serialize};

use crate::capability::GeometryInfo;

/// Unique identifier for a layer. Stable for the record's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identity, used for locally-created vector layers
    /// which have no server-assigned name.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source protocol type of a layer.
///
/// Closed set: every consumer matches exhaustively, so adding a kind is a
/// compile-visible change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    /// WMS-like rendered raster service.
    RasterService,
    /// Tile-matrix service (WMTS-like).
    TiledService,
    /// Feature service (WFS-like), vector data served remotely.
    FeatureService,
    /// Client-side vector layer with in-memory features.
    VectorLocal,
}

impl LayerKind {
    /// Remote service layers carry capability metadata that must be fetched
    /// before menus can materialize; local vector layers do not.
    pub fn is_service(&self) -> bool {
        !matches!(self, LayerKind::VectorLocal)
    }
}

/// Mutable render state of a layer on the map surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    /// Current style name; empty string means the server default.
    pub style: String,
    /// Current output format, if one has been applied.
    pub format: Option<String>,
    /// 0.0 (transparent) to 1.0 (opaque).
    pub opacity: f64,
    pub visible: bool,
    /// Baselayer vs overlay.
    pub base_layer: bool,
    pub min_scale: Option<f64>,
    pub max_scale: Option<f64>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            style: String::new(),
            format: None,
            opacity: 1.0,
            visible: true,
            base_layer: false,
            min_scale: None,
            max_scale: None,
        }
    }
}

/// Data source attribution shown in the layer panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub title: Option<String>,
    pub href: Option<String>,
    pub logo_href: Option<String>,
}

/// One map layer as tracked by the console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerRecord {
    pub id: LayerId,
    /// Technical name, e.g. "topp:roads".
    pub name: String,
    /// Human-readable title.
    pub title: String,
    pub kind: LayerKind,
    /// Service endpoint this layer is rendered from. None for local layers.
    pub source_url: Option<String>,
    /// Whether the layer answers feature-info queries. Refreshed when the
    /// capability descriptor arrives.
    pub queryable: bool,
    pub render: RenderState,
    pub attribution: Option<Attribution>,
    /// Geometry shape recorded by the edit-mode schema probe.
    pub geometry: Option<GeometryInfo>,
}

impl LayerRecord {
    pub fn new(
        id: LayerId,
        name: impl Into<String>,
        title: impl Into<String>,
        kind: LayerKind,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            title: title.into(),
            kind,
            source_url: None,
            queryable: false,
            render: RenderState::default(),
            attribution: None,
            geometry: None,
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_queryable(mut self, queryable: bool) -> Self {
        self.queryable = queryable;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_id_display() {
        let id = LayerId::new("topp:roads");
        assert_eq!(id.to_string(), "topp:roads");
    }

    #[test]
    fn test_random_ids_are_unique() {
        assert_ne!(LayerId::random(), LayerId::random());
    }

    #[test]
    fn test_service_kinds() {
        assert!(LayerKind::RasterService.is_service());
        assert!(LayerKind::TiledService.is_service());
        assert!(LayerKind::FeatureService.is_service());
        assert!(!LayerKind::VectorLocal.is_service());
    }

    #[test]
    fn test_default_render_state() {
        let render = RenderState::default();
        assert_eq!(render.style, "");
        assert_eq!(render.opacity, 1.0);
        assert!(render.visible);
        assert!(!render.base_layer);
    }

    #[test]
    fn test_record_builders() {
        let record = LayerRecord::new(
            LayerId::new("a"),
            "topp:roads",
            "Roads",
            LayerKind::RasterService,
        )
        .with_source_url("https://geo.example.org/wms")
        .with_queryable(true);
        assert_eq!(record.source_url.as_deref(), Some("https://geo.example.org/wms"));
        assert!(record.queryable);
        assert!(record.geometry.is_none());
    }
}
