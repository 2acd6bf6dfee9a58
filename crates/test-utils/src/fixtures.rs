//! Record and descriptor fixtures, plus a pre-wired console harness.

use std::sync::Arc;

use console_common::{
    AttributeDescriptor, BoundingBox, CapabilityDescriptor, FeatureServiceBinding, FormatEntry,
    LayerId, LayerKind, LayerRecord, SchemaDescription, StyleEntry,
};
use layer_console::{Collaborators, ConsoleConfig, EditTools, LayerConsole};

use crate::fakes::{
    RecordingNotices, RecordingQuerier, RecordingSession, RecordingSink, RecordingStyler,
    ScriptedMap, StubFetcher, StubProbe,
};

pub fn raster_record(id: &str) -> LayerRecord {
    LayerRecord::new(
        LayerId::new(id),
        format!("ns:{}", id),
        format!("{} (raster)", id),
        LayerKind::RasterService,
    )
    .with_source_url("https://geo.example.org/wms")
}

pub fn tiled_record(id: &str) -> LayerRecord {
    LayerRecord::new(
        LayerId::new(id),
        format!("ns:{}", id),
        format!("{} (tiles)", id),
        LayerKind::TiledService,
    )
    .with_source_url("https://geo.example.org/wmts")
}

pub fn feature_record(id: &str) -> LayerRecord {
    LayerRecord::new(
        LayerId::new(id),
        format!("ns:{}", id),
        format!("{} (features)", id),
        LayerKind::FeatureService,
    )
    .with_source_url("https://geo.example.org/wfs")
}

pub fn vector_record(id: &str) -> LayerRecord {
    LayerRecord::new(
        LayerId::new(id),
        id,
        format!("{} (drawing)", id),
        LayerKind::VectorLocal,
    )
}

/// A minimal described capability descriptor.
pub fn plain_descriptor() -> CapabilityDescriptor {
    CapabilityDescriptor {
        queryable: true,
        ..Default::default()
    }
}

/// Descriptor carrying a feature-service binding for `type_name`.
pub fn descriptor_with_feature_service(type_name: &str) -> CapabilityDescriptor {
    CapabilityDescriptor {
        queryable: true,
        feature_service: Some(FeatureServiceBinding {
            url: "https://geo.example.org/wfs".to_string(),
            type_name: type_name.to_string(),
            namespace: Some("https://geo.example.org/ns".to_string()),
        }),
        ..Default::default()
    }
}

/// Descriptor with named styles and the usual image formats.
pub fn descriptor_with_styles(styles: &[(&str, bool)]) -> CapabilityDescriptor {
    CapabilityDescriptor {
        queryable: true,
        styles: styles
            .iter()
            .map(|(name, current)| StyleEntry {
                name: name.to_string(),
                title: name.to_string(),
                current: *current,
                href: None,
            })
            .collect(),
        formats: vec![FormatEntry::new("image/png"), FormatEntry::new("image/jpeg")],
        ..Default::default()
    }
}

/// Descriptor with an extent in the given SRS.
pub fn descriptor_with_bbox(srs: &str, bbox: BoundingBox) -> CapabilityDescriptor {
    let mut descriptor = plain_descriptor();
    descriptor.bounding_boxes.insert(srs.to_string(), bbox);
    descriptor
}

/// Feature-type schema with the given geometry column type, a key and a
/// label column.
pub fn schema_with_geometry(geometry_type: &str) -> SchemaDescription {
    SchemaDescription {
        attributes: vec![
            AttributeDescriptor::new("osm_id", "xsd:long"),
            AttributeDescriptor::new("the_geom", geometry_type),
            AttributeDescriptor::new("label", "xsd:string"),
        ],
        namespace: Some("https://geo.example.org/ns".to_string()),
        protocol_version: "1.1.0".to_string(),
    }
}

/// Schema with tabular columns only.
pub fn schema_without_geometry() -> SchemaDescription {
    SchemaDescription {
        attributes: vec![
            AttributeDescriptor::new("osm_id", "xsd:long"),
            AttributeDescriptor::new("label", "xsd:string"),
        ],
        namespace: Some("https://geo.example.org/ns".to_string()),
        protocol_version: "1.1.0".to_string(),
    }
}

/// Every collaborator faked and recorded, wired into one console.
pub struct ConsoleHarness {
    pub map: Arc<ScriptedMap>,
    pub fetcher: Arc<StubFetcher>,
    pub probe: Arc<StubProbe>,
    pub session: Arc<RecordingSession>,
    pub notices: Arc<RecordingNotices>,
    pub downloads: Arc<RecordingSink>,
    pub styler: Arc<RecordingStyler>,
    pub querier: Arc<RecordingQuerier>,
    pub console: LayerConsole,
}

impl ConsoleHarness {
    /// Full collaborator set (styler, querier and editor present).
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Only the mandatory collaborators; optional tools absent.
    pub fn without_tools() -> Self {
        Self::build(false)
    }

    fn build(with_tools: bool) -> Self {
        let map = Arc::new(ScriptedMap::new("EPSG:3857"));
        let fetcher = Arc::new(StubFetcher::new());
        let probe = Arc::new(StubProbe::new());
        let session = Arc::new(RecordingSession::new());
        let notices = Arc::new(RecordingNotices::new());
        let downloads = Arc::new(RecordingSink::new());
        let styler = Arc::new(RecordingStyler::new());
        let querier = Arc::new(RecordingQuerier::new());

        let collaborators = Collaborators {
            map: map.clone(),
            fetcher: fetcher.clone(),
            downloads: downloads.clone(),
            notices: notices.clone(),
            editor: if with_tools {
                Some(EditTools {
                    probe: probe.clone(),
                    session: session.clone(),
                })
            } else {
                None
            },
            styler: if with_tools {
                Some(styler.clone() as Arc<dyn layer_console::StylingTool>)
            } else {
                None
            },
            querier: if with_tools {
                Some(querier.clone() as Arc<dyn layer_console::QueryBuilder>)
            } else {
                None
            },
        };
        let console = LayerConsole::new(collaborators, ConsoleConfig::default());

        Self {
            map,
            fetcher,
            probe,
            session,
            notices,
            downloads,
            styler,
            querier,
            console,
        }
    }

    /// Deliver a descriptor the way the fetch collaborator does: cache
    /// write first, then the arrival callback.
    pub fn deliver_capability(&self, id: &LayerId, descriptor: CapabilityDescriptor) {
        self.console.capabilities().insert(id.clone(), descriptor);
        self.console.on_capability_arrived(id);
    }
}

impl Default for ConsoleHarness {
    fn default() -> Self {
        Self::new()
    }
}
