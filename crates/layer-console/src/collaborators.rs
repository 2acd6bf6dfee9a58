//! Interfaces to the console's external collaborators.
//!
//! The console owns no transport, no wire format and no widgets: the map
//! surface, the capability and schema fetchers, the editing session and the
//! various tool launchers are all injected behind these traits. Optional
//! collaborators gate menu items by their mere presence.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use console_common::{
    AttributeDescriptor, BoundingBox, CapabilityDescriptor, ConsoleResult, GeometryShape, LayerId,
    LayerRecord, SchemaDescription,
};

/// The rendered map: ordered layer stack plus per-layer render mutation.
///
/// List mutations flow back into the console through the `on_layer_*`
/// callbacks, in the same synchronous turn, so list and map never diverge.
pub trait MapSurface: Send + Sync {
    /// SRS identifier the map is currently projected in.
    fn projection(&self) -> String;
    /// In-memory feature extent of a local vector layer.
    fn data_extent(&self, id: &LayerId) -> Option<BoundingBox>;
    fn zoom_to_extent(&self, bbox: BoundingBox, srs: &str);
    /// Merge request parameters into the layer's render parameters.
    fn merge_params(&self, id: &LayerId, params: &[(&str, String)]);
    fn set_style(&self, id: &LayerId, style: &str);
    fn set_format(&self, id: &LayerId, format: &str);
    fn redraw(&self, id: &LayerId);
    /// Move a layer up (+1) or down (-1) in the stack.
    fn raise_layer(&self, id: &LayerId, delta: i32);
    fn remove_layer(&self, id: &LayerId);
    fn set_base_layer(&self, id: &LayerId, base: bool);
}

/// Asynchronous capability metadata fetch. Must mark the descriptor
/// described exactly once on success.
#[async_trait]
pub trait CapabilityFetcher: Send + Sync {
    async fn describe(&self, record: &LayerRecord) -> ConsoleResult<CapabilityDescriptor>;
}

/// Remote feature-type schema probe.
#[async_trait]
pub trait SchemaProbe: Send + Sync {
    async fn describe_feature_type(
        &self,
        service_url: &str,
        type_name: &str,
    ) -> ConsoleResult<SchemaDescription>;
}

/// Feature protocol handed to the editing session, bound to the corrected
/// geometry field name.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureProtocol {
    pub service_url: String,
    pub type_name: String,
    pub namespace: Option<String>,
    pub version: String,
    pub geometry_name: Option<String>,
}

/// Everything the editing session needs to start.
#[derive(Debug, Clone)]
pub struct EditActivation {
    pub protocol: FeatureProtocol,
    /// Tabular attributes, geometry column already removed.
    pub attributes: Vec<AttributeDescriptor>,
    pub layer: LayerId,
    /// True when geometry cannot be edited interactively and the session
    /// must stick to attributes.
    pub read_only_geometry: bool,
}

/// The external editing-session collaborator.
#[async_trait]
pub trait EditingSession: Send + Sync {
    async fn activate(&self, activation: EditActivation) -> ConsoleResult<()>;
    async fn deactivate(&self) -> ConsoleResult<()>;
    /// Start drawing a new feature of the given shape.
    fn draw(&self, shape: GeometryShape);
}

/// Optional symbology editor.
pub trait StylingTool: Send + Sync {
    fn open(&self, record: &LayerRecord);
}

/// Target description for the query builder.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTarget {
    pub name: String,
    pub namespace: Option<String>,
    pub service_url: String,
    pub type_name: String,
}

/// Optional query builder.
pub trait QueryBuilder: Send + Sync {
    fn open(&self, target: QueryTarget);
    /// Re-show the request already configured for the current target.
    fn show_current(&self);
}

/// One layer of a download submission, serialized with the field names the
/// external extractor service expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadLayer {
    #[serde(rename = "layername")]
    pub layer_name: String,
    #[serde(rename = "metadataURL")]
    pub metadata_url: String,
    #[serde(rename = "owstype")]
    pub service_type: String,
    #[serde(rename = "owsurl")]
    pub service_url: String,
}

/// Payload accepted by the download submission collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadRequest {
    pub layers: Vec<DownloadLayer>,
}

impl DownloadRequest {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Out-of-band export trigger.
pub trait DownloadSink: Send + Sync {
    fn submit(&self, request: DownloadRequest);
}

/// Informational and error dialogs, presented by the embedding shell.
pub trait Notices: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// The schema probe and editing session travel together: edit mode needs
/// both or neither.
#[derive(Clone)]
pub struct EditTools {
    pub probe: Arc<dyn SchemaProbe>,
    pub session: Arc<dyn EditingSession>,
}

/// Full collaborator set wired in by the embedding application.
#[derive(Clone)]
pub struct Collaborators {
    pub map: Arc<dyn MapSurface>,
    pub fetcher: Arc<dyn CapabilityFetcher>,
    pub downloads: Arc<dyn DownloadSink>,
    pub notices: Arc<dyn Notices>,
    /// Absent when the session has no edit permission.
    pub editor: Option<EditTools>,
    pub styler: Option<Arc<dyn StylingTool>>,
    pub querier: Option<Arc<dyn QueryBuilder>>,
}
