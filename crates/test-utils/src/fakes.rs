//! Recording fakes for the console's collaborator traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use console_common::{
    BoundingBox, CapabilityDescriptor, ConsoleError, ConsoleResult, GeometryShape, LayerId,
    LayerRecord, SchemaDescription,
};
use layer_console::{
    CapabilityFetcher, DownloadRequest, DownloadSink, EditActivation, EditingSession, MapSurface,
    Notices, QueryBuilder, QueryTarget, SchemaProbe, StylingTool,
};

/// One recorded map-surface call.
#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    ZoomToExtent { bbox: BoundingBox, srs: String },
    MergeParams { layer: LayerId, params: Vec<(String, String)> },
    SetStyle { layer: LayerId, style: String },
    SetFormat { layer: LayerId, format: String },
    Redraw { layer: LayerId },
    RaiseLayer { layer: LayerId, delta: i32 },
    RemoveLayer { layer: LayerId },
    SetBaseLayer { layer: LayerId, base: bool },
}

/// Map surface double: records every mutation, serves configured extents.
pub struct ScriptedMap {
    projection: String,
    data_extents: Mutex<HashMap<LayerId, BoundingBox>>,
    calls: Mutex<Vec<MapCall>>,
}

impl ScriptedMap {
    pub fn new(projection: impl Into<String>) -> Self {
        Self {
            projection: projection.into(),
            data_extents: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_data_extent(&self, id: LayerId, bbox: BoundingBox) {
        self.data_extents.lock().unwrap().insert(id, bbox);
    }

    pub fn calls(&self) -> Vec<MapCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn zooms(&self) -> Vec<(BoundingBox, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MapCall::ZoomToExtent { bbox, srs } => Some((bbox, srs)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: MapCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MapSurface for ScriptedMap {
    fn projection(&self) -> String {
        self.projection.clone()
    }

    fn data_extent(&self, id: &LayerId) -> Option<BoundingBox> {
        self.data_extents.lock().unwrap().get(id).copied()
    }

    fn zoom_to_extent(&self, bbox: BoundingBox, srs: &str) {
        self.record(MapCall::ZoomToExtent {
            bbox,
            srs: srs.to_string(),
        });
    }

    fn merge_params(&self, id: &LayerId, params: &[(&str, String)]) {
        self.record(MapCall::MergeParams {
            layer: id.clone(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
    }

    fn set_style(&self, id: &LayerId, style: &str) {
        self.record(MapCall::SetStyle {
            layer: id.clone(),
            style: style.to_string(),
        });
    }

    fn set_format(&self, id: &LayerId, format: &str) {
        self.record(MapCall::SetFormat {
            layer: id.clone(),
            format: format.to_string(),
        });
    }

    fn redraw(&self, id: &LayerId) {
        self.record(MapCall::Redraw { layer: id.clone() });
    }

    fn raise_layer(&self, id: &LayerId, delta: i32) {
        self.record(MapCall::RaiseLayer {
            layer: id.clone(),
            delta,
        });
    }

    fn remove_layer(&self, id: &LayerId) {
        self.record(MapCall::RemoveLayer { layer: id.clone() });
    }

    fn set_base_layer(&self, id: &LayerId, base: bool) {
        self.record(MapCall::SetBaseLayer {
            layer: id.clone(),
            base,
        });
    }
}

/// Capability fetcher double. Layers without a configured descriptor fail.
pub struct StubFetcher {
    responses: Mutex<HashMap<LayerId, CapabilityDescriptor>>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn respond_with(&self, id: LayerId, descriptor: CapabilityDescriptor) {
        self.responses.lock().unwrap().insert(id, descriptor);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StubFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapabilityFetcher for StubFetcher {
    async fn describe(&self, record: &LayerRecord) -> ConsoleResult<CapabilityDescriptor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .get(&record.id)
            .cloned()
            .ok_or_else(|| ConsoleError::FetchFailure {
                layer: record.id.clone(),
                message: "no capability response scripted".to_string(),
            })
    }
}

/// Schema probe double.
pub struct StubProbe {
    response: Mutex<Option<SchemaDescription>>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl StubProbe {
    pub fn new() -> Self {
        Self {
            response: Mutex::new(None),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn respond_with(&self, schema: SchemaDescription) {
        *self.response.lock().unwrap() = Some(schema);
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StubProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaProbe for StubProbe {
    async fn describe_feature_type(
        &self,
        _service_url: &str,
        type_name: &str,
    ) -> ConsoleResult<SchemaDescription> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(ConsoleError::FetchFailure {
                layer: LayerId::new(type_name),
                message: "schema probe scripted to fail".to_string(),
            });
        }
        self.response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ConsoleError::FetchFailure {
                layer: LayerId::new(type_name),
                message: "no schema scripted".to_string(),
            })
    }
}

/// Editing session double.
pub struct RecordingSession {
    activations: Mutex<Vec<EditActivation>>,
    deactivations: AtomicUsize,
    draws: Mutex<Vec<GeometryShape>>,
    fail_activate: AtomicBool,
    fail_deactivate: AtomicBool,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            activations: Mutex::new(Vec::new()),
            deactivations: AtomicUsize::new(0),
            draws: Mutex::new(Vec::new()),
            fail_activate: AtomicBool::new(false),
            fail_deactivate: AtomicBool::new(false),
        }
    }

    pub fn activations(&self) -> Vec<EditActivation> {
        self.activations.lock().unwrap().clone()
    }

    pub fn deactivation_count(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }

    pub fn draws(&self) -> Vec<GeometryShape> {
        self.draws.lock().unwrap().clone()
    }

    pub fn fail_next_activate(&self) {
        self.fail_activate.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_deactivate(&self) {
        self.fail_deactivate.store(true, Ordering::SeqCst);
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EditingSession for RecordingSession {
    async fn activate(&self, activation: EditActivation) -> ConsoleResult<()> {
        if self.fail_activate.swap(false, Ordering::SeqCst) {
            return Err(ConsoleError::FetchFailure {
                layer: activation.layer,
                message: "activation scripted to fail".to_string(),
            });
        }
        self.activations.lock().unwrap().push(activation);
        Ok(())
    }

    async fn deactivate(&self) -> ConsoleResult<()> {
        self.deactivations.fetch_add(1, Ordering::SeqCst);
        if self.fail_deactivate.swap(false, Ordering::SeqCst) {
            return Err(ConsoleError::FetchFailure {
                layer: LayerId::new("session"),
                message: "deactivation scripted to fail".to_string(),
            });
        }
        Ok(())
    }

    fn draw(&self, shape: GeometryShape) {
        self.draws.lock().unwrap().push(shape);
    }
}

/// Notices double: collects dialog texts.
#[derive(Default)]
pub struct RecordingNotices {
    infos: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingNotices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Notices for RecordingNotices {
    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

/// Download sink double.
#[derive(Default)]
pub struct RecordingSink {
    requests: Mutex<Vec<DownloadRequest>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl DownloadSink for RecordingSink {
    fn submit(&self, request: DownloadRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

/// Styling tool double.
#[derive(Default)]
pub struct RecordingStyler {
    opened: Mutex<Vec<LayerId>>,
}

impl RecordingStyler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<LayerId> {
        self.opened.lock().unwrap().clone()
    }
}

impl StylingTool for RecordingStyler {
    fn open(&self, record: &LayerRecord) {
        self.opened.lock().unwrap().push(record.id.clone());
    }
}

/// Query builder double.
#[derive(Default)]
pub struct RecordingQuerier {
    opened: Mutex<Vec<QueryTarget>>,
    shown: AtomicUsize,
}

impl RecordingQuerier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<QueryTarget> {
        self.opened.lock().unwrap().clone()
    }

    pub fn show_count(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }
}

impl QueryBuilder for RecordingQuerier {
    fn open(&self, target: QueryTarget) {
        self.opened.lock().unwrap().push(target);
    }

    fn show_current(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }
}
