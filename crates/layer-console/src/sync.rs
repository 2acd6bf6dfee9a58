//! Layer tree synchronization.
//!
//! `LayerConsole` owns the mapping between the map's ordered layer list and
//! the tree UI. It reacts to additions, removals and reordering, builds
//! panels through the registry, materializes action menus through the ready
//! gate, and dispatches menu invocations to the collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};

use console_common::{
    CapabilityDescriptor, ConsoleError, ConsoleEvent, ConsoleResult, EventBus, LayerId, LayerKind,
    LayerRecord, RenderState,
};

use crate::cache::CapabilityCache;
use crate::collaborators::{
    Collaborators, DownloadLayer, DownloadRequest, QueryTarget,
};
use crate::config::ConsoleConfig;
use crate::edit::EditCoordinator;
use crate::gate::{GateHandle, ReadyGate};
use crate::menu::{self, Availability, MenuAction};
use crate::panel::{Panel, PanelRegistry};

/// One node of the tree view, in display order (top of list = topmost on
/// the map). Reorder affordances are disabled at the boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub layer: LayerId,
    pub title: String,
    pub base_layer: bool,
    pub visible: bool,
    pub up_enabled: bool,
    pub down_enabled: bool,
}

#[derive(Default)]
struct ConsoleState {
    /// Ordered mirror of the map's layer list.
    records: Vec<LayerRecord>,
    /// Layers with a capability fetch in flight; re-entrant fetches are
    /// suppressed against this set.
    pending_describe: HashSet<LayerId>,
    /// Layer whose query-builder request is already configured.
    query_target: Option<LayerId>,
}

/// The layer/UI synchronization engine.
pub struct LayerConsole {
    config: ConsoleConfig,
    collaborators: Collaborators,
    edit: Option<EditCoordinator>,
    capabilities: Arc<CapabilityCache>,
    panels: Arc<PanelRegistry>,
    events: Arc<EventBus>,
    state: Mutex<ConsoleState>,
    gates: Mutex<HashMap<LayerId, GateHandle>>,
}

impl LayerConsole {
    pub fn new(collaborators: Collaborators, config: ConsoleConfig) -> Self {
        let edit = collaborators
            .editor
            .clone()
            .map(|tools| EditCoordinator::new(tools, collaborators.notices.clone()));
        Self {
            config,
            collaborators,
            edit,
            capabilities: Arc::new(CapabilityCache::new()),
            panels: Arc::new(PanelRegistry::new()),
            events: Arc::new(EventBus::new()),
            state: Mutex::new(ConsoleState::default()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn capabilities(&self) -> &CapabilityCache {
        &self.capabilities
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn edit_state(&self) -> Option<crate::edit::EditState> {
        self.edit.as_ref().map(|e| e.state())
    }

    /// Snapshot of a layer record.
    pub fn layer(&self, id: &LayerId) -> Option<LayerRecord> {
        self.state
            .lock()
            .expect("console state poisoned")
            .records
            .iter()
            .find(|record| &record.id == id)
            .cloned()
    }

    pub fn layer_count(&self) -> usize {
        self.state.lock().expect("console state poisoned").records.len()
    }

    /// Read access to a layer's panel; None for removed layers.
    pub fn with_panel<R>(&self, id: &LayerId, f: impl FnOnce(&Panel) -> R) -> Option<R> {
        self.panels.with_panel(id, f)
    }

    pub(crate) fn with_panel_mut<R>(
        &self,
        id: &LayerId,
        f: impl FnOnce(&mut Panel) -> R,
    ) -> Option<R> {
        self.panels.with_panel_mut(id, f)
    }

    pub(crate) fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Mutate the render state of a stored record; a no-op for stale ids.
    pub(crate) fn update_render(&self, id: &LayerId, f: impl FnOnce(&mut RenderState)) {
        let mut state = self.state.lock().expect("console state poisoned");
        if let Some(stored) = state.records.iter_mut().find(|record| &record.id == id) {
            f(&mut stored.render);
        }
    }

    fn availability(&self) -> Availability {
        Availability {
            styler: self.collaborators.styler.is_some(),
            querier: self.collaborators.querier.is_some(),
            editor: self.edit.is_some(),
        }
    }

    // ------------------------------------------------------------------
    // Layer list mutation callbacks
    // ------------------------------------------------------------------

    /// A layer was added to the map at `index` (0 = topmost).
    pub fn on_layer_added(&self, record: LayerRecord, index: usize) {
        let id = record.id.clone();
        info!(layer = %id, kind = ?record.kind, "Layer added");

        let panel = self.build_panel(&record);
        self.panels.insert(panel);

        {
            let mut state = self.state.lock().expect("console state poisoned");
            let index = index.min(state.records.len());
            state.records.insert(index, record.clone());
        }

        self.wire_actions_menu(&record);
    }

    /// A layer was removed from the map. Tears down the panel entry and any
    /// pending gate; all teardown steps are idempotent.
    pub fn on_layer_removed(&self, id: &LayerId) {
        let removed = {
            let mut state = self.state.lock().expect("console state poisoned");
            let before = state.records.len();
            state.records.retain(|record| &record.id != id);
            state.pending_describe.remove(id);
            if state.query_target.as_ref() == Some(id) {
                state.query_target = None;
            }
            state.records.len() != before
        };
        if !removed {
            debug!(layer = %id, "Removal of unknown layer ignored");
            return;
        }

        if let Some(gate) = self.gates.lock().expect("gate table poisoned").remove(id) {
            gate.cancel();
        }
        self.panels.remove(id);
        self.capabilities.evict(id);
        info!(layer = %id, "Layer removed");
    }

    /// The map's layer stack was reordered; mirror the new order. Unknown
    /// identities are ignored, known ones missing from `order` keep their
    /// relative position at the end.
    pub fn on_layers_reordered(&self, order: &[LayerId]) {
        let mut state = self.state.lock().expect("console state poisoned");
        let mut remaining = std::mem::take(&mut state.records);
        let mut reordered = Vec::with_capacity(remaining.len());
        for id in order {
            if let Some(position) = remaining.iter().position(|record| &record.id == id) {
                reordered.push(remaining.remove(position));
            }
        }
        reordered.append(&mut remaining);
        state.records = reordered;
    }

    /// The capability descriptor for a layer became available in the cache.
    ///
    /// Liveness is checked first: arrivals racing a removal are dropped
    /// without touching panels.
    pub fn on_capability_arrived(&self, id: &LayerId) {
        let record = match self.layer(id) {
            Some(record) => record,
            None => {
                debug!(layer = %id, "Capability arrival for removed layer dropped");
                return;
            }
        };
        let descriptor = match self.capabilities.get(id) {
            Some(descriptor) => descriptor,
            None => {
                warn!(layer = %id, "Capability arrival without cached descriptor");
                return;
            }
        };

        {
            let mut state = self.state.lock().expect("console state poisoned");
            if let Some(stored) = state.records.iter_mut().find(|r| &r.id == id) {
                stored.queryable = descriptor.queryable;
            }
        }

        let editable = record.kind == LayerKind::RasterService
            && descriptor.has_feature_service()
            && self.edit.is_some();
        self.panels.with_panel_mut(id, |panel| {
            panel.info_enabled =
                record.kind == LayerKind::VectorLocal || descriptor.queryable;
            panel.edit_enabled = editable;
        });

        // The gate wakes on the cache epoch on its own; building here as
        // well makes arrival synchronous for the caller and lets us retire
        // the gate deterministically.
        let loading = self
            .panels
            .with_panel(id, |panel| panel.is_loading())
            .unwrap_or(false);
        if loading {
            let actions = self.build_actions(&record, Some(&descriptor));
            if !actions.is_empty() {
                if let Some(gate) = self.gates.lock().expect("gate table poisoned").remove(id) {
                    gate.cancel();
                }
                self.panels.set_ready(id, actions);
                self.events.publish(&ConsoleEvent::MenuReady { layer: id.clone() });
            }
        }

        self.events
            .publish(&ConsoleEvent::CapabilityArrived { layer: id.clone() });
    }

    // ------------------------------------------------------------------
    // Tree view
    // ------------------------------------------------------------------

    /// Tree nodes in list order, with boundary reorder affordances disabled.
    pub fn tree_nodes(&self) -> Vec<TreeNode> {
        let state = self.state.lock().expect("console state poisoned");
        let last = state.records.len().saturating_sub(1);
        state
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| TreeNode {
                layer: record.id.clone(),
                title: record.title.clone(),
                base_layer: record.render.base_layer,
                visible: record.render.visible,
                up_enabled: index > 0,
                down_enabled: index < last,
            })
            .collect()
    }

    /// Push a layer one position up; a no-op at the top.
    pub fn move_layer_up(&self, id: &LayerId) {
        let position = self.position_of(id);
        match position {
            Some(0) | None => {}
            Some(_) => self.collaborators.map.raise_layer(id, 1),
        }
    }

    /// Push a layer one position down; a no-op at the bottom.
    pub fn move_layer_down(&self, id: &LayerId) {
        let count = self.layer_count();
        match self.position_of(id) {
            Some(position) if position + 1 < count => {
                self.collaborators.map.raise_layer(id, -1)
            }
            _ => {}
        }
    }

    /// Ask the map to destroy a layer; the removal callback completes the
    /// teardown. The embedding shell confirms first when configured to.
    pub fn remove_layer(&self, id: &LayerId) {
        self.collaborators.map.remove_layer(id);
    }

    fn position_of(&self, id: &LayerId) -> Option<usize> {
        self.state
            .lock()
            .expect("console state poisoned")
            .records
            .iter()
            .position(|record| &record.id == id)
    }

    // ------------------------------------------------------------------
    // Panel construction and menu gating
    // ------------------------------------------------------------------

    fn build_panel(&self, record: &LayerRecord) -> Panel {
        let mut panel = Panel::new(record.id.clone());
        // vector layers always answer feature selection locally
        panel.info_enabled = record.kind == LayerKind::VectorLocal || record.queryable;
        let descriptor = self.capabilities.get(&record.id);
        panel.edit_enabled = record.kind == LayerKind::RasterService
            && descriptor
                .as_ref()
                .map(|d| d.has_feature_service())
                .unwrap_or(false)
            && self.edit.is_some();
        panel.attribution = record
            .attribution
            .as_ref()
            .map(crate::panel::format_attribution);
        if self.config.display_visibility_range {
            panel.visibility_range = crate::panel::format_visibility_range(&record.render);
        }
        panel
    }

    fn build_actions(
        &self,
        record: &LayerRecord,
        descriptor: Option<&CapabilityDescriptor>,
    ) -> Vec<MenuAction> {
        menu::build_menu_actions(
            record.kind,
            descriptor,
            &record.render,
            &self.availability(),
            &self.config.accepted_image_formats,
        )
    }

    /// Materialize the actions menu now if possible, otherwise leave the
    /// loading placeholder up and park a gate on the capability cache.
    fn wire_actions_menu(&self, record: &LayerRecord) {
        let descriptor = self.capabilities.get(&record.id);
        let actions = self.build_actions(record, descriptor.as_ref());
        if !actions.is_empty() {
            self.panels.set_ready(&record.id, actions);
            self.events
                .publish(&ConsoleEvent::MenuReady { layer: record.id.clone() });
            return;
        }

        let id = record.id.clone();
        let kind = record.kind;
        let render = record.render.clone();
        let availability = self.availability();
        let accepted = self.config.accepted_image_formats.clone();
        let cache = self.capabilities.clone();
        let builder_id = id.clone();
        let builder = move || {
            let descriptor = cache.get(&builder_id);
            menu::build_menu_actions(
                kind,
                descriptor.as_ref(),
                &render,
                &availability,
                &accepted,
            )
        };

        let panels = self.panels.clone();
        let events = self.events.clone();
        let ready_id = id.clone();
        let on_ready = move |actions: Vec<MenuAction>| {
            if panels.set_ready(&ready_id, actions) {
                events.publish(&ConsoleEvent::MenuReady { layer: ready_id.clone() });
            }
        };

        let gate = ReadyGate::spawn(self.capabilities.changes(), builder, on_ready);
        if let Some(stale) = self
            .gates
            .lock()
            .expect("gate table poisoned")
            .insert(id, gate)
        {
            stale.cancel();
        }
    }

    /// Rebuild a materialized menu from current state (style/format
    /// selection changed, base flag flipped). Loading panels are left to
    /// their gate.
    pub(crate) fn refresh_menu(&self, id: &LayerId) {
        let record = match self.layer(id) {
            Some(record) => record,
            None => return,
        };
        let ready = self
            .panels
            .with_panel(id, |panel| !panel.is_loading())
            .unwrap_or(false);
        if !ready {
            return;
        }
        let descriptor = self.capabilities.get(id);
        let actions = self.build_actions(&record, descriptor.as_ref());
        self.panels.set_ready(id, actions);
    }

    /// Clear every style checkmark of a layer's panel without firing a
    /// selection event.
    pub fn unselect_styles(&self, id: &LayerId) {
        self.panels.with_panel_mut(id, |panel| panel.unselect_styles());
    }

    /// Items for the edit split-button dropdown: drawing a new feature once
    /// a drawable geometry shape has been recorded by the schema probe.
    pub fn edition_menu(&self, id: &LayerId) -> Vec<MenuAction> {
        let Some(record) = self.layer(id) else {
            return Vec::new();
        };
        let descriptor = self.capabilities.get(id);
        menu::build_edition_items(&record, descriptor.as_ref())
    }

    // ------------------------------------------------------------------
    // Capability fetch coordination
    // ------------------------------------------------------------------

    /// Fetch the capability descriptor for a layer unless it is already
    /// described or a fetch is in flight (re-entrant fetches are
    /// suppressed).
    pub async fn ensure_described(&self, id: &LayerId) -> ConsoleResult<()> {
        if self.capabilities.is_described(id) {
            return Ok(());
        }
        let record = match self.layer(id) {
            Some(record) => record,
            None => return Err(ConsoleError::StaleRecord(id.clone())),
        };
        {
            let mut state = self.state.lock().expect("console state poisoned");
            if !state.pending_describe.insert(id.clone()) {
                debug!(layer = %id, "Capability fetch already in flight, suppressed");
                return Ok(());
            }
        }

        let outcome = self.collaborators.fetcher.describe(&record).await;
        self.state
            .lock()
            .expect("console state poisoned")
            .pending_describe
            .remove(id);

        match outcome {
            Ok(descriptor) => {
                self.capabilities.insert(id.clone(), descriptor);
                self.on_capability_arrived(id);
                Ok(())
            }
            Err(ConsoleError::FetchFailure { layer, message }) => {
                Err(ConsoleError::FetchFailure { layer, message })
            }
            Err(err) => Err(ConsoleError::FetchFailure {
                layer: id.clone(),
                message: err.to_string(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Menu dispatch
    // ------------------------------------------------------------------

    /// Execute a menu action for a layer. Stale identities are a silent
    /// no-op; recoverable failures surface through the notices collaborator
    /// and as the returned error.
    pub async fn invoke(&self, id: &LayerId, action: &MenuAction) -> ConsoleResult<()> {
        let record = match self.layer(id) {
            Some(record) => record,
            None => {
                debug!(layer = %id, "Menu invocation on removed layer ignored");
                return Ok(());
            }
        };

        match action {
            MenuAction::Separator
            | MenuAction::ChooseStyle { .. }
            | MenuAction::ModifyFormat { .. } => Ok(()),
            MenuAction::Recenter => self.recenter(&record).await,
            MenuAction::Refresh => {
                self.collaborators.map.merge_params(
                    id,
                    &[("nocache", Utc::now().timestamp_millis().to_string())],
                );
                Ok(())
            }
            MenuAction::ShowMetadata { url } => {
                self.events.publish(&ConsoleEvent::MetadataRequested {
                    layer: id.clone(),
                    url: url.clone(),
                });
                Ok(())
            }
            MenuAction::EditSymbology => {
                if let Some(styler) = &self.collaborators.styler {
                    styler.open(&record);
                }
                Ok(())
            }
            MenuAction::BuildQuery => {
                self.build_query(&record);
                Ok(())
            }
            MenuAction::DownloadData { metadata_url } => {
                self.submit_download(&record, metadata_url.clone());
                Ok(())
            }
            MenuAction::ToggleBaseLayer { to_base } => {
                {
                    let mut state = self.state.lock().expect("console state poisoned");
                    if let Some(stored) = state.records.iter_mut().find(|r| &r.id == id) {
                        stored.render.base_layer = *to_base;
                    }
                }
                self.collaborators.map.set_base_layer(id, *to_base);
                self.refresh_menu(id);
                Ok(())
            }
            MenuAction::DrawNew { shape } => {
                if let Some(editor) = &self.collaborators.editor {
                    editor.session.draw(*shape);
                }
                Ok(())
            }
        }
    }

    async fn recenter(&self, record: &LayerRecord) -> ConsoleResult<()> {
        if record.kind == LayerKind::VectorLocal {
            match self.collaborators.map.data_extent(&record.id) {
                Some(extent) if !extent.is_degenerate() => {
                    let srs = self.collaborators.map.projection();
                    self.collaborators.map.zoom_to_extent(extent, &srs);
                }
                _ => {
                    debug!(layer = %record.id, "Vector layer has no usable data extent");
                }
            }
            return Ok(());
        }

        if let Some(descriptor) = self.capabilities.get(&record.id) {
            return self.zoom_to_descriptor_extent(record, &descriptor);
        }

        // No extent known yet: hydrate the descriptor, then recenter once.
        match self.ensure_described(&record.id).await {
            Ok(()) => {
                if self.layer(&record.id).is_none() {
                    // removed while the fetch was in flight
                    return Ok(());
                }
                match self.capabilities.get(&record.id) {
                    Some(descriptor) => self.zoom_to_descriptor_extent(record, &descriptor),
                    None => self.report_extent_unavailable(record),
                }
            }
            Err(ConsoleError::StaleRecord(_)) => Ok(()),
            Err(_) => self.report_extent_unavailable(record),
        }
    }

    fn zoom_to_descriptor_extent(
        &self,
        record: &LayerRecord,
        descriptor: &CapabilityDescriptor,
    ) -> ConsoleResult<()> {
        let srs = self.collaborators.map.projection();
        if let Some(bbox) = descriptor.bbox_for(&srs) {
            self.collaborators.map.zoom_to_extent(*bbox, &srs);
            return Ok(());
        }
        if let Some(lat_lon) = descriptor.lat_lon_bbox {
            // the map surface transforms from geographic coordinates
            self.collaborators.map.zoom_to_extent(lat_lon, "EPSG:4326");
            return Ok(());
        }
        self.report_extent_unavailable(record)
    }

    fn report_extent_unavailable(&self, record: &LayerRecord) -> ConsoleResult<()> {
        let err = ConsoleError::ExtentUnavailable(record.id.clone());
        if let Some(notice) = err.user_notice() {
            self.collaborators.notices.error(&notice);
        }
        Err(err)
    }

    fn build_query(&self, record: &LayerRecord) {
        let Some(querier) = &self.collaborators.querier else {
            return;
        };

        let already_configured = {
            let state = self.state.lock().expect("console state poisoned");
            state.query_target.as_ref() == Some(&record.id)
        };
        if already_configured {
            querier.show_current();
            return;
        }

        let Some(descriptor) = self.capabilities.get(&record.id) else {
            debug!(layer = %record.id, "Query requested before description");
            return;
        };
        let Some(binding) = descriptor.feature_service else {
            debug!(layer = %record.id, "Query requested without feature service");
            return;
        };

        let name = if record.title.is_empty() {
            record.name.clone()
        } else {
            record.title.clone()
        };
        let namespace = match record.kind {
            LayerKind::FeatureService => binding.namespace.clone(),
            _ => None,
        };
        querier.open(QueryTarget {
            name,
            namespace,
            service_url: binding.url,
            type_name: binding.type_name,
        });
        self.state
            .lock()
            .expect("console state poisoned")
            .query_target = Some(record.id.clone());
    }

    fn submit_download(&self, record: &LayerRecord, metadata_url: Option<String>) {
        let descriptor = self.capabilities.get(&record.id);
        let (service_type, service_url) = match record.kind {
            LayerKind::FeatureService => (
                "WFS",
                descriptor
                    .as_ref()
                    .and_then(|d| d.feature_service.as_ref())
                    .map(|b| b.url.clone())
                    .or_else(|| record.source_url.clone()),
            ),
            _ => ("WMS", record.source_url.clone()),
        };
        let Some(service_url) = service_url else {
            warn!(layer = %record.id, "Download without a service endpoint ignored");
            return;
        };
        self.collaborators.downloads.submit(DownloadRequest {
            layers: vec![DownloadLayer {
                layer_name: record.name.clone(),
                metadata_url: metadata_url.unwrap_or_default(),
                service_type: service_type.to_string(),
                service_url,
            }],
        });
    }

    // ------------------------------------------------------------------
    // Edit mode
    // ------------------------------------------------------------------

    /// Toggle edit mode for a layer: leave when it is the active one, enter
    /// otherwise. Entry while another layer is active is a guarded no-op.
    pub async fn toggle_edit(&self, id: &LayerId) -> ConsoleResult<()> {
        let Some(edit) = &self.edit else {
            return Ok(());
        };
        let record = match self.layer(id) {
            Some(record) => record,
            None => {
                debug!(layer = %id, "Edit toggle on removed layer ignored");
                return Ok(());
            }
        };

        if edit.active_layer().as_ref() == Some(id) {
            edit.leave().await;
            self.panels.with_panel_mut(id, |panel| panel.edit_active = false);
            self.events.publish(&ConsoleEvent::EditStateChanged {
                layer: id.clone(),
                active: false,
            });
            return Ok(());
        }

        let Some(binding) = self
            .capabilities
            .get(id)
            .and_then(|descriptor| descriptor.feature_service)
        else {
            debug!(layer = %id, "Edit toggle without feature service ignored");
            return Ok(());
        };

        match edit.enter(&record, &binding).await {
            Ok(Some(outcome)) => {
                {
                    let mut state = self.state.lock().expect("console state poisoned");
                    if let Some(stored) = state.records.iter_mut().find(|r| &r.id == id) {
                        stored.geometry = outcome.geometry;
                    }
                }
                self.panels.with_panel_mut(id, |panel| panel.edit_active = true);
                self.refresh_menu(id);
                self.events.publish(&ConsoleEvent::EditStateChanged {
                    layer: id.clone(),
                    active: true,
                });
                Ok(())
            }
            // another layer is busy editing; the toggle stays unchecked
            Ok(None) => Ok(()),
            Err(err) => {
                self.panels.with_panel_mut(id, |panel| panel.edit_active = false);
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for LayerConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerConsole")
            .field("layers", &self.layer_count())
            .field("panels", &self.panels.len())
            .finish()
    }
}
