//! Edit-mode coordination.
//!
//! A short state machine per console: Idle -> Probing -> Active -> Idle,
//! with Probing able to fail back to Idle. Entering edit mode probes the
//! feature-type schema, validates the geometry column, and hands off to the
//! external editing session. One layer is editable at a time; switching
//! layers is the caller's responsibility via the same toggle.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use console_common::{
    ConsoleError, ConsoleResult, FeatureServiceBinding, GeometryInfo, LayerId, LayerRecord,
};

use crate::collaborators::{EditActivation, EditTools, FeatureProtocol, Notices};

/// Coordinator states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    Idle,
    Probing(LayerId),
    Active(LayerId),
}

/// What `enter` established: the geometry recorded on the layer (if any)
/// and whether the session runs attribute-only.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub geometry: Option<GeometryInfo>,
    pub read_only_geometry: bool,
}

/// Per-console edit-mode state machine.
pub struct EditCoordinator {
    state: Mutex<EditState>,
    tools: EditTools,
    notices: Arc<dyn Notices>,
}

impl EditCoordinator {
    pub fn new(tools: EditTools, notices: Arc<dyn Notices>) -> Self {
        Self {
            state: Mutex::new(EditState::Idle),
            tools,
            notices,
        }
    }

    pub fn state(&self) -> EditState {
        self.state.lock().expect("edit state poisoned").clone()
    }

    pub fn active_layer(&self) -> Option<LayerId> {
        match self.state() {
            EditState::Active(id) => Some(id),
            _ => None,
        }
    }

    /// Enter edit mode for a layer.
    ///
    /// Returns `Ok(None)` as a guarded no-op when another layer is already
    /// probing or active. On success the caller records the returned
    /// geometry on its layer record.
    pub async fn enter(
        &self,
        record: &LayerRecord,
        binding: &FeatureServiceBinding,
    ) -> ConsoleResult<Option<EditOutcome>> {
        {
            let mut state = self.state.lock().expect("edit state poisoned");
            match &*state {
                EditState::Idle => {
                    *state = EditState::Probing(record.id.clone());
                }
                busy => {
                    debug!(layer = %record.id, state = ?busy, "Edit entry ignored, editor busy");
                    return Ok(None);
                }
            }
        }

        let schema = match self
            .tools
            .probe
            .describe_feature_type(&binding.url, &binding.type_name)
            .await
        {
            Ok(schema) => schema,
            Err(err) => {
                self.reset_to_idle();
                let failure = ConsoleError::FetchFailure {
                    layer: record.id.clone(),
                    message: err.to_string(),
                };
                if let Some(notice) = failure.user_notice() {
                    self.notices.error(&notice);
                }
                return Err(failure);
            }
        };

        // Geometry is handled separately from tabular attributes: pull the
        // first geometry-like column out of the schema.
        let mut attributes = schema.attributes;
        let geometry_column = attributes
            .iter()
            .position(|attr| attr.geometry().is_some());
        let (geometry_name, parsed) = match geometry_column {
            Some(index) => {
                let column = attributes.remove(index);
                let parsed = column.geometry();
                (Some(column.name), parsed)
            }
            None => (None, None),
        };

        let mut read_only_geometry = false;
        let mut geometry = None;
        match parsed {
            None => {
                self.notices
                    .info("No geometry column. Switching to attributes-only edition.");
                read_only_geometry = true;
            }
            Some(info) if !info.shape.has_draw_handler() => {
                self.notices.info(&format!(
                    "Geometry column type ({}) is unsupported. Switching to attributes-only edition.",
                    info.shape.as_str()
                ));
                read_only_geometry = true;
            }
            Some(info) => {
                geometry = Some(info);
            }
        }

        let activation = EditActivation {
            protocol: FeatureProtocol {
                service_url: binding.url.clone(),
                type_name: binding.type_name.clone(),
                namespace: schema.namespace.or_else(|| binding.namespace.clone()),
                version: schema.protocol_version,
                geometry_name,
            },
            attributes,
            layer: record.id.clone(),
            read_only_geometry,
        };

        if let Err(err) = self.tools.session.activate(activation).await {
            self.reset_to_idle();
            let failure = ConsoleError::FetchFailure {
                layer: record.id.clone(),
                message: format!("editing session refused to start: {}", err),
            };
            if let Some(notice) = failure.user_notice() {
                self.notices.error(&notice);
            }
            return Err(failure);
        }

        *self.state.lock().expect("edit state poisoned") = EditState::Active(record.id.clone());
        info!(layer = %record.id, read_only_geometry, "Edit mode active");
        Ok(Some(EditOutcome {
            geometry,
            read_only_geometry,
        }))
    }

    /// Leave edit mode. Always lands in Idle, even when the session reports
    /// a deactivation error: the UI must never stay stuck in edit mode.
    pub async fn leave(&self) {
        if let Err(err) = self.tools.session.deactivate().await {
            warn!(error = %err, "Editing session deactivation failed");
        }
        self.reset_to_idle();
    }

    fn reset_to_idle(&self) {
        *self.state.lock().expect("edit state poisoned") = EditState::Idle;
    }
}

impl std::fmt::Debug for EditCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditCoordinator")
            .field("state", &self.state())
            .finish()
    }
}
