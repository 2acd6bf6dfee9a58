//! Per-layer panels and their registry.
//!
//! A panel is the realized UI state for one layer: toolbar toggles, the
//! gated actions menu, and the informational lines. Panels are created once
//! per layer and destroyed exactly when the layer record is destroyed.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use console_common::{Attribution, LayerId, RenderState};

use crate::menu::MenuAction;

/// The actions menu of a panel: a loading placeholder until the ready gate
/// materializes the real items.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionsMenu {
    Loading,
    Ready(Vec<MenuAction>),
}

impl ActionsMenu {
    pub fn is_loading(&self) -> bool {
        matches!(self, ActionsMenu::Loading)
    }
}

/// Realized UI state for one layer.
#[derive(Debug, Clone)]
pub struct Panel {
    pub layer: LayerId,
    /// Feature-info toggle; disabled unless the layer is queryable.
    pub info_enabled: bool,
    /// Edit toggle; enabled only once the layer is known to have an
    /// equivalent feature service.
    pub edit_enabled: bool,
    pub edit_active: bool,
    pub actions: ActionsMenu,
    pub attribution: Option<String>,
    pub visibility_range: Option<String>,
}

impl Panel {
    pub fn new(layer: LayerId) -> Self {
        Self {
            layer,
            info_enabled: false,
            edit_enabled: false,
            edit_active: false,
            actions: ActionsMenu::Loading,
            attribution: None,
            visibility_range: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.actions.is_loading()
    }

    /// The materialized actions, empty while loading.
    pub fn actions(&self) -> &[MenuAction] {
        match &self.actions {
            ActionsMenu::Loading => &[],
            ActionsMenu::Ready(items) => items,
        }
    }

    /// Clear the checked state of every style entry without firing a
    /// selection event, for when an external style assignment bypasses the
    /// menu.
    pub fn unselect_styles(&mut self) {
        if let ActionsMenu::Ready(items) = &mut self.actions {
            for item in items.iter_mut() {
                if let MenuAction::ChooseStyle { entries } = item {
                    for entry in entries.iter_mut() {
                        entry.checked = false;
                    }
                }
            }
        }
    }

    /// Move the style checkmark to `value` (empty string = default entry),
    /// like a radio group.
    pub fn check_style(&mut self, value: &str) {
        if let ActionsMenu::Ready(items) = &mut self.actions {
            for item in items.iter_mut() {
                if let MenuAction::ChooseStyle { entries } = item {
                    for entry in entries.iter_mut() {
                        entry.checked = entry.value == value;
                    }
                }
            }
        }
    }

    /// Move the format checkmark to `value`.
    pub fn check_format(&mut self, value: &str) {
        if let ActionsMenu::Ready(items) = &mut self.actions {
            for item in items.iter_mut() {
                if let MenuAction::ModifyFormat { entries } = item {
                    for entry in entries.iter_mut() {
                        entry.checked = entry.value == value;
                    }
                }
            }
        }
    }
}

/// "source: <title>" line for the panel.
pub fn format_attribution(attribution: &Attribution) -> String {
    let title = attribution.title.as_deref().unwrap_or("unknown");
    format!("source: {}", title)
}

/// Indicative visibility range line, when both scale bounds are known.
pub fn format_visibility_range(render: &RenderState) -> Option<String> {
    match (render.max_scale, render.min_scale) {
        (Some(max), Some(min)) => Some(format!("1:{:.0} to 1:{:.0}", max, min)),
        _ => None,
    }
}

/// Cache of realized panels keyed by layer identity.
pub struct PanelRegistry {
    panels: Mutex<HashMap<LayerId, Panel>>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self {
            panels: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, panel: Panel) {
        self.panels
            .lock()
            .expect("panel registry poisoned")
            .insert(panel.layer.clone(), panel);
    }

    /// Evict the panel for a destroyed layer. Idempotent.
    pub fn remove(&self, id: &LayerId) -> bool {
        let removed = self
            .panels
            .lock()
            .expect("panel registry poisoned")
            .remove(id)
            .is_some();
        if removed {
            debug!(layer = %id, "Panel evicted");
        }
        removed
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.panels
            .lock()
            .expect("panel registry poisoned")
            .contains_key(id)
    }

    /// Read access to a panel; None for unknown layers (stale access).
    pub fn with_panel<R>(&self, id: &LayerId, f: impl FnOnce(&Panel) -> R) -> Option<R> {
        self.panels
            .lock()
            .expect("panel registry poisoned")
            .get(id)
            .map(f)
    }

    /// Mutate a panel; a no-op returning None for unknown layers.
    pub fn with_panel_mut<R>(&self, id: &LayerId, f: impl FnOnce(&mut Panel) -> R) -> Option<R> {
        self.panels
            .lock()
            .expect("panel registry poisoned")
            .get_mut(id)
            .map(f)
    }

    /// Materialize the actions menu. Returns false (and changes nothing)
    /// when the layer's panel is gone, which is the expected outcome of a
    /// removal race.
    pub fn set_ready(&self, id: &LayerId, actions: Vec<MenuAction>) -> bool {
        let mut panels = self.panels.lock().expect("panel registry poisoned");
        match panels.get_mut(id) {
            Some(panel) => {
                panel.actions = ActionsMenu::Ready(actions);
                true
            }
            None => {
                debug!(layer = %id, "Dropped menu for removed layer");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.panels.lock().expect("panel registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PanelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
