//! Style and format mutation.
//!
//! Applies a user's submenu selection to the live layer and republishes a
//! selection event for external observers (persistence, logging). Kept
//! separate from menu construction: these run after the menu exists.

use tracing::debug;

use console_common::{ConsoleEvent, LayerId, LayerKind};

use crate::sync::LayerConsole;

impl LayerConsole {
    /// Apply a style selection. An empty value selects the server default.
    /// Stale identities are ignored.
    pub fn select_style(&self, id: &LayerId, style: &str) {
        let Some(record) = self.layer(id) else {
            debug!(layer = %id, "Style selection on removed layer ignored");
            return;
        };

        self.update_render(id, |render| render.style = style.to_string());
        self.collaborators().map.set_style(id, style);
        self.with_panel_mut(id, |panel| panel.check_style(style));
        self.events().publish(&ConsoleEvent::StyleSelected {
            layer: record.id,
            style: style.to_string(),
        });
    }

    /// Apply an output format selection. Tile-backed layers are redrawn
    /// explicitly: a parameter refresh alone does not repaint cached tiles.
    pub fn select_format(&self, id: &LayerId, format: &str) {
        let Some(record) = self.layer(id) else {
            debug!(layer = %id, "Format selection on removed layer ignored");
            return;
        };

        self.update_render(id, |render| render.format = Some(format.to_string()));
        self.collaborators().map.set_format(id, format);
        if record.kind == LayerKind::TiledService {
            self.collaborators().map.redraw(id);
        }
        self.with_panel_mut(id, |panel| panel.check_format(format));
        self.events().publish(&ConsoleEvent::FormatSelected {
            layer: record.id,
            format: format.to_string(),
        });
    }
}
