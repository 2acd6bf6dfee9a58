//! Interactive map-layer management console.
//!
//! Keeps a tree-structured UI in sync with the map's ordered layer list,
//! defers per-layer menus until capability metadata has arrived, and
//! coordinates edit mode for a selected layer. The map surface, fetchers
//! and tools are injected collaborators; this crate owns only the
//! synchronization and gating logic.

pub mod cache;
pub mod collaborators;
pub mod config;
pub mod edit;
pub mod gate;
pub mod menu;
mod mutator;
pub mod panel;
pub mod sync;

pub use cache::CapabilityCache;
pub use collaborators::{
    CapabilityFetcher, Collaborators, DownloadLayer, DownloadRequest, DownloadSink,
    EditActivation, EditTools, EditingSession, FeatureProtocol, MapSurface, Notices,
    QueryBuilder, QueryTarget, SchemaProbe, StylingTool,
};
pub use config::ConsoleConfig;
pub use edit::{EditCoordinator, EditOutcome, EditState};
pub use gate::{GateHandle, ReadyGate};
pub use menu::{
    build_edition_items, build_format_choices, build_menu_actions, build_style_choices,
    Availability, FormatChoice, MenuAction, StyleChoice,
};
pub use panel::{ActionsMenu, Panel, PanelRegistry};
pub use sync::{LayerConsole, TreeNode};
