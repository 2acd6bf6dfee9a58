//! Menu construction.
//!
//! Pure functions from (layer kind, capability descriptor, render state,
//! collaborator availability) to an ordered action list. No state: the same
//! inputs always produce the same menu, which is what makes the ready-gate
//! protocol sound.

use console_common::{
    CapabilityDescriptor, FormatEntry, GeometryShape, LayerKind, LayerRecord, MetadataLink,
    RenderState, StyleEntry,
};

/// Which optional collaborators the embedding application wired in. Their
/// mere presence gates menu items.
#[derive(Debug, Clone, Copy, Default)]
pub struct Availability {
    pub styler: bool,
    pub querier: bool,
    pub editor: bool,
}

/// One entry of the style submenu.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleChoice {
    pub label: String,
    /// Value carried by the selection event; empty string selects the
    /// server default.
    pub value: String,
    pub checked: bool,
}

/// One entry of the format submenu.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatChoice {
    pub label: String,
    pub value: String,
    pub checked: bool,
    /// False for the synthetic single entry shown when the capability
    /// document lists no formats (nothing else to pick).
    pub selectable: bool,
}

/// An entry of a layer's actions menu, in display order.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    Separator,
    Recenter,
    Refresh,
    ShowMetadata { url: String },
    EditSymbology,
    BuildQuery,
    DownloadData { metadata_url: Option<String> },
    ChooseStyle { entries: Vec<StyleChoice> },
    ModifyFormat { entries: Vec<FormatChoice> },
    ToggleBaseLayer { to_base: bool },
    DrawNew { shape: GeometryShape },
}

impl MenuAction {
    pub fn label(&self) -> String {
        match self {
            MenuAction::Separator => String::new(),
            MenuAction::Recenter => "Recenter on the layer".to_string(),
            MenuAction::Refresh => "Refresh layer".to_string(),
            MenuAction::ShowMetadata { .. } => "Show metadata".to_string(),
            MenuAction::EditSymbology => "Edit symbology".to_string(),
            MenuAction::BuildQuery => "Build a query".to_string(),
            MenuAction::DownloadData { .. } => "Download data".to_string(),
            MenuAction::ChooseStyle { .. } => "Choose a style".to_string(),
            MenuAction::ModifyFormat { .. } => "Modify format".to_string(),
            MenuAction::ToggleBaseLayer { to_base } => {
                if *to_base {
                    "Set as baselayer".to_string()
                } else {
                    "Set as overlay".to_string()
                }
            }
            MenuAction::DrawNew { shape } => format!("Draw new {}", shape.as_str()),
        }
    }

    pub fn icon_class(&self) -> Option<&'static str> {
        match self {
            MenuAction::Recenter => Some("console-btn-zoom"),
            MenuAction::Refresh => Some("console-btn-refresh"),
            MenuAction::ShowMetadata { .. } => Some("console-btn-metadata"),
            MenuAction::EditSymbology => Some("console-btn-style"),
            MenuAction::BuildQuery => Some("console-btn-query"),
            MenuAction::DownloadData { .. } => Some("console-btn-download"),
            MenuAction::DrawNew { .. } => Some("console-btn-edit"),
            _ => None,
        }
    }
}

/// Pick the metadata document to show: the first HTML-like link wins,
/// otherwise the first link.
pub fn preferred_metadata_url(links: &[MetadataLink]) -> Option<String> {
    links
        .iter()
        .find(|link| link.is_html())
        .or_else(|| links.first())
        .map(|link| link.href.clone())
}

/// Build the ordered actions menu for a layer.
///
/// Service layers whose capability descriptor has not arrived yield an
/// empty list; the ready gate keeps waiting on exactly this.
pub fn build_menu_actions(
    kind: LayerKind,
    descriptor: Option<&CapabilityDescriptor>,
    render: &RenderState,
    availability: &Availability,
    accepted_formats: &[String],
) -> Vec<MenuAction> {
    let described = descriptor.map(|d| d.described).unwrap_or(false);
    if kind.is_service() && !described {
        return Vec::new();
    }

    let has_feature_service = match kind {
        LayerKind::RasterService | LayerKind::FeatureService => descriptor
            .map(|d| d.has_feature_service())
            .unwrap_or(false),
        LayerKind::TiledService | LayerKind::VectorLocal => false,
    };
    let has_coverage_service = match kind {
        LayerKind::RasterService => descriptor.map(|d| d.has_coverage_service).unwrap_or(false),
        _ => false,
    };

    let mut items = vec![MenuAction::Recenter];

    // cache-bust redraw, meaningless for in-memory layers
    if kind.is_service() {
        items.push(MenuAction::Refresh);
    }

    let metadata_url =
        descriptor.and_then(|d| preferred_metadata_url(&d.metadata_links));

    let mut gated = Vec::new();
    if let Some(url) = &metadata_url {
        gated.push(MenuAction::ShowMetadata { url: url.clone() });
    }
    if availability.styler && kind == LayerKind::RasterService && has_feature_service {
        gated.push(MenuAction::EditSymbology);
    }
    if availability.querier && (kind == LayerKind::FeatureService || has_feature_service) {
        gated.push(MenuAction::BuildQuery);
    }
    if has_feature_service || has_coverage_service || kind == LayerKind::FeatureService {
        gated.push(MenuAction::DownloadData { metadata_url });
    }
    if !gated.is_empty() {
        items.push(MenuAction::Separator);
        items.append(&mut gated);
    }

    match kind {
        LayerKind::RasterService | LayerKind::TiledService => {
            let styles: &[StyleEntry] = descriptor.map(|d| d.styles.as_slice()).unwrap_or(&[]);
            let formats: &[FormatEntry] = descriptor.map(|d| d.formats.as_slice()).unwrap_or(&[]);
            items.push(MenuAction::Separator);
            items.push(MenuAction::ChooseStyle {
                entries: build_style_choices(styles, &render.style),
            });
            items.push(MenuAction::ModifyFormat {
                entries: build_format_choices(formats, render, accepted_formats),
            });
            items.push(MenuAction::ToggleBaseLayer {
                to_base: !render.base_layer,
            });
        }
        LayerKind::FeatureService | LayerKind::VectorLocal => {}
    }

    items
}

/// Build the style submenu.
///
/// A synthetic "Default style" entry always comes first. Named styles are
/// listed after it, sorted case-insensitively by name-or-title; styles
/// referenced only by href cannot go into a map request and are skipped.
/// An applied style name wins the checkmark; otherwise a named style
/// flagged current takes it from the synthetic entry. Exactly one entry is
/// checked either way.
pub fn build_style_choices(styles: &[StyleEntry], applied: &str) -> Vec<StyleChoice> {
    let mut named: Vec<&StyleEntry> = styles
        .iter()
        .filter(|style| !style.name.is_empty())
        .collect();
    named.sort_by_key(|style| sort_key(style));

    let applied_known = !applied.is_empty() && named.iter().any(|style| style.name == applied);
    let any_current = named.iter().any(|style| style.current);

    let mut choices = vec![StyleChoice {
        label: "Default style".to_string(),
        value: String::new(),
        checked: if applied_known { false } else { !any_current },
    }];
    for style in named {
        let checked = if applied_known {
            style.name == applied
        } else {
            style.current
        };
        choices.push(StyleChoice {
            // title is human readable but often irrelevant; name is what
            // servers display and what the request parameter takes
            label: style.name.clone(),
            value: style.name.clone(),
            checked,
        });
    }
    choices
}

fn sort_key(style: &StyleEntry) -> String {
    let key = if style.name.is_empty() {
        &style.title
    } else {
        &style.name
    };
    key.to_lowercase()
}

/// Build the format submenu, filtered to the accepted allow-list. When the
/// capability document advertises no formats, the only one we know is the
/// currently applied one, shown checked with nothing else to pick.
pub fn build_format_choices(
    formats: &[FormatEntry],
    render: &RenderState,
    accepted_formats: &[String],
) -> Vec<FormatChoice> {
    if formats.is_empty() {
        let current = render.format.clone().unwrap_or_default();
        return vec![FormatChoice {
            label: current.clone(),
            value: current,
            checked: true,
            selectable: false,
        }];
    }

    formats
        .iter()
        .filter(|format| accepted_formats.iter().any(|a| a == &format.value))
        .map(|format| FormatChoice {
            label: format.value.clone(),
            value: format.value.clone(),
            // an applied format wins over the capability's current flag
            checked: match render.format.as_deref() {
                Some(applied) => format.value == applied,
                None => format.current,
            },
            selectable: true,
        })
        .collect()
}

/// Build the edition submenu: once the schema probe has recorded a drawable
/// geometry shape, offer to draw a new feature of that shape.
pub fn build_edition_items(
    record: &LayerRecord,
    descriptor: Option<&CapabilityDescriptor>,
) -> Vec<MenuAction> {
    let described = descriptor.map(|d| d.described).unwrap_or(false);
    if record.kind.is_service() && !described {
        return Vec::new();
    }
    let has_feature_service = descriptor
        .map(|d| d.has_feature_service())
        .unwrap_or(false);
    if record.kind != LayerKind::RasterService || !has_feature_service {
        return Vec::new();
    }
    match record.geometry {
        Some(info) if info.shape.has_draw_handler() => {
            vec![MenuAction::DrawNew { shape: info.shape }]
        }
        _ => Vec::new(),
    }
}
