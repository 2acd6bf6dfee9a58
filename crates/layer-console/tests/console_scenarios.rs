//! End-to-end scenarios for the layer console: tree synchronization,
//! capability-gated menus, and menu dispatch against recorded fakes.

use std::sync::{Arc, Mutex};

use console_common::{BoundingBox, ConsoleError, ConsoleEvent, LayerId};
use layer_console::{MenuAction, TreeNode};
use test_utils::{
    descriptor_with_bbox, descriptor_with_feature_service, descriptor_with_styles,
    feature_record, plain_descriptor, raster_record, tiled_record, vector_record, ConsoleHarness,
    MapCall,
};

fn recorded_events(harness: &ConsoleHarness) -> Arc<Mutex<Vec<ConsoleEvent>>> {
    let events: Arc<Mutex<Vec<ConsoleEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    harness.console.events().subscribe(move |event| {
        sink.lock().unwrap().push(event.clone());
    });
    events
}

fn node_order(nodes: &[TreeNode]) -> Vec<String> {
    nodes.iter().map(|node| node.layer.0.clone()).collect()
}

fn panel_actions(harness: &ConsoleHarness, id: &LayerId) -> Vec<MenuAction> {
    harness
        .console
        .with_panel(id, |panel| panel.actions().to_vec())
        .expect("panel exists")
}

// ============================================================================
// Tree synchronization
// ============================================================================

#[tokio::test]
async fn test_tree_order_tracks_list_after_every_operation() {
    test_utils::init_tracing();
    let harness = ConsoleHarness::new();

    harness.console.on_layer_added(vector_record("a"), 0);
    assert_eq!(node_order(&harness.console.tree_nodes()), vec!["a"]);

    harness.console.on_layer_added(vector_record("b"), 0);
    harness.console.on_layer_added(vector_record("c"), 1);
    assert_eq!(node_order(&harness.console.tree_nodes()), vec!["b", "c", "a"]);

    harness.console.on_layers_reordered(&[
        LayerId::new("a"),
        LayerId::new("b"),
        LayerId::new("c"),
    ]);
    assert_eq!(node_order(&harness.console.tree_nodes()), vec!["a", "b", "c"]);

    harness.console.on_layer_removed(&LayerId::new("b"));
    assert_eq!(node_order(&harness.console.tree_nodes()), vec!["a", "c"]);

    // removal of an unknown layer is a silent no-op
    harness.console.on_layer_removed(&LayerId::new("b"));
    assert_eq!(node_order(&harness.console.tree_nodes()), vec!["a", "c"]);
}

#[tokio::test]
async fn test_reorder_affordances_disabled_at_boundaries() {
    let harness = ConsoleHarness::new();
    harness.console.on_layer_added(vector_record("top"), 0);
    harness.console.on_layer_added(vector_record("mid"), 1);
    harness.console.on_layer_added(vector_record("bottom"), 2);

    let nodes = harness.console.tree_nodes();
    assert!(!nodes[0].up_enabled);
    assert!(nodes[0].down_enabled);
    assert!(nodes[1].up_enabled);
    assert!(nodes[1].down_enabled);
    assert!(nodes[2].up_enabled);
    assert!(!nodes[2].down_enabled);
}

#[tokio::test]
async fn test_boundary_moves_are_noops() {
    let harness = ConsoleHarness::new();
    harness.console.on_layer_added(vector_record("top"), 0);
    harness.console.on_layer_added(vector_record("bottom"), 1);

    harness.console.move_layer_up(&LayerId::new("top"));
    harness.console.move_layer_down(&LayerId::new("bottom"));
    assert!(harness.map.calls().is_empty());

    harness.console.move_layer_up(&LayerId::new("bottom"));
    harness.console.move_layer_down(&LayerId::new("top"));
    assert_eq!(
        harness.map.calls(),
        vec![
            MapCall::RaiseLayer {
                layer: LayerId::new("bottom"),
                delta: 1
            },
            MapCall::RaiseLayer {
                layer: LayerId::new("top"),
                delta: -1
            },
        ]
    );
}

// ============================================================================
// Capability gating
// ============================================================================

#[tokio::test]
async fn test_feature_service_menu_materializes_on_capability_arrival() {
    let harness = ConsoleHarness::new();
    let record = feature_record("a");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    let loading = harness.console.with_panel(&id, |p| p.is_loading()).unwrap();
    assert!(loading, "menu must stay empty until the layer is described");

    harness.deliver_capability(&id, plain_descriptor());

    let actions = panel_actions(&harness, &id);
    assert!(actions.contains(&MenuAction::Recenter));
    // a feature service downloads its own data even without an equivalence
    assert!(actions
        .iter()
        .any(|a| matches!(a, MenuAction::DownloadData { .. })));
    // symbology needs a raster layer; this one is vector data
    assert!(!actions.contains(&MenuAction::EditSymbology));
    assert!(!actions
        .iter()
        .any(|a| matches!(a, MenuAction::ChooseStyle { .. })));
}

#[tokio::test]
async fn test_vector_layer_menu_is_immediate() {
    let harness = ConsoleHarness::new();
    let record = vector_record("sketch");
    let id = record.id.clone();
    let events = recorded_events(&harness);

    harness.console.on_layer_added(record, 0);

    let actions = panel_actions(&harness, &id);
    assert_eq!(actions, vec![MenuAction::Recenter]);
    assert!(events
        .lock()
        .unwrap()
        .contains(&ConsoleEvent::MenuReady { layer: id }));
}

#[tokio::test]
async fn test_raster_style_submenu_tie_break() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(
        &id,
        descriptor_with_styles(&[("blue", false), ("red", true)]),
    );

    let actions = panel_actions(&harness, &id);
    let entries = actions
        .iter()
        .find_map(|a| match a {
            MenuAction::ChooseStyle { entries } => Some(entries.clone()),
            _ => None,
        })
        .expect("style submenu");

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].label, "Default style");
    assert!(!entries[0].checked);
    assert_eq!(entries[1].value, "blue");
    assert!(!entries[1].checked);
    assert_eq!(entries[2].value, "red");
    assert!(entries[2].checked);
}

#[tokio::test]
async fn test_stale_capability_arrival_is_noop() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();
    let events = recorded_events(&harness);

    harness.console.on_layer_added(record, 0);
    harness.console.on_layer_removed(&id);

    // the fetch resolves after the layer is gone
    harness.deliver_capability(&id, plain_descriptor());
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }

    assert!(harness.console.with_panel(&id, |_| ()).is_none());
    let seen = events.lock().unwrap();
    assert!(!seen
        .iter()
        .any(|e| matches!(e, ConsoleEvent::MenuReady { .. })));
    assert!(!seen
        .iter()
        .any(|e| matches!(e, ConsoleEvent::CapabilityArrived { .. })));
}

#[tokio::test]
async fn test_toolbar_toggles_follow_capability_arrival() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    let (info, edit) = harness
        .console
        .with_panel(&id, |p| (p.info_enabled, p.edit_enabled))
        .unwrap();
    assert!(!info);
    assert!(!edit);

    harness.deliver_capability(&id, descriptor_with_feature_service("ns:a"));

    let (info, edit) = harness
        .console
        .with_panel(&id, |p| (p.info_enabled, p.edit_enabled))
        .unwrap();
    assert!(info, "queryable layers get the info toggle");
    assert!(edit, "feature-service equivalence enables the edit toggle");
}

#[tokio::test]
async fn test_edit_toggle_stays_disabled_without_editor() {
    let harness = ConsoleHarness::without_tools();
    let record = raster_record("a");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, descriptor_with_feature_service("ns:a"));

    let edit = harness.console.with_panel(&id, |p| p.edit_enabled).unwrap();
    assert!(!edit);
}

// ============================================================================
// Style and format selection
// ============================================================================

#[tokio::test]
async fn test_select_style_mutates_layer_and_publishes() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();
    let events = recorded_events(&harness);

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(
        &id,
        descriptor_with_styles(&[("blue", false), ("red", true)]),
    );

    harness.console.select_style(&id, "blue");

    assert!(harness.map.calls().contains(&MapCall::SetStyle {
        layer: id.clone(),
        style: "blue".to_string(),
    }));
    assert_eq!(
        harness.console.layer(&id).unwrap().render.style,
        "blue".to_string()
    );
    assert!(events.lock().unwrap().contains(&ConsoleEvent::StyleSelected {
        layer: id.clone(),
        style: "blue".to_string(),
    }));

    // the checkmark moved with the selection
    let entries = panel_actions(&harness, &id)
        .iter()
        .find_map(|a| match a {
            MenuAction::ChooseStyle { entries } => Some(entries.clone()),
            _ => None,
        })
        .unwrap();
    assert!(entries.iter().find(|e| e.value == "blue").unwrap().checked);
    assert!(!entries.iter().find(|e| e.value == "red").unwrap().checked);
}

#[tokio::test]
async fn test_select_format_redraws_tiled_layers() {
    let harness = ConsoleHarness::new();
    let record = tiled_record("t");
    let id = record.id.clone();
    let events = recorded_events(&harness);

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, descriptor_with_styles(&[]));

    harness.console.select_format(&id, "image/jpeg");

    let calls = harness.map.calls();
    assert!(calls.contains(&MapCall::SetFormat {
        layer: id.clone(),
        format: "image/jpeg".to_string(),
    }));
    assert!(calls.contains(&MapCall::Redraw { layer: id.clone() }));
    assert!(events.lock().unwrap().contains(&ConsoleEvent::FormatSelected {
        layer: id.clone(),
        format: "image/jpeg".to_string(),
    }));
}

#[tokio::test]
async fn test_select_format_does_not_redraw_raster() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, plain_descriptor());
    harness.console.select_format(&id, "image/png");

    assert!(!harness
        .map
        .calls()
        .contains(&MapCall::Redraw { layer: id.clone() }));
}

#[tokio::test]
async fn test_unselect_styles_clears_checkmarks_without_event() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();
    let events = recorded_events(&harness);

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, descriptor_with_styles(&[("red", true)]));

    harness.console.unselect_styles(&id);

    let entries = panel_actions(&harness, &id)
        .iter()
        .find_map(|a| match a {
            MenuAction::ChooseStyle { entries } => Some(entries.clone()),
            _ => None,
        })
        .unwrap();
    assert!(entries.iter().all(|e| !e.checked));
    assert!(!events
        .lock()
        .unwrap()
        .iter()
        .any(|e| matches!(e, ConsoleEvent::StyleSelected { .. })));
}

#[tokio::test]
async fn test_selection_on_removed_layer_is_silent() {
    let harness = ConsoleHarness::new();
    let events = recorded_events(&harness);

    harness.console.select_style(&LayerId::new("gone"), "blue");

    assert!(harness.map.calls().is_empty());
    assert!(events.lock().unwrap().is_empty());
}

// ============================================================================
// Menu dispatch
// ============================================================================

#[tokio::test]
async fn test_refresh_merges_cache_bust_param() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, plain_descriptor());

    harness
        .console
        .invoke(&id, &MenuAction::Refresh)
        .await
        .unwrap();

    let merged = harness.map.calls().into_iter().any(|call| match call {
        MapCall::MergeParams { layer, params } => {
            layer == id && params.iter().any(|(key, _)| key == "nocache")
        }
        _ => false,
    });
    assert!(merged);
}

#[tokio::test]
async fn test_metadata_action_publishes_event() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();
    let events = recorded_events(&harness);

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, plain_descriptor());

    harness
        .console
        .invoke(
            &id,
            &MenuAction::ShowMetadata {
                url: "https://example.org/md".to_string(),
            },
        )
        .await
        .unwrap();

    assert!(events
        .lock()
        .unwrap()
        .contains(&ConsoleEvent::MetadataRequested {
            layer: id,
            url: "https://example.org/md".to_string(),
        }));
}

#[tokio::test]
async fn test_toggle_baselayer_flips_flag_and_label() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, plain_descriptor());

    harness
        .console
        .invoke(&id, &MenuAction::ToggleBaseLayer { to_base: true })
        .await
        .unwrap();

    assert!(harness.map.calls().contains(&MapCall::SetBaseLayer {
        layer: id.clone(),
        base: true,
    }));
    assert!(harness.console.layer(&id).unwrap().render.base_layer);
    // rebuilt menu now offers the way back
    assert!(panel_actions(&harness, &id)
        .contains(&MenuAction::ToggleBaseLayer { to_base: false }));
}

#[tokio::test]
async fn test_invoke_on_removed_layer_is_silent_noop() {
    let harness = ConsoleHarness::new();
    let outcome = harness
        .console
        .invoke(&LayerId::new("gone"), &MenuAction::Recenter)
        .await;
    assert!(outcome.is_ok());
    assert!(harness.map.calls().is_empty());
    assert!(harness.notices.errors().is_empty());
}

// ============================================================================
// Recenter
// ============================================================================

#[tokio::test]
async fn test_recenter_prefers_map_srs_bbox() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();
    let bbox = BoundingBox::new(100.0, 200.0, 300.0, 400.0);

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, descriptor_with_bbox("EPSG:3857", bbox));

    harness
        .console
        .invoke(&id, &MenuAction::Recenter)
        .await
        .unwrap();

    assert_eq!(harness.map.zooms(), vec![(bbox, "EPSG:3857".to_string())]);
}

#[tokio::test]
async fn test_recenter_falls_back_to_lat_lon_bbox() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();
    let lat_lon = BoundingBox::new(-5.2, 41.3, 9.6, 51.1);

    harness.console.on_layer_added(record, 0);
    let mut descriptor = plain_descriptor();
    descriptor.lat_lon_bbox = Some(lat_lon);
    harness.deliver_capability(&id, descriptor);

    harness
        .console
        .invoke(&id, &MenuAction::Recenter)
        .await
        .unwrap();

    assert_eq!(harness.map.zooms(), vec![(lat_lon, "EPSG:4326".to_string())]);
}

#[tokio::test]
async fn test_recenter_without_extent_reports_once() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, plain_descriptor());

    let outcome = harness.console.invoke(&id, &MenuAction::Recenter).await;
    assert!(matches!(outcome, Err(ConsoleError::ExtentUnavailable(_))));
    assert!(harness.map.zooms().is_empty());
    assert_eq!(harness.notices.errors().len(), 1);
}

#[tokio::test]
async fn test_recenter_hydrates_undescribed_layer_once() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();
    let bbox = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
    harness
        .fetcher
        .respond_with(id.clone(), descriptor_with_bbox("EPSG:3857", bbox));

    harness.console.on_layer_added(record, 0);
    harness
        .console
        .invoke(&id, &MenuAction::Recenter)
        .await
        .unwrap();

    assert_eq!(harness.fetcher.call_count(), 1);
    assert_eq!(harness.map.zooms(), vec![(bbox, "EPSG:3857".to_string())]);
    // hydration also materialized the menu
    assert!(!harness.console.with_panel(&id, |p| p.is_loading()).unwrap());

    // descriptor is cached now; no second fetch
    harness
        .console
        .invoke(&id, &MenuAction::Recenter)
        .await
        .unwrap();
    assert_eq!(harness.fetcher.call_count(), 1);
}

#[tokio::test]
async fn test_recenter_vector_uses_data_extent() {
    let harness = ConsoleHarness::new();
    let record = vector_record("sketch");
    let id = record.id.clone();
    let extent = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
    harness.map.set_data_extent(id.clone(), extent);

    harness.console.on_layer_added(record, 0);
    harness
        .console
        .invoke(&id, &MenuAction::Recenter)
        .await
        .unwrap();

    assert_eq!(harness.map.zooms(), vec![(extent, "EPSG:3857".to_string())]);
}

#[tokio::test]
async fn test_recenter_vector_without_features_stays_silent() {
    let harness = ConsoleHarness::new();
    let record = vector_record("empty");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    let outcome = harness.console.invoke(&id, &MenuAction::Recenter).await;

    assert!(outcome.is_ok());
    assert!(harness.map.zooms().is_empty());
    assert!(harness.notices.errors().is_empty());
}

// ============================================================================
// Query builder and downloads
// ============================================================================

#[tokio::test]
async fn test_build_query_opens_then_shows_existing_request() {
    let harness = ConsoleHarness::new();
    let record = feature_record("a");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, descriptor_with_feature_service("ns:a"));

    harness
        .console
        .invoke(&id, &MenuAction::BuildQuery)
        .await
        .unwrap();
    harness
        .console
        .invoke(&id, &MenuAction::BuildQuery)
        .await
        .unwrap();

    let opened = harness.querier.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].type_name, "ns:a");
    // a feature-service layer carries its own namespace
    assert!(opened[0].namespace.is_some());
    assert_eq!(harness.querier.show_count(), 1);
}

#[tokio::test]
async fn test_build_query_for_raster_equivalence_has_no_namespace() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, descriptor_with_feature_service("ns:a"));

    harness
        .console
        .invoke(&id, &MenuAction::BuildQuery)
        .await
        .unwrap();

    let opened = harness.querier.opened();
    assert_eq!(opened.len(), 1);
    assert!(opened[0].namespace.is_none());
}

#[tokio::test]
async fn test_download_raster_submits_render_endpoint() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, descriptor_with_feature_service("ns:a"));

    harness
        .console
        .invoke(
            &id,
            &MenuAction::DownloadData {
                metadata_url: Some("https://example.org/md".to_string()),
            },
        )
        .await
        .unwrap();

    let requests = harness.downloads.requests();
    assert_eq!(requests.len(), 1);
    let layer = &requests[0].layers[0];
    assert_eq!(layer.layer_name, "ns:a");
    assert_eq!(layer.service_type, "WMS");
    assert_eq!(layer.service_url, "https://geo.example.org/wms");
    assert_eq!(layer.metadata_url, "https://example.org/md");
}

#[tokio::test]
async fn test_download_feature_service_submits_wfs_endpoint() {
    let harness = ConsoleHarness::new();
    let record = feature_record("a");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, descriptor_with_feature_service("ns:a"));

    harness
        .console
        .invoke(&id, &MenuAction::DownloadData { metadata_url: None })
        .await
        .unwrap();

    let requests = harness.downloads.requests();
    assert_eq!(requests.len(), 1);
    let layer = &requests[0].layers[0];
    assert_eq!(layer.service_type, "WFS");
    assert_eq!(layer.service_url, "https://geo.example.org/wfs");
    assert_eq!(layer.metadata_url, "");
}

#[tokio::test]
async fn test_symbology_opens_styling_tool() {
    let harness = ConsoleHarness::new();
    let record = raster_record("a");
    let id = record.id.clone();

    harness.console.on_layer_added(record, 0);
    harness.deliver_capability(&id, descriptor_with_feature_service("ns:a"));

    harness
        .console
        .invoke(&id, &MenuAction::EditSymbology)
        .await
        .unwrap();

    assert_eq!(harness.styler.opened(), vec![id]);
}
