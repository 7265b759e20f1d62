//! View controller: (state, event) -> surface commands.
//!
//! All selection state lives here. [`ViewController::handle`] is pure with
//! respect to the surface: it only returns commands. [`ViewController::dispatch`]
//! applies them to a [`MapSurface`] one at a time, so a failing command never
//! blocks the ones after it.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, HospitalSite, SENTINEL_OVERLAY_ID};
use crate::config::{ViewerConfig, METRIC_LAYER, OVERLAY_LAYER};
use crate::geo::LngLat;
use crate::logging::{log, log_rejected, log_selection, log_surface_failure, obj, Domain, Level};
use crate::overlay::{resolve_overlay, OverlayInstruction, Visibility};
use crate::popup::{resolve_popup, FeatureRecord};
use crate::search::{SearchOutcome, TimerRequest, FAILED_NOTICE, NOT_FOUND_NOTICE};
use crate::style::{legend, resolve_ramp, LegendEntry, StylePolicy};
use crate::surface::{Cursor, MapSurface, MarkerKind, SurfaceCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    pub metric_id: u32,
    pub overlay_id: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ViewEvent {
    StyleLoaded,
    MetricSelected {
        id: u32,
    },
    OverlaySelected {
        id: u32,
    },
    FeatureClicked {
        #[serde(default)]
        features: Vec<FeatureRecord>,
        at: LngLat,
    },
    PointerEnter,
    PointerLeave,
    HospitalsToggled,
    #[serde(skip)]
    SearchResolved(SearchOutcome),
    MarkerExpired {
        marker_id: u64,
    },
}

#[derive(Debug, Default, PartialEq)]
pub struct ViewOutput {
    pub commands: Vec<SurfaceCommand>,
    pub timers: Vec<TimerRequest>,
}

impl ViewOutput {
    fn commands(commands: Vec<SurfaceCommand>) -> Self {
        Self {
            commands,
            timers: Vec::new(),
        }
    }
}

/// Legend panel contents for the current selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: String,
    pub entries: Vec<LegendEntry>,
    pub overlay: Option<String>,
}

pub struct ViewController {
    catalog: Arc<Catalog>,
    policy: StylePolicy,
    selection: SelectionState,
    style_loaded: bool,
    /// Metric whose popup template the click handler renders.
    click_binding: Option<u32>,
    hospitals_enabled: bool,
    hospitals_shown: bool,
    search_marker: Option<u64>,
    next_marker: u64,
    /// Search notice that arrived before the surface was ready.
    pending_notice: Option<String>,
    search_zoom: f64,
    marker_ttl: Duration,
}

impl ViewController {
    pub fn new(catalog: Arc<Catalog>, cfg: &ViewerConfig) -> Self {
        let selection = SelectionState {
            metric_id: catalog.initial_metric().id,
            overlay_id: SENTINEL_OVERLAY_ID,
        };
        Self {
            catalog,
            policy: StylePolicy {
                no_data_color: cfg.no_data_color.clone(),
            },
            selection,
            style_loaded: false,
            click_binding: None,
            hospitals_enabled: cfg.hospitals,
            hospitals_shown: false,
            search_marker: None,
            next_marker: 0,
            pending_notice: None,
            search_zoom: cfg.search_zoom,
            marker_ttl: cfg.marker_ttl(),
        }
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    pub fn is_style_loaded(&self) -> bool {
        self.style_loaded
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Rich-text description of the current metric.
    pub fn description(&self) -> &str {
        self.catalog
            .metric(self.selection.metric_id)
            .map(|m| m.description.as_str())
            .unwrap_or("")
    }

    pub fn legend(&self) -> Legend {
        let (title, entries) = match self.catalog.metric(self.selection.metric_id) {
            Some(m) => (m.title.clone(), legend(m, &self.policy)),
            None => (String::new(), Vec::new()),
        };
        let overlay = self
            .catalog
            .overlay(self.selection.overlay_id)
            .filter(|o| !o.is_sentinel())
            .map(|o| o.name.clone());
        Legend {
            title,
            entries,
            overlay,
        }
    }

    /// Apply `event` to the surface. Returns the timer work left to the caller.
    pub fn dispatch(&mut self, event: ViewEvent, surface: &mut dyn MapSurface) -> Vec<TimerRequest> {
        let out = self.handle(event);
        for cmd in &out.commands {
            if let Err(e) = surface.apply(cmd) {
                log_surface_failure(cmd.name(), &format!("{:#}", e));
            }
        }
        out.timers
    }

    pub fn handle(&mut self, event: ViewEvent) -> ViewOutput {
        match event {
            ViewEvent::StyleLoaded => self.on_style_loaded(),
            ViewEvent::MetricSelected { id } => self.on_metric_selected(id),
            ViewEvent::OverlaySelected { id } => self.on_overlay_selected(id),
            ViewEvent::FeatureClicked { features, at } => self.on_click(features, at),
            ViewEvent::PointerEnter => self.cursor(Cursor::Pointer),
            ViewEvent::PointerLeave => self.cursor(Cursor::Default),
            ViewEvent::HospitalsToggled => self.on_hospitals_toggled(),
            ViewEvent::SearchResolved(outcome) => self.on_search(outcome),
            ViewEvent::MarkerExpired { marker_id } => self.on_marker_expired(marker_id),
        }
    }

    fn on_style_loaded(&mut self) -> ViewOutput {
        self.style_loaded = true;
        let mut cmds = self.metric_commands();
        cmds.extend(self.overlay_commands());
        if self.hospitals_shown {
            cmds.extend(self.hospital_commands(true));
        }
        if let Some(message) = self.pending_notice.take() {
            cmds.push(SurfaceCommand::ShowNotice { message });
        }
        log(
            Level::Info,
            Domain::View,
            "style_loaded",
            obj(&[
                ("metric_id", serde_json::json!(self.selection.metric_id)),
                ("overlay_id", serde_json::json!(self.selection.overlay_id)),
            ]),
        );
        ViewOutput::commands(cmds)
    }

    fn on_metric_selected(&mut self, id: u32) -> ViewOutput {
        if self.catalog.metric(id).is_none() {
            log_rejected("metric", id, "unknown metric id");
            return ViewOutput::default();
        }
        self.selection.metric_id = id;
        log_selection("metric", id, self.selection.overlay_id, self.style_loaded);
        if !self.style_loaded {
            return ViewOutput::default();
        }
        ViewOutput::commands(self.metric_commands())
    }

    fn on_overlay_selected(&mut self, id: u32) -> ViewOutput {
        if self.catalog.overlay(id).is_none() {
            log_rejected("overlay", id, "unknown overlay id");
            return ViewOutput::default();
        }
        self.selection.overlay_id = id;
        log_selection("overlay", self.selection.metric_id, id, self.style_loaded);
        if !self.style_loaded {
            return ViewOutput::default();
        }
        ViewOutput::commands(self.overlay_commands())
    }

    fn on_click(&self, features: Vec<FeatureRecord>, at: LngLat) -> ViewOutput {
        let metric_id = match (self.style_loaded, self.click_binding) {
            (true, Some(id)) => id,
            _ => return ViewOutput::default(),
        };
        let feature = match features.first() {
            Some(f) => f,
            None => return ViewOutput::default(),
        };
        let title = self
            .catalog
            .metric(metric_id)
            .map(|m| m.title.as_str())
            .unwrap_or_default();
        let content = resolve_popup(self.catalog.popups(), metric_id, title, feature);
        log(
            Level::Debug,
            Domain::Popup,
            "popup",
            obj(&[
                ("metric_id", serde_json::json!(metric_id)),
                ("lines", serde_json::json!(content.lines.len())),
            ]),
        );
        ViewOutput::commands(vec![SurfaceCommand::ClosePopups, SurfaceCommand::popup(at, content)])
    }

    fn cursor(&self, cursor: Cursor) -> ViewOutput {
        if !self.style_loaded {
            return ViewOutput::default();
        }
        ViewOutput::commands(vec![SurfaceCommand::SetCursor { cursor }])
    }

    fn on_hospitals_toggled(&mut self) -> ViewOutput {
        if !self.hospitals_enabled {
            log(Level::Debug, Domain::View, "hospitals_disabled", obj(&[]));
            return ViewOutput::default();
        }
        self.hospitals_shown = !self.hospitals_shown;
        if !self.style_loaded {
            return ViewOutput::default();
        }
        ViewOutput::commands(self.hospital_commands(self.hospitals_shown))
    }

    fn on_search(&mut self, outcome: SearchOutcome) -> ViewOutput {
        if !self.style_loaded {
            let (kind, notice) = match &outcome {
                SearchOutcome::Found { .. } => ("found", None),
                SearchOutcome::NotFound { .. } => ("not_found", Some(NOT_FOUND_NOTICE)),
                SearchOutcome::Failed { .. } => ("failed", Some(FAILED_NOTICE)),
            };
            log(
                Level::Warn,
                Domain::Search,
                "result_before_style_load",
                obj(&[
                    ("outcome", serde_json::json!(kind)),
                    ("deferred", serde_json::json!(notice.is_some())),
                ]),
            );
            if let Some(message) = notice {
                self.pending_notice = Some(message.to_string());
            }
            return ViewOutput::default();
        }
        match outcome {
            SearchOutcome::Found { best, .. } => {
                let mut out = ViewOutput::default();
                if let Some(prev) = self.search_marker.take() {
                    out.commands.push(SurfaceCommand::RemoveMarker {
                        id: search_marker_id(prev),
                    });
                    out.timers.push(TimerRequest::Cancel { marker_id: prev });
                }
                self.next_marker += 1;
                let marker_id = self.next_marker;
                out.commands.push(SurfaceCommand::FlyTo {
                    center: best.center,
                    zoom: self.search_zoom,
                });
                out.commands.push(SurfaceCommand::AddMarker {
                    id: search_marker_id(marker_id),
                    at: best.center,
                    kind: MarkerKind::Search,
                    title: best.place_name,
                    detail: None,
                });
                out.timers.push(TimerRequest::Arm {
                    marker_id,
                    after: self.marker_ttl,
                });
                self.search_marker = Some(marker_id);
                out
            }
            SearchOutcome::NotFound { .. } => ViewOutput::commands(vec![SurfaceCommand::ShowNotice {
                message: NOT_FOUND_NOTICE.to_string(),
            }]),
            SearchOutcome::Failed { .. } => ViewOutput::commands(vec![SurfaceCommand::ShowNotice {
                message: FAILED_NOTICE.to_string(),
            }]),
        }
    }

    fn on_marker_expired(&mut self, marker_id: u64) -> ViewOutput {
        if self.search_marker != Some(marker_id) {
            return ViewOutput::default();
        }
        self.search_marker = None;
        if !self.style_loaded {
            return ViewOutput::default();
        }
        ViewOutput::commands(vec![SurfaceCommand::RemoveMarker {
            id: search_marker_id(marker_id),
        }])
    }

    fn metric_commands(&mut self) -> Vec<SurfaceCommand> {
        let metric = match self.catalog.metric(self.selection.metric_id) {
            Some(m) => m,
            None => return Vec::new(),
        };
        let ramp = resolve_ramp(metric, &self.policy);
        log(
            Level::Debug,
            Domain::Style,
            "ramp_resolved",
            obj(&[
                ("metric_id", serde_json::json!(metric.id)),
                ("layer", serde_json::json!(METRIC_LAYER)),
                ("field", serde_json::json!(ramp.field)),
            ]),
        );
        self.click_binding = Some(metric.id);
        vec![SurfaceCommand::color_rule(METRIC_LAYER, ramp)]
    }

    fn overlay_commands(&self) -> Vec<SurfaceCommand> {
        let overlay = match self.catalog.overlay(self.selection.overlay_id) {
            Some(o) => o,
            None => return Vec::new(),
        };
        log(
            Level::Debug,
            Domain::Overlay,
            "overlay_resolved",
            obj(&[
                ("overlay_id", serde_json::json!(overlay.id)),
                ("layer", serde_json::json!(OVERLAY_LAYER)),
                ("property", serde_json::json!(overlay.property)),
            ]),
        );
        resolve_overlay(overlay)
            .into_iter()
            .map(|instr| match instr {
                OverlayInstruction::SetFilter(f) => SurfaceCommand::filter(OVERLAY_LAYER, f),
                OverlayInstruction::ClearFilter => SurfaceCommand::ClearFilter {
                    layer: OVERLAY_LAYER.to_string(),
                },
                OverlayInstruction::Show => SurfaceCommand::SetVisibility {
                    layer: OVERLAY_LAYER.to_string(),
                    visibility: Visibility::Visible,
                },
                OverlayInstruction::Hide => SurfaceCommand::SetVisibility {
                    layer: OVERLAY_LAYER.to_string(),
                    visibility: Visibility::Hidden,
                },
            })
            .collect()
    }

    fn hospital_commands(&self, show: bool) -> Vec<SurfaceCommand> {
        self.catalog
            .hospitals()
            .iter()
            .enumerate()
            .map(|(i, site)| {
                let id = format!("hospital-{}", i);
                if show {
                    SurfaceCommand::AddMarker {
                        id,
                        at: site.coordinates,
                        kind: hospital_kind(site),
                        title: site.name.clone(),
                        detail: Some(site.kind.clone()),
                    }
                } else {
                    SurfaceCommand::RemoveMarker { id }
                }
            })
            .collect()
    }
}

fn search_marker_id(n: u64) -> String {
    format!("search-{}", n)
}

fn hospital_kind(site: &HospitalSite) -> MarkerKind {
    if site.kind.to_lowercase().contains("trauma") {
        MarkerKind::TraumaCenter
    } else {
        MarkerKind::AcuteCare
    }
}

impl std::fmt::Debug for ViewController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewController")
            .field("selection", &self.selection)
            .field("style_loaded", &self.style_loaded)
            .field("search_marker", &self.search_marker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{default_overlays, MetricDescriptor};
    use crate::geocode::GeocodeMatch;
    use crate::surface::RecordingSurface;
    use serde_json::json;

    fn metric(id: u32, field: &str) -> MetricDescriptor {
        MetricDescriptor {
            id,
            field: field.to_string(),
            title: format!("Metric {}", id),
            description: format!("<p>about {}</p>", id),
            labels: ["1", "2", "3", "4", "5"].map(String::from),
            breakpoints: [0.1, 0.2, 0.3, 0.4, 0.5],
            colors: ["#fca503", "#fad087", "#e6cafc", "#c587fa", "#4f048f"].map(String::from),
            popup: None,
        }
    }

    fn controller() -> ViewController {
        let hospitals = vec![
            HospitalSite {
                name: "Orlando Health".to_string(),
                coordinates: LngLat { lng: -81.3809, lat: 28.5217 },
                kind: "Trauma Center".to_string(),
            },
            HospitalSite {
                name: "AdventHealth Orlando".to_string(),
                coordinates: LngLat { lng: -81.3673, lat: 28.5754 },
                kind: "Acute Care".to_string(),
            },
        ];
        let catalog = Catalog::new(
            vec![metric(0, "A_Unhealthy"), metric(1, "A_Chronic")],
            default_overlays(),
            hospitals,
        )
        .unwrap();
        ViewController::new(Arc::new(catalog), &ViewerConfig::default())
    }

    fn loaded() -> ViewController {
        let mut c = controller();
        c.handle(ViewEvent::StyleLoaded);
        c
    }

    fn found(name: &str) -> ViewEvent {
        ViewEvent::SearchResolved(SearchOutcome::Found {
            query: name.to_string(),
            best: GeocodeMatch {
                center: LngLat { lng: -81.38, lat: 28.54 },
                place_name: name.to_string(),
            },
        })
    }

    #[test]
    fn test_initial_selection() {
        let c = controller();
        assert_eq!(c.selection(), SelectionState { metric_id: 0, overlay_id: 1 });
        assert!(!c.is_style_loaded());
    }

    #[test]
    fn test_nothing_issued_before_style_load() {
        let mut c = controller();
        let events = vec![
            ViewEvent::MetricSelected { id: 1 },
            ViewEvent::OverlaySelected { id: 4 },
            ViewEvent::PointerEnter,
            ViewEvent::HospitalsToggled,
            ViewEvent::FeatureClicked {
                features: vec![FeatureRecord::new()],
                at: LngLat { lng: -81.4, lat: 28.5 },
            },
            found("Orlando"),
        ];
        for e in events {
            assert_eq!(c.handle(e), ViewOutput::default());
        }
        // selection still tracked
        assert_eq!(c.selection(), SelectionState { metric_id: 1, overlay_id: 4 });
    }

    #[test]
    fn test_style_load_applies_pending_state() {
        let mut c = controller();
        c.handle(ViewEvent::MetricSelected { id: 1 });
        c.handle(ViewEvent::OverlaySelected { id: 4 });
        c.handle(ViewEvent::HospitalsToggled);
        let out = c.handle(ViewEvent::StyleLoaded);
        let names: Vec<&str> = out.commands.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["set_color_rule", "set_filter", "set_visibility", "add_marker", "add_marker"]
        );
        match &out.commands[0] {
            SurfaceCommand::SetColorRule { layer, ramp, .. } => {
                assert_eq!(layer, METRIC_LAYER);
                assert_eq!(ramp.field, "A_Chronic");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_ids_rejected() {
        let mut c = loaded();
        assert!(c.handle(ViewEvent::MetricSelected { id: 99 }).commands.is_empty());
        assert!(c.handle(ViewEvent::OverlaySelected { id: 3 }).commands.is_empty());
        assert_eq!(c.selection(), SelectionState { metric_id: 0, overlay_id: 1 });
    }

    #[test]
    fn test_overlay_sequence_leaves_no_filter() {
        let mut c = loaded();
        let mut surface = RecordingSurface::new();
        c.dispatch(ViewEvent::OverlaySelected { id: 2 }, &mut surface);
        c.dispatch(ViewEvent::OverlaySelected { id: 4 }, &mut surface);
        let layer = surface.layer(OVERLAY_LAYER).unwrap();
        assert_eq!(layer.filter.as_ref().unwrap().property, "SenFlag");
        assert_eq!(layer.visibility, Some(Visibility::Visible));

        c.dispatch(ViewEvent::OverlaySelected { id: 1 }, &mut surface);
        let layer = surface.layer(OVERLAY_LAYER).unwrap();
        assert_eq!(layer.filter, None);
        assert_eq!(layer.visibility, Some(Visibility::Hidden));
    }

    #[test]
    fn test_click_uses_rebound_metric() {
        let mut c = loaded();
        c.handle(ViewEvent::MetricSelected { id: 1 });
        let feature = json!({"A_Cancer": 0.071, "Population": 900, "Households": 350})
            .as_object()
            .cloned()
            .unwrap();
        let out = c.handle(ViewEvent::FeatureClicked {
            features: vec![feature],
            at: LngLat { lng: -81.4, lat: 28.5 },
        });
        assert_eq!(out.commands[0], SurfaceCommand::ClosePopups);
        match &out.commands[1] {
            SurfaceCommand::ShowPopup { content, html, .. } => {
                assert_eq!(content.title, "Metric 1");
                assert_eq!(content.lines[0], "Cancer: 7.1%");
                assert_eq!(content.lines[1], "Heart Disease: N/A");
                assert!(html.starts_with("<h3>Metric 1</h3>"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_click_without_features_is_ignored() {
        let mut c = loaded();
        let out = c.handle(ViewEvent::FeatureClicked {
            features: vec![],
            at: LngLat { lng: 0.0, lat: 0.0 },
        });
        assert!(out.commands.is_empty());
    }

    #[test]
    fn test_cursor_follows_pointer() {
        let mut c = loaded();
        assert_eq!(
            c.handle(ViewEvent::PointerEnter).commands,
            vec![SurfaceCommand::SetCursor { cursor: Cursor::Pointer }]
        );
        assert_eq!(
            c.handle(ViewEvent::PointerLeave).commands,
            vec![SurfaceCommand::SetCursor { cursor: Cursor::Default }]
        );
    }

    #[test]
    fn test_hospital_markers_toggle() {
        let mut c = loaded();
        let mut surface = RecordingSurface::new();
        c.dispatch(ViewEvent::HospitalsToggled, &mut surface);
        let markers = surface.markers();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers["hospital-0"].kind, MarkerKind::TraumaCenter);
        assert_eq!(markers["hospital-1"].kind, MarkerKind::AcuteCare);

        c.dispatch(ViewEvent::HospitalsToggled, &mut surface);
        assert!(surface.markers().is_empty());
    }

    #[test]
    fn test_hospitals_disabled_by_config() {
        let catalog = controller().catalog.clone();
        let cfg = ViewerConfig {
            hospitals: false,
            ..ViewerConfig::default()
        };
        let mut c = ViewController::new(catalog, &cfg);
        c.handle(ViewEvent::StyleLoaded);
        assert!(c.handle(ViewEvent::HospitalsToggled).commands.is_empty());
    }

    #[test]
    fn test_search_places_marker_and_arms_timer() {
        let mut c = loaded();
        let out = c.handle(found("Lake Eola"));
        assert_eq!(
            out.commands[0],
            SurfaceCommand::FlyTo {
                center: LngLat { lng: -81.38, lat: 28.54 },
                zoom: 15.0
            }
        );
        assert!(matches!(
            &out.commands[1],
            SurfaceCommand::AddMarker { id, kind: MarkerKind::Search, title, .. }
                if id == "search-1" && title == "Lake Eola"
        ));
        assert_eq!(
            out.timers,
            vec![TimerRequest::Arm { marker_id: 1, after: Duration::from_secs(10) }]
        );
    }

    #[test]
    fn test_superseding_search_cancels_previous() {
        let mut c = loaded();
        c.handle(found("first"));
        let out = c.handle(found("second"));
        assert_eq!(out.commands[0], SurfaceCommand::RemoveMarker { id: "search-1".into() });
        assert_eq!(
            out.timers,
            vec![
                TimerRequest::Cancel { marker_id: 1 },
                TimerRequest::Arm { marker_id: 2, after: Duration::from_secs(10) },
            ]
        );
        // a stale expiry for the first marker does nothing
        assert!(c.handle(ViewEvent::MarkerExpired { marker_id: 1 }).commands.is_empty());
        assert_eq!(
            c.handle(ViewEvent::MarkerExpired { marker_id: 2 }).commands,
            vec![SurfaceCommand::RemoveMarker { id: "search-2".into() }]
        );
    }

    #[test]
    fn test_early_search_failure_shown_after_load() {
        let mut c = controller();
        let out = c.handle(ViewEvent::SearchResolved(SearchOutcome::Failed {
            query: "x".into(),
            error: "connection refused".into(),
        }));
        assert_eq!(out, ViewOutput::default());

        let out = c.handle(ViewEvent::StyleLoaded);
        assert_eq!(
            out.commands.last(),
            Some(&SurfaceCommand::ShowNotice { message: FAILED_NOTICE.into() })
        );
        // shown once
        let again = c.handle(ViewEvent::StyleLoaded);
        assert!(!again
            .commands
            .iter()
            .any(|cmd| matches!(cmd, SurfaceCommand::ShowNotice { .. })));
    }

    #[test]
    fn test_search_notices() {
        let mut c = loaded();
        let out = c.handle(ViewEvent::SearchResolved(SearchOutcome::NotFound { query: "x".into() }));
        assert_eq!(out.commands, vec![SurfaceCommand::ShowNotice { message: NOT_FOUND_NOTICE.into() }]);
        let out = c.handle(ViewEvent::SearchResolved(SearchOutcome::Failed {
            query: "x".into(),
            error: "timeout".into(),
        }));
        assert_eq!(out.commands, vec![SurfaceCommand::ShowNotice { message: FAILED_NOTICE.into() }]);
    }

    #[test]
    fn test_failed_command_does_not_block_rest() {
        let mut c = loaded();
        let mut surface = RecordingSurface::failing_on("close_popups");
        let feature = json!({"A_Smokers": 0.2}).as_object().cloned().unwrap();
        c.dispatch(
            ViewEvent::FeatureClicked {
                features: vec![feature],
                at: LngLat { lng: -81.4, lat: 28.5 },
            },
            &mut surface,
        );
        assert!(surface.popup().is_some());
    }

    #[test]
    fn test_legend_and_description() {
        let mut c = loaded();
        let l = c.legend();
        assert_eq!(l.title, "Metric 0");
        assert_eq!(l.entries.len(), 6);
        assert_eq!(l.overlay, None);
        assert_eq!(c.description(), "<p>about 0</p>");

        c.handle(ViewEvent::OverlaySelected { id: 6 });
        c.handle(ViewEvent::MetricSelected { id: 1 });
        let l = c.legend();
        assert_eq!(l.title, "Metric 1");
        assert!(l.overlay.unwrap().starts_with("Walkability"));
    }

    #[test]
    fn test_event_json_shape() {
        let e: ViewEvent = serde_json::from_str(r#"{"event":"metric_selected","id":3}"#).unwrap();
        assert_eq!(e, ViewEvent::MetricSelected { id: 3 });
        let e: ViewEvent = serde_json::from_str(
            r#"{"event":"feature_clicked","at":[-81.4,28.5],"features":[{"NWI":12}]}"#,
        )
        .unwrap();
        assert!(matches!(e, ViewEvent::FeatureClicked { ref features, .. } if features.len() == 1));
        let e: ViewEvent = serde_json::from_str(r#"{"event":"style_loaded"}"#).unwrap();
        assert_eq!(e, ViewEvent::StyleLoaded);
    }
}
