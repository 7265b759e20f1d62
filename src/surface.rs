//! The map surface the controller drives.
//!
//! The renderer is external; the controller only emits [`SurfaceCommand`]s
//! and hands them to a [`MapSurface`]. Two implementations ship here: an
//! in-memory [`RecordingSurface`] that tracks resulting layer state, and a
//! [`JsonlSurface`] that streams commands to an external renderer.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geo::LngLat;
use crate::overlay::{FlagFilter, Visibility};
use crate::popup::PopupContent;
use crate::style::ColorRamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    Default,
    Pointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Search,
    AcuteCare,
    TraumaCenter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SurfaceCommand {
    SetColorRule {
        layer: String,
        ramp: ColorRamp,
        expression: Value,
    },
    SetFilter {
        layer: String,
        filter: FlagFilter,
        expression: Value,
    },
    ClearFilter {
        layer: String,
    },
    SetVisibility {
        layer: String,
        visibility: Visibility,
    },
    ShowPopup {
        at: LngLat,
        content: PopupContent,
        html: String,
    },
    ClosePopups,
    SetCursor {
        cursor: Cursor,
    },
    FlyTo {
        center: LngLat,
        zoom: f64,
    },
    AddMarker {
        id: String,
        at: LngLat,
        kind: MarkerKind,
        title: String,
        detail: Option<String>,
    },
    RemoveMarker {
        id: String,
    },
    ShowNotice {
        message: String,
    },
}

impl SurfaceCommand {
    pub fn color_rule(layer: &str, ramp: ColorRamp) -> Self {
        let expression = ramp.to_expression();
        SurfaceCommand::SetColorRule {
            layer: layer.to_string(),
            ramp,
            expression,
        }
    }

    pub fn filter(layer: &str, filter: FlagFilter) -> Self {
        let expression = filter.to_expression();
        SurfaceCommand::SetFilter {
            layer: layer.to_string(),
            filter,
            expression,
        }
    }

    pub fn popup(at: LngLat, content: PopupContent) -> Self {
        let html = content.to_html();
        SurfaceCommand::ShowPopup { at, content, html }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SurfaceCommand::SetColorRule { .. } => "set_color_rule",
            SurfaceCommand::SetFilter { .. } => "set_filter",
            SurfaceCommand::ClearFilter { .. } => "clear_filter",
            SurfaceCommand::SetVisibility { .. } => "set_visibility",
            SurfaceCommand::ShowPopup { .. } => "show_popup",
            SurfaceCommand::ClosePopups => "close_popups",
            SurfaceCommand::SetCursor { .. } => "set_cursor",
            SurfaceCommand::FlyTo { .. } => "fly_to",
            SurfaceCommand::AddMarker { .. } => "add_marker",
            SurfaceCommand::RemoveMarker { .. } => "remove_marker",
            SurfaceCommand::ShowNotice { .. } => "show_notice",
        }
    }
}

pub trait MapSurface {
    fn apply(&mut self, cmd: &SurfaceCommand) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerState {
    pub color_rule: Option<ColorRamp>,
    pub filter: Option<FlagFilter>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedMarker {
    pub at: LngLat,
    pub kind: MarkerKind,
    pub title: String,
}

/// In-memory surface: applies commands to a model of the map and keeps the
/// command log. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    layers: HashMap<String, LayerState>,
    popup: Option<(LngLat, PopupContent)>,
    markers: BTreeMap<String, PlacedMarker>,
    cursor: Option<Cursor>,
    camera: Option<(LngLat, f64)>,
    notices: Vec<String>,
    log: Vec<SurfaceCommand>,
    fail_op: Option<&'static str>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface that rejects every command named `op`.
    pub fn failing_on(op: &'static str) -> Self {
        Self {
            fail_op: Some(op),
            ..Self::default()
        }
    }

    pub fn layer(&self, name: &str) -> Option<&LayerState> {
        self.layers.get(name)
    }

    pub fn popup(&self) -> Option<&(LngLat, PopupContent)> {
        self.popup.as_ref()
    }

    pub fn markers(&self) -> &BTreeMap<String, PlacedMarker> {
        &self.markers
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn camera(&self) -> Option<(LngLat, f64)> {
        self.camera
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn commands(&self) -> &[SurfaceCommand] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

impl MapSurface for RecordingSurface {
    fn apply(&mut self, cmd: &SurfaceCommand) -> Result<()> {
        if self.fail_op == Some(cmd.name()) {
            return Err(anyhow!("surface rejected {}", cmd.name()));
        }
        self.log.push(cmd.clone());
        match cmd {
            SurfaceCommand::SetColorRule { layer, ramp, .. } => {
                self.layers.entry(layer.clone()).or_default().color_rule = Some(ramp.clone());
            }
            SurfaceCommand::SetFilter { layer, filter, .. } => {
                self.layers.entry(layer.clone()).or_default().filter = Some(filter.clone());
            }
            SurfaceCommand::ClearFilter { layer } => {
                self.layers.entry(layer.clone()).or_default().filter = None;
            }
            SurfaceCommand::SetVisibility { layer, visibility } => {
                self.layers.entry(layer.clone()).or_default().visibility = Some(*visibility);
            }
            SurfaceCommand::ShowPopup { at, content, .. } => {
                self.popup = Some((*at, content.clone()));
            }
            SurfaceCommand::ClosePopups => {
                self.popup = None;
            }
            SurfaceCommand::SetCursor { cursor } => {
                self.cursor = Some(*cursor);
            }
            SurfaceCommand::FlyTo { center, zoom } => {
                self.camera = Some((*center, *zoom));
            }
            SurfaceCommand::AddMarker { id, at, kind, title, .. } => {
                self.markers.insert(
                    id.clone(),
                    PlacedMarker {
                        at: *at,
                        kind: *kind,
                        title: title.clone(),
                    },
                );
            }
            SurfaceCommand::RemoveMarker { id } => {
                self.markers.remove(id);
            }
            SurfaceCommand::ShowNotice { message } => {
                self.notices.push(message.clone());
            }
        }
        Ok(())
    }
}

/// Writes each command as one JSON line, for an external renderer.
pub struct JsonlSurface<W: Write> {
    out: W,
}

impl<W: Write> JsonlSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MapSurface for JsonlSurface<W> {
    fn apply(&mut self, cmd: &SurfaceCommand) -> Result<()> {
        let line = serde_json::to_string(cmd)?;
        writeln!(self.out, "{}", line)?;
        self.out.flush()?;
        Ok(())
    }
}
