//! Output types for frontend consumption.
//!
//! These structs are serialized to JSON and handed to the renderer, which
//! draws them as-is. Positions are world coordinates; the renderer applies
//! the view transform.

use serde::Serialize;

use crate::geometry::{port_world_position, CubicBezier, Point, Rect};
use crate::ids::{EdgeId, PortId, WidgetId};
use crate::model::{Direction, WidgetKind};
use crate::validation::{FeedDiff, Summary};
use crate::workspace::{Workspace, WorkspaceEvent};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortOutput {
    pub id: PortId,
    pub label: String,
    pub type_tag: String,
    pub direction: Direction,
    pub position: Point,
    /// Number of incident edges; drives the "connected" styling.
    pub edge_count: usize,
}

/// Badge counts for one widget.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IndicatorOutput {
    pub warnings: usize,
    pub errors: usize,
    pub alerts: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetOutput {
    pub id: WidgetId,
    pub kind: WidgetKind,
    pub title: String,
    pub bounds: Rect,
    pub pinned: bool,
    pub minimized: bool,
    pub manual_position: bool,
    pub indicator: IndicatorOutput,
    pub ports: Vec<PortOutput>,
}

/// A drawable connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgePath {
    pub id: EdgeId,
    pub source: PortId,
    pub sink: PortId,
    /// SVG path data.
    pub path: String,
    pub selected: bool,
}

/// The in-progress drag line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewOutput {
    pub path: String,
    pub snap_target: Option<PortId>,
    /// Edge being moved, drawn dimmed while dragging.
    pub reconnecting: Option<EdgeId>,
}

/// The combined output sent to the renderer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneOutput {
    pub widgets: Vec<WidgetOutput>,
    pub edges: Vec<EdgePath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<PreviewOutput>,
    pub summary: Summary,
    pub feed_diff: FeedDiff,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<WorkspaceEvent>,
}

/// Error payload returned in place of a normal result.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub error: String,
}

pub fn widget_output(ws: &Workspace, id: &WidgetId) -> Option<WidgetOutput> {
    let widget = ws.widget(id)?;
    let indicator = ws
        .report()
        .indicators
        .get(id)
        .map(|i| IndicatorOutput { warnings: i.warnings, errors: i.errors, alerts: i.alerts })
        .unwrap_or_default();
    let ports = widget
        .ports()
        .map(|p| PortOutput {
            id: p.id.clone(),
            label: p.label.clone(),
            type_tag: p.type_tag.clone(),
            direction: p.direction,
            position: port_world_position(widget, p, &ws.config().ports),
            edge_count: p.edge_count(),
        })
        .collect();
    Some(WidgetOutput {
        id: widget.id.clone(),
        kind: widget.kind,
        title: widget.title.clone(),
        bounds: widget.bounds,
        pinned: widget.pinned,
        minimized: widget.minimized,
        manual_position: widget.manual_position,
        indicator,
        ports,
    })
}

/// Project the whole workspace. `events` are the ones drained since the
/// last scene.
pub fn scene(ws: &Workspace, preview: Option<PreviewOutput>, events: Vec<WorkspaceEvent>) -> SceneOutput {
    let report = ws.report();
    SceneOutput {
        widgets: ws
            .registry()
            .ids()
            .filter_map(|id| widget_output(ws, id))
            .collect(),
        edges: ws.edge_paths(),
        preview,
        summary: report.summary,
        feed_diff: report.feed_diff.clone(),
        events,
    }
}

pub fn preview_output(curve: &CubicBezier, snap_target: Option<PortId>, reconnecting: Option<EdgeId>) -> PreviewOutput {
    PreviewOutput {
        path: curve.to_svg_path(),
        snap_target,
        reconnecting,
    }
}
