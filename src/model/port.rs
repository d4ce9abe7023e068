use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{EdgeId, PortId, WidgetId};

/// Which way data flows through a port.
///
/// Serialized as `"output"` / `"input"` to stay compatible with saved
/// connection records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "output")]
    Source,
    #[serde(rename = "input")]
    Sink,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Source => Direction::Sink,
            Direction::Sink => Direction::Source,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Source => "output",
            Direction::Sink => "input",
        }
    }

    /// Normalized x of ports on this side: sinks on the left edge, sources on the right.
    pub fn side_x(self) -> f64 {
        match self {
            Direction::Source => 1.0,
            Direction::Sink => 0.0,
        }
    }
}

/// Binds a port's vertical position to a named layout anchor of its widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortAnchor {
    pub id: String,
    /// Pixel offset added to the anchor's y.
    #[serde(default)]
    pub offset: f64,
}

impl PortAnchor {
    pub fn new(id: impl Into<String>, offset: f64) -> Self {
        Self { id: id.into(), offset }
    }
}

/// Everything needed to add a port to a widget.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    pub direction: Direction,
    pub type_tag: String,
    pub label: String,
    pub relative_y: f64,
    pub anchor: Option<PortAnchor>,
    pub min_spacing: Option<f64>,
    pub allow_multiple: bool,
    /// Explicit id; generated from the widget's counters when `None`.
    pub id: Option<PortId>,
}

impl PortSpec {
    pub fn new(direction: Direction, type_tag: impl Into<String>, label: impl Into<String>, relative_y: f64) -> Self {
        Self {
            direction,
            type_tag: type_tag.into(),
            label: label.into(),
            relative_y,
            anchor: None,
            min_spacing: None,
            allow_multiple: false,
            id: None,
        }
    }

    pub fn multiple(mut self) -> Self {
        self.allow_multiple = true;
        self
    }

    pub fn anchored(mut self, anchor: PortAnchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_id(mut self, id: PortId) -> Self {
        self.id = Some(id);
        self
    }
}

/// A typed, directional connection point owned by exactly one widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: PortId,
    pub widget: WidgetId,
    pub direction: Direction,
    pub type_tag: String,
    pub label: String,
    /// 0..1 across the widget width (0 = left edge).
    pub relative_x: f64,
    /// 0..1 down the widget's content band. Rewritten by reflow.
    pub relative_y: f64,
    pub anchor: Option<PortAnchor>,
    pub min_spacing: f64,
    pub allow_multiple: bool,
    /// Expandable group this port belongs to, if any.
    pub group: Option<String>,
    /// Creation order within the owning widget.
    pub order: u64,
    edges: BTreeSet<EdgeId>,
}

impl Port {
    pub(crate) fn from_spec(
        id: PortId,
        widget: WidgetId,
        spec: PortSpec,
        default_spacing: f64,
        group: Option<String>,
        order: u64,
    ) -> Self {
        let allow_multiple = spec.allow_multiple;
        Self {
            id,
            widget,
            direction: spec.direction,
            type_tag: spec.type_tag,
            label: spec.label,
            relative_x: spec.direction.side_x(),
            relative_y: spec.relative_y.clamp(0.0, 1.0),
            anchor: spec.anchor,
            min_spacing: spec.min_spacing.unwrap_or(default_spacing),
            allow_multiple,
            group,
            order,
            edges: BTreeSet::new(),
        }
    }

    /// Edges currently incident to this port.
    pub fn edges(&self) -> &BTreeSet<EdgeId> {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_free(&self) -> bool {
        self.edges.is_empty()
    }

    /// A sink that accepts only one incoming edge.
    pub fn is_single_sink(&self) -> bool {
        self.direction == Direction::Sink && !self.allow_multiple
    }

    pub(crate) fn attach(&mut self, edge: EdgeId) {
        self.edges.insert(edge);
    }

    pub(crate) fn detach(&mut self, edge: &EdgeId) -> bool {
        self.edges.remove(edge)
    }
}
