//! Editor configuration.
//!
//! Every field has a default so the frontend can pass a partial JSON object
//! (or nothing) to the `Editor` constructor.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub ports: PortLayoutConfig,
    pub curve: CurveConfig,
    pub arrange: ArrangeConfig,
    pub snap: SnapConfig,
    pub validation: ValidationConfig,
    pub canvas: CanvasConfig,
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }
}

/// Vertical layout of ports inside a widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortLayoutConfig {
    /// Height of the widget header band; ports never sit above it.
    pub header_height: f64,
    pub top_padding: f64,
    pub bottom_padding: f64,
    /// Lower bound for the usable content band, even on tiny widgets.
    pub min_content_height: f64,
    /// Minimum distance between two ports on the same side.
    pub default_min_spacing: f64,
    /// Pointer distance (world units) at which a port counts as hit.
    pub port_hit_radius: f64,
    /// Distance (world units) from an edge curve that counts as a hit.
    pub edge_hit_tolerance: f64,
}

impl Default for PortLayoutConfig {
    fn default() -> Self {
        Self {
            header_height: 40.0,
            top_padding: 10.0,
            bottom_padding: 20.0,
            min_content_height: 60.0,
            default_min_spacing: 28.0,
            port_hit_radius: 10.0,
            edge_hit_tolerance: 6.0,
        }
    }
}

/// Shape of connection curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CurveConfig {
    /// Control-point reach as a fraction of endpoint distance.
    pub curvature_factor: f64,
    /// Upper bound on control-point reach.
    pub max_curvature: f64,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            curvature_factor: 0.3,
            max_curvature: 100.0,
        }
    }
}

/// Hierarchy auto-arrangement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArrangeConfig {
    /// Gap between a parent's right edge and its children's left edge.
    pub spacing_x: f64,
    /// Vertical distance between stacked siblings.
    pub spacing_y: f64,
    /// Dragging a widget moves all of its descendants by the same delta.
    pub cascade_drag: bool,
}

impl Default for ArrangeConfig {
    fn default() -> Self {
        Self {
            spacing_x: 320.0,
            spacing_y: 220.0,
            cascade_drag: false,
        }
    }
}

/// Magnetic edge snapping while dragging widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapConfig {
    pub enabled: bool,
    pub threshold: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidationConfig {
    /// Trailing debounce for edits that request validation.
    pub debounce_ms: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { debounce_ms: 100.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    /// When set, widget positions are clamped so the widget stays inside.
    pub bounds: Option<Rect>,
}
