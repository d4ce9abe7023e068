// Port placement inside a widget.
//
// Each side of a widget (sinks left, sources right) is laid out
// independently: ports are sorted by the y they ask for, pushed down until
// they clear the previous port by their minimum spacing, and clamped into
// the content band below the header. Ports that do not fit collect on the
// bottom edge of the band. The final position is written back
// as the port's normalized y so the order survives resizes.

use super::{Point, ViewTransform};
use crate::config::PortLayoutConfig;
use crate::ids::PortId;
use crate::model::{Direction, Port, Widget};

/// Vertical content band of a widget, in widget-local pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayoutMetrics {
    pub content_top: f64,
    pub content_bottom: f64,
    pub available_height: f64,
}

impl LayoutMetrics {
    pub fn for_widget(widget: &Widget, cfg: &PortLayoutConfig) -> Self {
        let available_height = (widget.bounds.height - cfg.header_height - cfg.top_padding - cfg.bottom_padding)
            .max(cfg.min_content_height);
        let content_top = cfg.header_height + cfg.top_padding;
        Self {
            content_top,
            content_bottom: content_top + available_height,
            available_height,
        }
    }

    fn normalize(&self, y: f64) -> f64 {
        ((y - self.content_top) / self.available_height).clamp(0.0, 1.0)
    }

    fn denormalize(&self, normalized: f64) -> f64 {
        self.content_top + normalized.clamp(0.0, 1.0) * self.available_height
    }
}

/// The y a port asks for, before spacing is enforced.
///
/// Anchored ports follow their anchor when the widget has registered it;
/// otherwise the stored relative y is used.
pub fn port_target_y(widget: &Widget, port: &Port, metrics: &LayoutMetrics) -> f64 {
    let mut normalized = port.relative_y.clamp(0.0, 1.0);
    if let Some(anchor) = &port.anchor {
        if let Some(anchor_y) = widget.anchor(&anchor.id) {
            normalized = metrics.normalize(anchor_y + anchor.offset);
        }
    }
    metrics.denormalize(normalized)
}

/// Current port position relative to the widget's top-left corner.
pub fn port_local_position(widget: &Widget, port: &Port, metrics: &LayoutMetrics) -> Point {
    Point {
        x: port.relative_x * widget.bounds.width,
        y: metrics.denormalize(port.relative_y),
    }
}

pub fn port_world_position(widget: &Widget, port: &Port, cfg: &PortLayoutConfig) -> Point {
    let metrics = LayoutMetrics::for_widget(widget, cfg);
    let local = port_local_position(widget, port, &metrics);
    Point {
        x: widget.bounds.x + local.x,
        y: widget.bounds.y + local.y,
    }
}

pub fn port_screen_position(widget: &Widget, port: &Port, cfg: &PortLayoutConfig, transform: &ViewTransform) -> Point {
    transform.world_to_screen(port_world_position(widget, port, cfg))
}

/// Re-flow both sides of `widget`.
pub fn reflow_ports(widget: &mut Widget, cfg: &PortLayoutConfig) {
    let metrics = LayoutMetrics::for_widget(widget, cfg);
    for direction in [Direction::Sink, Direction::Source] {
        let placed = layout_side(widget, direction, &metrics);
        for (id, y) in placed {
            if let Some(port) = widget.port_mut(&id) {
                port.relative_x = direction.side_x();
                port.relative_y = metrics.normalize(y);
            }
        }
    }
}

fn layout_side(widget: &Widget, direction: Direction, metrics: &LayoutMetrics) -> Vec<(PortId, f64)> {
    let mut entries: Vec<(PortId, f64, f64, u64)> = widget
        .ports()
        .filter(|p| p.direction == direction)
        .map(|p| (p.id.clone(), port_target_y(widget, p, metrics), p.min_spacing, p.order))
        .collect();
    // Ports asking for the same y keep creation order.
    entries.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.3.cmp(&b.3)));

    let bottom = metrics.content_bottom;
    let mut placed: Vec<(PortId, f64)> = Vec::with_capacity(entries.len());
    let mut last_y = f64::NEG_INFINITY;
    for (id, target, spacing, _) in entries {
        let mut y = target;
        if y - last_y < spacing {
            y = last_y + spacing;
        }
        y = y.max(metrics.content_top);
        if y >= bottom {
            y = bottom;
            // Ports that no longer fit pile up on the bottom edge; pull in a
            // neighbour that would otherwise sit closer than its spacing.
            for prev in placed.iter_mut().rev() {
                if prev.1 >= bottom {
                    continue;
                }
                if bottom - prev.1 < spacing {
                    prev.1 = bottom;
                } else {
                    break;
                }
            }
        }
        placed.push((id, y));
        last_y = y;
    }
    placed
}
