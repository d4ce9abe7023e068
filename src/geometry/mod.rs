// Geometry primitives and the layout engine.
//
// All positions are world coordinates owned by the crate. The frontend
// renders a projection of them and never feeds DOM measurements back in.
//
// Submodules:
// - curve: connection curves (cubic Bézier) shared by edges and drag previews
// - reflow: port placement inside a widget's content band
// - snap: magnetic edge alignment while dragging widgets
// - spatial: bucketed widget bounds for hit testing and snap lookups

use serde::{Deserialize, Serialize};

pub mod curve;
pub mod reflow;
pub mod snap;
pub mod spatial;

pub use curve::{edge_curve, CubicBezier};
pub use reflow::{
    port_local_position, port_screen_position, port_target_y, port_world_position, reflow_ports, LayoutMetrics,
};
pub use snap::magnetic_snap;
pub use spatial::SpatialGrid;

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 { self.x + self.width }
    pub fn bottom(&self) -> f64 { self.y + self.height }
    pub fn center_y(&self) -> f64 { self.y + self.height / 2.0 }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect { x: x0, y: y0, width: x1 - x0, height: y1 - y0 }
    }

    /// Move the rect so it lies inside `bounds` where possible.
    pub fn clamp_into(&mut self, bounds: &Rect) {
        let max_x = (bounds.right() - self.width).max(bounds.x);
        let max_y = (bounds.bottom() - self.height).max(bounds.y);
        self.x = self.x.clamp(bounds.x, max_x);
        self.y = self.y.clamp(bounds.y, max_y);
    }
}

/// Pan/zoom transform of the workspace: `screen = world * scale + translate`.
///
/// Owned by the viewport (minimap, context menus share it); geometry only
/// takes it as a parameter.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTransform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { scale: 1.0, translate_x: 0.0, translate_y: 0.0 }
    }
}

impl ViewTransform {
    pub fn screen_to_world(&self, screen: Point) -> Point {
        let scale = if self.scale == 0.0 { 1.0 } else { self.scale };
        Point {
            x: (screen.x - self.translate_x) / scale,
            y: (screen.y - self.translate_y) / scale,
        }
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.scale + self.translate_x,
            y: world.y * self.scale + self.translate_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_inverts() {
        let t = ViewTransform { scale: 2.0, translate_x: 50.0, translate_y: -20.0 };
        let world = t.screen_to_world(Point::new(250.0, 180.0));
        assert_eq!(world, Point::new(100.0, 100.0));
        assert_eq!(t.world_to_screen(world), Point::new(250.0, 180.0));
    }

    #[test]
    fn test_rect_clamp_into() {
        let bounds = Rect::new(0.0, 0.0, 1000.0, 800.0);
        let mut r = Rect::new(950.0, -40.0, 300.0, 200.0);
        r.clamp_into(&bounds);
        assert_eq!((r.x, r.y), (700.0, 0.0));
    }

    #[test]
    fn test_rect_overlaps() {
        let a = Rect::new(0.0, 0.0, 50.0, 50.0);
        assert!(a.overlaps(&Rect::new(25.0, 25.0, 50.0, 50.0)));
        assert!(!a.overlaps(&Rect::new(100.0, 100.0, 50.0, 50.0)));
    }
}
