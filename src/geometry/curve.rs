// Connection curve geometry.
//
// A connection leaves a source port travelling right and enters a sink port
// travelling right, so flow always reads left-to-right even when the sink
// widget sits left of the source. The drag preview uses the same function
// with the pointer standing in for the missing endpoint, so completing a
// drag does not make the curve jump.

use serde::Serialize;

use super::Point;
use crate::config::CurveConfig;
use crate::model::Direction;

/// Number of straight segments used to approximate a curve for hit testing.
const HIT_SAMPLES: usize = 24;

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct CubicBezier {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl CubicBezier {
    pub fn point_at(&self, t: f64) -> Point {
        let u = 1.0 - t;
        let a = u * u * u;
        let b = 3.0 * u * u * t;
        let c = 3.0 * u * t * t;
        let d = t * t * t;
        Point {
            x: a * self.start.x + b * self.control1.x + c * self.control2.x + d * self.end.x,
            y: a * self.start.y + b * self.control1.y + c * self.control2.y + d * self.end.y,
        }
    }

    /// SVG path data, `M x1 y1 C c1x c1y, c2x c2y, x2 y2`.
    pub fn to_svg_path(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x, self.start.y,
            self.control1.x, self.control1.y,
            self.control2.x, self.control2.y,
            self.end.x, self.end.y,
        )
    }

    /// Approximate shortest distance from `p` to the curve.
    pub fn distance_to(&self, p: Point) -> f64 {
        let mut best = f64::INFINITY;
        let mut prev = self.start;
        for i in 1..=HIT_SAMPLES {
            let next = self.point_at(i as f64 / HIT_SAMPLES as f64);
            best = best.min(distance_to_segment(p, prev, next));
            prev = next;
        }
        best
    }

    /// The same curve traversed from the other end.
    pub fn reversed(&self) -> CubicBezier {
        CubicBezier {
            start: self.end,
            control1: self.control2,
            control2: self.control1,
            end: self.start,
        }
    }
}

/// Curve from an endpoint of known direction to another point.
///
/// Control points reach horizontally by a distance proportional to the
/// endpoint distance, capped at `max_curvature`. A source endpoint reaches
/// right, a sink endpoint reaches left; the far end is treated as the
/// opposite direction.
pub fn edge_curve(from: Point, from_direction: Direction, to: Point, cfg: &CurveConfig) -> CubicBezier {
    let reach = (from.distance(to) * cfg.curvature_factor).min(cfg.max_curvature);
    let sign = match from_direction {
        Direction::Source => 1.0,
        Direction::Sink => -1.0,
    };
    CubicBezier {
        start: from,
        control1: Point { x: from.x + sign * reach, y: from.y },
        control2: Point { x: to.x - sign * reach, y: to.y },
        end: to,
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point { x: a.x + t * dx, y: a.y + t * dy })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_curve_leaves_rightward() {
        let cfg = CurveConfig::default();
        let c = edge_curve(Point::new(0.0, 0.0), Direction::Source, Point::new(100.0, 0.0), &cfg);
        assert_eq!(c.control1, Point::new(30.0, 0.0));
        assert_eq!(c.control2, Point::new(70.0, 0.0));
    }

    #[test]
    fn test_curvature_is_capped() {
        let cfg = CurveConfig::default();
        let c = edge_curve(Point::new(0.0, 0.0), Direction::Source, Point::new(1000.0, 0.0), &cfg);
        assert_eq!(c.control1.x, 100.0);
        assert_eq!(c.control2.x, 900.0);
    }

    #[test]
    fn test_backwards_link_still_flows_left_to_right() {
        // Sink widget to the left of the source: control points still point
        // right from the source and left from the sink.
        let cfg = CurveConfig::default();
        let c = edge_curve(Point::new(500.0, 0.0), Direction::Source, Point::new(100.0, 0.0), &cfg);
        assert!(c.control1.x > c.start.x);
        assert!(c.control2.x < c.end.x);
    }

    #[test]
    fn test_sink_origin_preview_matches_committed_curve() {
        let cfg = CurveConfig::default();
        let sink = Point::new(400.0, 120.0);
        let source = Point::new(100.0, 40.0);
        let preview = edge_curve(sink, Direction::Sink, source, &cfg);
        let committed = edge_curve(source, Direction::Source, sink, &cfg);
        assert_eq!(preview.reversed(), committed);
    }

    #[test]
    fn test_distance_to_curve() {
        let cfg = CurveConfig::default();
        let c = edge_curve(Point::new(0.0, 0.0), Direction::Source, Point::new(100.0, 0.0), &cfg);
        assert!(c.distance_to(Point::new(50.0, 0.0)) < 0.5);
        assert!(c.distance_to(Point::new(50.0, 40.0)) > 30.0);
    }

    #[test]
    fn test_svg_path() {
        let cfg = CurveConfig::default();
        let c = edge_curve(Point::new(0.0, 0.0), Direction::Source, Point::new(100.0, 0.0), &cfg);
        assert_eq!(c.to_svg_path(), "M 0 0 C 30 0, 70 0, 100 0");
    }
}
