// Magnetic edge snapping for dragged widgets.
//
// Each axis snaps at most once: the first nearby widget offering an
// alignment within the threshold wins. Horizontal alignment is only
// considered against widgets that overlap (or nearly overlap) vertically,
// and vice versa.

use super::Rect;

/// Snapped top-left corner for `moving`, or its current corner when nothing is close.
pub fn magnetic_snap<'a>(moving: &Rect, others: impl IntoIterator<Item = &'a Rect>, threshold: f64) -> (f64, f64) {
    let mut snap_x = None;
    let mut snap_y = None;
    let near = |a: f64, b: f64| (a - b).abs() < threshold;

    for other in others {
        if snap_x.is_none() {
            let vertical_overlap = !(moving.bottom() < other.y || moving.y > other.bottom());
            let vertical_proximity = [
                (moving.y - other.bottom()).abs(),
                (moving.bottom() - other.y).abs(),
                (moving.y - other.y).abs(),
                (moving.bottom() - other.bottom()).abs(),
            ]
            .into_iter()
            .fold(f64::INFINITY, f64::min);
            if vertical_overlap || vertical_proximity < threshold {
                snap_x = axis_snap(moving.x, moving.width, other.x, other.right(), near);
            }
        }

        if snap_y.is_none() {
            let horizontal_overlap = !(moving.right() < other.x || moving.x > other.right());
            let horizontal_proximity = [
                (moving.x - other.right()).abs(),
                (moving.right() - other.x).abs(),
                (moving.x - other.x).abs(),
                (moving.right() - other.right()).abs(),
            ]
            .into_iter()
            .fold(f64::INFINITY, f64::min);
            if horizontal_overlap || horizontal_proximity < threshold {
                snap_y = axis_snap(moving.y, moving.height, other.y, other.bottom(), near);
            }
        }

        if snap_x.is_some() && snap_y.is_some() {
            break;
        }
    }

    (snap_x.unwrap_or(moving.x), snap_y.unwrap_or(moving.y))
}

/// Start/start, start/end, end/start, end/end, in that order of preference.
fn axis_snap(start: f64, extent: f64, other_start: f64, other_end: f64, near: impl Fn(f64, f64) -> bool) -> Option<f64> {
    let end = start + extent;
    if near(start, other_start) {
        Some(other_start)
    } else if near(start, other_end) {
        Some(other_end)
    } else if near(end, other_start) {
        Some(other_start - extent)
    } else if near(end, other_end) {
        Some(other_end - extent)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snaps_left_edge_to_right_edge() {
        let other = Rect::new(0.0, 0.0, 300.0, 200.0);
        let moving = Rect::new(310.0, 20.0, 300.0, 200.0);
        let (x, y) = magnetic_snap(&moving, [&other], 15.0);
        assert_eq!(x, 300.0);
        // Tops are 20 apart: outside the threshold.
        assert_eq!(y, 20.0);
    }

    #[test]
    fn test_snaps_both_axes() {
        let other = Rect::new(0.0, 0.0, 300.0, 200.0);
        let moving = Rect::new(8.0, 210.0, 300.0, 200.0);
        assert_eq!(magnetic_snap(&moving, [&other], 15.0), (0.0, 200.0));
    }

    #[test]
    fn test_far_widgets_do_not_snap() {
        let other = Rect::new(0.0, 0.0, 300.0, 200.0);
        let moving = Rect::new(5.0, 900.0, 300.0, 200.0);
        assert_eq!(magnetic_snap(&moving, [&other], 15.0), (5.0, 900.0));
    }
}
