// Spatial hash grid over widget bounds.
//
// Hit testing and snap candidate lookup only need the widgets near a point
// or a rectangle; bucketing bounds by cell avoids scanning every widget.

use std::collections::{BTreeSet, HashMap};

use super::{Point, Rect};

#[derive(Debug, Clone)]
pub struct SpatialGrid<K> {
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<(K, Rect)>>,
}

impl<K: Clone + Ord> SpatialGrid<K> {
    /// Cell size should be roughly the size of a typical widget.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            cells: HashMap::new(),
        }
    }

    fn cell_of(&self, v: f64) -> i64 {
        (v / self.cell_size).floor() as i64
    }

    fn cell_range(&self, rect: &Rect) -> impl Iterator<Item = (i64, i64)> {
        let (x0, x1) = (self.cell_of(rect.x), self.cell_of(rect.right()));
        let (y0, y1) = (self.cell_of(rect.y), self.cell_of(rect.bottom()));
        (x0..=x1).flat_map(move |cx| (y0..=y1).map(move |cy| (cx, cy)))
    }

    pub fn insert(&mut self, key: K, rect: Rect) {
        let cells: Vec<_> = self.cell_range(&rect).collect();
        for cell in cells {
            self.cells.entry(cell).or_default().push((key.clone(), rect));
        }
    }

    /// Keys whose rect overlaps or touches `rect`, in key order.
    pub fn query(&self, rect: &Rect) -> Vec<(K, Rect)> {
        let mut seen = BTreeSet::new();
        let mut result = Vec::new();
        for cell in self.cell_range(rect) {
            let Some(entries) = self.cells.get(&cell) else { continue };
            for (key, r) in entries {
                let touches = r.x <= rect.right() && r.right() >= rect.x && r.y <= rect.bottom() && r.bottom() >= rect.y;
                if touches && seen.insert(key.clone()) {
                    result.push((key.clone(), *r));
                }
            }
        }
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    pub fn at_point(&self, p: Point) -> Vec<K> {
        self.query(&Rect::new(p.x, p.y, 0.0, 0.0))
            .into_iter()
            .filter(|(_, r)| r.contains(p))
            .map(|(k, _)| k)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_query() {
        let mut grid = SpatialGrid::new(100.0);
        grid.insert("a", Rect::new(0.0, 0.0, 50.0, 50.0));
        grid.insert("b", Rect::new(200.0, 200.0, 50.0, 50.0));

        let nearby = grid.query(&Rect::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].0, "a");
    }

    #[test]
    fn test_large_rect_is_reported_once() {
        let mut grid = SpatialGrid::new(50.0);
        grid.insert("big", Rect::new(0.0, 0.0, 400.0, 400.0));
        assert_eq!(grid.query(&Rect::new(0.0, 0.0, 400.0, 400.0)).len(), 1);
    }

    #[test]
    fn test_at_point() {
        let mut grid = SpatialGrid::new(100.0);
        grid.insert(1, Rect::new(-50.0, -50.0, 100.0, 100.0));
        assert_eq!(grid.at_point(Point::new(-10.0, 10.0)), vec![1]);
        assert!(grid.at_point(Point::new(80.0, 80.0)).is_empty());
    }
}
