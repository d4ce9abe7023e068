// Parent/child hierarchy derived from source -> sink edges.
//
// The parent and child sets on widgets are a cache of the edges. Only the
// connection graph calls `link`/`unlink`; everything else reads.
//
// Two distinct repositioning operations live here:
// - auto_arrange: canonical stack layout of movable children, recursive
// - cascade_drag: shift every descendant by a drag delta, keeping offsets

use std::collections::BTreeSet;

use log::debug;

use crate::config::ArrangeConfig;
use crate::error::HierarchyError;
use crate::ids::WidgetId;
use crate::model::Widget;
use crate::registry::Registry;

/// Add `parent -> child`. Returns false when the link already existed.
///
/// Refused when it would make a widget its own descendant.
pub fn link(registry: &mut Registry, parent: &WidgetId, child: &WidgetId) -> Result<bool, HierarchyError> {
    if parent == child {
        return Err(HierarchyError::SelfLink(parent.clone()));
    }
    for id in [parent, child] {
        if !registry.contains(id) {
            return Err(HierarchyError::UnknownWidget(id.clone()));
        }
    }
    if registry.get(parent).is_some_and(|p| p.children.contains(child)) {
        return Ok(false);
    }
    if is_ancestor_of(registry, child, parent) {
        debug!("refusing hierarchy link {parent} -> {child}: cycle");
        return Err(HierarchyError::WouldCycle {
            parent: parent.clone(),
            child: child.clone(),
        });
    }
    if let Some(p) = registry.get_mut(parent) {
        p.children.insert(child.clone());
    }
    if let Some(c) = registry.get_mut(child) {
        c.parents.insert(parent.clone());
    }
    Ok(true)
}

/// Remove `parent -> child`. Returns whether a link was removed.
pub fn unlink(registry: &mut Registry, parent: &WidgetId, child: &WidgetId) -> bool {
    let mut removed = false;
    if let Some(p) = registry.get_mut(parent) {
        removed |= p.children.remove(child);
    }
    if let Some(c) = registry.get_mut(child) {
        removed |= c.parents.remove(parent);
    }
    removed
}

/// Whether `descendant` is reachable from `ancestor` through child links.
pub fn is_ancestor_of(registry: &Registry, ancestor: &WidgetId, descendant: &WidgetId) -> bool {
    let mut visited = BTreeSet::new();
    let mut stack = vec![ancestor.clone()];
    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        let Some(widget) = registry.get(&id) else { continue };
        for child in &widget.children {
            if child == descendant {
                return true;
            }
            stack.push(child.clone());
        }
    }
    false
}

/// All widgets below `root`, depth-first, without `root` itself.
pub fn descendants(registry: &Registry, root: &WidgetId) -> Vec<WidgetId> {
    walk(registry, root, |w| &w.children)
}

/// All widgets above `id`, nearest first.
pub fn ancestors(registry: &Registry, id: &WidgetId) -> Vec<WidgetId> {
    walk(registry, id, |w| &w.parents)
}

fn walk(registry: &Registry, start: &WidgetId, next: impl Fn(&Widget) -> &BTreeSet<WidgetId>) -> Vec<WidgetId> {
    let mut out = Vec::new();
    let mut visited = BTreeSet::from([start.clone()]);
    let mut stack: Vec<WidgetId> = registry.get(start).map(|w| next(w).iter().rev().cloned().collect()).unwrap_or_default();
    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        if let Some(widget) = registry.get(&id) {
            stack.extend(next(widget).iter().rev().cloned());
        }
        out.push(id);
    }
    out
}

/// Stack the movable children of `root` to its right, centred on its
/// vertical midpoint, then recurse into every child.
///
/// A child is movable when it is not pinned, has not been placed by hand
/// and has at most one parent. Returns the widgets that moved; the caller
/// refreshes geometry once for the whole pass.
pub fn auto_arrange(registry: &mut Registry, root: &WidgetId, cfg: &ArrangeConfig) -> Vec<WidgetId> {
    let mut visited = BTreeSet::new();
    let mut moved = Vec::new();
    arrange_children(registry, root, cfg, &mut visited, &mut moved);
    moved
}

fn arrange_children(
    registry: &mut Registry,
    id: &WidgetId,
    cfg: &ArrangeConfig,
    visited: &mut BTreeSet<WidgetId>,
    moved: &mut Vec<WidgetId>,
) {
    if !visited.insert(id.clone()) {
        return;
    }
    let Some(parent) = registry.get(id) else { return };
    let bounds = parent.bounds;
    let children: Vec<WidgetId> = parent.children.iter().cloned().collect();

    // Keep the current top-to-bottom order of the stack.
    let mut movable: Vec<(f64, WidgetId)> = children
        .iter()
        .filter_map(|c| registry.get(c))
        .filter(|w| !w.pinned && !w.manual_position && w.parents.len() <= 1)
        .map(|w| (w.bounds.center_y(), w.id.clone()))
        .collect();
    movable.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let x = bounds.right() + cfg.spacing_x;
    let middle = (movable.len() as f64 - 1.0) / 2.0;
    for (i, (_, child)) in movable.iter().enumerate() {
        let center = bounds.center_y() + (i as f64 - middle) * cfg.spacing_y;
        if let Some(w) = registry.get_mut(child) {
            w.bounds.x = x;
            w.bounds.y = center - w.bounds.height / 2.0;
            moved.push(child.clone());
        }
    }

    for child in &children {
        arrange_children(registry, child, cfg, visited, moved);
    }
}

/// Shift every descendant of `id` by `(dx, dy)`. Returns the moved widgets.
pub fn cascade_drag(registry: &mut Registry, id: &WidgetId, dx: f64, dy: f64) -> Vec<WidgetId> {
    let moved = descendants(registry, id);
    for child in &moved {
        if let Some(w) = registry.get_mut(child) {
            w.bounds.x += dx;
            w.bounds.y += dy;
        }
    }
    moved
}
