//! One editing session.
//!
//! The workspace owns the registry, the connection graph, the validation
//! engine and the empire, and is the only thing that mutates them. Every
//! public operation tolerates stale ids by doing nothing; side effects are
//! reported as [`WorkspaceEvent`]s drained by the frontend.

use std::collections::BTreeSet;

use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

use crate::config::EditorConfig;
use crate::factory::WidgetFactory;
use crate::geometry::{
    edge_curve, magnetic_snap, port_world_position, reflow_ports, CubicBezier, Point, Rect, SpatialGrid,
};
use crate::graph::{ConnectionGraph, GraphChange};
use crate::hierarchy;
use crate::ids::{EdgeId, PortId, WidgetId};
use crate::model::{Direction, Widget, WidgetData, WidgetKind};
use crate::output::EdgePath;
use crate::registry::Registry;
use crate::tech::{Empire, TechTree};
use crate::validation::{Debouncer, IndicatorSink, Preflight, PreflightInput, PreflightReport, Summary};

/// Cell size of the widget lookup grid, about one widget wide.
const GRID_CELL: f64 = 320.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkspaceEvent {
    WidgetAdded { widget: WidgetId },
    WidgetClosed { widget: WidgetId },
    /// The incident-edge count of a port changed.
    PortStateChanged { widget: WidgetId, port: PortId },
    ParentLinked { parent: WidgetId, child: WidgetId },
    ParentUnlinked { parent: WidgetId, child: WidgetId },
    /// Bounds or port layout of these widgets changed; edge paths touching
    /// them need recomputing.
    GeometryInvalidated { widgets: Vec<WidgetId> },
    /// Minimap and other viewport consumers should redraw.
    ViewportRefresh,
    ValidationCompleted { summary: Summary },
    TechReady,
}

/// Something under the pointer, topmost first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum Hit {
    Edge(EdgeId),
    Port(PortId),
    Widget(WidgetId),
}

pub struct Workspace {
    config: EditorConfig,
    registry: Registry,
    graph: ConnectionGraph,
    factory: WidgetFactory,
    preflight: Preflight,
    empire: Empire,
    debouncer: Debouncer,
    validation_dirty: bool,
    events: Vec<WorkspaceEvent>,
    indicator_sink: Option<Box<dyn IndicatorSink>>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Workspace {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            registry: Registry::new(),
            graph: ConnectionGraph::new(config.ports.clone()),
            factory: WidgetFactory::new(config.ports.clone()).with_canvas(config.canvas.bounds),
            preflight: Preflight::new(),
            empire: Empire::default(),
            debouncer: Debouncer::new(config.validation.debounce_ms),
            validation_dirty: false,
            events: Vec::new(),
            indicator_sink: None,
            config,
        }
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn graph(&self) -> &ConnectionGraph {
        &self.graph
    }

    pub fn empire(&self) -> &Empire {
        &self.empire
    }

    pub fn report(&self) -> &PreflightReport {
        self.preflight.report()
    }

    pub fn widget(&self, id: &WidgetId) -> Option<&Widget> {
        self.registry.get(id)
    }

    pub fn set_indicator_sink(&mut self, sink: impl IndicatorSink + 'static) {
        self.indicator_sink = Some(Box::new(sink));
    }

    pub fn drain_events(&mut self) -> Vec<WorkspaceEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn factory(&self) -> &WidgetFactory {
        &self.factory
    }

    pub(crate) fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub(crate) fn push_event(&mut self, event: WorkspaceEvent) {
        self.events.push(event);
    }

    // ========================================================================
    // Widgets
    // ========================================================================

    pub fn add_widget(&mut self, kind: WidgetKind, position: Option<Point>) -> WidgetId {
        let id = self.factory.create(kind, position, &mut self.registry);
        info!("added {} {}", kind.as_str(), id);
        self.events.push(WorkspaceEvent::WidgetAdded { widget: id.clone() });
        self.invalidate(vec![id.clone()]);
        id
    }

    /// Register a fully built widget, e.g. one rebuilt from a snapshot.
    pub(crate) fn insert_widget(&mut self, widget: Widget) {
        let id = widget.id.clone();
        self.registry.add(widget);
        self.events.push(WorkspaceEvent::WidgetAdded { widget: id.clone() });
        self.invalidate(vec![id]);
    }

    /// Close a widget, removing every edge that touches it first.
    pub fn close_widget(&mut self, id: &WidgetId) -> bool {
        if !self.registry.contains(id) {
            debug!("close of unknown widget {id} ignored");
            return false;
        }
        let change = self.graph.remove_all_connections_of_widget(&mut self.registry, id);
        self.apply_change(change);
        self.registry.remove(id);
        info!("closed {id}");
        self.events.push(WorkspaceEvent::WidgetClosed { widget: id.clone() });
        self.events.push(WorkspaceEvent::ViewportRefresh);
        self.validation_dirty = true;
        true
    }

    /// Drag a widget to `(x, y)`. Applies magnetic snapping, canvas
    /// clamping and, when enabled, cascades the delta to descendants.
    /// Returns the final top-left corner.
    pub fn move_widget(&mut self, id: &WidgetId, x: f64, y: f64) -> Option<Point> {
        let old = self.registry.get(id)?.bounds;
        let mut target = Rect::new(x, y, old.width, old.height);

        if self.config.snap.enabled {
            let threshold = self.config.snap.threshold;
            let reach = Rect::new(
                target.x - threshold,
                target.y - threshold,
                target.width + 2.0 * threshold,
                target.height + 2.0 * threshold,
            );
            let others: Vec<Rect> = self
                .widget_grid(Some(id))
                .query(&reach)
                .into_iter()
                .map(|(_, r)| r)
                .collect();
            let (sx, sy) = magnetic_snap(&target, &others, threshold);
            target.x = sx;
            target.y = sy;
        }
        if let Some(canvas) = &self.config.canvas.bounds {
            target.clamp_into(canvas);
        }

        let (dx, dy) = (target.x - old.x, target.y - old.y);
        let widget = self.registry.get_mut(id)?;
        widget.bounds.x = target.x;
        widget.bounds.y = target.y;
        widget.manual_position = true;

        let mut moved = vec![id.clone()];
        if self.config.arrange.cascade_drag && (dx != 0.0 || dy != 0.0) {
            moved.extend(hierarchy::cascade_drag(&mut self.registry, id, dx, dy));
        }
        self.events.push(WorkspaceEvent::GeometryInvalidated { widgets: moved });
        Some(Point::new(target.x, target.y))
    }

    /// Place a widget without snapping and mark it as user-positioned.
    pub fn place_widget(&mut self, id: &WidgetId, x: f64, y: f64) -> bool {
        let Some(widget) = self.registry.get_mut(id) else { return false };
        widget.bounds.x = x;
        widget.bounds.y = y;
        widget.manual_position = true;
        self.events.push(WorkspaceEvent::GeometryInvalidated { widgets: vec![id.clone()] });
        true
    }

    pub fn resize_widget(&mut self, id: &WidgetId, width: f64, height: f64) -> bool {
        let Some(widget) = self.registry.get_mut(id) else { return false };
        widget.bounds.width = width.max(0.0);
        widget.bounds.height = height.max(0.0);
        reflow_ports(widget, &self.config.ports);
        self.events.push(WorkspaceEvent::GeometryInvalidated { widgets: vec![id.clone()] });
        true
    }

    pub fn set_pinned(&mut self, id: &WidgetId, pinned: bool) -> bool {
        let Some(widget) = self.registry.get_mut(id) else { return false };
        widget.pinned = pinned;
        true
    }

    pub fn set_minimized(&mut self, id: &WidgetId, minimized: bool) -> bool {
        let Some(widget) = self.registry.get_mut(id) else { return false };
        widget.minimized = minimized;
        self.events.push(WorkspaceEvent::GeometryInvalidated { widgets: vec![id.clone()] });
        true
    }

    pub fn set_title(&mut self, id: &WidgetId, title: &str) -> bool {
        let Some(widget) = self.registry.get_mut(id) else { return false };
        widget.title = title.to_string();
        self.validation_dirty = true;
        true
    }

    /// Move a layout anchor (e.g. after a form section grew) and re-flow.
    pub fn set_anchor(&mut self, id: &WidgetId, anchor: &str, y: f64) -> bool {
        let Some(widget) = self.registry.get_mut(id) else { return false };
        widget.set_anchor(anchor, y);
        reflow_ports(widget, &self.config.ports);
        self.events.push(WorkspaceEvent::GeometryInvalidated { widgets: vec![id.clone()] });
        true
    }

    /// Replace a widget's payload from its serialized form.
    ///
    /// `Ok(false)` for an unknown widget; decoding failures are returned.
    pub fn update_widget_data(&mut self, id: &WidgetId, value: Value) -> Result<bool, serde_json::Error> {
        let Some(kind) = self.registry.get(id).map(|w| w.kind) else { return Ok(false) };
        let data = WidgetData::from_value(kind, value)?;
        let Some(widget) = self.registry.get_mut(id) else { return Ok(false) };
        match data {
            WidgetData::Reroute(routes) => {
                self.factory.restore_routes(widget, routes);
                self.registry.reindex(id);
                self.events.push(WorkspaceEvent::GeometryInvalidated { widgets: vec![id.clone()] });
            }
            data => widget.data = data,
        }
        self.validation_dirty = true;
        Ok(true)
    }

    /// Add a pass-through route for `type_tag` to a reroute widget.
    pub fn configure_route(&mut self, id: &WidgetId, type_tag: &str) -> Option<(PortId, PortId)> {
        let widget = self.registry.get_mut(id)?;
        let ports = self.factory.configure_route(widget, type_tag)?;
        self.registry.reindex(id);
        self.events.push(WorkspaceEvent::GeometryInvalidated { widgets: vec![id.clone()] });
        Some(ports)
    }

    /// Auto-arrange the subtree below `root`.
    pub fn arrange(&mut self, root: &WidgetId) -> Vec<WidgetId> {
        let moved = hierarchy::auto_arrange(&mut self.registry, root, &self.config.arrange);
        if !moved.is_empty() {
            self.events.push(WorkspaceEvent::GeometryInvalidated { widgets: moved.clone() });
            self.events.push(WorkspaceEvent::ViewportRefresh);
        }
        moved
    }

    // ========================================================================
    // Connections
    // ========================================================================

    pub fn can_connect(&self, a: &PortId, b: &PortId) -> bool {
        self.graph.can_connect(&self.registry, a, b)
    }

    pub fn connect(&mut self, a: &PortId, b: &PortId) -> Option<EdgeId> {
        let change = self.graph.create_connection(&mut self.registry, a, b)?;
        let created = change.created.clone();
        self.apply_change(change);
        created
    }

    pub fn disconnect(&mut self, edge: &EdgeId) -> bool {
        match self.graph.remove_connection(&mut self.registry, edge) {
            Some(change) => {
                self.apply_change(change);
                true
            }
            None => false,
        }
    }

    pub fn reconnect_begin(&mut self, edge: &EdgeId, moving: &PortId) -> Option<PortId> {
        let anchor = self.graph.reconnect_begin(&mut self.registry, edge, moving)?;
        if let Some(owner) = self.registry.owner_of(moving).cloned() {
            self.events.push(WorkspaceEvent::PortStateChanged { widget: owner, port: moving.clone() });
        }
        Some(anchor)
    }

    pub fn reconnect_commit(&mut self, edge: &EdgeId, anchor: &PortId, new_port: &PortId) -> Option<EdgeId> {
        let change = self.graph.reconnect_commit(&mut self.registry, edge, anchor, new_port)?;
        let created = change.created.clone();
        self.apply_change(change);
        created
    }

    pub fn reconnect_abort(&mut self, edge: &EdgeId, dragged: &PortId) -> bool {
        let restored = self.graph.reconnect_abort(&mut self.registry, edge, dragged);
        if restored && let Some(owner) = self.registry.owner_of(dragged).cloned() {
            self.events.push(WorkspaceEvent::PortStateChanged { widget: owner, port: dragged.clone() });
        }
        restored
    }

    pub fn select_connection(&mut self, edge: &EdgeId) -> bool {
        self.graph.select_connection(edge)
    }

    pub fn deselect_all(&mut self) {
        self.graph.deselect_all();
    }

    /// Turn a graph change into events, re-arrangement and a pending pass.
    fn apply_change(&mut self, change: GraphChange) {
        if change.is_empty() {
            return;
        }
        let mut touched: BTreeSet<WidgetId> = BTreeSet::new();
        for (widget, port) in change.ports_changed {
            touched.insert(widget.clone());
            self.events.push(WorkspaceEvent::PortStateChanged { widget, port });
        }

        let mut roots: Vec<WidgetId> = Vec::new();
        for (parent, child) in change.unlinked {
            self.events.push(WorkspaceEvent::ParentUnlinked { parent: parent.clone(), child });
            let ancestors = hierarchy::ancestors(&self.registry, &parent);
            roots.push(parent);
            roots.extend(ancestors);
        }
        for (parent, child) in change.linked {
            self.events.push(WorkspaceEvent::ParentLinked { parent: parent.clone(), child });
            let ancestors = hierarchy::ancestors(&self.registry, &parent);
            roots.push(parent);
            roots.extend(ancestors);
        }

        let mut arranged = false;
        let mut seen = BTreeSet::new();
        for root in roots {
            if !seen.insert(root.clone()) {
                continue;
            }
            let moved = hierarchy::auto_arrange(&mut self.registry, &root, &self.config.arrange);
            arranged |= !moved.is_empty();
            touched.extend(moved);
        }

        if !touched.is_empty() {
            self.events.push(WorkspaceEvent::GeometryInvalidated { widgets: touched.into_iter().collect() });
        }
        if arranged {
            self.events.push(WorkspaceEvent::ViewportRefresh);
        }
        self.validation_dirty = true;
    }

    // ========================================================================
    // Geometry queries
    // ========================================================================

    pub fn port_position(&self, port: &PortId) -> Option<Point> {
        let widget = self.registry.get(self.registry.owner_of(port)?)?;
        let port = widget.port(port)?;
        Some(port_world_position(widget, port, &self.config.ports))
    }

    pub fn edge_curve(&self, edge: &EdgeId) -> Option<CubicBezier> {
        let edge = self.graph.edge(edge)?;
        let from = self.port_position(&edge.source)?;
        let to = self.port_position(&edge.sink)?;
        Some(edge_curve(from, Direction::Source, to, &self.config.curve))
    }

    /// SVG paths for every drawable edge.
    pub fn edge_paths(&self) -> Vec<EdgePath> {
        self.graph
            .edges()
            .filter_map(|e| {
                let curve = self.edge_curve(&e.id)?;
                Some(EdgePath {
                    id: e.id.clone(),
                    source: e.source.clone(),
                    sink: e.sink.clone(),
                    path: curve.to_svg_path(),
                    selected: e.selected,
                })
            })
            .collect()
    }

    fn widget_grid(&self, exclude: Option<&WidgetId>) -> SpatialGrid<WidgetId> {
        let mut grid = SpatialGrid::new(GRID_CELL);
        for widget in self.registry.iter().filter(|w| Some(&w.id) != exclude) {
            grid.insert(widget.id.clone(), widget.bounds);
        }
        grid
    }

    /// Everything under `point`, topmost first: edges, then ports, then
    /// widget bodies (most recently added on top).
    pub fn hit_test(&self, point: Point) -> Vec<Hit> {
        let mut edges: Vec<(f64, EdgeId)> = self
            .graph
            .edges()
            .filter_map(|e| {
                let d = self.edge_curve(&e.id)?.distance_to(point);
                (d <= self.config.ports.edge_hit_tolerance).then(|| (d, e.id.clone()))
            })
            .collect();
        edges.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut ports: Vec<(f64, PortId)> = self
            .registry
            .iter()
            .filter(|w| !w.minimized)
            .flat_map(|w| {
                w.ports().filter_map(move |p| {
                    let d = port_world_position(w, p, &self.config.ports).distance(point);
                    (d <= self.config.ports.port_hit_radius).then(|| (d, p.id.clone()))
                })
            })
            .collect();
        ports.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut bodies: Vec<&Widget> = self
            .widget_grid(None)
            .at_point(point)
            .iter()
            .filter_map(|id| self.registry.get(id))
            .collect();
        bodies.sort_by_key(|w| std::cmp::Reverse(widget_number(&w.id)));

        edges
            .into_iter()
            .map(|(_, id)| Hit::Edge(id))
            .chain(ports.into_iter().map(|(_, id)| Hit::Port(id)))
            .chain(bodies.into_iter().map(|w| Hit::Widget(w.id.clone())))
            .collect()
    }

    // ========================================================================
    // Validation and tech
    // ========================================================================

    /// Run a pass now, bypassing the debounce.
    pub fn run_validation(&mut self) -> &PreflightReport {
        self.validation_dirty = false;
        self.debouncer.cancel();
        let input = PreflightInput {
            registry: &self.registry,
            graph: &self.graph,
            empire: &self.empire,
        };
        let sink = self
            .indicator_sink
            .as_deref_mut()
            .map(|s| s as &mut dyn IndicatorSink);
        let summary = self.preflight.run(input, sink).summary;
        self.events.push(WorkspaceEvent::ValidationCompleted { summary });
        self.preflight.report()
    }

    /// Schedule a pass after the debounce delay.
    pub fn request_validation(&mut self, now_ms: f64) {
        self.validation_dirty = false;
        self.debouncer.request(now_ms);
    }

    /// Drive the debounce. Structural edits since the last call start (or
    /// extend) the quiet period; returns true when a pass ran.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        if self.validation_dirty {
            self.request_validation(now_ms);
        }
        if self.debouncer.poll(now_ms) {
            self.run_validation();
            true
        } else {
            false
        }
    }

    pub fn is_validation_pending(&self) -> bool {
        self.validation_dirty || self.debouncer.is_pending()
    }

    /// Install static tech data. The first load re-runs validation at once,
    /// since every tech check failed closed until now.
    pub fn load_tech_tree(&mut self, tree: TechTree) -> bool {
        let became_ready = self.empire.load_tech_tree(tree);
        if became_ready {
            self.events.push(WorkspaceEvent::TechReady);
            self.run_validation();
        } else {
            self.validation_dirty = true;
        }
        became_ready
    }

    pub fn research_tech(&mut self, tech: &str) -> bool {
        let done = self.empire.research(tech);
        if done {
            self.validation_dirty = true;
        }
        done
    }

    /// Swap in a restored empire, keeping any loaded tech tree.
    pub(crate) fn replace_empire(&mut self, mut empire: Empire) {
        if let Some(tree) = self.empire.tree().cloned() {
            empire.load_tech_tree(tree);
        }
        self.empire = empire;
        self.validation_dirty = true;
    }

    /// Drop every widget and edge. Tech state is kept.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.registry.clear();
        self.events.push(WorkspaceEvent::ViewportRefresh);
        self.validation_dirty = true;
    }

    fn invalidate(&mut self, widgets: Vec<WidgetId>) {
        self.events.push(WorkspaceEvent::GeometryInvalidated { widgets });
        self.validation_dirty = true;
    }
}

/// Creation order of `widget-{n}` ids; other ids sort first.
fn widget_number(id: &WidgetId) -> u64 {
    id.as_str()
        .strip_prefix("widget-")
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::data::ShipData;
    use crate::validation::Severity;

    fn port(ws: &Workspace, widget: &WidgetId, tag: &str, direction: Direction) -> PortId {
        ws.widget(widget).unwrap().find_port(tag, direction).unwrap().id.clone()
    }

    fn ship_with_magazines(ws: &mut Workspace) -> WidgetId {
        let ship = ws.add_widget(WidgetKind::Ship, None);
        let mut data = ShipData::default();
        data.hull_composition.insert("magazine".to_string(), 2);
        data.hull_composition.insert("hangar".to_string(), 0);
        ws.update_widget_data(&ship, serde_json::to_value(&data).unwrap()).unwrap();
        ship
    }

    #[test]
    fn test_ship_with_outfit_but_no_loadout_gets_one_warning() {
        let mut ws = Workspace::default();
        let ship = ship_with_magazines(&mut ws);
        let outfit = ws.add_widget(WidgetKind::Outfit, None);
        let (a, b) = (port(&ws, &ship, "Class", Direction::Source), port(&ws, &outfit, "Class", Direction::Sink));
        ws.connect(&a, &b).unwrap();

        let report = ws.run_validation();
        let on_ship: Vec<&crate::validation::Issue> = report
            .feed
            .iter()
            .filter(|i| i.source_id == ship.as_str())
            .collect();
        let warnings: Vec<_> = on_ship.iter().filter(|i| i.severity == Severity::Warning).collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("Loadout connection"));
        assert!(!on_ship.iter().any(|i| i.severity == Severity::Error && i.message.contains("hulls")));
    }

    #[test]
    fn test_class_pair_connects_once() {
        let mut ws = Workspace::default();
        let ship = ws.add_widget(WidgetKind::Ship, None);
        let outfit = ws.add_widget(WidgetKind::Outfit, None);
        let class_out = port(&ws, &ship, "Class", Direction::Source);
        let class_in = port(&ws, &outfit, "Class", Direction::Sink);
        let core_in = port(&ws, &outfit, "Core", Direction::Sink);

        assert!(!ws.can_connect(&class_out, &core_in));
        assert!(ws.connect(&class_out, &class_in).is_some());
        assert!(!ws.can_connect(&class_out, &class_in));
        assert!(ws.connect(&class_in, &class_out).is_none());
        assert_eq!(ws.graph().len(), 1);
    }

    #[test]
    fn test_connect_links_and_arranges_child() {
        let mut ws = Workspace::default();
        let ship = ws.add_widget(WidgetKind::Ship, Some(Point::new(0.0, 0.0)));
        let outfit = ws.add_widget(WidgetKind::Outfit, Some(Point::new(900.0, 900.0)));
        ws.drain_events();
        let (a, b) = (port(&ws, &ship, "Class", Direction::Source), port(&ws, &outfit, "Class", Direction::Sink));
        ws.connect(&a, &b).unwrap();

        let parent = ws.widget(&ship).unwrap().bounds;
        let child = ws.widget(&outfit).unwrap().bounds;
        assert_eq!(child.x, parent.right() + ws.config().arrange.spacing_x);
        assert_eq!(child.center_y(), parent.center_y());

        let events = ws.drain_events();
        assert!(events.contains(&WorkspaceEvent::ParentLinked { parent: ship.clone(), child: outfit.clone() }));
        assert_eq!(events.iter().filter(|e| **e == WorkspaceEvent::ViewportRefresh).count(), 1);
    }

    #[test]
    fn test_unlink_rearranges_ancestors() {
        let mut ws = Workspace::default();
        let outfit = ws.add_widget(WidgetKind::Outfit, Some(Point::new(0.0, 0.0)));
        let berth = ws.add_widget(WidgetKind::ShipBerth, Some(Point::new(0.0, 2000.0)));
        let hulls = ws.add_widget(WidgetKind::ShipHulls, Some(Point::new(3000.0, 3000.0)));
        let staff = ws
            .connect(&port(&ws, &berth, "Staff", Direction::Source), &port(&ws, &hulls, "Staff", Direction::Sink))
            .unwrap();
        ws.connect(&port(&ws, &outfit, "Berth", Direction::Source), &port(&ws, &berth, "Berth", Direction::Sink))
            .unwrap();
        ws.connect(&port(&ws, &outfit, "OutfitHull", Direction::Source), &port(&ws, &hulls, "OutfitHull", Direction::Sink))
            .unwrap();
        assert_eq!(ws.widget(&hulls).unwrap().parents().len(), 2);
        let column = ws.widget(&outfit).unwrap().bounds.right() + ws.config().arrange.spacing_x;
        assert!(ws.widget(&hulls).unwrap().bounds.x > column);

        // The hull plan is left with one parent, so the outfit stacks it.
        assert!(ws.disconnect(&staff));
        assert_eq!(ws.widget(&hulls).unwrap().bounds.x, column);
        assert_eq!(ws.widget(&berth).unwrap().bounds.x, column);
    }

    #[test]
    fn test_ancestor_cycle_edge_keeps_hierarchy_acyclic() {
        let mut ws = Workspace::default();
        let a = ws.add_widget(WidgetKind::Statistics, None);
        let b = ws.add_widget(WidgetKind::Statistics, None);
        let c = ws.add_widget(WidgetKind::Statistics, None);
        for (p, q) in [(&a, &b), (&b, &c), (&c, &a)] {
            let out = port(&ws, p, "Statistics", Direction::Source);
            let inp = port(&ws, q, "Statistics", Direction::Sink);
            ws.connect(&out, &inp);
        }
        for id in [&a, &b, &c] {
            assert!(!hierarchy::is_ancestor_of(ws.registry(), id, id));
        }
        assert!(ws.widget(&a).unwrap().parents().is_empty());
    }

    #[test]
    fn test_close_widget_removes_incident_edges() {
        let mut ws = Workspace::default();
        let core = ws.add_widget(WidgetKind::ShipCore, None);
        let outfit = ws.add_widget(WidgetKind::Outfit, None);
        let (a, b) = (port(&ws, &core, "Core", Direction::Source), port(&ws, &outfit, "Core", Direction::Sink));
        ws.connect(&a, &b).unwrap();
        assert!(ws.close_widget(&core));
        assert!(ws.graph().is_empty());
        assert!(ws.widget(&outfit).unwrap().parents().is_empty());
        assert!(ws.widget(&outfit).unwrap().port(&b).unwrap().is_free());
        assert!(!ws.close_widget(&core));
    }

    #[test]
    fn test_outfit_accepts_many_cores() {
        let mut ws = Workspace::default();
        let outfit = ws.add_widget(WidgetKind::Outfit, None);
        let core_in = port(&ws, &outfit, "Core", Direction::Sink);
        for _ in 0..3 {
            let core = ws.add_widget(WidgetKind::ShipCore, None);
            let out = port(&ws, &core, "Core", Direction::Source);
            ws.connect(&out, &core_in).unwrap();
        }
        assert_eq!(ws.widget(&outfit).unwrap().count_connections("Core", Direction::Sink), 3);
    }

    #[test]
    fn test_move_snaps_and_marks_manual() {
        let mut ws = Workspace::default();
        let a = ws.add_widget(WidgetKind::ShipCore, Some(Point::new(0.0, 0.0)));
        let b = ws.add_widget(WidgetKind::ShipCore, Some(Point::new(600.0, 600.0)));
        let width = ws.widget(&a).unwrap().bounds.width;
        let at = ws.move_widget(&b, width + 8.0, 5.0).unwrap();
        assert_eq!(at, Point::new(width, 0.0));
        assert!(ws.widget(&b).unwrap().manual_position);
        assert!(ws.move_widget(&WidgetId::from("widget-99"), 0.0, 0.0).is_none());
    }

    #[test]
    fn test_cascade_drag_moves_descendants_when_enabled() {
        let mut config = EditorConfig::default();
        config.arrange.cascade_drag = true;
        config.snap.enabled = false;
        let mut ws = Workspace::new(config);
        let ship = ws.add_widget(WidgetKind::Ship, Some(Point::new(0.0, 0.0)));
        let outfit = ws.add_widget(WidgetKind::Outfit, None);
        let (a, b) = (port(&ws, &ship, "Class", Direction::Source), port(&ws, &outfit, "Class", Direction::Sink));
        ws.connect(&a, &b).unwrap();
        let before = ws.widget(&outfit).unwrap().bounds;
        ws.move_widget(&ship, 50.0, 20.0);
        let after = ws.widget(&outfit).unwrap().bounds;
        assert_eq!((after.x - before.x, after.y - before.y), (50.0, 20.0));
    }

    #[test]
    fn test_debounced_validation_coalesces() {
        let mut ws = Workspace::default();
        ws.add_widget(WidgetKind::Outfit, None);
        assert!(!ws.poll(0.0));
        ws.add_widget(WidgetKind::Outfit, None);
        assert!(!ws.poll(50.0));
        assert!(!ws.poll(149.0));
        assert!(ws.poll(150.0));
        assert!(!ws.poll(400.0));
        assert_eq!(ws.report().summary.errors, 4);
    }

    #[test]
    fn test_tech_ready_triggers_revalidation() {
        let mut ws = Workspace::default();
        let tree = TechTree::from_json(r#"{"Root": {"name": "Root", "cost": 0}}"#).unwrap();
        ws.drain_events();
        assert!(ws.load_tech_tree(tree.clone()));
        let events = ws.drain_events();
        assert!(events.contains(&WorkspaceEvent::TechReady));
        assert!(events.iter().any(|e| matches!(e, WorkspaceEvent::ValidationCompleted { .. })));
        assert!(!ws.load_tech_tree(tree));
    }

    #[test]
    fn test_hit_test_finds_port_and_body() {
        let mut ws = Workspace::default();
        let core = ws.add_widget(WidgetKind::ShipCore, Some(Point::new(0.0, 0.0)));
        let out = port(&ws, &core, "Core", Direction::Source);
        let at = ws.port_position(&out).unwrap();
        let hits = ws.hit_test(at);
        assert_eq!(hits.first(), Some(&Hit::Port(out)));
        assert!(hits.contains(&Hit::Widget(core)));
        assert!(ws.hit_test(Point::new(-500.0, -500.0)).is_empty());
    }

    #[test]
    fn test_indicator_sink_receives_counts() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut ws = Workspace::default();
        let log = Rc::clone(&seen);
        ws.set_indicator_sink(move |id: &WidgetId, w: usize, e: usize, _: &[crate::validation::Issue], a: usize| {
            log.borrow_mut().push((id.clone(), w, e, a));
        });
        let outfit = ws.add_widget(WidgetKind::Outfit, None);
        ws.run_validation();
        assert_eq!(*seen.borrow(), vec![(outfit, 0, 2, 1)]);
    }
}
