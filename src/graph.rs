//! Connection graph: typed edges between ports on different widgets.
//!
//! The graph owns the edge set and keeps three caches in step with it: the
//! incident-edge sets on ports, the expandable port groups on widgets, and
//! the parent/child hierarchy. Every operation on an id that no longer
//! exists is a silent no-op, because pointer events routinely race widget
//! removal.
//!
//! Operations return a [`GraphChange`] describing their side effects so the
//! workspace can fire events, auto-arrange and schedule validation.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::Serialize;

use crate::config::PortLayoutConfig;
use crate::error::ConnectError;
use crate::geometry::reflow_ports;
use crate::hierarchy;
use crate::ids::{EdgeId, PortId, WidgetId};
use crate::model::{Direction, GroupChange};
use crate::registry::Registry;
use crate::schema::types_compatible;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    /// The source-direction endpoint.
    pub source: PortId,
    /// The sink-direction endpoint.
    pub sink: PortId,
    pub selected: bool,
}

/// Side effects of a graph operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphChange {
    pub created: Option<EdgeId>,
    pub removed: Vec<EdgeId>,
    /// Ports whose incident-edge count changed, with their owners.
    pub ports_changed: Vec<(WidgetId, PortId)>,
    /// Hierarchy links added, as (parent, child).
    pub linked: Vec<(WidgetId, WidgetId)>,
    /// Hierarchy links removed, as (parent, child).
    pub unlinked: Vec<(WidgetId, WidgetId)>,
}

impl GraphChange {
    pub fn is_empty(&self) -> bool {
        self.created.is_none()
            && self.removed.is_empty()
            && self.ports_changed.is_empty()
            && self.linked.is_empty()
            && self.unlinked.is_empty()
    }

    pub fn absorb(&mut self, other: GraphChange) {
        if other.created.is_some() {
            self.created = other.created;
        }
        self.removed.extend(other.removed);
        self.ports_changed.extend(other.ports_changed);
        self.linked.extend(other.linked);
        self.unlinked.extend(other.unlinked);
    }
}

/// Dangling edge found by `validate_connections`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionFinding {
    pub edge: EdgeId,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
struct Reconnect {
    edge: EdgeId,
    moving: PortId,
    anchor: PortId,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionGraph {
    edges: BTreeMap<EdgeId, Edge>,
    reconnect: Option<Reconnect>,
    layout: PortLayoutConfig,
}

impl ConnectionGraph {
    pub fn new(layout: PortLayoutConfig) -> Self {
        Self {
            edges: BTreeMap::new(),
            reconnect: None,
            layout,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge_between(&self, a: &PortId, b: &PortId) -> Option<&Edge> {
        self.edges.get(&EdgeId::between(a, b))
    }

    /// Edges incident to `port`, as recorded on the port.
    pub fn connections_of_port(&self, registry: &Registry, port: &PortId) -> BTreeSet<EdgeId> {
        registry.port(port).map(|p| p.edges().clone()).unwrap_or_default()
    }

    /// Union of the incident edges of every port on `widget`.
    pub fn connections_of_widget(&self, registry: &Registry, widget: &WidgetId) -> BTreeSet<EdgeId> {
        registry
            .get(widget)
            .map(|w| w.ports().flat_map(|p| p.edges().iter().cloned()).collect())
            .unwrap_or_default()
    }

    pub fn is_reconnecting(&self) -> bool {
        self.reconnect.is_some()
    }

    /// Edges whose endpoints no longer resolve to ports.
    pub fn validate_connections(&self, registry: &Registry) -> Vec<ConnectionFinding> {
        self.edges
            .values()
            .filter(|e| registry.port(&e.source).is_none() || registry.port(&e.sink).is_none())
            .map(|e| ConnectionFinding {
                edge: e.id.clone(),
                message: "Invalid connection: missing node",
            })
            .collect()
    }

    // ========================================================================
    // Legality
    // ========================================================================

    pub fn can_connect(&self, registry: &Registry, a: &PortId, b: &PortId) -> bool {
        self.check_connect(registry, a, b).is_ok()
    }

    /// Validate a prospective edge and return its (source, sink) orientation.
    ///
    /// An existing edge between the pair is only tolerated when it is the
    /// edge currently being reconnected.
    pub fn check_connect(&self, registry: &Registry, a: &PortId, b: &PortId) -> Result<(PortId, PortId), ConnectError> {
        let pa = registry.port(a).ok_or_else(|| ConnectError::UnknownPort(a.clone()))?;
        let pb = registry.port(b).ok_or_else(|| ConnectError::UnknownPort(b.clone()))?;
        if pa.widget == pb.widget {
            return Err(ConnectError::SameWidget(pa.widget.clone()));
        }
        if pa.direction == pb.direction {
            return Err(ConnectError::SameDirection(pa.direction.as_str()));
        }
        let id = EdgeId::between(a, b);
        let reconnecting_this = self.reconnect.as_ref().is_some_and(|r| r.edge == id);
        if self.edges.contains_key(&id) && !reconnecting_this {
            return Err(ConnectError::AlreadyConnected(a.clone(), b.clone()));
        }
        if !types_compatible(&pa.type_tag, &pb.type_tag) {
            return Err(ConnectError::IncompatibleTypes(pa.type_tag.clone(), pb.type_tag.clone()));
        }
        Ok(match pa.direction {
            Direction::Source => (a.clone(), b.clone()),
            Direction::Sink => (b.clone(), a.clone()),
        })
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Connect two ports, in either order. `None` when the edge is illegal.
    pub fn create_connection(&mut self, registry: &mut Registry, a: &PortId, b: &PortId) -> Option<GraphChange> {
        let (source, sink) = match self.check_connect(registry, a, b) {
            Ok(pair) => pair,
            Err(err) => {
                debug!("connection rejected: {err}");
                return None;
            }
        };
        let mut change = GraphChange::default();

        // Single-connection sinks give up their current edge first.
        for port in [&source, &sink] {
            let evict: Vec<EdgeId> = registry
                .port(port)
                .filter(|p| p.is_single_sink())
                .map(|p| p.edges().iter().cloned().collect())
                .unwrap_or_default();
            for edge in evict {
                if let Some(removed) = self.remove_connection(registry, &edge) {
                    change.absorb(removed);
                }
            }
        }

        let id = EdgeId::between(&source, &sink);
        self.edges.insert(
            id.clone(),
            Edge {
                id: id.clone(),
                source: source.clone(),
                sink: sink.clone(),
                selected: false,
            },
        );
        for port in [&source, &sink] {
            if let Some(p) = registry.port_mut(port) {
                p.attach(id.clone());
            }
        }
        debug!("connected {source} -> {sink}");

        for port in [&source, &sink] {
            if let Some(owner) = self.port_changed(registry, port) {
                change.ports_changed.push((owner, port.clone()));
            }
        }

        if let (Some(parent), Some(child)) = (registry.owner_of(&source).cloned(), registry.owner_of(&sink).cloned()) {
            match hierarchy::link(registry, &parent, &child) {
                Ok(true) => change.linked.push((parent, child)),
                Ok(false) => {}
                Err(err) => debug!("edge {id} kept without hierarchy link: {err}"),
            }
        }

        change.created = Some(id);
        Some(change)
    }

    /// Remove an edge. The hierarchy link it supported goes too, unless
    /// another source -> sink edge still joins the same pair of widgets.
    pub fn remove_connection(&mut self, registry: &mut Registry, id: &EdgeId) -> Option<GraphChange> {
        let edge = self.edges.remove(id)?;
        if self.reconnect.as_ref().is_some_and(|r| &r.edge == id) {
            self.reconnect = None;
        }
        let mut change = GraphChange::default();
        for port in [&edge.source, &edge.sink] {
            if let Some(p) = registry.port_mut(port) {
                p.detach(id);
            }
        }

        let parent = registry.owner_of(&edge.source).cloned();
        let child = registry.owner_of(&edge.sink).cloned();
        if let (Some(parent), Some(child)) = (parent, child) {
            let still_linked = self.edges.values().any(|e| {
                registry.owner_of(&e.source) == Some(&parent) && registry.owner_of(&e.sink) == Some(&child)
            });
            if !still_linked && hierarchy::unlink(registry, &parent, &child) {
                change.unlinked.push((parent, child));
                change.linked.extend(self.relink_refused(registry));
            }
        }

        for port in [&edge.source, &edge.sink] {
            if let Some(owner) = self.port_changed(registry, port) {
                change.ports_changed.push((owner, port.clone()));
            }
        }
        debug!("removed {id}");
        change.removed.push(edge.id);
        Some(change)
    }

    /// Remove every edge touching a port of `widget`.
    pub fn remove_all_connections_of_widget(&mut self, registry: &mut Registry, widget: &WidgetId) -> GraphChange {
        let doomed: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| {
                registry.owner_of(&e.source) == Some(widget) || registry.owner_of(&e.sink) == Some(widget)
            })
            .map(|e| e.id.clone())
            .collect();
        let mut change = GraphChange::default();
        for id in doomed {
            if let Some(removed) = self.remove_connection(registry, &id) {
                change.absorb(removed);
            }
        }
        change
    }

    /// Detach `edge` from `moving` only and return the other endpoint.
    ///
    /// The edge stays in the graph until the reconnection is committed or
    /// aborted.
    pub fn reconnect_begin(&mut self, registry: &mut Registry, edge: &EdgeId, moving: &PortId) -> Option<PortId> {
        let e = self.edges.get(edge)?;
        let anchor = if &e.source == moving {
            e.sink.clone()
        } else if &e.sink == moving {
            e.source.clone()
        } else {
            return None;
        };
        if let Some(p) = registry.port_mut(moving) {
            p.detach(edge);
        }
        self.reconnect = Some(Reconnect {
            edge: edge.clone(),
            moving: moving.clone(),
            anchor: anchor.clone(),
        });
        Some(anchor)
    }

    /// Replace `edge` with `anchor` <-> `new_port`. `None` (and nothing
    /// changed) when the new pair is illegal; the caller then aborts.
    pub fn reconnect_commit(
        &mut self,
        registry: &mut Registry,
        edge: &EdgeId,
        anchor: &PortId,
        new_port: &PortId,
    ) -> Option<GraphChange> {
        if !self.edges.contains_key(edge) {
            return None;
        }
        if let Err(err) = self.check_connect(registry, anchor, new_port) {
            debug!("reconnect rejected: {err}");
            return None;
        }
        // Removing the old edge can trim free group ports; remember enough
        // to find an equivalent port if the target was one of them.
        let target = registry
            .port(new_port)
            .map(|p| (p.widget.clone(), p.type_tag.clone(), p.direction));

        let mut change = self.remove_connection(registry, edge)?;
        self.reconnect = None;

        let resolved = if registry.port(new_port).is_some() {
            Some(new_port.clone())
        } else {
            target.and_then(|(widget, tag, direction)| {
                registry
                    .get(&widget)
                    .and_then(|w| w.find_port(&tag, direction))
                    .map(|p| p.id.clone())
            })
        };
        if let Some(created) = resolved.and_then(|port| self.create_connection(registry, anchor, &port)) {
            change.absorb(created);
        }
        Some(change)
    }

    /// Put `edge` back on `dragged`. No hierarchy change.
    pub fn reconnect_abort(&mut self, registry: &mut Registry, edge: &EdgeId, dragged: &PortId) -> bool {
        let restored = match self.edges.get(edge) {
            Some(e) if &e.source == dragged || &e.sink == dragged => {
                if let Some(p) = registry.port_mut(dragged) {
                    p.attach(edge.clone());
                }
                true
            }
            _ => false,
        };
        if self.reconnect.as_ref().is_some_and(|r| &r.edge == edge) {
            self.reconnect = None;
        }
        restored
    }

    pub fn select_connection(&mut self, id: &EdgeId) -> bool {
        self.deselect_all();
        match self.edges.get_mut(id) {
            Some(edge) => {
                edge.selected = true;
                true
            }
            None => false,
        }
    }

    pub fn deselect_all(&mut self) {
        for edge in self.edges.values_mut() {
            edge.selected = false;
        }
    }

    pub fn clear(&mut self) {
        self.edges.clear();
        self.reconnect = None;
    }

    /// Retry the hierarchy link of every edge whose link is missing. An edge
    /// refused as a cycle gets its link once the cycle is broken.
    fn relink_refused(&self, registry: &mut Registry) -> Vec<(WidgetId, WidgetId)> {
        let pairs: Vec<(WidgetId, WidgetId)> = self
            .edges
            .values()
            .filter_map(|e| Some((registry.owner_of(&e.source)?.clone(), registry.owner_of(&e.sink)?.clone())))
            .filter(|(parent, child)| parent != child)
            .collect();
        let mut linked = Vec::new();
        for (parent, child) in pairs {
            if let Ok(true) = hierarchy::link(registry, &parent, &child) {
                debug!("restored hierarchy link {parent} -> {child}");
                linked.push((parent, child));
            }
        }
        linked
    }

    /// Run the owning widget's port-change hook, keeping the port index and
    /// layout current when a group grew or shrank.
    fn port_changed(&self, registry: &mut Registry, port: &PortId) -> Option<WidgetId> {
        let owner = registry.owner_of(port)?.clone();
        let spacing = self.layout.default_min_spacing;
        let group_change: GroupChange = registry.get_mut(&owner)?.handle_port_connection_change(port, spacing);
        if !group_change.is_empty() {
            registry.reindex(&owner);
            if let Some(widget) = registry.get_mut(&owner) {
                reflow_ports(widget, &self.layout);
            }
        }
        Some(owner)
    }
}
