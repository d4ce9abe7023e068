use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::data::WidgetData;
use super::port::{Direction, Port, PortAnchor, PortSpec};
use crate::geometry::Rect;
use crate::ids::{PortId, WidgetId};

/// Widget type tag. Serialized names match saved workspaces.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetKind {
    Ship,
    Outfit,
    ShipCore,
    ShipHulls,
    ShipBerth,
    Loadouts,
    Craft,
    Troops,
    Missiles,
    Statistics,
    Reroute,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 11] = [
        WidgetKind::Ship,
        WidgetKind::Outfit,
        WidgetKind::ShipCore,
        WidgetKind::ShipHulls,
        WidgetKind::ShipBerth,
        WidgetKind::Loadouts,
        WidgetKind::Craft,
        WidgetKind::Troops,
        WidgetKind::Missiles,
        WidgetKind::Statistics,
        WidgetKind::Reroute,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WidgetKind::Ship => "ship",
            WidgetKind::Outfit => "outfit",
            WidgetKind::ShipCore => "shipCore",
            WidgetKind::ShipHulls => "shipHulls",
            WidgetKind::ShipBerth => "shipBerth",
            WidgetKind::Loadouts => "loadouts",
            WidgetKind::Craft => "craft",
            WidgetKind::Troops => "troops",
            WidgetKind::Missiles => "missiles",
            WidgetKind::Statistics => "statistics",
            WidgetKind::Reroute => "reroute",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// A run of same-typed ports that grows and shrinks with use, e.g. the
/// craft slots of a loadout.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandableGroup {
    pub direction: Direction,
    pub type_tag: String,
    pub label_base: String,
    pub relative_y: f64,
    pub anchor: Option<PortAnchor>,
    pub min_spacing: Option<f64>,
    /// A new port is added whenever fewer than this many are free.
    pub min_available: usize,
    /// Free ports beyond this count are trimmed.
    pub max_free: usize,
    pub allow_multiple: bool,
    members: Vec<PortId>,
}

impl ExpandableGroup {
    pub fn new(direction: Direction, type_tag: impl Into<String>, label_base: impl Into<String>, relative_y: f64) -> Self {
        Self {
            direction,
            type_tag: type_tag.into(),
            label_base: label_base.into(),
            relative_y,
            anchor: None,
            min_spacing: None,
            min_available: 1,
            max_free: 2,
            allow_multiple: false,
            members: Vec::new(),
        }
    }

    pub fn anchored(mut self, anchor: PortAnchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn members(&self) -> &[PortId] {
        &self.members
    }

    /// "Craft", "Craft 2", "Craft 3", ...
    fn label(&self, index: usize) -> String {
        if index == 1 {
            self.label_base.clone()
        } else {
            format!("{} {}", self.label_base, index)
        }
    }

    fn spec(&self, index: usize) -> PortSpec {
        PortSpec {
            direction: self.direction,
            type_tag: self.type_tag.clone(),
            label: self.label(index),
            relative_y: self.relative_y,
            anchor: self.anchor.clone(),
            min_spacing: self.min_spacing,
            allow_multiple: self.allow_multiple,
            id: None,
        }
    }
}

/// Ports added and removed by a group update. The registry reindexes from this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupChange {
    pub added: Vec<PortId>,
    pub removed: Vec<PortId>,
}

impl GroupChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    fn merge(&mut self, other: GroupChange) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
    }
}

/// A positioned node of the workspace graph.
///
/// Ports and hierarchy sets are only mutated through the registry, the
/// connection graph and the hierarchy module so the port index and the
/// parent/child cache never drift from the edges.
#[derive(Debug, Clone)]
pub struct Widget {
    pub id: WidgetId,
    pub kind: WidgetKind,
    pub title: String,
    pub bounds: Rect,
    pub pinned: bool,
    /// Set once the user drags the widget; auto-arrange leaves it alone.
    pub manual_position: bool,
    pub minimized: bool,
    pub selected: bool,
    pub data: WidgetData,
    pub(crate) ports: BTreeMap<PortId, Port>,
    pub(crate) parents: BTreeSet<WidgetId>,
    pub(crate) children: BTreeSet<WidgetId>,
    /// Layout anchor id -> widget-local y in pixels.
    anchors: BTreeMap<String, f64>,
    groups: BTreeMap<String, ExpandableGroup>,
    /// "{direction}:{tag}" -> ports created so far, for stable id generation.
    counters: BTreeMap<String, u32>,
    next_order: u64,
}

impl Widget {
    pub fn new(id: WidgetId, kind: WidgetKind, title: impl Into<String>, bounds: Rect) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            bounds,
            pinned: false,
            manual_position: false,
            minimized: false,
            selected: false,
            data: WidgetData::default_for(kind),
            ports: BTreeMap::new(),
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            anchors: BTreeMap::new(),
            groups: BTreeMap::new(),
            counters: BTreeMap::new(),
            next_order: 0,
        }
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn port(&self, id: &PortId) -> Option<&Port> {
        self.ports.get(id)
    }

    pub fn port_ids(&self) -> impl Iterator<Item = &PortId> {
        self.ports.keys()
    }

    pub fn parents(&self) -> &BTreeSet<WidgetId> {
        &self.parents
    }

    pub fn children(&self) -> &BTreeSet<WidgetId> {
        &self.children
    }

    pub fn anchor(&self, id: &str) -> Option<f64> {
        self.anchors.get(id).copied()
    }

    pub fn group(&self, id: &str) -> Option<&ExpandableGroup> {
        self.groups.get(id)
    }

    /// Total incident edges over ports with this tag and direction.
    pub fn count_connections(&self, type_tag: &str, direction: Direction) -> usize {
        self.ports
            .values()
            .filter(|p| p.type_tag == type_tag && p.direction == direction)
            .map(Port::edge_count)
            .sum()
    }

    /// First port with this tag and direction, preferring one without edges.
    pub fn find_port(&self, type_tag: &str, direction: Direction) -> Option<&Port> {
        let mut matching = self
            .ports
            .values()
            .filter(|p| p.type_tag == type_tag && p.direction == direction);
        let first = matching.clone().next();
        matching.find(|p| p.is_free()).or(first)
    }

    // ========================================================================
    // Ports
    // ========================================================================

    pub(crate) fn add_port(&mut self, spec: PortSpec, default_spacing: f64) -> PortId {
        self.add_port_in_group(spec, default_spacing, None)
    }

    fn add_port_in_group(&mut self, spec: PortSpec, default_spacing: f64, group: Option<String>) -> PortId {
        let counter_key = format!("{}:{}", spec.direction.as_str(), spec.type_tag);
        let counter = self.counters.entry(counter_key).or_insert(0);
        *counter += 1;
        let id = match &spec.id {
            Some(id) => id.clone(),
            None => PortId::for_widget(&self.id, spec.direction, &spec.type_tag, *counter),
        };
        let port = Port::from_spec(id.clone(), self.id.clone(), spec, default_spacing, group, self.next_order);
        self.next_order += 1;
        self.ports.insert(id.clone(), port);
        id
    }

    /// Remove a port that has no incident edges. Ports in use are kept.
    pub(crate) fn remove_port(&mut self, id: &PortId) -> Option<Port> {
        if !self.ports.get(id).is_some_and(Port::is_free) {
            return None;
        }
        let port = self.ports.remove(id)?;
        if let Some(group) = port.group.as_ref().and_then(|g| self.groups.get_mut(g)) {
            group.members.retain(|m| m != id);
        }
        Some(port)
    }

    pub(crate) fn port_mut(&mut self, id: &PortId) -> Option<&mut Port> {
        self.ports.get_mut(id)
    }

    pub(crate) fn set_anchor(&mut self, id: impl Into<String>, y: f64) {
        self.anchors.insert(id.into(), y);
    }

    // ========================================================================
    // Expandable groups
    // ========================================================================

    pub(crate) fn create_group(&mut self, id: impl Into<String>, group: ExpandableGroup, default_spacing: f64) -> GroupChange {
        let id = id.into();
        self.groups.insert(id.clone(), group);
        let mut change = GroupChange::default();
        if let Some(port) = self.add_group_port(&id, default_spacing) {
            change.added.push(port);
        }
        change.merge(self.update_group(&id, default_spacing));
        change
    }

    fn add_group_port(&mut self, group_id: &str, default_spacing: f64) -> Option<PortId> {
        let group = self.groups.get(group_id)?;
        let spec = group.spec(group.members.len() + 1);
        let port = self.add_port_in_group(spec, default_spacing, Some(group_id.to_string()));
        if let Some(group) = self.groups.get_mut(group_id) {
            group.members.push(port.clone());
        }
        Some(port)
    }

    /// Hook run after the incident-edge count of `port` changed.
    pub(crate) fn handle_port_connection_change(&mut self, port: &PortId, default_spacing: f64) -> GroupChange {
        let Some(group_id) = self.ports.get(port).and_then(|p| p.group.clone()) else {
            return GroupChange::default();
        };
        self.update_group(&group_id, default_spacing)
    }

    /// Grow by one port when too few are free, otherwise trim surplus free ports.
    pub(crate) fn update_group(&mut self, group_id: &str, default_spacing: f64) -> GroupChange {
        let mut change = GroupChange::default();
        let ports = &self.ports;
        let Some(group) = self.groups.get_mut(group_id) else {
            return change;
        };
        group.members.retain(|id| ports.contains_key(id));
        let mut free: Vec<PortId> = group
            .members
            .iter()
            .filter(|id| ports.get(*id).is_some_and(Port::is_free))
            .cloned()
            .collect();
        let (min_available, max_free) = (group.min_available, group.max_free);

        if free.len() < min_available {
            if let Some(port) = self.add_group_port(group_id, default_spacing) {
                change.added.push(port);
            }
            return change;
        }

        while free.len() > max_free && self.group_len(group_id) > min_available {
            let Some(id) = free.pop() else { break };
            if let Some(port) = self.remove_port(&id) {
                change.removed.push(port.id);
            }
        }
        change
    }

    fn group_len(&self, group_id: &str) -> usize {
        self.groups.get(group_id).map_or(0, |g| g.members.len())
    }
}
