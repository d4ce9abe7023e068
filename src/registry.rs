//! Live widgets keyed by id, plus a port -> owner index.

use std::collections::{BTreeMap, HashMap};

use crate::ids::{PortId, WidgetId};
use crate::model::{Port, Widget, WidgetKind};

#[derive(Debug, Clone, Default)]
pub struct Registry {
    widgets: BTreeMap<WidgetId, Widget>,
    port_owner: HashMap<PortId, WidgetId>,
    next_number: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next free `widget-{n}` id. Numbers are never reused within a session.
    pub fn allocate_id(&mut self) -> WidgetId {
        loop {
            self.next_number += 1;
            let id = WidgetId::numbered(self.next_number);
            if !self.widgets.contains_key(&id) {
                return id;
            }
        }
    }

    /// Insert a widget, replacing any widget with the same id.
    pub fn add(&mut self, widget: Widget) {
        let id = widget.id.clone();
        if let Some(n) = id.as_str().strip_prefix("widget-").and_then(|n| n.parse::<u64>().ok()) {
            self.next_number = self.next_number.max(n);
        }
        if self.widgets.contains_key(&id) {
            self.remove(&id);
        }
        for port in widget.port_ids() {
            self.port_owner.insert(port.clone(), id.clone());
        }
        self.widgets.insert(id, widget);
    }

    pub fn remove(&mut self, id: &WidgetId) -> Option<Widget> {
        let widget = self.widgets.remove(id)?;
        for port in widget.port_ids() {
            self.port_owner.remove(port);
        }
        Some(widget)
    }

    pub fn get(&self, id: &WidgetId) -> Option<&Widget> {
        self.widgets.get(id)
    }

    /// Mutable access. Callers that add or remove ports must `reindex` afterwards.
    pub fn get_mut(&mut self, id: &WidgetId) -> Option<&mut Widget> {
        self.widgets.get_mut(id)
    }

    pub fn contains(&self, id: &WidgetId) -> bool {
        self.widgets.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &WidgetId> {
        self.widgets.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Widget> {
        self.widgets.values()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn count_of_kind(&self, kind: WidgetKind) -> usize {
        self.widgets.values().filter(|w| w.kind == kind).count()
    }

    pub fn owner_of(&self, port: &PortId) -> Option<&WidgetId> {
        self.port_owner.get(port)
    }

    pub fn port(&self, id: &PortId) -> Option<&Port> {
        let owner = self.port_owner.get(id)?;
        self.widgets.get(owner)?.port(id)
    }

    pub(crate) fn port_mut(&mut self, id: &PortId) -> Option<&mut Port> {
        let owner = self.port_owner.get(id)?;
        self.widgets.get_mut(owner)?.port_mut(id)
    }

    /// Bring the port index in line with the widget's current port map.
    pub fn reindex(&mut self, id: &WidgetId) {
        self.port_owner.retain(|_, owner| owner != id);
        if let Some(widget) = self.widgets.get(id) {
            for port in widget.port_ids() {
                self.port_owner.insert(port.clone(), id.clone());
            }
        }
    }

    pub fn clear(&mut self) {
        self.widgets.clear();
        self.port_owner.clear();
        self.next_number = 0;
    }
}
