//! Saved workspace format.
//!
//! Connections are stored with both literal port ids and enough context
//! (widget, tag, direction) to find an equivalent port when the literal id
//! no longer exists, e.g. an expandable group that rebuilt with fewer
//! members. Records that resolve to nothing are dropped and loading goes on.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PersistError;
use crate::geometry::{reflow_ports, Point, Rect};
use crate::ids::{PortId, WidgetId};
use crate::model::{Direction, WidgetData, WidgetKind};
use crate::tech::Empire;
use crate::workspace::{Workspace, WorkspaceEvent};

pub const FILE_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    pub source_port_id: PortId,
    pub target_port_id: PortId,
    pub source_widget_id: WidgetId,
    pub target_widget_id: WidgetId,
    pub source_type_tag: String,
    pub target_type_tag: String,
    pub source_direction: Direction,
    pub target_direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetRecord {
    pub id: WidgetId,
    pub kind: WidgetKind,
    pub title: String,
    pub bounds: Rect,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub manual_position: bool,
    #[serde(default)]
    pub minimized: bool,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    #[serde(default)]
    pub file_version: u32,
    #[serde(default)]
    pub empire: Empire,
    #[serde(default)]
    pub widgets: Vec<WidgetRecord>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

impl WorkspaceSnapshot {
    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// What a restore managed to bring back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    pub widgets: usize,
    pub connections: usize,
    pub dropped_connections: usize,
}

impl Workspace {
    pub fn snapshot(&self) -> WorkspaceSnapshot {
        let widgets = self
            .registry()
            .iter()
            .map(|w| WidgetRecord {
                id: w.id.clone(),
                kind: w.kind,
                title: w.title.clone(),
                bounds: w.bounds,
                pinned: w.pinned,
                manual_position: w.manual_position,
                minimized: w.minimized,
                data: w.data.to_value(),
            })
            .collect();

        let connections = self
            .graph()
            .edges()
            .filter_map(|e| {
                let source = self.registry().port(&e.source)?;
                let target = self.registry().port(&e.sink)?;
                Some(ConnectionRecord {
                    source_port_id: source.id.clone(),
                    target_port_id: target.id.clone(),
                    source_widget_id: source.widget.clone(),
                    target_widget_id: target.widget.clone(),
                    source_type_tag: source.type_tag.clone(),
                    target_type_tag: target.type_tag.clone(),
                    source_direction: source.direction,
                    target_direction: target.direction,
                })
            })
            .collect();

        WorkspaceSnapshot {
            file_version: FILE_VERSION,
            empire: self.empire().clone(),
            widgets,
            connections,
        }
    }

    /// Replace the whole session with `snapshot`.
    pub fn restore(&mut self, snapshot: WorkspaceSnapshot) -> RestoreSummary {
        if snapshot.file_version != FILE_VERSION {
            warn!(
                "snapshot version {} differs from {}, loading anyway",
                snapshot.file_version, FILE_VERSION
            );
        }
        self.clear();
        self.replace_empire(snapshot.empire);

        let mut summary = RestoreSummary::default();
        for record in &snapshot.widgets {
            self.restore_widget(record);
            summary.widgets += 1;
        }

        for record in &snapshot.connections {
            let source = self.resolve_port(
                &record.source_port_id,
                &record.source_widget_id,
                &record.source_type_tag,
                record.source_direction,
            );
            let target = self.resolve_port(
                &record.target_port_id,
                &record.target_widget_id,
                &record.target_type_tag,
                record.target_direction,
            );
            let created = match (source, target) {
                (Some(s), Some(t)) => self.connect(&s, &t),
                _ => None,
            };
            if created.is_some() {
                summary.connections += 1;
            } else {
                warn!(
                    "dropping connection {} -> {}: no matching ports",
                    record.source_port_id, record.target_port_id
                );
                summary.dropped_connections += 1;
            }
        }

        // Saved positions win over arrangement done while re-linking.
        let mut moved = Vec::new();
        for record in &snapshot.widgets {
            let Some(widget) = self.registry_mut().get_mut(&record.id) else { continue };
            if (widget.bounds.x, widget.bounds.y) != (record.bounds.x, record.bounds.y) {
                widget.bounds.x = record.bounds.x;
                widget.bounds.y = record.bounds.y;
                moved.push(record.id.clone());
            }
        }
        self.push_event(WorkspaceEvent::GeometryInvalidated { widgets: moved });
        self.push_event(WorkspaceEvent::ViewportRefresh);

        info!(
            "restored {} widgets, {} connections ({} dropped)",
            summary.widgets, summary.connections, summary.dropped_connections
        );
        summary
    }

    pub fn load_json(&mut self, json: &str) -> Result<RestoreSummary, PersistError> {
        let snapshot = WorkspaceSnapshot::from_json(json)?;
        Ok(self.restore(snapshot))
    }

    pub fn save_json(&self) -> Result<String, PersistError> {
        self.snapshot().to_json()
    }

    fn restore_widget(&mut self, record: &WidgetRecord) {
        let origin = Point::new(record.bounds.x, record.bounds.y);
        let mut widget = self.factory().build(record.id.clone(), record.kind, origin);
        widget.title = record.title.clone();
        widget.bounds.width = record.bounds.width;
        widget.bounds.height = record.bounds.height;
        widget.pinned = record.pinned;
        widget.manual_position = record.manual_position;
        widget.minimized = record.minimized;

        match WidgetData::from_value(record.kind, record.data.clone()) {
            Ok(WidgetData::Reroute(routes)) => self.factory().restore_routes(&mut widget, routes),
            Ok(data) => widget.data = data,
            Err(err) => warn!("widget {} has unreadable data, using defaults: {err}", record.id),
        }
        reflow_ports(&mut widget, &self.config().ports);
        self.insert_widget(widget);
    }

    /// The literal port when it still exists with the right direction,
    /// otherwise a port on the same widget with the same tag and direction,
    /// free ones first.
    fn resolve_port(&self, port: &PortId, widget: &WidgetId, tag: &str, direction: Direction) -> Option<PortId> {
        if let Some(p) = self.registry().port(port)
            && p.direction == direction
        {
            return Some(p.id.clone());
        }
        let found = self.widget(widget)?.find_port(tag, direction)?.id.clone();
        info!("resolved missing port {port} to {found}");
        Some(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::data::RerouteData;

    fn port(ws: &Workspace, widget: &WidgetId, tag: &str, direction: Direction) -> PortId {
        ws.widget(widget).unwrap().find_port(tag, direction).unwrap().id.clone()
    }

    fn sample() -> Workspace {
        let mut ws = Workspace::default();
        let ship = ws.add_widget(WidgetKind::Ship, Some(Point::new(0.0, 0.0)));
        let outfit = ws.add_widget(WidgetKind::Outfit, None);
        let core = ws.add_widget(WidgetKind::ShipCore, Some(Point::new(-400.0, 300.0)));
        ws.set_title(&ship, "Frigate");
        ws.place_widget(&core, -420.0, 310.0);
        let (a, b) = (port(&ws, &ship, "Class", Direction::Source), port(&ws, &outfit, "Class", Direction::Sink));
        ws.connect(&a, &b).unwrap();
        let (c, d) = (port(&ws, &core, "Core", Direction::Source), port(&ws, &outfit, "Core", Direction::Sink));
        ws.connect(&c, &d).unwrap();
        ws
    }

    #[test]
    fn test_save_and_load_restores_graph() {
        let original = sample();
        let json = original.save_json().unwrap();
        let mut loaded = Workspace::default();
        let summary = loaded.load_json(&json).unwrap();

        assert_eq!(summary, RestoreSummary { widgets: 3, connections: 2, dropped_connections: 0 });
        let ids = |ws: &Workspace| ws.graph().edges().map(|e| e.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&loaded), ids(&original));
        for w in original.registry().iter() {
            let restored = loaded.widget(&w.id).unwrap();
            assert_eq!(restored.bounds, w.bounds);
            assert_eq!(restored.title, w.title);
            assert_eq!(restored.manual_position, w.manual_position);
            assert_eq!(restored.parents(), w.parents());
        }
    }

    #[test]
    fn test_missing_port_falls_back_to_matching_port() {
        let mut snapshot = sample().snapshot();
        snapshot.connections[0].target_port_id = PortId::from("widget-2-input:Class-9");
        let mut ws = Workspace::default();
        let summary = ws.restore(snapshot);
        assert_eq!(summary.connections, 2);
        assert_eq!(summary.dropped_connections, 0);
    }

    #[test]
    fn test_unresolvable_connection_is_dropped() {
        let mut snapshot = sample().snapshot();
        snapshot.connections[0].target_port_id = PortId::from("nowhere");
        snapshot.connections[0].target_widget_id = WidgetId::from("widget-42");
        let mut ws = Workspace::default();
        let summary = ws.restore(snapshot);
        assert_eq!(summary.connections, 1);
        assert_eq!(summary.dropped_connections, 1);
        assert_eq!(ws.registry().len(), 3);
    }

    #[test]
    fn test_group_ports_rebuild_on_load() {
        let mut ws = Workspace::default();
        let loadout = ws.add_widget(WidgetKind::Loadouts, None);
        for _ in 0..3 {
            let craft = ws.add_widget(WidgetKind::Craft, None);
            let out = port(&ws, &craft, "Craft", Direction::Source);
            let slot = port(&ws, &loadout, "Craft", Direction::Sink);
            ws.connect(&out, &slot).unwrap();
        }
        let mut loaded = Workspace::default();
        let summary = loaded.restore(ws.snapshot());
        assert_eq!(summary.connections, 3);
        let restored = loaded.widget(&loadout).unwrap();
        assert_eq!(restored.count_connections("Craft", Direction::Sink), 3);
        assert_eq!(restored.group("craft-slots").unwrap().members().len(), 4);
    }

    #[test]
    fn test_reroute_routes_survive_round_trip() {
        let mut ws = Workspace::default();
        let reroute = ws.add_widget(WidgetKind::Reroute, None);
        ws.configure_route(&reroute, "Core");
        let mut loaded = Workspace::default();
        loaded.load_json(&ws.save_json().unwrap()).unwrap();
        let w = loaded.widget(&reroute).unwrap();
        assert_eq!(w.data, WidgetData::Reroute(RerouteData { routes: vec!["Core".to_string()] }));
        assert_eq!(w.ports().count(), 2);
    }

    #[test]
    fn test_old_version_still_loads() {
        let json = r#"{"fileVersion": 1, "widgets": [
            {"id": "widget-5", "kind": "shipCore", "title": "Core", "bounds": {"x": 10, "y": 20, "width": 300, "height": 220}}
        ]}"#;
        let mut ws = Workspace::default();
        let summary = ws.load_json(json).unwrap();
        assert_eq!(summary.widgets, 1);
        assert_eq!(ws.empire().tech_points, 1000);
        assert_eq!(ws.add_widget(WidgetKind::Craft, None).as_str(), "widget-6");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let mut ws = Workspace::default();
        assert!(ws.load_json("{not json").is_err());
    }
}
