//! Builds widgets from the kind schema.

use log::{debug, warn};

use crate::config::PortLayoutConfig;
use crate::geometry::{reflow_ports, Point, Rect};
use crate::ids::{PortId, WidgetId};
use crate::model::data::RerouteData;
use crate::model::{Direction, ExpandableGroup, PortAnchor, PortSpec, Widget, WidgetData, WidgetKind};
use crate::registry::Registry;
use crate::schema::{self, GroupTemplate, PortTemplate};

/// Coordinates beyond this are treated as a stale transform and clamped.
const EXTREME_COORD: f64 = 20_000.0;

#[derive(Debug, Clone, Default)]
pub struct WidgetFactory {
    layout: PortLayoutConfig,
    canvas: Option<Rect>,
}

impl WidgetFactory {
    pub fn new(layout: PortLayoutConfig) -> Self {
        Self { layout, canvas: None }
    }

    pub fn with_canvas(mut self, canvas: Option<Rect>) -> Self {
        self.canvas = canvas;
        self
    }

    /// Create a widget of `kind`, register it and return its id.
    ///
    /// Without a position the widget is cascaded from (150, 100) by 30 per
    /// existing widget of the same kind.
    pub fn create(&self, kind: WidgetKind, position: Option<Point>, registry: &mut Registry) -> WidgetId {
        let position = position.unwrap_or_else(|| Self::default_position(kind, registry));
        let id = registry.allocate_id();
        let widget = self.build(id.clone(), kind, position);
        debug!("created {} {}", kind.as_str(), id);
        registry.add(widget);
        id
    }

    pub fn default_position(kind: WidgetKind, registry: &Registry) -> Point {
        let offset = registry.count_of_kind(kind) as f64 * 30.0;
        Point::new(150.0 + offset, 100.0 + offset)
    }

    /// Build an unregistered widget with its fixed ports, groups and anchors.
    pub fn build(&self, id: WidgetId, kind: WidgetKind, position: Point) -> Widget {
        let schema = schema::of(kind);
        let mut bounds = Rect::new(position.x, position.y, schema.size.width, schema.size.height);
        if bounds.x.abs() > EXTREME_COORD || bounds.y.abs() > EXTREME_COORD {
            warn!("clamping extreme widget position ({}, {})", bounds.x, bounds.y);
            match &self.canvas {
                Some(canvas) => bounds.clamp_into(canvas),
                None => {
                    bounds.x = bounds.x.clamp(-EXTREME_COORD, EXTREME_COORD);
                    bounds.y = bounds.y.clamp(-EXTREME_COORD, EXTREME_COORD);
                }
            }
        }

        let mut widget = Widget::new(id, kind, schema.title, bounds);
        for (anchor, y) in schema.anchors {
            widget.set_anchor(*anchor, *y);
        }
        let spacing = self.layout.default_min_spacing;
        for template in schema.ports {
            widget.add_port(port_spec(template), spacing);
        }
        for template in schema.groups {
            widget.create_group(template.id, expandable_group(template), spacing);
        }
        reflow_ports(&mut widget, &self.layout);
        widget
    }

    /// Give a reroute widget a pass-through pair for `type_tag`.
    ///
    /// Returns the (input, output) ports; an existing route is reused.
    /// The caller reindexes the registry.
    pub fn configure_route(&self, widget: &mut Widget, type_tag: &str) -> Option<(PortId, PortId)> {
        let WidgetData::Reroute(data) = &widget.data else { return None };
        if data.routes.iter().any(|r| r == type_tag) {
            return route_ports(widget, type_tag);
        }

        let label = route_label(type_tag);
        let spacing = self.layout.default_min_spacing;
        let input = widget.add_port(PortSpec::new(Direction::Sink, type_tag, format!("{label} In"), 0.5), spacing);
        let output = widget.add_port(
            PortSpec::new(Direction::Source, type_tag, format!("{label} Out"), 0.5).multiple(),
            spacing,
        );
        if let WidgetData::Reroute(data) = &mut widget.data {
            data.routes.push(type_tag.to_string());
        }
        spread_routes(widget);
        reflow_ports(widget, &self.layout);
        Some((input, output))
    }

    /// Make sure every route listed in `data` exists. Routes already present
    /// keep their ports and edges.
    pub fn restore_routes(&self, widget: &mut Widget, data: RerouteData) {
        for tag in &data.routes {
            self.configure_route(widget, tag);
        }
    }
}

fn port_spec(template: &PortTemplate) -> PortSpec {
    let mut spec = PortSpec::new(template.direction, template.type_tag, template.label, template.relative_y);
    spec.anchor = template.anchor.map(|(id, offset)| PortAnchor::new(id, offset));
    spec.min_spacing = template.min_spacing;
    spec.allow_multiple = template.allow_multiple;
    spec
}

fn expandable_group(template: &GroupTemplate) -> ExpandableGroup {
    let mut group = ExpandableGroup::new(template.direction, template.type_tag, template.label_base, template.relative_y);
    group.max_free = template.max_free;
    match template.anchor {
        Some((id, offset)) => group.anchored(PortAnchor::new(id, offset)),
        None => group,
    }
}

/// "outfit-hull" -> "Outfit Hull".
fn route_label(type_tag: &str) -> String {
    let tag = if type_tag.is_empty() { "Route" } else { type_tag };
    tag.replace('-', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn route_ports(widget: &Widget, type_tag: &str) -> Option<(PortId, PortId)> {
    let find = |direction| {
        widget
            .ports()
            .find(|p| p.type_tag == type_tag && p.direction == direction)
            .map(|p| p.id.clone())
    };
    Some((find(Direction::Sink)?, find(Direction::Source)?))
}

/// Space route pairs evenly: one route sits at 0.5, n routes at i/(n+1).
fn spread_routes(widget: &mut Widget) {
    let WidgetData::Reroute(data) = &widget.data else { return };
    let routes = data.routes.clone();
    let total = routes.len();
    for (i, tag) in routes.iter().enumerate() {
        let y = if total == 1 { 0.5 } else { (i + 1) as f64 / (total + 1) as f64 };
        let ids: Vec<PortId> = widget
            .ports()
            .filter(|p| &p.type_tag == tag)
            .map(|p| p.id.clone())
            .collect();
        for id in ids {
            if let Some(port) = widget.port_mut(&id) {
                port.relative_y = y;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> WidgetFactory {
        WidgetFactory::new(PortLayoutConfig::default())
    }

    #[test]
    fn test_create_materializes_schema() {
        let mut reg = Registry::new();
        let id = factory().create(WidgetKind::Loadouts, None, &mut reg);
        let w = reg.get(&id).unwrap();
        assert_eq!(w.title, "Loadout");
        assert_eq!((w.bounds.x, w.bounds.y), (150.0, 100.0));
        assert_eq!(w.group("craft-slots").unwrap().members().len(), 1);
        assert_eq!(w.group("weapon-slots").unwrap().members().len(), 1);
        assert_eq!(w.ports().count(), 4);
        for port in w.port_ids() {
            assert_eq!(reg.owner_of(port), Some(&id));
        }
    }

    #[test]
    fn test_default_positions_cascade_per_kind() {
        let mut reg = Registry::new();
        let f = factory();
        f.create(WidgetKind::Craft, None, &mut reg);
        let second = f.create(WidgetKind::Craft, None, &mut reg);
        let other = f.create(WidgetKind::Troops, None, &mut reg);
        assert_eq!(reg.get(&second).unwrap().bounds.x, 180.0);
        assert_eq!(reg.get(&other).unwrap().bounds.y, 100.0);
    }

    #[test]
    fn test_extreme_position_is_clamped_into_canvas() {
        let f = factory().with_canvas(Some(Rect::new(0.0, 0.0, 4000.0, 3000.0)));
        let w = f.build(WidgetId::from("widget-1"), WidgetKind::ShipCore, Point::new(50_000.0, 10.0));
        assert_eq!(w.bounds.x, 3700.0);
        assert_eq!(w.bounds.y, 10.0);
    }

    #[test]
    fn test_ship_ports_follow_anchors() {
        let w = factory().build(WidgetId::from("widget-1"), WidgetKind::Ship, Point::default());
        assert_eq!(w.anchor("composition"), Some(200.0));
        let class_in = w.find_port("ShipClass", Direction::Sink).unwrap();
        assert!(class_in.anchor.is_some());
    }

    #[test]
    fn test_configure_route_adds_pair_once() {
        let f = factory();
        let mut w = f.build(WidgetId::from("widget-4"), WidgetKind::Reroute, Point::default());
        let (input, output) = f.configure_route(&mut w, "outfit-hull").unwrap();
        assert_eq!(w.port(&input).unwrap().label, "Outfit Hull In");
        assert!(w.port(&output).unwrap().allow_multiple);
        assert_eq!(f.configure_route(&mut w, "outfit-hull"), Some((input, output)));
        assert_eq!(w.ports().count(), 2);

        f.configure_route(&mut w, "Core");
        let WidgetData::Reroute(data) = &w.data else { panic!("reroute payload") };
        assert_eq!(data.routes, vec!["outfit-hull".to_string(), "Core".to_string()]);
    }

    #[test]
    fn test_route_on_non_reroute_is_refused() {
        let f = factory();
        let mut w = f.build(WidgetId::from("widget-1"), WidgetKind::Craft, Point::default());
        assert!(f.configure_route(&mut w, "Craft").is_none());
    }
}
