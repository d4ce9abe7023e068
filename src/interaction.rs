//! Connection gesture state machine.
//!
//! Turns pointer input (already hit-tested by [`Workspace::hit_test`]) into
//! graph operations. The controller keeps only gesture bookkeeping; every
//! mutation goes through the workspace.

use log::debug;
use serde::Serialize;

use crate::geometry::{edge_curve, CubicBezier, Point};
use crate::ids::{EdgeId, PortId, WidgetId};
use crate::model::{Direction, WidgetKind};
use crate::schema::{self, types_compatible};
use crate::workspace::{Hit, Workspace};

#[derive(Debug, Clone, PartialEq)]
pub enum DragKind {
    New,
    /// Moving one end of an existing edge. `detached` is the endpoint that
    /// was picked up; the drag origin is the edge's other end.
    Reconnect { edge: EdgeId, detached: PortId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub origin: PortId,
    pub origin_widget: WidgetId,
    pub origin_direction: Direction,
    pub origin_tag: String,
    pub kind: DragKind,
    pub pointer: Point,
    pub snap_target: Option<PortId>,
    pub preview: CubicBezier,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Widget kinds offered after a new connection was dropped on empty canvas.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnMenu {
    pub origin: PortId,
    pub type_tag: String,
    pub direction: Direction,
    pub drop_point: Point,
    pub kinds: Vec<WidgetKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "camelCase")]
pub enum GestureOutcome {
    Connected(EdgeId),
    Reconnected(EdgeId),
    Rejected,
    Disconnected(EdgeId),
    SpawnMenu(SpawnMenu),
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionGesture {
    state: GestureState,
}

impl ConnectionGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, GestureState::Dragging(_))
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            GestureState::Dragging(s) => Some(s),
            GestureState::Idle => None,
        }
    }

    /// Start dragging from `port`. A single-connection sink that already
    /// has its edge picks that edge up instead of starting a new one.
    pub fn pointer_down(&mut self, ws: &mut Workspace, port: &PortId, pointer: Point) -> bool {
        if self.is_dragging() {
            self.cancel(ws);
        }
        let Some(picked) = ws.registry().port(port) else {
            debug!("pointer down on unknown port {port}");
            return false;
        };

        let existing = (picked.is_single_sink() && picked.edge_count() == 1)
            .then(|| picked.edges().iter().next().cloned())
            .flatten();
        let (origin, kind) = match existing {
            Some(edge) => match ws.reconnect_begin(&edge, port) {
                Some(anchor) => (anchor, DragKind::Reconnect { edge, detached: port.clone() }),
                None => return false,
            },
            None => (port.clone(), DragKind::New),
        };

        let Some(origin_port) = ws.registry().port(&origin) else { return false };
        let (origin_widget, origin_direction, origin_tag) =
            (origin_port.widget.clone(), origin_port.direction, origin_port.type_tag.clone());
        let Some(from) = ws.port_position(&origin) else { return false };

        debug!("drag {:?} from {origin}", kind);
        self.state = GestureState::Dragging(DragSession {
            preview: edge_curve(from, origin_direction, pointer, &ws.config().curve),
            origin,
            origin_widget,
            origin_direction,
            origin_tag,
            kind,
            pointer,
            snap_target: None,
        });
        true
    }

    /// Update the live preview. The curve ends on a compatible port under
    /// the pointer when there is one, otherwise on the pointer itself.
    pub fn pointer_move(&mut self, ws: &Workspace, pointer: Point, hits: &[Hit]) -> Option<CubicBezier> {
        let GestureState::Dragging(session) = &mut self.state else { return None };
        session.pointer = pointer;
        session.snap_target = port_under(hits).filter(|p| accepts(ws, session, p)).cloned();

        let from = ws.port_position(&session.origin)?;
        let to = session
            .snap_target
            .as_ref()
            .and_then(|p| ws.port_position(p))
            .unwrap_or(pointer);
        session.preview = edge_curve(from, session.origin_direction, to, &ws.config().curve);
        Some(session.preview)
    }

    /// Finish the gesture. The controller is idle afterwards whatever the
    /// outcome.
    pub fn pointer_up(&mut self, ws: &mut Workspace, pointer: Point, hits: &[Hit]) -> GestureOutcome {
        let GestureState::Dragging(session) = std::mem::take(&mut self.state) else {
            return GestureOutcome::Cancelled;
        };

        if let Some(target) = port_under(hits) {
            return match &session.kind {
                DragKind::New => {
                    let same_side = ws.registry().port(target).map(|p| p.direction) == Some(session.origin_direction);
                    if same_side {
                        return GestureOutcome::Rejected;
                    }
                    ws.connect(&session.origin, target)
                        .map_or(GestureOutcome::Rejected, GestureOutcome::Connected)
                }
                DragKind::Reconnect { edge, detached } => match ws.reconnect_commit(edge, &session.origin, target) {
                    Some(created) => GestureOutcome::Reconnected(created),
                    None => {
                        ws.reconnect_abort(edge, detached);
                        GestureOutcome::Rejected
                    }
                },
            };
        }

        // A picked-up edge dropped on empty canvas is removed; dropped on a
        // widget body it goes back where it was.
        if let DragKind::Reconnect { edge, detached } = &session.kind {
            ws.reconnect_abort(edge, detached);
            if widget_under(hits).is_some() {
                return GestureOutcome::Cancelled;
            }
            ws.disconnect(edge);
            return GestureOutcome::Disconnected(edge.clone());
        }

        match widget_under(hits) {
            Some(widget) if widget != &session.origin_widget => drop_on_widget(ws, &session, widget),
            Some(_) => GestureOutcome::Cancelled,
            None => GestureOutcome::SpawnMenu(SpawnMenu {
                kinds: schema::compatible_kinds(&session.origin_tag, session.origin_direction, ws.empire()),
                origin: session.origin,
                type_tag: session.origin_tag,
                direction: session.origin_direction,
                drop_point: pointer,
            }),
        }
    }

    /// Abandon the gesture and put a picked-up edge back where it was.
    pub fn cancel(&mut self, ws: &mut Workspace) {
        if let GestureState::Dragging(session) = std::mem::take(&mut self.state)
            && let DragKind::Reconnect { edge, detached } = &session.kind
        {
            ws.reconnect_abort(edge, detached);
        }
    }

    /// Instantiate `kind` from a spawn menu and connect it to the menu's
    /// origin. The new widget is shifted so the connected port sits exactly
    /// at `click_point`, and is marked as placed by hand.
    pub fn complete_spawn(ws: &mut Workspace, menu: &SpawnMenu, kind: WidgetKind, click_point: Point) -> Option<EdgeId> {
        if !menu.kinds.contains(&kind) {
            debug!("{} is not offered for {}", kind.as_str(), menu.type_tag);
            return None;
        }
        let widget = ws.add_widget(kind, Some(click_point));
        let wanted = menu.direction.opposite();
        let port = if kind == WidgetKind::Reroute {
            let (input, output) = ws.configure_route(&widget, &menu.type_tag)?;
            if wanted == Direction::Sink { input } else { output }
        } else {
            ws.widget(&widget)?.find_port(&menu.type_tag, wanted)?.id.clone()
        };

        let at = ws.port_position(&port)?;
        let bounds = ws.widget(&widget)?.bounds;
        ws.place_widget(
            &widget,
            bounds.x + (click_point.x - at.x),
            bounds.y + (click_point.y - at.y),
        );
        ws.connect(&menu.origin, &port)
    }
}

/// The first port under the pointer, looking through edge lines only.
fn port_under(hits: &[Hit]) -> Option<&PortId> {
    match hits.iter().find(|h| !matches!(h, Hit::Edge(_)))? {
        Hit::Port(p) => Some(p),
        _ => None,
    }
}

fn widget_under(hits: &[Hit]) -> Option<&WidgetId> {
    hits.iter().find_map(|h| match h {
        Hit::Widget(w) => Some(w),
        _ => None,
    })
}

/// Snap target rule: another widget, the other direction, a compatible tag.
fn accepts(ws: &Workspace, session: &DragSession, target: &PortId) -> bool {
    ws.registry().port(target).is_some_and(|p| {
        p.widget != session.origin_widget
            && p.direction == session.origin_direction.opposite()
            && types_compatible(&session.origin_tag, &p.type_tag)
    })
}

/// A new connection dropped on a widget body. Reroutes grow a matching
/// route and take the edge; anything else ignores the drop.
fn drop_on_widget(ws: &mut Workspace, session: &DragSession, widget: &WidgetId) -> GestureOutcome {
    if ws.widget(widget).map(|w| w.kind) != Some(WidgetKind::Reroute) {
        return GestureOutcome::Cancelled;
    }
    let Some((input, output)) = ws.configure_route(widget, &session.origin_tag) else {
        return GestureOutcome::Rejected;
    };
    let target = match session.origin_direction {
        Direction::Source => input,
        Direction::Sink => output,
    };
    ws.connect(&session.origin, &target)
        .map_or(GestureOutcome::Rejected, GestureOutcome::Connected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(ws: &Workspace, widget: &WidgetId, tag: &str, direction: Direction) -> PortId {
        ws.widget(widget).unwrap().find_port(tag, direction).unwrap().id.clone()
    }

    fn setup() -> (Workspace, WidgetId, WidgetId) {
        let mut ws = Workspace::default();
        let ship = ws.add_widget(WidgetKind::Ship, Some(Point::new(0.0, 0.0)));
        let outfit = ws.add_widget(WidgetKind::Outfit, Some(Point::new(800.0, 0.0)));
        (ws, ship, outfit)
    }

    #[test]
    fn test_drag_onto_compatible_port_connects() {
        let (mut ws, ship, outfit) = setup();
        let from = port(&ws, &ship, "Class", Direction::Source);
        let to = port(&ws, &outfit, "Class", Direction::Sink);
        let target_at = ws.port_position(&to).unwrap();
        let mut g = ConnectionGesture::new();

        assert!(g.pointer_down(&mut ws, &from, Point::new(10.0, 10.0)));
        let hits = vec![Hit::Port(to.clone()), Hit::Widget(outfit.clone())];
        let preview = g.pointer_move(&ws, Point::new(target_at.x + 4.0, target_at.y), &hits).unwrap();
        assert_eq!(preview.end, target_at);
        assert_eq!(g.session().unwrap().snap_target, Some(to.clone()));

        let outcome = g.pointer_up(&mut ws, target_at, &hits);
        assert_eq!(outcome, GestureOutcome::Connected(EdgeId::between(&from, &to)));
        assert_eq!(g.state(), &GestureState::Idle);
    }

    #[test]
    fn test_edge_lines_are_looked_through() {
        let (mut ws, ship, outfit) = setup();
        let from = port(&ws, &ship, "Class", Direction::Source);
        let to = port(&ws, &outfit, "Class", Direction::Sink);
        let mut g = ConnectionGesture::new();
        g.pointer_down(&mut ws, &from, Point::default());
        let hits = vec![Hit::Edge(EdgeId::from("connection-x-y")), Hit::Port(to.clone())];
        g.pointer_move(&ws, Point::default(), &hits);
        assert_eq!(g.session().unwrap().snap_target, Some(to));
    }

    #[test]
    fn test_incompatible_target_is_not_snapped() {
        let (mut ws, ship, outfit) = setup();
        let from = port(&ws, &ship, "Class", Direction::Source);
        let core_in = port(&ws, &outfit, "Core", Direction::Sink);
        let mut g = ConnectionGesture::new();
        g.pointer_down(&mut ws, &from, Point::default());
        let pointer = Point::new(500.0, 500.0);
        let preview = g.pointer_move(&ws, pointer, &[Hit::Port(core_in.clone())]).unwrap();
        assert_eq!(preview.end, pointer);
        assert!(g.session().unwrap().snap_target.is_none());
        assert_eq!(g.pointer_up(&mut ws, pointer, &[Hit::Port(core_in)]), GestureOutcome::Rejected);
        assert!(ws.graph().is_empty());
    }

    #[test]
    fn test_same_direction_drop_is_rejected() {
        let (mut ws, ship, outfit) = setup();
        let from = port(&ws, &outfit, "Class", Direction::Sink);
        let other = port(&ws, &ship, "ShipClass", Direction::Sink);
        let mut g = ConnectionGesture::new();
        g.pointer_down(&mut ws, &from, Point::default());
        assert_eq!(g.pointer_up(&mut ws, Point::default(), &[Hit::Port(other)]), GestureOutcome::Rejected);
    }

    #[test]
    fn test_drop_on_empty_canvas_offers_spawn_menu() {
        let (mut ws, ship, _) = setup();
        let from = port(&ws, &ship, "Class", Direction::Source);
        let mut g = ConnectionGesture::new();
        g.pointer_down(&mut ws, &from, Point::default());
        let drop = Point::new(1500.0, 900.0);
        let GestureOutcome::SpawnMenu(menu) = g.pointer_up(&mut ws, drop, &[]) else {
            panic!("expected a spawn menu");
        };
        assert_eq!(menu.kinds, vec![WidgetKind::Outfit, WidgetKind::Reroute]);
        assert_eq!(menu.drop_point, drop);
        assert!(!g.is_dragging());

        let click = Point::new(1520.0, 940.0);
        let edge = ConnectionGesture::complete_spawn(&mut ws, &menu, WidgetKind::Outfit, click).unwrap();
        let spawned = ws.graph().edge(&edge).unwrap().sink.clone();
        assert!(ws.port_position(&spawned).unwrap().distance(click) < 1e-9);
        let owner = ws.registry().owner_of(&spawned).unwrap();
        assert!(ws.widget(owner).unwrap().manual_position);
    }

    #[test]
    fn test_spawn_of_unoffered_kind_is_refused() {
        let (mut ws, ship, _) = setup();
        let menu = SpawnMenu {
            origin: port(&ws, &ship, "Class", Direction::Source),
            type_tag: "Class".to_string(),
            direction: Direction::Source,
            drop_point: Point::default(),
            kinds: vec![WidgetKind::Outfit, WidgetKind::Reroute],
        };
        let before = ws.registry().len();
        assert!(ConnectionGesture::complete_spawn(&mut ws, &menu, WidgetKind::Craft, Point::default()).is_none());
        assert_eq!(ws.registry().len(), before);
    }

    #[test]
    fn test_spawned_reroute_grows_a_route() {
        let (mut ws, ship, _) = setup();
        let from = port(&ws, &ship, "Class", Direction::Source);
        let mut g = ConnectionGesture::new();
        g.pointer_down(&mut ws, &from, Point::default());
        let GestureOutcome::SpawnMenu(menu) = g.pointer_up(&mut ws, Point::new(900.0, 900.0), &[]) else {
            panic!("expected a spawn menu");
        };
        let edge = ConnectionGesture::complete_spawn(&mut ws, &menu, WidgetKind::Reroute, Point::new(900.0, 900.0)).unwrap();
        let sink = &ws.graph().edge(&edge).unwrap().sink;
        assert_eq!(ws.registry().port(sink).unwrap().label, "Class In");
    }

    #[test]
    fn test_drop_on_reroute_body_routes_through() {
        let (mut ws, ship, _) = setup();
        let reroute = ws.add_widget(WidgetKind::Reroute, Some(Point::new(600.0, 600.0)));
        let from = port(&ws, &ship, "Loadout", Direction::Source);
        let mut g = ConnectionGesture::new();
        g.pointer_down(&mut ws, &from, Point::default());
        let outcome = g.pointer_up(&mut ws, Point::new(650.0, 650.0), &[Hit::Widget(reroute.clone())]);
        assert!(matches!(outcome, GestureOutcome::Connected(_)));
        assert_eq!(ws.widget(&reroute).unwrap().count_connections("Loadout", Direction::Sink), 1);
    }

    #[test]
    fn test_drop_on_plain_widget_body_does_nothing() {
        let (mut ws, ship, outfit) = setup();
        let from = port(&ws, &ship, "Class", Direction::Source);
        let mut g = ConnectionGesture::new();
        g.pointer_down(&mut ws, &from, Point::default());
        assert_eq!(g.pointer_up(&mut ws, Point::default(), &[Hit::Widget(outfit)]), GestureOutcome::Cancelled);
        assert!(ws.graph().is_empty());
    }

    fn connected() -> (Workspace, PortId, PortId, EdgeId) {
        let (mut ws, ship, outfit) = setup();
        let from = port(&ws, &ship, "Class", Direction::Source);
        let to = port(&ws, &outfit, "Class", Direction::Sink);
        let edge = ws.connect(&from, &to).unwrap();
        (ws, from, to, edge)
    }

    #[test]
    fn test_picking_up_a_single_sink_starts_reconnect() {
        let (mut ws, from, to, edge) = connected();
        let mut g = ConnectionGesture::new();
        assert!(g.pointer_down(&mut ws, &to, Point::default()));
        let session = g.session().unwrap();
        assert_eq!(session.origin, from);
        assert_eq!(session.kind, DragKind::Reconnect { edge, detached: to.clone() });
        assert!(ws.registry().port(&to).unwrap().is_free());
    }

    #[test]
    fn test_reconnect_to_new_target_keeps_edge_count() {
        let (mut ws, from, _, edge) = connected();
        let second = ws.add_widget(WidgetKind::Outfit, Some(Point::new(800.0, 600.0)));
        let target = port(&ws, &second, "Class", Direction::Sink);
        let old_sink = ws.graph().edge(&edge).unwrap().sink.clone();

        let mut g = ConnectionGesture::new();
        g.pointer_down(&mut ws, &old_sink, Point::default());
        let outcome = g.pointer_up(&mut ws, Point::default(), &[Hit::Port(target.clone())]);
        assert_eq!(outcome, GestureOutcome::Reconnected(EdgeId::between(&from, &target)));
        assert_eq!(ws.graph().len(), 1);
        assert!(ws.registry().port(&old_sink).unwrap().is_free());
    }

    #[test]
    fn test_reconnect_dropped_on_nothing_disconnects() {
        let (mut ws, from, to, edge) = connected();
        let mut g = ConnectionGesture::new();
        g.pointer_down(&mut ws, &to, Point::default());
        assert_eq!(g.pointer_up(&mut ws, Point::new(2000.0, 2000.0), &[]), GestureOutcome::Disconnected(edge));
        assert!(ws.graph().is_empty());
        assert!(ws.registry().port(&from).unwrap().is_free());
        assert!(ws.registry().port(&to).unwrap().is_free());
        assert!(!ws.graph().is_reconnecting());
    }

    #[test]
    fn test_reconnect_dropped_on_widget_body_keeps_edge() {
        let (mut ws, from, to, edge) = connected();
        let core = ws.add_widget(WidgetKind::ShipCore, Some(Point::new(0.0, 900.0)));
        let mut g = ConnectionGesture::new();
        g.pointer_down(&mut ws, &to, Point::default());
        let hits = [Hit::Edge(edge.clone()), Hit::Widget(core)];
        assert_eq!(g.pointer_up(&mut ws, Point::new(10.0, 910.0), &hits), GestureOutcome::Cancelled);
        assert_eq!(ws.graph().len(), 1);
        assert!(ws.registry().port(&from).unwrap().edges().contains(&edge));
        assert!(ws.registry().port(&to).unwrap().edges().contains(&edge));
        assert!(!ws.graph().is_reconnecting());
    }

    #[test]
    fn test_reconnect_rejected_drop_restores_edge() {
        let (mut ws, _, to, edge) = connected();
        let core = ws.add_widget(WidgetKind::ShipCore, None);
        let wrong = port(&ws, &core, "Core", Direction::Source);
        let mut g = ConnectionGesture::new();
        g.pointer_down(&mut ws, &to, Point::default());
        assert_eq!(g.pointer_up(&mut ws, Point::default(), &[Hit::Port(wrong)]), GestureOutcome::Rejected);
        assert!(ws.registry().port(&to).unwrap().edges().contains(&edge));
    }

    #[test]
    fn test_cancel_restores_pre_drag_state() {
        let (mut ws, _, to, edge) = connected();
        let mut g = ConnectionGesture::new();
        g.pointer_down(&mut ws, &to, Point::default());
        g.cancel(&mut ws);
        assert_eq!(g.state(), &GestureState::Idle);
        assert_eq!(ws.graph().len(), 1);
        assert!(ws.registry().port(&to).unwrap().edges().contains(&edge));
        assert!(!ws.graph().is_reconnecting());
    }

    #[test]
    fn test_pointer_up_when_idle_is_a_no_op() {
        let (mut ws, _, _, _) = connected();
        let mut g = ConnectionGesture::new();
        assert_eq!(g.pointer_up(&mut ws, Point::default(), &[]), GestureOutcome::Cancelled);
        assert!(g.pointer_move(&ws, Point::default(), &[]).is_none());
    }
}
