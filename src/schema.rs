//! Static capability table: one entry per widget kind.
//!
//! The factory builds ports from it, the validation engine dispatches
//! checkers through it and the spawn menu inverts it to find the kinds that
//! can accept a dangling connection.

use crate::geometry::Size;
use crate::model::{Direction, WidgetKind};
use crate::tech::TechGate;
use crate::validation::checks::{self, CheckFn};

/// A fixed port every widget of a kind is built with.
#[derive(Debug, Clone, Copy)]
pub struct PortTemplate {
    pub direction: Direction,
    pub type_tag: &'static str,
    pub label: &'static str,
    pub relative_y: f64,
    /// Layout anchor id and pixel offset.
    pub anchor: Option<(&'static str, f64)>,
    pub min_spacing: Option<f64>,
    pub allow_multiple: bool,
}

/// An expandable run of same-typed ports.
#[derive(Debug, Clone, Copy)]
pub struct GroupTemplate {
    pub id: &'static str,
    pub direction: Direction,
    pub type_tag: &'static str,
    pub label_base: &'static str,
    pub relative_y: f64,
    pub anchor: Option<(&'static str, f64)>,
    pub max_free: usize,
}

pub struct KindSchema {
    pub kind: WidgetKind,
    pub title: &'static str,
    pub size: Size,
    pub ports: &'static [PortTemplate],
    pub groups: &'static [GroupTemplate],
    /// Layout anchors registered on new widgets: id and widget-local y.
    pub anchors: &'static [(&'static str, f64)],
    /// Technology that must be researched before the kind is offered.
    pub unlock_tech: Option<&'static str>,
    pub check: CheckFn,
}

impl KindSchema {
    /// Whether the kind exposes a port (fixed or grown) with this direction and tag.
    pub fn exposes(&self, direction: Direction, type_tag: &str) -> bool {
        self.ports
            .iter()
            .any(|p| p.direction == direction && types_compatible(p.type_tag, type_tag))
            || self
                .groups
                .iter()
                .any(|g| g.direction == direction && types_compatible(g.type_tag, type_tag))
    }
}

/// Type compatibility between two port tags. Plain equality for now.
pub fn types_compatible(a: &str, b: &str) -> bool {
    a == b
}

const fn port(direction: Direction, type_tag: &'static str, label: &'static str, relative_y: f64) -> PortTemplate {
    PortTemplate {
        direction,
        type_tag,
        label,
        relative_y,
        anchor: None,
        min_spacing: None,
        allow_multiple: false,
    }
}

const fn anchored(mut p: PortTemplate, anchor: &'static str, offset: f64, min_spacing: f64) -> PortTemplate {
    p.anchor = Some((anchor, offset));
    p.min_spacing = Some(min_spacing);
    p
}

const fn multiple(mut p: PortTemplate) -> PortTemplate {
    p.allow_multiple = true;
    p
}

const fn group(
    id: &'static str,
    type_tag: &'static str,
    label_base: &'static str,
    relative_y: f64,
    anchor: Option<(&'static str, f64)>,
) -> GroupTemplate {
    GroupTemplate {
        id,
        direction: Direction::Sink,
        type_tag,
        label_base,
        relative_y,
        anchor,
        max_free: 2,
    }
}

use Direction::{Sink, Source};

const DEFAULT_SIZE: Size = Size { width: 300.0, height: 220.0 };

static SHIP: KindSchema = KindSchema {
    kind: WidgetKind::Ship,
    title: "Ship",
    size: Size { width: 340.0, height: 320.0 },
    ports: &[
        anchored(port(Sink, "ShipClass", "Class", 0.25), "information", 0.0, 36.0),
        anchored(port(Source, "Statistics", "Stats", 0.25), "information", 20.0, 32.0),
        anchored(port(Source, "ShipClass", "Subclass", 0.55), "information", 40.0, 32.0),
        anchored(port(Source, "Class", "Outfit", 0.4), "composition", -30.0, 32.0),
        anchored(port(Source, "Loadout", "Loadout", 0.65), "composition", 30.0, 32.0),
    ],
    groups: &[],
    anchors: &[("information", 90.0), ("composition", 200.0)],
    unlock_tech: None,
    check: checks::check_ship,
};

static OUTFIT: KindSchema = KindSchema {
    kind: WidgetKind::Outfit,
    title: "Outfit",
    size: Size { width: 320.0, height: 280.0 },
    ports: &[
        port(Sink, "Class", "Class", 0.25),
        multiple(port(Sink, "Core", "Core", 0.45)),
        port(Source, "OutfitHull", "Hulls", 0.3),
        port(Source, "Berth", "Berth", 0.5),
        port(Source, "Information", "Information", 0.7),
    ],
    groups: &[],
    anchors: &[],
    unlock_tech: None,
    check: checks::check_outfit,
};

static SHIP_CORE: KindSchema = KindSchema {
    kind: WidgetKind::ShipCore,
    title: "Ship Core",
    size: DEFAULT_SIZE,
    ports: &[port(Source, "Core", "Core", 0.4)],
    groups: &[],
    anchors: &[],
    unlock_tech: None,
    check: checks::check_ship_core,
};

static SHIP_HULLS: KindSchema = KindSchema {
    kind: WidgetKind::ShipHulls,
    title: "Hull Plan",
    size: DEFAULT_SIZE,
    ports: &[port(Sink, "OutfitHull", "Outfit", 0.2)],
    groups: &[
        group("loadout-links", "LoadoutHull", "Loadout", 0.45, None),
        group("staff-links", "Staff", "Staff", 0.7, None),
    ],
    anchors: &[],
    unlock_tech: None,
    check: checks::check_ship_hulls,
};

static SHIP_BERTH: KindSchema = KindSchema {
    kind: WidgetKind::ShipBerth,
    title: "Berth Plan",
    size: DEFAULT_SIZE,
    ports: &[port(Sink, "Berth", "Outfit", 0.2), port(Source, "Staff", "Staff", 0.45)],
    groups: &[group("troop-links", "Troop", "Troop", 0.5, None)],
    anchors: &[],
    unlock_tech: None,
    check: checks::check_ship_berth,
};

static LOADOUTS: KindSchema = KindSchema {
    kind: WidgetKind::Loadouts,
    title: "Loadout",
    size: Size { width: 300.0, height: 260.0 },
    ports: &[
        anchored(port(Sink, "Loadout", "Class", 0.2), "config", 0.0, 28.0),
        anchored(port(Source, "LoadoutHull", "Hull", 0.45), "config", 0.0, 28.0),
    ],
    groups: &[
        group("craft-slots", "Craft", "Craft", 0.45, Some(("config", 32.0))),
        group("weapon-slots", "Weapon", "Weapon", 0.65, Some(("config", 64.0))),
    ],
    anchors: &[("config", 70.0)],
    unlock_tech: None,
    check: checks::check_loadouts,
};

static CRAFT: KindSchema = KindSchema {
    kind: WidgetKind::Craft,
    title: "Craft",
    size: DEFAULT_SIZE,
    ports: &[port(Source, "Craft", "Craft Data", 0.3)],
    groups: &[],
    anchors: &[],
    unlock_tech: Some("SmallCraft"),
    check: checks::check_craft,
};

static TROOPS: KindSchema = KindSchema {
    kind: WidgetKind::Troops,
    title: "Troop Unit",
    size: DEFAULT_SIZE,
    ports: &[port(Source, "Troop", "Troop", 0.4)],
    groups: &[],
    anchors: &[],
    unlock_tech: None,
    check: checks::check_troops,
};

static MISSILES: KindSchema = KindSchema {
    kind: WidgetKind::Missiles,
    title: "Missile",
    size: DEFAULT_SIZE,
    ports: &[port(Source, "Weapon", "Weapon", 0.4)],
    groups: &[],
    anchors: &[],
    unlock_tech: Some("Missiles"),
    check: checks::check_missiles,
};

static STATISTICS: KindSchema = KindSchema {
    kind: WidgetKind::Statistics,
    title: "Statistics",
    size: DEFAULT_SIZE,
    ports: &[port(Sink, "Statistics", "Statistics In", 0.5), port(Source, "Statistics", "Statistics Out", 0.5)],
    groups: &[],
    anchors: &[],
    unlock_tech: None,
    check: checks::check_nothing,
};

static REROUTE: KindSchema = KindSchema {
    kind: WidgetKind::Reroute,
    title: "Reroute",
    size: Size { width: 160.0, height: 100.0 },
    ports: &[],
    groups: &[],
    anchors: &[],
    unlock_tech: None,
    check: checks::check_nothing,
};

pub fn of(kind: WidgetKind) -> &'static KindSchema {
    match kind {
        WidgetKind::Ship => &SHIP,
        WidgetKind::Outfit => &OUTFIT,
        WidgetKind::ShipCore => &SHIP_CORE,
        WidgetKind::ShipHulls => &SHIP_HULLS,
        WidgetKind::ShipBerth => &SHIP_BERTH,
        WidgetKind::Loadouts => &LOADOUTS,
        WidgetKind::Craft => &CRAFT,
        WidgetKind::Troops => &TROOPS,
        WidgetKind::Missiles => &MISSILES,
        WidgetKind::Statistics => &STATISTICS,
        WidgetKind::Reroute => &REROUTE,
    }
}

/// Kinds that could accept a connection dragged out of a port with this
/// tag and direction. Kinds gated behind unresearched tech are left out;
/// reroute is always offered last.
pub fn compatible_kinds(type_tag: &str, origin: Direction, tech: &dyn TechGate) -> Vec<WidgetKind> {
    let wanted = origin.opposite();
    let mut kinds: Vec<WidgetKind> = WidgetKind::ALL
        .into_iter()
        .filter(|k| *k != WidgetKind::Reroute)
        .filter(|k| {
            let schema = of(*k);
            schema.exposes(wanted, type_tag) && schema.unlock_tech.is_none_or(|t| tech.has_tech(t))
        })
        .collect();
    kinds.push(WidgetKind::Reroute);
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tech::Empire;

    #[test]
    fn test_schema_kinds_line_up() {
        for kind in WidgetKind::ALL {
            assert_eq!(of(kind).kind, kind);
        }
    }

    #[test]
    fn test_class_source_offers_outfit() {
        let empire = Empire::default();
        let kinds = compatible_kinds("Class", Direction::Source, &empire);
        assert_eq!(kinds, vec![WidgetKind::Outfit, WidgetKind::Reroute]);
    }

    #[test]
    fn test_group_ports_count_as_exposed() {
        let empire = Empire::default();
        let kinds = compatible_kinds("LoadoutHull", Direction::Source, &empire);
        assert_eq!(kinds, vec![WidgetKind::ShipHulls, WidgetKind::Reroute]);
    }

    #[test]
    fn test_tech_gated_kinds_fail_closed() {
        let empire = Empire::default();
        // Tech data not loaded yet: missiles are hidden.
        let kinds = compatible_kinds("Weapon", Direction::Sink, &empire);
        assert_eq!(kinds, vec![WidgetKind::Reroute]);
    }

    #[test]
    fn test_reroute_always_offered() {
        let empire = Empire::default();
        assert_eq!(compatible_kinds("Unknown", Direction::Sink, &empire), vec![WidgetKind::Reroute]);
    }
}
