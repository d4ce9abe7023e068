//! Per-kind preflight rules.
//!
//! Checkers only read. Each one inspects a widget's payload and the edge
//! counts on its ports and appends issues with the widget's id as source.

use crate::ids::WidgetId;
use crate::model::data::{Component, ShipData};
use crate::model::{Direction, Widget, WidgetData, WidgetKind};
use crate::registry::Registry;
use crate::tech::TechGate;

use super::IssueList;

/// Read-only view handed to every checker.
pub struct CheckContext<'a> {
    pub registry: &'a Registry,
    pub tech: &'a dyn TechGate,
}

impl CheckContext<'_> {
    fn parent_of_kind(&self, widget: &Widget, kind: WidgetKind) -> Option<&Widget> {
        widget
            .parents()
            .iter()
            .filter_map(|id| self.registry.get(id))
            .find(|p| p.kind == kind)
    }
}

pub type CheckFn = fn(&CheckContext<'_>, &Widget, &mut IssueList);

const MAX_CRAFT_MASS: f64 = 200.0;
const MAX_SHIP_MASS: f64 = 1000.0;

fn source(widget: &Widget) -> &WidgetId {
    &widget.id
}

fn links(widget: &Widget, tag: &str, direction: Direction) -> usize {
    widget.count_connections(tag, direction)
}

/// "reinforcedSpine" -> "Reinforced Spine".
fn foundation_label(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            spaced.push(' ');
        }
        spaced.push(c);
    }
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

/// Emit one tech issue per unresearched requirement of each component.
fn component_techs<'c>(
    ctx: &CheckContext<'_>,
    widget: &Widget,
    components: impl IntoIterator<Item = &'c Component>,
    describe: impl Fn(&Component, &str) -> String,
    out: &mut IssueList,
) {
    for component in components {
        for tech in &component.required_tech {
            if !ctx.tech.has_tech(tech) {
                out.tech(describe(component, tech), tech, source(widget));
            }
        }
    }
}

pub fn check_ship(ctx: &CheckContext<'_>, widget: &Widget, out: &mut IssueList) {
    let Some(ship) = widget.data.as_ship() else { return };
    if ship.is_component_based() {
        check_component_ship(ctx, widget, ship, out);
        return;
    }
    let title = &widget.title;

    if links(widget, "Class", Direction::Source) == 0 {
        out.warning(format!("Ship \"{title}\" requires an Outfit connection"), source(widget));
    }
    if ship.hulls("magazine") + ship.hulls("hangar") > 0 && links(widget, "Loadout", Direction::Source) == 0 {
        out.warning(
            format!("Ship \"{title}\" has magazine or hangar hulls without a Loadout connection"),
            source(widget),
        );
    }

    if let Some(parent) = ctx.parent_of_kind(widget, WidgetKind::Ship) {
        let parent_ship = parent.data.as_ship().cloned().unwrap_or_default();
        check_inheritance(widget, ship, &parent.title, &parent_ship, out);
    }

    if !ship.ignore_tech_requirements {
        for (tech, enabled) in &ship.foundations {
            if *enabled && !ctx.tech.has_tech(tech) {
                out.tech(
                    format!("Ship \"{title}\" foundation \"{tech}\" requires technology"),
                    tech,
                    source(widget),
                );
            }
        }
    }
}

/// Parts-list ships: essential parts, power budget and mass.
fn check_component_ship(ctx: &CheckContext<'_>, widget: &Widget, ship: &ShipData, out: &mut IssueList) {
    let title = &widget.title;
    if !ship.ignore_tech_requirements {
        component_techs(
            ctx,
            widget,
            &ship.components,
            |c, tech| format!("Ship \"{title}\" component \"{}\" requires {tech}", c.name),
            out,
        );
    }

    let has = |kind: &str| ship.components.iter().any(|c| c.kind == kind);
    let mass: f64 = ship.components.iter().map(|c| c.mass).sum();
    let consumption: f64 = ship.components.iter().map(|c| c.power_consumption).sum();
    let generation: f64 = ship.components.iter().map(|c| c.power_output).sum();

    if !has("hull") {
        out.error(format!("Ship \"{title}\" requires a hull component"), source(widget));
    }
    if !has("engine") {
        out.error(format!("Ship \"{title}\" requires an engine component"), source(widget));
    }
    if !has("reactor") && consumption > 0.0 {
        out.error(format!("Ship \"{title}\" requires power generation for its components"), source(widget));
    }

    if consumption > generation {
        out.error(
            format!("Ship \"{title}\" has insufficient power: {generation} generated, {consumption} required"),
            source(widget),
        );
    } else if consumption < generation * 0.5 {
        out.warning(format!("Ship \"{title}\" has excess power generation"), source(widget));
    }

    if mass > MAX_SHIP_MASS {
        out.warning(format!("Ship \"{title}\" is very heavy ({mass} mass units)"), source(widget));
    }
}

/// A subclass keeps its parent's hull count and foundation switches.
fn check_inheritance(widget: &Widget, ship: &ShipData, parent_title: &str, parent: &ShipData, out: &mut IssueList) {
    let title = &widget.title;
    let (expected, current) = (parent.total_hulls(), ship.total_hulls());
    if expected != current {
        out.error(
            format!("Ship \"{title}\" inherits from \"{parent_title}\" and must keep {expected} hulls (currently {current})."),
            source(widget),
        );
    }

    let mismatched: Vec<String> = parent
        .foundations
        .iter()
        .filter(|(key, enabled)| **enabled != ship.foundations.get(*key).copied().unwrap_or(false))
        .map(|(key, _)| foundation_label(key))
        .collect();
    if !mismatched.is_empty() {
        out.error(
            format!(
                "Ship \"{title}\" foundations must match parent \"{parent_title}\" ({}).",
                mismatched.join(", ")
            ),
            source(widget),
        );
    }
}

pub fn check_craft(ctx: &CheckContext<'_>, widget: &Widget, out: &mut IssueList) {
    let WidgetData::Craft(craft) = &widget.data else { return };
    let title = &widget.title;
    if craft.components.is_empty() {
        out.warning(format!("Craft \"{title}\" has no components"), source(widget));
        return;
    }
    component_techs(
        ctx,
        widget,
        &craft.components,
        |c, tech| format!("Craft \"{title}\" component \"{}\" requires {tech}", c.name),
        out,
    );
    let mass: f64 = craft.components.iter().map(|c| c.mass).sum();
    if mass > MAX_CRAFT_MASS {
        out.warning(format!("Craft \"{title}\" is heavy for a small craft ({mass} mass units)"), source(widget));
    }
    if links(widget, "Craft", Direction::Source) == 0 {
        out.alert(format!("Craft \"{title}\" is not assigned to any loadout"), source(widget));
    }
}

pub fn check_troops(ctx: &CheckContext<'_>, widget: &Widget, out: &mut IssueList) {
    let WidgetData::Troops(troops) = &widget.data else { return };
    let title = &widget.title;
    if troops.equipment.is_empty() {
        out.warning(format!("Troop unit \"{title}\" has no equipment"), source(widget));
    }
    component_techs(
        ctx,
        widget,
        &troops.equipment,
        |e, tech| format!("Troop unit \"{title}\" equipment \"{}\" requires {tech}", e.name),
        out,
    );
    if links(widget, "Troop", Direction::Source) == 0 {
        out.alert(format!("Troop unit \"{title}\" is not assigned to any berth plan"), source(widget));
    }
}

pub fn check_missiles(ctx: &CheckContext<'_>, widget: &Widget, out: &mut IssueList) {
    let WidgetData::Missiles(missile) = &widget.data else { return };
    let title = &widget.title;
    if missile.warhead.is_none() && missile.guidance.is_none() {
        out.error(format!("Missile \"{title}\" requires warhead and guidance systems"), source(widget));
    }
    component_techs(
        ctx,
        widget,
        missile.parts(),
        |c, tech| format!("Missile \"{title}\" component \"{}\" requires {tech}", c.name),
        out,
    );
    if links(widget, "Weapon", Direction::Source) == 0 {
        out.alert(format!("Missile design \"{title}\" is not assigned to any loadout"), source(widget));
    }
}

pub fn check_outfit(_ctx: &CheckContext<'_>, widget: &Widget, out: &mut IssueList) {
    let title = &widget.title;
    if links(widget, "Class", Direction::Sink) == 0 {
        out.error(format!("Outfit \"{title}\" must connect to a Ship Class"), source(widget));
    }
    if links(widget, "Core", Direction::Sink) == 0 {
        out.error(format!("Outfit \"{title}\" requires at least one Ship Core"), source(widget));
    }
    if links(widget, "OutfitHull", Direction::Source) == 0 {
        out.alert(format!("Outfit \"{title}\" is not assigned to any Hull plan"), source(widget));
    }
}

/// Cores raise nothing; an unused core is not worth an alert.
pub fn check_ship_core(_ctx: &CheckContext<'_>, _widget: &Widget, _out: &mut IssueList) {}

pub fn check_ship_berth(_ctx: &CheckContext<'_>, widget: &Widget, out: &mut IssueList) {
    let title = &widget.title;
    if links(widget, "Berth", Direction::Sink) == 0 {
        out.alert(format!("Berth plan \"{title}\" is not linked to an Outfit"), source(widget));
    }
    if links(widget, "Troop", Direction::Sink) == 0 {
        out.alert(format!("Berth plan \"{title}\" has unused berth capacity"), source(widget));
    }
    if links(widget, "Staff", Direction::Source) == 0 {
        out.alert(format!("Berth plan \"{title}\" does not produce a staff plan"), source(widget));
    }
}

pub fn check_ship_hulls(ctx: &CheckContext<'_>, widget: &Widget, out: &mut IssueList) {
    let title = &widget.title;
    if links(widget, "OutfitHull", Direction::Sink) == 0 {
        out.error(format!("Hull plan \"{title}\" requires an Outfit connection"), source(widget));
    }

    let Some(outfit) = ctx.parent_of_kind(widget, WidgetKind::Outfit) else { return };
    let ship = ctx
        .parent_of_kind(outfit, WidgetKind::Ship)
        .and_then(|s| s.data.as_ship());
    if let Some(ship) = ship
        && ship.hulls("magazine") + ship.hulls("hangar") > 0
        && links(widget, "LoadoutHull", Direction::Sink) == 0
    {
        out.alert(
            format!("Hull plan \"{title}\" has magazine or hangar capacity without a Loadout connection"),
            source(widget),
        );
    }

    let berthing = outfit.data.as_outfit().is_some_and(|o| o.has_berthing());
    if berthing && links(widget, "Staff", Direction::Sink) == 0 {
        out.alert(
            format!("Hull plan \"{title}\" has berthing systems but no Staff plan connection"),
            source(widget),
        );
    }
}

pub fn check_loadouts(_ctx: &CheckContext<'_>, widget: &Widget, out: &mut IssueList) {
    let title = &widget.title;
    let items = match &widget.data {
        WidgetData::Loadouts(loadout) => loadout.items.as_slice(),
        _ => &[],
    };
    if items.is_empty() {
        out.warning(format!("Loadout \"{title}\" is empty"), source(widget));
    }
    let weapons = items.iter().filter(|i| i.kind == "weapon").count();
    let ammunition = items.iter().filter(|i| i.kind == "ammunition").count();
    if weapons > 0 && ammunition == 0 {
        out.warning(format!("Loadout \"{title}\" has weapons but no ammunition"), source(widget));
    }

    let unlinked = [
        ("Loadout", Direction::Sink, "is not linked to a ship class"),
        ("Craft", Direction::Sink, "has unused hangar bays"),
        ("Weapon", Direction::Sink, "has unused magazines"),
        ("LoadoutHull", Direction::Source, "is not assigned to a hull plan"),
    ];
    for (tag, direction, what) in unlinked {
        if links(widget, tag, direction) == 0 {
            out.alert(format!("Loadout \"{title}\" {what}"), source(widget));
        }
    }
}

/// Kinds without rules.
pub fn check_nothing(_ctx: &CheckContext<'_>, _widget: &Widget, _out: &mut IssueList) {}
