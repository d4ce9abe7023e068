//! Typed per-kind widget payloads.
//!
//! The content forms that edit these live in the frontend; the core only
//! reads them during validation and round-trips them through snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::WidgetKind;

/// A buildable part with an optional technology gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Component {
    pub name: String,
    /// Component category: "hull", "engine", "reactor", "weapon", ...
    #[serde(rename = "type")]
    pub kind: String,
    pub mass: f64,
    pub power_consumption: f64,
    pub power_output: f64,
    pub required_tech: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShipData {
    /// Hull category ("magazine", "hangar", "armor", ...) -> hull count.
    pub hull_composition: BTreeMap<String, u32>,
    /// Foundation tech id -> enabled.
    pub foundations: BTreeMap<String, bool>,
    pub ignore_tech_requirements: bool,
    /// Parts list of designs saved before hull plans existed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

impl ShipData {
    /// Built from a parts list rather than a hull composition.
    pub fn is_component_based(&self) -> bool {
        self.hull_composition.is_empty() && !self.components.is_empty()
    }

    pub fn total_hulls(&self) -> u32 {
        self.hull_composition.values().sum()
    }

    pub fn hulls(&self, category: &str) -> u32 {
        self.hull_composition.get(category).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutfitModule {
    pub module_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutfitData {
    pub modules: Vec<OutfitModule>,
}

impl OutfitData {
    pub fn has_berthing(&self) -> bool {
        self.modules.iter().any(|m| {
            let key = if m.module_id.is_empty() { &m.name } else { &m.module_id };
            key.to_lowercase().contains("berth")
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadoutItem {
    pub name: String,
    /// "weapon", "ammunition", "craft", ...
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadoutData {
    pub items: Vec<LoadoutItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CraftData {
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TroopData {
    pub equipment: Vec<Component>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MissileData {
    pub warhead: Option<Component>,
    pub guidance: Option<Component>,
    pub propulsion: Option<Component>,
}

impl MissileData {
    pub fn parts(&self) -> impl Iterator<Item = &Component> {
        [&self.warhead, &self.guidance, &self.propulsion].into_iter().flatten()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RerouteData {
    /// Type tags this reroute passes through, in creation order.
    pub routes: Vec<String>,
}

/// Payload of a widget, one variant per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetData {
    Ship(ShipData),
    Outfit(OutfitData),
    ShipCore,
    ShipHulls,
    ShipBerth,
    Loadouts(LoadoutData),
    Craft(CraftData),
    Troops(TroopData),
    Missiles(MissileData),
    Statistics,
    Reroute(RerouteData),
}

impl WidgetData {
    pub fn default_for(kind: WidgetKind) -> Self {
        match kind {
            WidgetKind::Ship => WidgetData::Ship(ShipData::default()),
            WidgetKind::Outfit => WidgetData::Outfit(OutfitData::default()),
            WidgetKind::ShipCore => WidgetData::ShipCore,
            WidgetKind::ShipHulls => WidgetData::ShipHulls,
            WidgetKind::ShipBerth => WidgetData::ShipBerth,
            WidgetKind::Loadouts => WidgetData::Loadouts(LoadoutData::default()),
            WidgetKind::Craft => WidgetData::Craft(CraftData::default()),
            WidgetKind::Troops => WidgetData::Troops(TroopData::default()),
            WidgetKind::Missiles => WidgetData::Missiles(MissileData::default()),
            WidgetKind::Statistics => WidgetData::Statistics,
            WidgetKind::Reroute => WidgetData::Reroute(RerouteData::default()),
        }
    }

    /// Decode a serialized payload for `kind`. `null` yields the default.
    pub fn from_value(kind: WidgetKind, value: Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default_for(kind));
        }
        Ok(match kind {
            WidgetKind::Ship => WidgetData::Ship(serde_json::from_value(value)?),
            WidgetKind::Outfit => WidgetData::Outfit(serde_json::from_value(value)?),
            WidgetKind::Loadouts => WidgetData::Loadouts(serde_json::from_value(value)?),
            WidgetKind::Craft => WidgetData::Craft(serde_json::from_value(value)?),
            WidgetKind::Troops => WidgetData::Troops(serde_json::from_value(value)?),
            WidgetKind::Missiles => WidgetData::Missiles(serde_json::from_value(value)?),
            WidgetKind::Reroute => WidgetData::Reroute(serde_json::from_value(value)?),
            WidgetKind::ShipCore
            | WidgetKind::ShipHulls
            | WidgetKind::ShipBerth
            | WidgetKind::Statistics => Self::default_for(kind),
        })
    }

    pub fn to_value(&self) -> Value {
        let encoded = match self {
            WidgetData::Ship(d) => serde_json::to_value(d),
            WidgetData::Outfit(d) => serde_json::to_value(d),
            WidgetData::Loadouts(d) => serde_json::to_value(d),
            WidgetData::Craft(d) => serde_json::to_value(d),
            WidgetData::Troops(d) => serde_json::to_value(d),
            WidgetData::Missiles(d) => serde_json::to_value(d),
            WidgetData::Reroute(d) => serde_json::to_value(d),
            WidgetData::ShipCore
            | WidgetData::ShipHulls
            | WidgetData::ShipBerth
            | WidgetData::Statistics => Ok(Value::Null),
        };
        // Plain data structs with string keys always encode.
        encoded.unwrap_or(Value::Null)
    }

    pub fn as_ship(&self) -> Option<&ShipData> {
        match self {
            WidgetData::Ship(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_outfit(&self) -> Option<&OutfitData> {
        match self {
            WidgetData::Outfit(d) => Some(d),
            _ => None,
        }
    }
}
