//! Technology tree and empire research state.
//!
//! The empire starts unready: until static tech data has been loaded every
//! tech query answers "not researched". `load_tech_tree` flips it to ready
//! exactly once, and the workspace re-runs validation on that transition.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::model::Component;

/// Tech lookups consumed by validation and the spawn menu.
pub trait TechGate {
    fn has_tech(&self, tech: &str) -> bool;

    /// Every known tech id with its prerequisites.
    fn all_techs(&self) -> Vec<(&str, &[String])>;
}

/// Special requirement that is always considered met.
const TIER_REQUIREMENT: &str = "Tier3";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tech {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub cost: u32,
    pub prerequisites: Vec<String>,
    pub special_requirement: Option<String>,
    pub category: Option<String>,
}

impl Tech {
    fn is_free_root(&self) -> bool {
        self.cost == 0 && self.prerequisites.is_empty() && self.special_requirement.is_none()
    }
}

/// Static tech data keyed by tech id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TechTree {
    techs: BTreeMap<String, Tech>,
}

impl TechTree {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut techs: BTreeMap<String, Tech> = serde_json::from_str(json)?;
        for (id, tech) in techs.iter_mut() {
            tech.id = id.clone();
        }
        Ok(Self { techs })
    }

    pub fn from_techs(techs: impl IntoIterator<Item = Tech>) -> Self {
        Self {
            techs: techs.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Tech> {
        self.techs.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tech> {
        self.techs.values()
    }

    pub fn len(&self) -> usize {
        self.techs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.techs.is_empty()
    }
}

/// A saved design kept by the empire, independent of the live workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Design {
    pub id: String,
    pub name: String,
    pub components: Vec<Component>,
    pub ignore_tech_requirements: bool,
}

/// A tech a saved design needs but the empire has not researched.
#[derive(Debug, Clone, PartialEq)]
pub struct UnmetRequirement<'a> {
    pub design_type: &'a str,
    pub design: &'a Design,
    pub tech: &'a str,
}

pub const DESIGN_TYPES: [&str; 8] = [
    "ships",
    "craft",
    "troops",
    "missiles",
    "loadouts",
    "powerplants",
    "factories",
    "shipyards",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Empire {
    pub name: String,
    pub tech_points: u32,
    #[serde(rename = "researchedTech")]
    pub researched: BTreeSet<String>,
    #[serde(rename = "availableTech")]
    pub available: BTreeSet<String>,
    pub designs: BTreeMap<String, Vec<Design>>,
    #[serde(skip)]
    tree: Option<TechTree>,
}

impl Default for Empire {
    fn default() -> Self {
        Self {
            name: "New Empire".to_string(),
            tech_points: 1000,
            researched: BTreeSet::new(),
            available: BTreeSet::new(),
            designs: DESIGN_TYPES.iter().map(|t| (t.to_string(), Vec::new())).collect(),
            tree: None,
        }
    }
}

impl Empire {
    pub fn is_ready(&self) -> bool {
        self.tree.is_some()
    }

    pub fn tree(&self) -> Option<&TechTree> {
        self.tree.as_ref()
    }

    /// Install static tech data. Returns true on the unready -> ready transition.
    pub fn load_tech_tree(&mut self, tree: TechTree) -> bool {
        let became_ready = self.tree.is_none();
        for tech in tree.iter() {
            if tech.prerequisites.is_empty() && tech.special_requirement.is_none() {
                self.available.insert(tech.id.clone());
            }
        }
        // Zero-cost roots are baseline capabilities.
        for tech in tree.iter().filter(|t| t.is_free_root()) {
            if self.researched.insert(tech.id.clone()) {
                debug!("auto-researched {}", tech.id);
            }
            self.available.remove(&tech.id);
        }
        self.tree = Some(tree);
        self.update_available();
        if became_ready {
            info!("tech tree ready: {} techs, {} researched", self.tree.as_ref().map_or(0, TechTree::len), self.researched.len());
        }
        became_ready
    }

    pub fn can_research(&self, tech: &str) -> bool {
        self.available.contains(tech)
    }

    /// Spend points on an available tech. Returns false when it cannot be researched.
    pub fn research(&mut self, tech_id: &str) -> bool {
        if !self.available.contains(tech_id) || self.researched.contains(tech_id) {
            return false;
        }
        let Some(cost) = self.tree.as_ref().and_then(|t| t.get(tech_id)).map(|t| t.cost) else {
            return false;
        };
        if self.tech_points < cost {
            debug!("cannot research {tech_id}: {} points, {cost} needed", self.tech_points);
            return false;
        }
        self.tech_points -= cost;
        self.researched.insert(tech_id.to_string());
        self.available.remove(tech_id);
        self.update_available();
        info!("researched {tech_id}");
        true
    }

    fn update_available(&mut self) {
        let Some(tree) = &self.tree else { return };
        let newly: Vec<String> = tree
            .iter()
            .filter(|t| !self.researched.contains(&t.id) && !self.available.contains(&t.id))
            .filter(|t| t.prerequisites.iter().all(|p| self.researched.contains(p)))
            .filter(|t| match t.special_requirement.as_deref() {
                None | Some(TIER_REQUIREMENT) => true,
                Some(req) => self.researched.contains(req),
            })
            .map(|t| t.id.clone())
            .collect();
        self.available.extend(newly);
    }

    /// Store a design under `design_type`, assigning it the next free id.
    pub fn add_design(&mut self, design_type: &str, mut design: Design) -> Option<String> {
        let designs = self.designs.get_mut(design_type)?;
        let mut n = 1;
        while designs.iter().any(|d| d.id == format!("{design_type}-{n}")) {
            n += 1;
        }
        design.id = format!("{design_type}-{n}");
        let id = design.id.clone();
        designs.push(design);
        Some(id)
    }

    pub fn remove_design(&mut self, design_type: &str, design_id: &str) -> Option<Design> {
        let designs = self.designs.get_mut(design_type)?;
        let index = designs.iter().position(|d| d.id == design_id)?;
        Some(designs.remove(index))
    }

    /// Saved designs whose components need techs that are not researched.
    pub fn unmet_requirements(&self) -> Vec<UnmetRequirement<'_>> {
        let mut out = Vec::new();
        for (design_type, designs) in &self.designs {
            for design in designs.iter().filter(|d| !d.ignore_tech_requirements) {
                for component in &design.components {
                    for tech in &component.required_tech {
                        if !self.has_tech(tech) {
                            out.push(UnmetRequirement { design_type, design, tech });
                        }
                    }
                }
            }
        }
        out
    }
}

impl TechGate for Empire {
    fn has_tech(&self, tech: &str) -> bool {
        self.is_ready() && self.researched.contains(tech)
    }

    fn all_techs(&self) -> Vec<(&str, &[String])> {
        self.tree
            .iter()
            .flat_map(|t| t.iter())
            .map(|t| (t.id.as_str(), t.prerequisites.as_slice()))
            .collect()
    }
}
