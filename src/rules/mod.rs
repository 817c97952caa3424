//! Compatibility Rule Table
//!
//! Declarative per-layer constraints. A rule table holds one or more
//! profiles; each DNA generation attempt draws one profile by weight and
//! then looks up every layer's rule by the layer's directory name. Layers
//! without a rule are plain weighted picks.

mod condition;
mod garment;
mod presets;
mod state;

pub use condition::Condition;
pub use garment::{GarmentRule, MatchPolicy, Resolution};
pub use presets::{character_profiles, NONE_TRAIT};
pub use state::{CompatibilityState, Establish, StateFlag, StateUpdate};

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{Layer, TraitElement};
use crate::error::{Result, StrataError};

/// Reference to a fixed element of a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRef {
    Filename(String),
    Id(u32),
}

impl ElementRef {
    pub fn filename(name: &str) -> Self {
        ElementRef::Filename(name.to_string())
    }

    /// Find the referenced element in `layer`'s catalog.
    pub fn resolve<'a>(&self, layer: &'a Layer) -> Result<&'a TraitElement> {
        let found = match self {
            ElementRef::Filename(name) => layer.element_by_filename(name),
            ElementRef::Id(id) => layer.element_by_id(*id),
        };
        found.ok_or_else(|| StrataError::UnknownPinnedElement {
            layer: layer.name.clone(),
            reference: self.to_string(),
        })
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::Filename(name) => write!(f, "'{}'", name),
            ElementRef::Id(id) => write!(f, "#{}", id),
        }
    }
}

/// Draw only when a state flag holds; otherwise use a fixed element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub flag: StateFlag,
    pub otherwise: ElementRef,
}

/// Constraints for one layer within a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerRule {
    /// Always use this element; no weighted draw happens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<ElementRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<Gate>,
    /// Every condition must hold for a candidate to be accepted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<Condition>,
    /// State this layer establishes from its accepted element
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub establish: Vec<Establish>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub garment: Option<GarmentRule>,
    /// Element used once the resample cap is exhausted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<ElementRef>,
}

impl LayerRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pinned(element: ElementRef) -> Self {
        Self {
            pin: Some(element),
            ..Default::default()
        }
    }

    pub fn requiring(mut self, condition: Condition) -> Self {
        self.require.push(condition);
        self
    }

    pub fn establishing(mut self, establish: Establish) -> Self {
        self.establish.push(establish);
        self
    }

    pub fn gated(mut self, flag: StateFlag, otherwise: ElementRef) -> Self {
        self.gate = Some(Gate { flag, otherwise });
        self
    }

    pub fn with_garment(mut self, garment: GarmentRule) -> Self {
        self.garment = Some(garment);
        self
    }

    pub fn with_fallback(mut self, element: ElementRef) -> Self {
        self.fallback = Some(element);
        self
    }

    /// Every fixed element this rule can fall back on.
    pub fn element_refs(&self) -> impl Iterator<Item = &ElementRef> {
        self.pin
            .iter()
            .chain(self.gate.as_ref().map(|gate| &gate.otherwise))
            .chain(self.fallback.iter())
    }

    /// Whether `element` passes every condition under `state`.
    pub fn accepts(&self, element: &TraitElement, state: &CompatibilityState) -> bool {
        self.require.iter().all(|c| c.evaluate(element, state))
    }

    /// The combined state update for an accepted element.
    pub fn establishes(&self, element: &TraitElement) -> StateUpdate {
        self.establish
            .iter()
            .fold(StateUpdate::default(), |update, rule| {
                update.merge(rule.derive(element))
            })
    }
}

/// A named rule set; one profile governs a whole DNA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default = "default_profile_weight")]
    pub weight: f64,
    #[serde(default)]
    pub layers: BTreeMap<String, LayerRule>,
}

fn default_profile_weight() -> f64 {
    1.0
}

impl Profile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            weight: default_profile_weight(),
            layers: BTreeMap::new(),
        }
    }

    pub fn with_rule(mut self, layer: &str, rule: LayerRule) -> Self {
        self.layers.insert(layer.to_string(), rule);
        self
    }

    pub fn rule_for(&self, layer: &str) -> Option<&LayerRule> {
        self.layers.get(layer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl RuleTable {
    pub fn new(profiles: Vec<Profile>) -> Self {
        Self { profiles }
    }

    /// Built-in rule table by name.
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "character" => Ok(Self::new(character_profiles())),
            "none" => Ok(Self::default()),
            _ => Err(StrataError::UnknownPreset {
                name: name.to_string(),
            }),
        }
    }

    /// Check the table against the scanned waves before anything is drawn.
    ///
    /// Every rule must name a layer present in some wave, and each pinned,
    /// gate or fallback element must exist in every wave's layer of that
    /// name. A layer without positive weight is only usable when every
    /// profile pins it.
    pub fn validate<'a, I>(&self, waves: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a [Layer]>,
    {
        let layers: Vec<&Layer> = waves.into_iter().flatten().collect();

        for profile in &self.profiles {
            for (name, rule) in &profile.layers {
                let mut matched = false;
                for layer in layers.iter().filter(|layer| &layer.name == name) {
                    matched = true;
                    for reference in rule.element_refs() {
                        reference.resolve(layer)?;
                    }
                }
                if !matched {
                    return Err(StrataError::InvalidConfig {
                        reason: format!(
                            "profile '{}' has a rule for layer '{}', which no wave contains",
                            profile.name, name
                        ),
                    });
                }
            }
        }

        for layer in &layers {
            if layer.total_weight() > 0.0 {
                continue;
            }
            let always_pinned = !self.profiles.is_empty()
                && self.profiles.iter().all(|profile| {
                    profile
                        .rule_for(&layer.name)
                        .is_some_and(|rule| rule.pin.is_some())
                });
            if !always_pinned {
                return Err(StrataError::EmptyLayer {
                    layer: layer.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Draw the profile governing one generation attempt.
    ///
    /// Returns `None` for an empty table, meaning no layer is constrained.
    pub fn choose_profile<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Profile> {
        let total: f64 = self.profiles.iter().map(|p| p.weight.max(0.0)).sum();
        if self.profiles.is_empty() || total <= 0.0 {
            return self.profiles.first();
        }
        let mut remaining = rng.random_range(0.0..total);
        for profile in &self.profiles {
            remaining -= profile.weight.max(0.0);
            if remaining < 0.0 {
                return Some(profile);
            }
        }
        self.profiles.last()
    }
}
