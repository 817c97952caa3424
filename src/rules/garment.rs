//! Garment sub-filter
//!
//! The body layer does not simply accept or reject its weighted candidate:
//! depending on the cloth design and type the arms layer established, it
//! redirects to a matching element of the right skin tone.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::CompatibilityState;
use crate::catalog::{Layer, TraitElement};

/// How to choose among several matching elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Always the first match in catalog order
    FirstMatch,
    /// Uniformly among all matches, ignoring weights
    RandomAmongMatches,
}

impl MatchPolicy {
    fn pick<R: Rng + ?Sized>(&self, matches: &[usize], rng: &mut R) -> Option<usize> {
        match (self, matches.len()) {
            (_, 0) => None,
            (MatchPolicy::FirstMatch, _) => Some(matches[0]),
            (MatchPolicy::RandomAmongMatches, n) => Some(matches[rng.random_range(0..n)]),
        }
    }
}

/// Outcome of running a candidate through a sub-filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Use the element at this catalog index
    Accept(usize),
    /// Draw a new weighted candidate
    Resample,
    /// No draw can ever succeed under the current state
    Unsatisfiable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarmentRule {
    #[serde(default)]
    pub skin_token: usize,
    #[serde(default = "default_type_token")]
    pub type_token: usize,
    #[serde(default = "default_design_token")]
    pub design_token: usize,
    /// Designs resolved by design + skin, independent of the candidate
    #[serde(default)]
    pub design_policies: BTreeMap<String, MatchPolicy>,
    /// Cloth types resolved among every element of the type, any skin
    #[serde(default)]
    pub type_policies: BTreeMap<String, MatchPolicy>,
}

fn default_type_token() -> usize {
    1
}

fn default_design_token() -> usize {
    2
}

impl Default for GarmentRule {
    fn default() -> Self {
        Self {
            skin_token: 0,
            type_token: default_type_token(),
            design_token: default_design_token(),
            design_policies: BTreeMap::new(),
            type_policies: BTreeMap::new(),
        }
    }
}

impl GarmentRule {
    pub fn with_design_policy(mut self, design: &str, policy: MatchPolicy) -> Self {
        self.design_policies.insert(design.to_string(), policy);
        self
    }

    pub fn with_type_policy(mut self, cloth_type: &str, policy: MatchPolicy) -> Self {
        self.type_policies.insert(cloth_type.to_string(), policy);
        self
    }

    fn matching<F>(layer: &Layer, predicate: F) -> Vec<usize>
    where
        F: Fn(&TraitElement) -> bool,
    {
        layer
            .elements
            .iter()
            .enumerate()
            .filter(|(_, element)| predicate(element))
            .map(|(index, _)| index)
            .collect()
    }

    /// Resolve the weighted candidate at `candidate` against the state.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        layer: &Layer,
        candidate: usize,
        state: &CompatibilityState,
        rng: &mut R,
    ) -> Resolution {
        let skin = state.skin_type.as_deref();

        if let Some(design) = state.cloth_design.as_deref() {
            if let Some(policy) = self.design_policies.get(design) {
                let matches = Self::matching(layer, |e| {
                    e.design_token(self.design_token) == Some(design)
                        && skin.is_some()
                        && e.token(self.skin_token) == skin
                });
                return match policy.pick(&matches, rng) {
                    Some(index) => Resolution::Accept(index),
                    None => Resolution::Unsatisfiable,
                };
            }
        }

        let Some(element) = layer.elements.get(candidate) else {
            return Resolution::Resample;
        };
        let cloth_type = state.cloth_type.as_deref();
        if cloth_type.is_none() || element.token(self.type_token) != cloth_type {
            return Resolution::Resample;
        }

        if let Some(policy) = cloth_type.and_then(|t| self.type_policies.get(t)) {
            let matches = Self::matching(layer, |e| e.token(self.type_token) == cloth_type);
            return match policy.pick(&matches, rng) {
                Some(index) => Resolution::Accept(index),
                None => Resolution::Resample,
            };
        }

        if skin.is_some() && element.token(self.skin_token) == skin {
            return Resolution::Accept(candidate);
        }

        let matches = Self::matching(layer, |e| {
            skin.is_some()
                && e.token(self.skin_token) == skin
                && e.token(self.type_token) == cloth_type
        });
        match MatchPolicy::RandomAmongMatches.pick(&matches, rng) {
            Some(index) => Resolution::Accept(index),
            None => Resolution::Resample,
        }
    }
}
