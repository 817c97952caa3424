//! Weighted Constrained Selector
//!
//! Picks one element per layer with probability proportional to its weight,
//! subject to the layer's rule in the drawn profile. A rejected candidate is
//! not excluded: the next draw is over the full catalog again, up to the
//! configured resample cap.

use log::{debug, warn};
use rand::Rng;

use crate::catalog::{Layer, TraitElement};
use crate::config::DEFAULT_MAX_RESAMPLE_ATTEMPTS;
use crate::dna::{DnaEntry, DnaStrand};
use crate::error::{Result, StrataError};
use crate::rules::{CompatibilityState, LayerRule, Resolution, RuleTable};

/// How a layer's element was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    /// Weighted draw accepted by the layer rule
    Drawn,
    /// Fixed by a pin or a closed gate
    Pinned,
    /// Fallback after the resample cap
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Catalog index of the chosen element
    pub index: usize,
    pub source: SelectionSource,
    /// Weighted draws consumed
    pub attempts: usize,
}

/// Index of the element a uniform draw over the total weight lands on.
///
/// Walks the catalog subtracting each weight; the first element where the
/// remainder goes negative wins.
pub fn weighted_index<R: Rng + ?Sized>(elements: &[TraitElement], total_weight: f64, rng: &mut R) -> usize {
    let mut remaining = rng.random_range(0.0..total_weight);
    for (index, element) in elements.iter().enumerate() {
        remaining -= element.weight;
        if remaining < 0.0 {
            return index;
        }
    }
    // Float rounding can leave a tiny positive remainder; it belongs to the
    // last element with any weight.
    elements
        .iter()
        .rposition(|e| e.weight > 0.0)
        .unwrap_or(elements.len() - 1)
}

fn index_of(layer: &Layer, element: &TraitElement) -> usize {
    layer
        .elements
        .iter()
        .position(|e| e.id == element.id)
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct WeightedSelector {
    max_attempts: usize,
}

impl Default for WeightedSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RESAMPLE_ATTEMPTS)
    }
}

impl WeightedSelector {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Select one element of `layer`, updating `state` with whatever the
    /// accepted element establishes.
    pub fn select<R: Rng + ?Sized>(
        &self,
        layer: &Layer,
        rule: Option<&LayerRule>,
        state: &mut CompatibilityState,
        rng: &mut R,
    ) -> Result<Selection> {
        if let Some(rule) = rule {
            if let Some(pin) = &rule.pin {
                let element = pin.resolve(layer)?;
                return Ok(Selection {
                    index: index_of(layer, element),
                    source: SelectionSource::Pinned,
                    attempts: 0,
                });
            }
            if let Some(gate) = &rule.gate {
                if !state.flag(gate.flag) {
                    let element = gate.otherwise.resolve(layer)?;
                    debug!("Layer '{}' gated on {:?}", layer.name, gate.flag);
                    return Ok(Selection {
                        index: index_of(layer, element),
                        source: SelectionSource::Pinned,
                        attempts: 0,
                    });
                }
            }
        }

        let total_weight = layer.total_weight();
        if layer.elements.is_empty() || total_weight <= 0.0 {
            return Err(StrataError::EmptyLayer {
                layer: layer.name.clone(),
            });
        }

        let mut attempts = 0;
        while attempts < self.max_attempts {
            attempts += 1;
            let candidate = weighted_index(&layer.elements, total_weight, rng);

            let Some(rule) = rule else {
                return Ok(Selection {
                    index: candidate,
                    source: SelectionSource::Drawn,
                    attempts,
                });
            };

            if !rule.accepts(&layer.elements[candidate], state) {
                continue;
            }

            let index = match &rule.garment {
                Some(garment) => match garment.resolve(layer, candidate, state, rng) {
                    Resolution::Accept(index) => index,
                    Resolution::Resample => continue,
                    Resolution::Unsatisfiable => break,
                },
                None => candidate,
            };

            state.apply(rule.establishes(&layer.elements[index]));
            return Ok(Selection {
                index,
                source: SelectionSource::Drawn,
                attempts,
            });
        }

        if let Some(fallback) = rule.and_then(|r| r.fallback.as_ref()) {
            let element = fallback.resolve(layer)?;
            debug!(
                "Layer '{}' fell back to {} after {} attempts",
                layer.name, element.filename, attempts
            );
            return Ok(Selection {
                index: index_of(layer, element),
                source: SelectionSource::Fallback,
                attempts,
            });
        }

        warn!(
            "No compatible element for layer '{}' after {} attempts (state: {:?})",
            layer.name, attempts, state
        );
        Err(StrataError::UnsatisfiableConstraint {
            layer: layer.name.clone(),
            attempts,
        })
    }
}

/// A generated DNA together with the state it was generated under.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDna {
    pub strand: DnaStrand,
    /// Name of the drawn profile, if the rule table has any
    pub profile: Option<String>,
    /// Final compatibility state after the last layer
    pub state: CompatibilityState,
}

/// Generate one DNA across all layers of a wave.
///
/// Draws a profile, then selects every layer in order against a fresh
/// compatibility state.
pub fn create_dna<R: Rng + ?Sized>(
    layers: &[Layer],
    rules: &RuleTable,
    selector: &WeightedSelector,
    rng: &mut R,
) -> Result<GeneratedDna> {
    let profile = rules.choose_profile(rng);
    let mut state = CompatibilityState::new();
    let mut entries = Vec::with_capacity(layers.len());

    for layer in layers {
        let rule = profile.and_then(|p| p.rule_for(&layer.name));
        let selection = selector.select(layer, rule, &mut state, rng).inspect_err(|e| {
            if let (Some(profile), true) = (profile, e.is_recoverable()) {
                debug!("Profile '{}' discarded: {}", profile.name, e);
            }
        })?;
        let element = &layer.elements[selection.index];
        entries.push(DnaEntry::new(element.id, &element.filename, layer.bypass_dna));
    }

    Ok(GeneratedDna {
        strand: DnaStrand::new(entries),
        profile: profile.map(|p| p.name.clone()),
        state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Condition, ElementRef, Establish, StateFlag};
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn layer(name: &str, files: &[(&str, f64)]) -> Layer {
        let elements = files
            .iter()
            .enumerate()
            .map(|(i, (f, w))| TraitElement::new(i as u32, f, f, *w))
            .collect();
        Layer::new(0, name, elements)
    }

    #[test]
    fn test_weighted_frequencies_converge() {
        let background = layer("Background", &[("Grey#1.png", 1.0), ("Blue#3.png", 3.0)]);
        let selector = WeightedSelector::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let mut state = CompatibilityState::new();

        let mut counts = [0usize; 2];
        for _ in 0..4000 {
            let selection = selector.select(&background, None, &mut state, &mut rng).unwrap();
            counts[selection.index] += 1;
        }

        assert_abs_diff_eq!(counts[0] as f64 / 4000.0, 0.25, epsilon = 0.03);
        assert_abs_diff_eq!(counts[1] as f64 / 4000.0, 0.75, epsilon = 0.03);
    }

    #[test]
    fn test_zero_weight_never_drawn() {
        let layer = layer("rings", &[("bald#0.png", 0.0), ("Gold.png", 1.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..500 {
            assert_eq!(weighted_index(&layer.elements, layer.total_weight(), &mut rng), 1);
        }
    }

    #[test]
    fn test_constraint_resamples_until_match() {
        let arms = layer(
            "arms",
            &[("Red_Tee_Plain#1.png", 1.0), ("Blue_Tee_Plain#50.png", 50.0)],
        );
        let rule = LayerRule::new().requiring(Condition::skin_matches(0));
        let mut state = CompatibilityState {
            skin_type: Some("Red".to_string()),
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let selection = WeightedSelector::default()
            .select(&arms, Some(&rule), &mut state, &mut rng)
            .unwrap();
        assert_eq!(selection.index, 0);
        assert_eq!(selection.source, SelectionSource::Drawn);
    }

    #[test]
    fn test_resample_cap_signals_unsatisfiable() {
        let arms = layer("arms", &[("Blue_Tee_Plain.png", 1.0)]);
        let rule = LayerRule::new().requiring(Condition::skin_matches(0));
        let mut state = CompatibilityState {
            skin_type: Some("Red".to_string()),
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let err = WeightedSelector::new(25)
            .select(&arms, Some(&rule), &mut state, &mut rng)
            .unwrap_err();
        match err {
            StrataError::UnsatisfiableConstraint { layer, attempts } => {
                assert_eq!(layer, "arms");
                assert_eq!(attempts, 25);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_fallback_after_cap() {
        let ears = layer("ears", &[("bald#10.png", 10.0), ("Blue_Pointy.png", 1.0)]);
        let rule = LayerRule::new()
            .requiring(Condition::skin_matches(0))
            .with_fallback(ElementRef::filename("bald#10.png"));
        let mut state = CompatibilityState::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let selection = WeightedSelector::new(10)
            .select(&ears, Some(&rule), &mut state, &mut rng)
            .unwrap();
        assert_eq!(selection.index, 0);
        assert_eq!(selection.source, SelectionSource::Fallback);
        assert_eq!(selection.attempts, 10);
    }

    #[test]
    fn test_pin_skips_sampling() {
        let face = layer("face", &[("Red_Mask.png", 100.0), ("bald#10.png", 0.0)]);
        let rule = LayerRule::pinned(ElementRef::filename("bald#10.png"));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let selection = WeightedSelector::default()
            .select(&face, Some(&rule), &mut CompatibilityState::new(), &mut rng)
            .unwrap();
        assert_eq!(selection.index, 1);
        assert_eq!(selection.source, SelectionSource::Pinned);
    }

    #[test]
    fn test_gate_closed_uses_otherwise() {
        let rings = layer("rings", &[("Gold.png", 1.0), ("bald#10.png", 1.0)]);
        let rule = LayerRule::new().gated(StateFlag::RingCompatible, ElementRef::filename("bald#10.png"));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let selector = WeightedSelector::default();

        let mut closed = CompatibilityState {
            ring_compatible: Some(false),
            ..Default::default()
        };
        for _ in 0..20 {
            assert_eq!(selector.select(&rings, Some(&rule), &mut closed, &mut rng).unwrap().index, 1);
        }

        let mut open = CompatibilityState {
            ring_compatible: Some(true),
            ..Default::default()
        };
        let drawn: std::collections::BTreeSet<usize> = (0..50)
            .map(|_| selector.select(&rings, Some(&rule), &mut open, &mut rng).unwrap().index)
            .collect();
        assert_eq!(drawn.len(), 2);
    }

    #[test]
    fn test_accepted_element_establishes_state() {
        let hands = layer("hands", &[("White_Lancet#1.png", 1.0)]);
        let rule = LayerRule::new()
            .establishing(Establish::Skin { token: 0, allowed: None })
            .establishing(Establish::RingCompatibility {
                token: 1,
                incompatible_marker: "Lancet".to_string(),
            });
        let mut state = CompatibilityState::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        WeightedSelector::default()
            .select(&hands, Some(&rule), &mut state, &mut rng)
            .unwrap();
        assert_eq!(state.skin_type.as_deref(), Some("White"));
        assert_eq!(state.ring_compatible, Some(false));
    }

    #[test]
    fn test_empty_layer() {
        let empty = Layer::new(0, "void", Vec::new());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = WeightedSelector::default()
            .select(&empty, None, &mut CompatibilityState::new(), &mut rng)
            .unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_LAYER");
    }

    #[test]
    fn test_create_dna_one_entry_per_layer() {
        let layers = vec![
            layer("Background", &[("Grey.png", 1.0)]),
            layer("Eyes", &[("Blue.png", 1.0), ("Green.png", 1.0)]).with_bypass_dna(true),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let generated = create_dna(
            &layers,
            &RuleTable::default(),
            &WeightedSelector::default(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(generated.strand.entries.len(), 2);
        assert!(generated.profile.is_none());
        assert_eq!(generated.strand.entries[0].filename, "Grey.png");
        assert!(generated.strand.entries[1].bypass);
    }
}
