//! Compatibility State
//!
//! Cross-layer attributes established while one DNA is generated. A fresh
//! state is created for every generation attempt and dropped once the DNA
//! is finalized.

use serde::{Deserialize, Serialize};

use crate::catalog::TraitElement;

/// Attributes earlier layers establish for later ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityState {
    /// Skin tone set by the layer that owns it (e.g. hands)
    pub skin_type: Option<String>,
    /// Whether rings may be drawn over the established hands
    pub ring_compatible: Option<bool>,
    /// Garment family set by the arms layer
    pub cloth_type: Option<String>,
    /// Garment print set by the arms layer
    pub cloth_design: Option<String>,
}

impl CompatibilityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a partial update; fields the update leaves unset are kept.
    pub fn apply(&mut self, update: StateUpdate) {
        if update.skin_type.is_some() {
            self.skin_type = update.skin_type;
        }
        if update.ring_compatible.is_some() {
            self.ring_compatible = update.ring_compatible;
        }
        if update.cloth_type.is_some() {
            self.cloth_type = update.cloth_type;
        }
        if update.cloth_design.is_some() {
            self.cloth_design = update.cloth_design;
        }
    }

    /// Read a boolean flag by name, for rule gates.
    pub fn flag(&self, flag: StateFlag) -> bool {
        match flag {
            StateFlag::RingCompatible => self.ring_compatible.unwrap_or(false),
        }
    }
}

/// Partial state produced by an [`Establish`] rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub skin_type: Option<String>,
    pub ring_compatible: Option<bool>,
    pub cloth_type: Option<String>,
    pub cloth_design: Option<String>,
}

impl StateUpdate {
    pub fn merge(mut self, other: StateUpdate) -> Self {
        self.skin_type = other.skin_type.or(self.skin_type);
        self.ring_compatible = other.ring_compatible.or(self.ring_compatible);
        self.cloth_type = other.cloth_type.or(self.cloth_type);
        self.cloth_design = other.cloth_design.or(self.cloth_design);
        self
    }
}

/// Boolean state a layer can be gated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFlag {
    RingCompatible,
}

/// What an accepted element establishes for the layers after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Establish {
    /// Skin tone from a filename token; restricted to `allowed` when given
    Skin {
        token: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allowed: Option<Vec<String>>,
    },
    /// Ring compatibility: false when the token contains the marker
    RingCompatibility {
        token: usize,
        incompatible_marker: String,
    },
    /// Cloth type and design from two filename tokens
    Cloth {
        type_token: usize,
        design_token: usize,
    },
}

impl Establish {
    /// Compute the partial update this rule derives from `element`.
    pub fn derive(&self, element: &TraitElement) -> StateUpdate {
        match self {
            Establish::Skin { token, allowed } => {
                let skin = element.token(*token).filter(|skin| {
                    allowed
                        .as_ref()
                        .map_or(true, |allowed| allowed.iter().any(|a| a.as_str() == *skin))
                });
                StateUpdate {
                    skin_type: skin.map(str::to_string),
                    ..Default::default()
                }
            }
            Establish::RingCompatibility {
                token,
                incompatible_marker,
            } => StateUpdate {
                ring_compatible: Some(
                    !element
                        .token(*token)
                        .is_some_and(|t| t.contains(incompatible_marker.as_str())),
                ),
                ..Default::default()
            },
            Establish::Cloth {
                type_token,
                design_token,
            } => StateUpdate {
                cloth_type: element.token(*type_token).map(str::to_string),
                cloth_design: element.design_token(*design_token).map(str::to_string),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(filename: &str) -> TraitElement {
        TraitElement::new(0, filename, filename, 1.0)
    }

    #[test]
    fn test_apply_keeps_unset_fields() {
        let mut state = CompatibilityState::new();
        state.apply(StateUpdate {
            skin_type: Some("Red".to_string()),
            ..Default::default()
        });
        state.apply(StateUpdate {
            cloth_type: Some("Sweat".to_string()),
            ..Default::default()
        });
        assert_eq!(state.skin_type.as_deref(), Some("Red"));
        assert_eq!(state.cloth_type.as_deref(), Some("Sweat"));
        assert!(state.ring_compatible.is_none());
    }

    #[test]
    fn test_skin_establish_respects_allowed() {
        let rule = Establish::Skin {
            token: 0,
            allowed: Some(vec!["Red".to_string(), "Blue".to_string()]),
        };
        assert_eq!(
            rule.derive(&element("Red_Lancet#3.png")).skin_type.as_deref(),
            Some("Red")
        );
        assert!(rule.derive(&element("Green_Plain.png")).skin_type.is_none());
    }

    #[test]
    fn test_ring_compatibility() {
        let rule = Establish::RingCompatibility {
            token: 1,
            incompatible_marker: "Lancet".to_string(),
        };
        assert_eq!(
            rule.derive(&element("Red_Lancet#3.png")).ring_compatible,
            Some(false)
        );
        assert_eq!(
            rule.derive(&element("Red_Plain#3.png")).ring_compatible,
            Some(true)
        );
    }

    #[test]
    fn test_cloth_establish() {
        let rule = Establish::Cloth {
            type_token: 1,
            design_token: 2,
        };
        let update = rule.derive(&element("Blue_Sweat_Fire#5.png"));
        assert_eq!(update.cloth_type.as_deref(), Some("Sweat"));
        assert_eq!(update.cloth_design.as_deref(), Some("Fire"));
    }

    #[test]
    fn test_flag_defaults_to_false() {
        let state = CompatibilityState::new();
        assert!(!state.flag(StateFlag::RingCompatible));
    }
}
