//! Compatibility predicates
//!
//! Each condition is a pure function of a candidate element and the current
//! compatibility state.

use serde::{Deserialize, Serialize};

use super::CompatibilityState;
use crate::catalog::TraitElement;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// The skin token equals the established skin type, or is a wildcard.
    /// With `strip_rarity` the token is cut at the rarity delimiter first.
    SkinMatches {
        token: usize,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        wildcards: Vec<String>,
        #[serde(default)]
        strip_rarity: bool,
    },
    /// The filename has no token at this position (an untinted asset).
    HasNoToken { token: usize },
    /// The filename is none of these (e.g. a canonical "none" trait).
    FilenameNotIn { names: Vec<String> },
    Any(Vec<Condition>),
    All(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn skin_matches(token: usize) -> Self {
        Condition::SkinMatches {
            token,
            wildcards: Vec::new(),
            strip_rarity: false,
        }
    }

    pub fn filename_not(name: &str) -> Self {
        Condition::FilenameNotIn {
            names: vec![name.to_string()],
        }
    }

    pub fn evaluate(&self, element: &TraitElement, state: &CompatibilityState) -> bool {
        match self {
            Condition::SkinMatches {
                token,
                wildcards,
                strip_rarity,
            } => {
                let value = if *strip_rarity {
                    element.design_token(*token)
                } else {
                    element.token(*token)
                };
                let Some(value) = value else {
                    return false;
                };
                wildcards.iter().any(|w| w == value)
                    || state.skin_type.as_deref() == Some(value)
            }
            Condition::HasNoToken { token } => element.token(*token).is_none(),
            Condition::FilenameNotIn { names } => !names.iter().any(|n| *n == element.filename),
            Condition::Any(conditions) => conditions.iter().any(|c| c.evaluate(element, state)),
            Condition::All(conditions) => conditions.iter().all(|c| c.evaluate(element, state)),
            Condition::Not(condition) => !condition.evaluate(element, state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(filename: &str) -> TraitElement {
        TraitElement::new(0, filename, filename, 1.0)
    }

    fn state_with_skin(skin: &str) -> CompatibilityState {
        CompatibilityState {
            skin_type: Some(skin.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_skin_matches() {
        let condition = Condition::skin_matches(0);
        let state = state_with_skin("Red");
        assert!(condition.evaluate(&element("Red_Sweat_Fire#2.png"), &state));
        assert!(!condition.evaluate(&element("Blue_Sweat_Fire#2.png"), &state));
    }

    #[test]
    fn test_skin_matches_without_established_skin() {
        let condition = Condition::skin_matches(0);
        assert!(!condition.evaluate(&element("Red_Sweat.png"), &CompatibilityState::new()));
    }

    #[test]
    fn test_skin_wildcard() {
        let condition = Condition::SkinMatches {
            token: 0,
            wildcards: vec!["None".to_string()],
            strip_rarity: false,
        };
        assert!(condition.evaluate(&element("None_Bare_Plain.png"), &state_with_skin("Red")));
        assert!(condition.evaluate(&element("None_Bare_Plain.png"), &CompatibilityState::new()));
    }

    #[test]
    fn test_skin_strip_rarity() {
        let condition = Condition::SkinMatches {
            token: 0,
            wildcards: Vec::new(),
            strip_rarity: true,
        };
        assert!(condition.evaluate(&element("Red#4.png"), &state_with_skin("Red")));
    }

    #[test]
    fn test_combinators() {
        let legs = Condition::Any(vec![
            Condition::HasNoToken { token: 1 },
            Condition::skin_matches(0),
        ]);
        let state = state_with_skin("Red");
        assert!(legs.evaluate(&element("Shorts#3.png"), &state));
        assert!(legs.evaluate(&element("Red_Shorts#3.png"), &state));
        assert!(!legs.evaluate(&element("Blue_Shorts#3.png"), &state));

        let ears = Condition::All(vec![
            Condition::skin_matches(0),
            Condition::filename_not("bald#10.png"),
        ]);
        assert!(ears.evaluate(&element("Red_Pointy.png"), &state));
        assert!(!ears.evaluate(&element("bald#10.png"), &state_with_skin("bald#10.png")));

        let not_bald = Condition::Not(Box::new(Condition::filename_not("bald#10.png")));
        assert!(not_bald.evaluate(&element("bald#10.png"), &state));
    }

    #[test]
    fn test_serde_shape() {
        let condition: Condition = serde_json::from_str(
            r#"{ "any": [ { "has_no_token": { "token": 1 } }, { "skin_matches": { "token": 0 } } ] }"#,
        )
        .unwrap();
        assert_eq!(
            condition,
            Condition::Any(vec![
                Condition::HasNoToken { token: 1 },
                Condition::skin_matches(0),
            ])
        );
    }
}
