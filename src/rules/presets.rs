//! Built-in rule presets
//!
//! The `character` preset composes a figure from hands, arms, legs and body,
//! then one of three heads: a built-up head (`headed`), a full face mask
//! (`masked`) or a lizard head (`lizard`). Layers that do not belong to the
//! drawn head are pinned to the canonical empty trait.

use super::{Condition, ElementRef, Establish, GarmentRule, LayerRule, MatchPolicy, Profile, StateFlag};

/// Filename of the transparent "none" trait present in every layer directory.
pub const NONE_TRAIT: &str = "bald#10.png";

/// Cloth designs that always resolve to the first design + skin match.
const FIRST_MATCH_DESIGNS: &[&str] = &["Xray", "AlienDrip", "InverseCross", "Suppreme", "Sad", "Fire"];

const HEADED_LAYERS: &[&str] = &["heading", "hair", "eyes", "midface", "mouth", "ears"];
const LIZARD_LAYERS: &[&str] = &[
    "lizardFace",
    "lizardEyes",
    "lizardMidface",
    "lizardHorns",
    "lizardEarrings",
];

fn none() -> ElementRef {
    ElementRef::filename(NONE_TRAIT)
}

fn not_none() -> Condition {
    Condition::filename_not(NONE_TRAIT)
}

fn hands(allowed_skins: Option<&[&str]>) -> LayerRule {
    LayerRule::new()
        .establishing(Establish::Skin {
            token: 0,
            allowed: allowed_skins.map(|skins| skins.iter().map(|s| s.to_string()).collect()),
        })
        .establishing(Establish::RingCompatibility {
            token: 1,
            incompatible_marker: "Lancet".to_string(),
        })
}

fn arms() -> LayerRule {
    LayerRule::new()
        .requiring(Condition::SkinMatches {
            token: 0,
            wildcards: vec!["None".to_string()],
            strip_rarity: false,
        })
        .establishing(Establish::Cloth {
            type_token: 1,
            design_token: 2,
        })
}

fn legs() -> LayerRule {
    LayerRule::new().requiring(Condition::Any(vec![
        Condition::HasNoToken { token: 1 },
        Condition::skin_matches(0),
    ]))
}

fn body() -> LayerRule {
    let garment = FIRST_MATCH_DESIGNS
        .iter()
        .fold(GarmentRule::default(), |rule, design| {
            rule.with_design_policy(design, MatchPolicy::FirstMatch)
        })
        .with_type_policy("Sweat", MatchPolicy::RandomAmongMatches);
    LayerRule::new().with_garment(garment)
}

fn rings() -> LayerRule {
    LayerRule::new().gated(StateFlag::RingCompatible, none())
}

/// Rules shared by every head profile.
fn figure(name: &str, allowed_skins: Option<&[&str]>) -> Profile {
    Profile::new(name)
        .with_rule("hands", hands(allowed_skins))
        .with_rule("arms", arms())
        .with_rule("legs", legs())
        .with_rule("body", body())
        .with_rule("rings", rings())
}

fn pin_all(profile: Profile, layers: &[&str]) -> Profile {
    layers.iter().fold(profile, |profile, layer| {
        profile.with_rule(layer, LayerRule::pinned(none()))
    })
}

fn headed() -> Profile {
    let profile = figure("headed", None)
        .with_rule("face", LayerRule::pinned(none()))
        .with_rule("head", LayerRule::pinned(none()))
        .with_rule(
            "heading",
            LayerRule::new()
                .requiring(not_none())
                .requiring(Condition::skin_matches(0)),
        )
        .with_rule("eyes", LayerRule::new().requiring(not_none()))
        .with_rule("midface", LayerRule::new().requiring(not_none()))
        .with_rule("mouth", LayerRule::new().requiring(not_none()))
        .with_rule(
            "ears",
            LayerRule::new()
                .requiring(Condition::skin_matches(0))
                .requiring(not_none()),
        );
    pin_all(profile, LIZARD_LAYERS)
}

fn masked() -> Profile {
    let profile = figure("masked", None).with_rule(
        "face",
        LayerRule::new()
            .requiring(not_none())
            .requiring(Condition::skin_matches(0)),
    );
    pin_all(pin_all(profile, HEADED_LAYERS), LIZARD_LAYERS)
}

fn lizard() -> Profile {
    let profile = figure("lizard", Some(&["Red", "Blue", "White"]))
        .with_rule("Background", LayerRule::new().requiring(not_none()))
        .with_rule("face", LayerRule::pinned(none()))
        .with_rule("head", LayerRule::pinned(none()))
        .with_rule("horns", LayerRule::pinned(none()))
        .with_rule("earrings", LayerRule::pinned(none()))
        .with_rule("lizardEyes", LayerRule::new().requiring(not_none()))
        .with_rule(
            "lizardFace",
            LayerRule::new()
                .requiring(not_none())
                .requiring(Condition::SkinMatches {
                    token: 0,
                    wildcards: Vec::new(),
                    strip_rarity: true,
                }),
        );
    pin_all(profile, HEADED_LAYERS)
}

/// The three equally likely head profiles of the `character` preset.
pub fn character_profiles() -> Vec<Profile> {
    vec![headed(), masked(), lizard()]
}
