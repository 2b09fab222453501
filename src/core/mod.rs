//! Core mana types: colors, pools, costs, cards and per-card rules

pub mod card;
pub mod cost;
pub mod entity;
pub mod mana;
pub mod rule;

pub use card::{CardFace, CardType};
pub use cost::{ParsedCost, Pip};
pub use entity::{CardIdentity, ObjectId, PlayerId};
pub use mana::{ColorSet, ManaColor, ManaPool};
pub use rule::{default_rule, AbilityType, ManaAbility, ManaRule, RuleBook, RuleChoice};
