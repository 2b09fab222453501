//! Per-card mana rules
//!
//! A `ManaRule` says how a card produces mana: which colors, whether the
//! ability costs mana to activate, and how eagerly auto-pay should tap it.
//! Rules are keyed by [`CardIdentity`], so every copy of a card shares one
//! rule. A rule either comes from the user (stored in a [`RuleBook`]) or is
//! generated from the card's printed data by [`default_rule`].
//!
//! A rule carries at most one alternative ability. Both slots hold a
//! non-recursive [`ManaAbility`], so a rule can never nest deeper than that.

use crate::core::{CardFace, CardIdentity, ManaColor, ParsedCost};
use crate::{ManaError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// How a mana ability is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityType {
    /// Tap the permanent (e.g. a land)
    #[default]
    Tap,
    /// Pay a mana cost (usually along with tapping)
    Activated,
    /// Produces mana on its own; never activated by the engine
    Passive,
}

/// One mana ability: what it makes and what it costs
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManaAbility {
    /// Mana symbols this ability produces. Repeating a color means more than
    /// one mana ({C}{C}); distinct colors mean a choice of one, unless
    /// `produces_all` is set.
    #[serde(default)]
    pub produced_colors: SmallVec<[ManaColor; 2]>,

    /// Every listed symbol is produced at once (e.g. "Add {W}{U}")
    #[serde(default)]
    pub produces_all: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_cost: Option<ParsedCost>,

    /// Extra generic mana required on top of `activation_cost`
    #[serde(default)]
    pub generic_activation_cost: u32,

    #[serde(default)]
    pub ability_type: AbilityType,
}

impl ManaAbility {
    /// Produces `amount` mana of one color
    pub fn fixed(color: ManaColor, amount: usize) -> Self {
        ManaAbility {
            produced_colors: std::iter::repeat(color).take(amount).collect(),
            ..ManaAbility::default()
        }
    }

    /// Produces one mana of any listed color
    pub fn one_of(colors: &[ManaColor]) -> Self {
        ManaAbility {
            produced_colors: colors.iter().copied().collect(),
            ..ManaAbility::default()
        }
    }

    /// Produces every listed symbol at once
    pub fn all_of(colors: &[ManaColor]) -> Self {
        ManaAbility {
            produced_colors: colors.iter().copied().collect(),
            produces_all: true,
            ..ManaAbility::default()
        }
    }

    pub fn with_activation_cost(mut self, cost: &str) -> Self {
        self.activation_cost = Some(ParsedCost::parse(cost));
        self.ability_type = AbilityType::Activated;
        self
    }

    /// The full mana cost of activating this ability, if any
    pub fn effective_activation_cost(&self) -> Option<ParsedCost> {
        let base = self.activation_cost.clone().unwrap_or_default();
        let cost = base.plus_generic(self.generic_activation_cost);
        if cost.is_free() {
            None
        } else {
            Some(cost)
        }
    }
}

/// Which of a rule's two abilities to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleChoice {
    Primary,
    Alternative,
}

/// Mana behavior for every copy of one card
///
/// Serialized in the same flat camelCase shape used for manual editing:
/// `{ "disabled", "entersTapped", "producedColors", "activationCost",
/// "genericActivationCost", "autoTapPriority", "alternativeRule" }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManaRule {
    #[serde(default)]
    pub disabled: bool,

    #[serde(default)]
    pub enters_tapped: bool,

    #[serde(flatten)]
    pub primary: ManaAbility,

    /// Lower taps first during auto-pay
    #[serde(default)]
    pub auto_tap_priority: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_rule: Option<ManaAbility>,
}

impl ManaRule {
    pub fn new(primary: ManaAbility) -> Self {
        ManaRule {
            primary,
            ..ManaRule::default()
        }
    }

    /// A rule that makes the card produce nothing
    pub fn disabled() -> Self {
        ManaRule {
            disabled: true,
            ..ManaRule::default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.auto_tap_priority = priority;
        self
    }

    pub fn with_alternative(mut self, alternative: ManaAbility) -> Self {
        self.alternative_rule = Some(alternative);
        self
    }

    pub fn ability(&self, choice: RuleChoice) -> Option<&ManaAbility> {
        match choice {
            RuleChoice::Primary => Some(&self.primary),
            RuleChoice::Alternative => self.alternative_rule.as_ref(),
        }
    }
}

/// User-edited mana rules keyed by card identity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleBook {
    rules: FxHashMap<CardIdentity, ManaRule>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &CardIdentity) -> Option<&ManaRule> {
        self.rules.get(identity)
    }

    pub fn set(&mut self, identity: CardIdentity, rule: ManaRule) {
        self.rules.insert(identity, rule);
    }

    pub fn remove(&mut self, identity: &CardIdentity) -> Option<ManaRule> {
        self.rules.remove(identity)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rule in force for a card: the user's rule if present, else the default
    pub fn effective_rule(&self, card: &CardFace) -> ManaRule {
        match self.rules.get(&card.identity()) {
            Some(rule) => rule.clone(),
            None => default_rule(card),
        }
    }

    /// Serialize as `{ cardIdentity: ManaRule }`, keys sorted
    pub fn to_json(&self) -> Result<String> {
        let sorted: BTreeMap<&CardIdentity, &ManaRule> = self.rules.iter().collect();
        Ok(serde_json::to_string_pretty(&sorted)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let rules: FxHashMap<CardIdentity, ManaRule> = serde_json::from_str(json)?;
        for (identity, rule) in &rules {
            if let Some(alt) = &rule.alternative_rule {
                if alt.produced_colors.is_empty() {
                    return Err(ManaError::InvalidRule(format!(
                        "{identity}: alternative rule produces no mana"
                    )));
                }
            }
        }
        Ok(RuleBook { rules })
    }
}

/// Generate a rule from printed card data
///
/// Lands produce the colors of their basic land types, else whatever their
/// text adds, else their printed producible-mana list, else colorless.
/// Other permanents are sources only when their data marks a mana ability;
/// a marked ability with no readable color produces colorless.
pub fn default_rule(card: &CardFace) -> ManaRule {
    let text = card.text.to_lowercase();
    let enters_tapped = text.contains("enters the battlefield tapped") || text.contains("enters tapped");
    let ability_line = text.lines().find(|line| line.contains(": add") || line.starts_with("add "));
    let parsed = ability_line.map(parse_ability_line);

    let mut ability = parsed.clone().unwrap_or_default();
    let basic_colors = card.basic_land_colors();

    if card.is_land() && !basic_colors.is_empty() {
        ability.produced_colors = basic_colors;
        ability.produces_all = false;
    } else if !card.produced_mana.is_empty() {
        let has_text_colors = parsed.as_ref().is_some_and(|a| !a.produced_colors.is_empty());
        if !has_text_colors {
            ability.produced_colors = card.produced_mana.clone();
            ability.produces_all = false;
        }
    } else if ability.produced_colors.is_empty() {
        if card.is_land() || parsed.is_some() {
            ability.produced_colors = smallvec::smallvec![ManaColor::Colorless];
        } else {
            return ManaRule {
                enters_tapped,
                ..ManaRule::disabled()
            };
        }
    }

    let distinct = distinct_count(&ability.produced_colors);
    let flexible = (distinct > 1 && !ability.produces_all)
        || ability.produced_colors.iter().any(|c| c.is_pseudo());
    let auto_tap_priority = if ability.effective_activation_cost().is_some() {
        4
    } else if flexible {
        3
    } else if card.is_basic_land() {
        0
    } else if card.is_land() {
        1
    } else {
        2
    };

    ManaRule {
        disabled: false,
        enters_tapped,
        primary: ability,
        auto_tap_priority,
        alternative_rule: None,
    }
}

fn distinct_count(colors: &[ManaColor]) -> usize {
    let mut seen: SmallVec<[ManaColor; 6]> = SmallVec::new();
    for color in colors {
        if !seen.contains(color) {
            seen.push(*color);
        }
    }
    seen.len()
}

/// Read one lowercase oracle line such as "{1}, {t}: add {w}{u}."
fn parse_ability_line(line: &str) -> ManaAbility {
    let (cost_part, effect_part) = match line.find(": add") {
        Some(pos) => (&line[..pos], &line[pos + 1..]),
        None => ("", line),
    };

    let mut ability = ManaAbility::default();

    if effect_part.contains("color identity") {
        ability.produced_colors.push(ManaColor::CommanderIdentity);
    } else if effect_part.contains("any color") {
        ability.produced_colors.push(ManaColor::AnyColor);
    } else {
        let produced = ParsedCost::parse(effect_part);
        for _ in 0..produced.generic_amount() {
            // "{2}" in an add clause is old templating for colorless
            ability.produced_colors.push(ManaColor::Colorless);
        }
        for pip in produced.symbols() {
            ability.produced_colors.extend(pip.options());
        }
        ability.produces_all = distinct_count(&ability.produced_colors) > 1 && !effect_part.contains(" or ");
    }

    let cost = ParsedCost::parse(cost_part);
    let taps = cost_part.contains("{t}");
    if !cost.is_free() {
        ability.activation_cost = Some(cost);
        ability.ability_type = AbilityType::Activated;
    } else if taps || (cost_part.is_empty() && line.contains(": add")) {
        ability.ability_type = AbilityType::Tap;
    } else {
        ability.ability_type = AbilityType::Passive;
    }

    ability
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CardType;

    fn artifact(name: &str, text: &str) -> CardFace {
        CardFace::new(name).with_type(CardType::Artifact).with_text(text)
    }

    #[test]
    fn test_basic_land_default() {
        let rule = default_rule(&CardFace::basic_land("Forest"));
        assert!(!rule.disabled);
        assert_eq!(rule.primary.produced_colors.as_slice(), &[ManaColor::Green]);
        assert_eq!(rule.auto_tap_priority, 0);
        assert_eq!(rule.primary.ability_type, AbilityType::Tap);
    }

    #[test]
    fn test_dual_land_default_is_flexible() {
        let tundra = CardFace::new("Tundra")
            .with_type(CardType::Land)
            .with_subtype("Plains")
            .with_subtype("Island");
        let rule = default_rule(&tundra);
        assert_eq!(
            rule.primary.produced_colors.as_slice(),
            &[ManaColor::White, ManaColor::Blue]
        );
        assert!(!rule.primary.produces_all);
        assert_eq!(rule.auto_tap_priority, 3);
    }

    #[test]
    fn test_sol_ring_from_text() {
        let rule = default_rule(&artifact("Sol Ring", "{T}: Add {C}{C}."));
        assert_eq!(
            rule.primary.produced_colors.as_slice(),
            &[ManaColor::Colorless, ManaColor::Colorless]
        );
        assert!(!rule.primary.produces_all);
        assert_eq!(rule.auto_tap_priority, 2);
    }

    #[test]
    fn test_signet_has_activation_cost() {
        let rule = default_rule(&artifact("Azorius Signet", "{1}, {T}: Add {W}{U}."));
        assert!(rule.primary.produces_all);
        assert_eq!(rule.primary.ability_type, AbilityType::Activated);
        let cost = rule.primary.effective_activation_cost().unwrap();
        assert_eq!(cost.generic_amount(), 1);
        assert_eq!(rule.auto_tap_priority, 4);
    }

    #[test]
    fn test_any_color_and_commander_text() {
        let birds = CardFace::new("Birds of Paradise")
            .with_type(CardType::Creature)
            .with_text("Flying\n{T}: Add one mana of any color.");
        assert_eq!(
            default_rule(&birds).primary.produced_colors.as_slice(),
            &[ManaColor::AnyColor]
        );

        let tower = CardFace::new("Command Tower")
            .with_type(CardType::Land)
            .with_text("{T}: Add one mana of any color in your commander's color identity.");
        assert_eq!(
            default_rule(&tower).primary.produced_colors.as_slice(),
            &[ManaColor::CommanderIdentity]
        );
    }

    #[test]
    fn test_enters_tapped_and_or_clause() {
        let land = CardFace::new("Azorius Guildgate")
            .with_type(CardType::Land)
            .with_text("Azorius Guildgate enters the battlefield tapped.\n{T}: Add {W} or {U}.");
        let rule = default_rule(&land);
        assert!(rule.enters_tapped);
        assert!(!rule.primary.produces_all);
        assert_eq!(rule.primary.produced_colors.len(), 2);
    }

    #[test]
    fn test_non_land_without_mana_ability_is_disabled() {
        let bear = CardFace::new("Grizzly Bears").with_type(CardType::Creature);
        assert!(default_rule(&bear).disabled);

        let mut marked = CardFace::new("Mystery Rock").with_type(CardType::Artifact);
        marked.produced_mana.push(ManaColor::Red);
        assert_eq!(
            default_rule(&marked).primary.produced_colors.as_slice(),
            &[ManaColor::Red]
        );
    }

    #[test]
    fn test_land_without_colors_defaults_to_colorless() {
        let land = CardFace::new("Strange Land").with_type(CardType::Land);
        assert_eq!(
            default_rule(&land).primary.produced_colors.as_slice(),
            &[ManaColor::Colorless]
        );
    }

    #[test]
    fn test_rule_json_shape_round_trips() {
        let rule = ManaRule::new(ManaAbility::fixed(ManaColor::Colorless, 2))
            .with_priority(1)
            .with_alternative(ManaAbility::one_of(&[ManaColor::Red]).with_activation_cost("{1}"));
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["producedColors"], serde_json::json!(["C", "C"]));
        assert_eq!(json["autoTapPriority"], 1);
        assert_eq!(json["alternativeRule"]["activationCost"], "{1}");

        let back: ManaRule = serde_json::from_value(json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_rule_book_effective_rule_and_json() {
        let mut book = RuleBook::new();
        let ring = artifact("Sol Ring", "{T}: Add {C}{C}.");
        book.set(ring.identity(), ManaRule::disabled());
        assert!(book.effective_rule(&ring).disabled);
        assert!(!book.effective_rule(&CardFace::basic_land("Island")).disabled);

        let json = book.to_json().unwrap();
        let restored = RuleBook::from_json(&json).unwrap();
        assert_eq!(restored, book);
    }

    #[test]
    fn test_rule_book_rejects_empty_alternative() {
        let json = r#"{"forest": {"producedColors": ["G"], "alternativeRule": {}}}"#;
        assert!(matches!(RuleBook::from_json(json), Err(ManaError::InvalidRule(_))));
    }

    #[test]
    fn test_effective_activation_cost_combines_generic() {
        let mut ability = ManaAbility::fixed(ManaColor::Green, 1).with_activation_cost("{G}");
        ability.generic_activation_cost = 2;
        let cost = ability.effective_activation_cost().unwrap();
        assert_eq!(cost.to_string(), "{2}{G}");
        assert!(ManaAbility::fixed(ManaColor::Green, 1).effective_activation_cost().is_none());
    }
}
