//! Mana source discovery
//!
//! Projects a player's permanents and the rule book into a [`SourceCatalog`]:
//! the sources auto-pay may use right now (`available`) and the ones it may
//! not (`potential`: tapped, summoning sick, or passive). The catalog is a
//! pure function of its inputs and is rebuilt after every board change.
//!
//! ## Production shapes
//!
//! A rule's produced-color list is read as one of three [`Yield`]s:
//!
//! - one distinct color, repeated or not: that many mana of that color
//!   (`[C, C]` is two colorless)
//! - several distinct colors with `produces_all`: every symbol at once
//! - anything else (including `AnyColor`): one chosen color, as many times
//!   as the most repeated color in the list
//!
//! `CommanderIdentity` is expanded against the commander's colors while the
//! catalog is built; a rule left with nothing to produce is not a source.

use crate::board::{BoardView, Permanent};
use crate::core::{
    AbilityType, CardIdentity, ColorSet, ManaAbility, ManaColor, ManaPool, ObjectId, ParsedCost, Pip, PlayerId,
    RuleBook, RuleChoice,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// What one activation of an ability puts into the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Yield {
    /// `count` mana of a single color
    Fixed { color: ManaColor, count: u32 },
    /// Every listed symbol at once
    All { mana: ManaPool },
    /// `count` mana of one color picked from `options`
    Choice {
        options: SmallVec<[ManaColor; 5]>,
        count: u32,
    },
}

impl Yield {
    /// Read a produced-color list. Pseudo-symbols must already be expanded
    /// except `AnyColor`.
    pub fn from_colors(colors: &[ManaColor], produces_all: bool) -> Option<Yield> {
        if colors.is_empty() {
            return None;
        }

        let mut distinct: SmallVec<[ManaColor; 5]> = SmallVec::new();
        let mut any_color = false;
        for &color in colors {
            if color == ManaColor::AnyColor {
                any_color = true;
            } else if color.is_pool_color() && !distinct.contains(&color) {
                distinct.push(color);
            }
        }

        let multiplicity = |c: ManaColor| colors.iter().filter(|&&x| x == c).count() as u32;

        if !any_color && distinct.len() == 1 {
            let color = distinct[0];
            return Some(Yield::Fixed {
                color,
                count: multiplicity(color),
            });
        }

        if !any_color && produces_all && !distinct.is_empty() {
            let mut mana = ManaPool::new();
            for &color in colors {
                // distinct only holds pool colors
                if color.is_pool_color() {
                    mana.add(color, 1).ok()?;
                }
            }
            return Some(Yield::All { mana });
        }

        let mut options = distinct;
        if any_color {
            for color in ManaColor::COLORS {
                if !options.contains(&color) {
                    options.push(color);
                }
            }
        }
        if options.is_empty() {
            return None;
        }
        options.sort();
        let count = options.iter().map(|&c| multiplicity(c)).max().unwrap_or(0).max(1);
        Some(Yield::Choice { options, count })
    }

    pub fn is_flexible(&self) -> bool {
        matches!(self, Yield::Choice { options, .. } if options.len() > 1)
    }

    /// Total mana one activation makes
    pub fn mana_count(&self) -> u32 {
        match self {
            Yield::Fixed { count, .. } | Yield::Choice { count, .. } => *count,
            Yield::All { mana } => mana.total(),
        }
    }

    pub fn can_make(&self, color: ManaColor) -> bool {
        match self {
            Yield::Fixed { color: c, .. } => *c == color,
            Yield::All { mana } => mana.get(color) > 0,
            Yield::Choice { options, .. } => options.contains(&color),
        }
    }

    /// Colors this yield can put into the pool
    pub fn options(&self) -> SmallVec<[ManaColor; 5]> {
        match self {
            Yield::Fixed { color, .. } => smallvec::smallvec![*color],
            Yield::All { mana } => mana.iter().filter(|(_, n)| *n > 0).map(|(c, _)| c).collect(),
            Yield::Choice { options, .. } => options.clone(),
        }
    }

    /// Most mana of `color` a single activation can make
    pub fn max_of(&self, color: ManaColor) -> u32 {
        match self {
            Yield::Fixed { color: c, count } if *c == color => *count,
            Yield::All { mana } => mana.get(color),
            Yield::Choice { options, count } if options.contains(&color) => *count,
            _ => 0,
        }
    }

    /// The mana produced when `chosen` is picked (ignored unless this is a choice)
    pub fn produce(&self, chosen: ManaColor) -> ManaPool {
        let mut pool = ManaPool::new();
        match self {
            Yield::Fixed { color, count } => {
                let _ = pool.add(*color, *count);
            }
            Yield::All { mana } => pool = *mana,
            Yield::Choice { options, count } => {
                let color = if options.contains(&chosen) { chosen } else { options[0] };
                let _ = pool.add(color, *count);
            }
        }
        pool
    }
}

/// One usable mana ability of a source, with pseudo-colors resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAbility {
    pub choice: RuleChoice,
    pub ability_type: AbilityType,
    pub activation_cost: Option<ParsedCost>,
    pub yields: Yield,
}

impl SourceAbility {
    pub fn is_flexible(&self) -> bool {
        self.yields.is_flexible()
    }
}

/// A permanent that can make mana, as the solver and the UI see it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaSource {
    pub object_id: ObjectId,
    pub card_name: String,
    pub card_identity: CardIdentity,
    /// Produced colors after commander identity expansion
    pub produced_mana: SmallVec<[ManaColor; 2]>,
    pub produces_all: bool,
    pub ability_type: AbilityType,
    pub activation_cost: Option<ParsedCost>,
    pub is_flexible: bool,
    pub mana_count: u32,
    pub alternative_rule: Option<ManaAbility>,
    pub auto_tap_priority: i32,
    /// Copies that can still be tapped
    pub charges: u32,
    pub is_stack: bool,
}

impl ManaSource {
    /// An untapped single-copy source using `ability` as its primary ability
    pub fn new(object_id: ObjectId, card_name: &str, ability: &ManaAbility) -> Self {
        let yields = Yield::from_colors(&ability.produced_colors, ability.produces_all);
        ManaSource {
            object_id,
            card_name: card_name.to_string(),
            card_identity: CardIdentity::new(card_name),
            produced_mana: ability.produced_colors.clone(),
            produces_all: ability.produces_all,
            ability_type: ability.ability_type,
            activation_cost: ability.effective_activation_cost(),
            is_flexible: yields.as_ref().is_some_and(Yield::is_flexible),
            mana_count: yields.as_ref().map_or(0, Yield::mana_count),
            alternative_rule: None,
            auto_tap_priority: 0,
            charges: 1,
            is_stack: false,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.auto_tap_priority = priority;
        self
    }

    pub fn with_charges(mut self, charges: u32) -> Self {
        self.charges = charges;
        self.is_stack = charges > 1;
        self
    }

    pub fn with_alternative(mut self, alternative: ManaAbility) -> Self {
        self.alternative_rule = Some(alternative);
        self
    }

    pub fn yields(&self) -> Option<Yield> {
        Yield::from_colors(&self.produced_mana, self.produces_all)
    }

    /// The primary ability, then the alternative if the rule has one
    pub fn abilities(&self) -> SmallVec<[SourceAbility; 2]> {
        let mut abilities = SmallVec::new();
        if let Some(yields) = self.yields() {
            abilities.push(SourceAbility {
                choice: RuleChoice::Primary,
                ability_type: self.ability_type,
                activation_cost: self.activation_cost.clone(),
                yields,
            });
        }
        if let Some(alt) = &self.alternative_rule {
            if let Some(yields) = Yield::from_colors(&alt.produced_colors, alt.produces_all) {
                abilities.push(SourceAbility {
                    choice: RuleChoice::Alternative,
                    ability_type: alt.ability_type,
                    activation_cost: alt.effective_activation_cost(),
                    yields,
                });
            }
        }
        abilities
    }

    pub fn ability(&self, choice: RuleChoice) -> Option<SourceAbility> {
        self.abilities().into_iter().find(|a| a.choice == choice)
    }

    pub fn has_alternative(&self) -> bool {
        self.alternative_rule.is_some()
    }
}

/// Upper bound on the mana a player could make right now
///
/// Per-color counts ignore activation costs; `total` counts each activation
/// at its net gain. Both are bounds, not promises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaCapacity {
    pub white: u32,
    pub blue: u32,
    pub black: u32,
    pub red: u32,
    pub green: u32,
    pub colorless: u32,
    pub total: u32,
}

impl ManaCapacity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, color: ManaColor) -> u32 {
        match color {
            ManaColor::White => self.white,
            ManaColor::Blue => self.blue,
            ManaColor::Black => self.black,
            ManaColor::Red => self.red,
            ManaColor::Green => self.green,
            ManaColor::Colorless => self.colorless,
            _ => 0,
        }
    }

    fn add(&mut self, color: ManaColor, amount: u32) {
        let slot = match color {
            ManaColor::White => &mut self.white,
            ManaColor::Blue => &mut self.blue,
            ManaColor::Black => &mut self.black,
            ManaColor::Red => &mut self.red,
            ManaColor::Green => &mut self.green,
            ManaColor::Colorless => &mut self.colorless,
            _ => return,
        };
        *slot = slot.saturating_add(amount);
    }

    /// Include mana already floating
    pub fn with_pool(mut self, pool: &ManaPool) -> Self {
        for (color, amount) in pool.iter() {
            self.add(color, amount);
        }
        self.total = self.total.saturating_add(pool.total());
        self
    }

    /// False only when `cost` provably cannot be paid
    ///
    /// Checks the total and every fixed single-color pip. Hybrid pips only
    /// need one of their colors.
    pub fn admits(&self, cost: &ParsedCost) -> bool {
        if cost.total_converted_value() > self.total {
            return false;
        }
        for color in ManaColor::POOL_COLORS {
            let needed = cost.symbols().iter().filter(|pip| **pip == Pip::Single(color)).count() as u32;
            if needed > self.get(color) {
                return false;
            }
        }
        cost.symbols().iter().all(|pip| match pip {
            Pip::ColorOrGeneric { .. } => true,
            _ => pip.options().iter().any(|&c| self.get(c) > 0),
        })
    }
}

/// Sources split by whether auto-pay may use them now
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCatalog {
    pub available: Vec<ManaSource>,
    pub potential: Vec<ManaSource>,
}

impl SourceCatalog {
    pub fn find(&self, object_id: ObjectId) -> Option<&ManaSource> {
        self.available
            .iter()
            .chain(self.potential.iter())
            .find(|s| s.object_id == object_id)
    }

    pub fn is_available(&self, object_id: ObjectId) -> bool {
        self.available.iter().any(|s| s.object_id == object_id)
    }

    /// Bound on producible mana from the available sources
    pub fn capacity(&self) -> ManaCapacity {
        capacity_of(&self.available)
    }
}

/// Bound on producible mana from `sources`, counting every remaining charge
pub fn capacity_of(sources: &[ManaSource]) -> ManaCapacity {
    let mut capacity = ManaCapacity::new();
    for source in sources {
        let abilities: SmallVec<[SourceAbility; 2]> = source
            .abilities()
            .into_iter()
            .filter(|a| a.ability_type != AbilityType::Passive)
            .collect();
        for color in ManaColor::POOL_COLORS {
            let best = abilities.iter().map(|a| a.yields.max_of(color)).max().unwrap_or(0);
            capacity.add(color, best.saturating_mul(source.charges));
        }
        let net = abilities
            .iter()
            .map(|a| {
                let cost = a.activation_cost.as_ref().map_or(0, |c| c.total_converted_value());
                a.yields.mana_count().saturating_sub(cost)
            })
            .max()
            .unwrap_or(0);
        capacity.total = capacity.total.saturating_add(net.saturating_mul(source.charges));
    }
    capacity
}

/// Replace `CommanderIdentity` with the identity's colors
fn expand_identity(colors: &[ManaColor], identity: ColorSet) -> (SmallVec<[ManaColor; 2]>, bool) {
    let mut expanded = SmallVec::new();
    let mut touched = false;
    for &color in colors {
        if color == ManaColor::CommanderIdentity {
            touched = true;
            for c in identity.iter() {
                if !expanded.contains(&c) {
                    expanded.push(c);
                }
            }
        } else {
            expanded.push(color);
        }
    }
    (expanded, touched)
}

fn project(permanent: &Permanent, rules: &RuleBook, identity: ColorSet) -> Option<ManaSource> {
    let rule = rules.effective_rule(&permanent.card);
    if rule.disabled {
        return None;
    }

    let (produced_colors, expanded) = expand_identity(&rule.primary.produced_colors, identity);
    let primary = ManaAbility {
        produces_all: rule.primary.produces_all && !expanded,
        produced_colors,
        ..rule.primary.clone()
    };
    let alternative_rule = rule.alternative_rule.as_ref().and_then(|alt| {
        let (colors, touched) = expand_identity(&alt.produced_colors, identity);
        if colors.is_empty() {
            return None;
        }
        Some(ManaAbility {
            produced_colors: colors,
            produces_all: alt.produces_all && !touched,
            ..alt.clone()
        })
    });

    // A primary with nothing to make still leaves the alternative
    if Yield::from_colors(&primary.produced_colors, primary.produces_all).is_none() && alternative_rule.is_none() {
        return None;
    }

    Some(ManaSource {
        card_identity: permanent.card.identity(),
        alternative_rule,
        auto_tap_priority: rule.auto_tap_priority,
        charges: permanent.untapped_copies(),
        is_stack: permanent.is_stack(),
        ..ManaSource::new(permanent.object_id, &permanent.card.name, &primary)
    })
}

/// Commander color identity from the board's commander card
pub fn commander_identity(board: &dyn BoardView, player: PlayerId) -> ColorSet {
    board
        .commander(player)
        .map(|card| card.parsed_mana_cost().color_identity())
        .unwrap_or_default()
}

/// Build the catalog for the permanents `player` controls
pub fn build_catalog(permanents: &[Permanent], player: PlayerId, rules: &RuleBook, identity: ColorSet) -> SourceCatalog {
    let mut catalog = SourceCatalog::default();
    for permanent in permanents.iter().filter(|p| p.controller == player) {
        let Some(source) = project(permanent, rules, identity) else {
            continue;
        };
        let usable = source.charges > 0
            && !permanent.summoning_sick
            && source.abilities().iter().any(|a| a.ability_type != AbilityType::Passive);
        if usable {
            catalog.available.push(source);
        } else {
            catalog.potential.push(source);
        }
    }
    catalog
}
