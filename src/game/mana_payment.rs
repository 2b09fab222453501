//! Mana payment resolution
//!
//! Given a cost, the floating pool and the available sources, decide which
//! sources to tap. The solver is greedy and deterministic:
//!
//! 1. **Pool first.** Fixed pips take their exact color, hybrid pips take the
//!    acceptable color with the least floating (ties in WUBRG order), generic
//!    takes colorless first, then WUBRG.
//! 2. **Tap for the shortfall.** Fixed pips, then hybrid pips, then generic.
//!    Each unit first reuses mana already floating (excess from an earlier
//!    tap), otherwise taps the best candidate ability: lowest
//!    `auto_tap_priority`, then non-flexible before flexible, then catalog
//!    order. Whatever a tap makes beyond the unit floats.
//! 3. **Activation costs** are paid recursively from the same working state,
//!    up to a depth limit. A failed sub-payment is rolled back and the
//!    candidate skipped.
//!
//! The ordering is a heuristic. It does not look ahead, so a later pip can
//! miss a source an earlier pip consumed; callers only rely on a returned
//! plan being correct, not on it being the best allocation.
//!
//! Solving is pure: the request is borrowed, and failure returns
//! [`ManaError::InsufficientMana`] with nothing to undo.

use crate::core::{AbilityType, ColorSet, ManaColor, ManaPool, ObjectId, ParsedCost, Pip, RuleChoice};
use crate::game::catalog::{capacity_of, ManaSource, SourceAbility, Yield};
use crate::{ManaError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Nested activation costs deeper than this are not attempted
pub const DEFAULT_ACTIVATION_DEPTH: u32 = 3;

/// Order in which generic mana is taken from the pool
const GENERIC_ORDER: [ManaColor; 6] = [
    ManaColor::Colorless,
    ManaColor::White,
    ManaColor::Blue,
    ManaColor::Black,
    ManaColor::Red,
    ManaColor::Green,
];

/// Result of checking whether a mana cost can be paid
///
/// - `Yes` carries a plan
/// - `No` means provably impossible
/// - `Maybe` means the bounds allow it but the greedy search found nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentResult {
    Yes(PaymentPlan),
    No,
    Maybe,
}

/// Everything the solver reads
#[derive(Debug, Clone)]
pub struct PaymentRequest<'a> {
    /// Cost with any X already folded into generic
    pub cost: &'a ParsedCost,
    pub sources: &'a [ManaSource],
    pub pool: ManaPool,
    /// Commander color identity, preferred when a flexible source pays generic
    pub identity: ColorSet,
    pub max_depth: u32,
}

impl<'a> PaymentRequest<'a> {
    pub fn new(cost: &'a ParsedCost, sources: &'a [ManaSource], pool: ManaPool) -> Self {
        PaymentRequest {
            cost,
            sources,
            pool,
            identity: ColorSet::empty(),
            max_depth: DEFAULT_ACTIVATION_DEPTH,
        }
    }

    pub fn with_identity(mut self, identity: ColorSet) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// One activation chosen by the solver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTap {
    pub object_id: ObjectId,
    pub card_name: String,
    pub choice: RuleChoice,
    /// The color the activation was asked for
    pub color: ManaColor,
    pub produced: ManaPool,
    /// Tapped to pay another source's activation cost
    pub for_activation: bool,
}

/// A flexible source tapped for a hybrid pip it could pay more than one way
///
/// The solver went ahead with `provisional`; the player confirms or changes
/// it. Only `excess` (mana of the provisional color left floating) moves
/// when the color changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChoice {
    pub object_id: ObjectId,
    pub card_name: String,
    pub options: SmallVec<[ManaColor; 5]>,
    pub provisional: ManaColor,
    pub excess: u32,
}

/// A successful payment
///
/// Conservation: `floating_mana_remaining == prior pool +
/// mana_produced_from_tap - mana_used - activation_mana_used`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPlan {
    /// One entry per tap; a stack tapped twice appears twice
    pub tapped_source_ids: Vec<ObjectId>,
    pub floating_mana_remaining: ManaPool,
    pub mana_produced_from_tap: ManaPool,
    /// Mana spent on the cost itself
    pub mana_used: ManaPool,
    /// The part of `mana_used` that came from the pool the request started
    /// with. Floating mana is attributed to that pool before any tap's output.
    pub consumed_from_pool: ManaPool,
    /// Mana spent on activation costs of tapped sources
    pub activation_mana_used: ManaPool,
    pub taps: Vec<SourceTap>,
    pub pending_choices: Vec<PendingChoice>,
}

impl PaymentPlan {
    /// Taps per object, in order of first tap
    pub fn tap_counts(&self) -> Vec<(ObjectId, u32)> {
        let mut counts: Vec<(ObjectId, u32)> = Vec::new();
        for id in &self.tapped_source_ids {
            match counts.iter_mut().find(|(seen, _)| seen == id) {
                Some((_, n)) => *n += 1,
                None => counts.push((*id, 1)),
            }
        }
        counts
    }
}

/// Trait for mana payment resolution strategies
pub trait ManaPaymentResolver {
    /// Find a payment or fail with `InsufficientMana`
    fn solve(&self, request: &PaymentRequest<'_>) -> Result<PaymentResult>;

    /// Fast pessimistic check. Never returns `Yes`.
    fn quick_check(&self, request: &PaymentRequest<'_>) -> PaymentResult {
        match self.solve(request) {
            Ok(PaymentResult::Yes(_)) => PaymentResult::Maybe,
            _ => PaymentResult::No,
        }
    }

    fn check_payment(&self, request: &PaymentRequest<'_>) -> PaymentResult {
        if self.quick_check(request) == PaymentResult::No {
            return PaymentResult::No;
        }
        match self.solve(request) {
            Ok(result) => result,
            Err(_) => PaymentResult::Maybe,
        }
    }

    /// Pessimistic: `Maybe` counts as no
    fn can_pay(&self, request: &PaymentRequest<'_>) -> bool {
        matches!(self.check_payment(request), PaymentResult::Yes(_))
    }

    fn plan(&self, request: &PaymentRequest<'_>) -> Result<PaymentPlan> {
        match self.solve(request)? {
            PaymentResult::Yes(plan) => Ok(plan),
            _ => Err(ManaError::InsufficientMana {
                cost: request.cost.to_string(),
                unpaid: request.cost.total_converted_value(),
            }),
        }
    }
}

/// Greedy resolver described in the module docs
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyManaResolver;

impl GreedyManaResolver {
    pub fn new() -> Self {
        Self
    }
}

impl ManaPaymentResolver for GreedyManaResolver {
    fn solve(&self, request: &PaymentRequest<'_>) -> Result<PaymentResult> {
        let solver = Solver { request };
        let mut state = Working {
            charges: request.sources.iter().map(|s| s.charges).collect(),
            prior: request.pool,
            plan: PaymentPlan {
                floating_mana_remaining: request.pool,
                ..PaymentPlan::default()
            },
        };

        if let Err(unpaid) = solver.pay(&mut state, request.cost, 0, Spend::Cost) {
            return Err(ManaError::InsufficientMana {
                cost: request.cost.to_string(),
                unpaid,
            });
        }

        let mut plan = state.plan;
        // Later pips may have eaten some of the provisional excess
        let floating = plan.floating_mana_remaining;
        for choice in &mut plan.pending_choices {
            choice.excess = choice.excess.min(floating.get(choice.provisional));
        }
        Ok(PaymentResult::Yes(plan))
    }

    fn quick_check(&self, request: &PaymentRequest<'_>) -> PaymentResult {
        let capacity = capacity_of(request.sources).with_pool(&request.pool);
        if capacity.admits(request.cost) {
            PaymentResult::Maybe
        } else {
            PaymentResult::No
        }
    }
}

/// Who the mana is being spent on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Spend {
    Cost,
    Activation,
}

/// What a tap has to make
#[derive(Debug, Clone, Copy)]
enum Want<'p> {
    Color(ManaColor),
    AnyOf(&'p [ManaColor]),
    Any,
}

impl Want<'_> {
    fn matches(&self, yields: &Yield) -> bool {
        match self {
            Want::Color(color) => yields.can_make(*color),
            Want::AnyOf(options) => options.iter().any(|&c| yields.can_make(c)),
            Want::Any => true,
        }
    }
}

/// Solver state that is cloned to roll back a failed activation
#[derive(Debug, Clone)]
struct Working {
    charges: Vec<u32>,
    /// What is left of the pool the request started with
    prior: ManaPool,
    plan: PaymentPlan,
}

struct Solver<'r, 'a> {
    request: &'r PaymentRequest<'a>,
}

impl Solver<'_, '_> {
    /// Pay `cost` into `state`. On failure returns how many units were left
    /// unpaid; `state` is then garbage and the caller discards it.
    fn pay(&self, state: &mut Working, cost: &ParsedCost, depth: u32, spend: Spend) -> std::result::Result<(), u32> {
        let mut singles: SmallVec<[ManaColor; 4]> = SmallVec::new();
        let mut hybrids: SmallVec<[&Pip; 4]> = SmallVec::new();
        let mut generic = cost.generic_amount();

        // Phase 1: floating pool
        for pip in cost.symbols() {
            if let Pip::Single(color) = pip {
                if !self.take(state, *color, spend) {
                    singles.push(*color);
                }
            }
        }
        for pip in cost.symbols() {
            let paid = match pip {
                Pip::Single(_) => continue,
                Pip::Hybrid(options) => match least_floating(&state.plan.floating_mana_remaining, options) {
                    Some(color) => self.take(state, color, spend),
                    None => false,
                },
                Pip::ColorOrGeneric { color, .. } => self.take(state, *color, spend),
            };
            if !paid {
                hybrids.push(pip);
            }
        }
        while generic > 0 {
            match generic_floating(&state.plan.floating_mana_remaining) {
                Some(color) if self.take(state, color, spend) => generic -= 1,
                _ => break,
            }
        }

        // Phase 2: tap for the shortfall
        let mut outstanding = (singles.len() + hybrids.len()) as u32 + generic;

        for color in singles {
            let paid = self.take(state, color, spend)
                || (self.tap_for(state, Want::Color(color), depth).is_some() && self.take(state, color, spend));
            if !paid {
                return Err(outstanding);
            }
            outstanding -= 1;
        }

        for pip in hybrids {
            match pip {
                Pip::Hybrid(options) => {
                    let floating = least_floating(&state.plan.floating_mana_remaining, options);
                    let color = match floating {
                        Some(color) => Some(color),
                        None => self.tap_for(state, Want::AnyOf(options), depth),
                    };
                    match color {
                        Some(color) if self.take(state, color, spend) => outstanding -= 1,
                        _ => return Err(outstanding),
                    }
                }
                Pip::ColorOrGeneric { color, generic: fallback } => {
                    let paid = self.take(state, *color, spend)
                        || (self.tap_for(state, Want::Color(*color), depth).is_some()
                            && self.take(state, *color, spend));
                    outstanding -= 1;
                    if !paid {
                        generic = generic.saturating_add(*fallback);
                        outstanding = outstanding.saturating_add(*fallback);
                    }
                }
                Pip::Single(_) => {}
            }
        }

        while generic > 0 {
            if generic_floating(&state.plan.floating_mana_remaining).is_none()
                && self.tap_for(state, Want::Any, depth).is_none()
            {
                return Err(outstanding);
            }
            match generic_floating(&state.plan.floating_mana_remaining) {
                Some(color) if self.take(state, color, spend) => {
                    generic -= 1;
                    outstanding -= 1;
                }
                _ => return Err(outstanding),
            }
        }

        Ok(())
    }

    /// Spend one mana of `color` from the working pool
    fn take(&self, state: &mut Working, color: ManaColor, spend: Spend) -> bool {
        if state.plan.floating_mana_remaining.remove(color, 1).is_err() {
            return false;
        }
        let ledger = match spend {
            Spend::Cost => &mut state.plan.mana_used,
            Spend::Activation => &mut state.plan.activation_mana_used,
        };
        // remove() succeeded, so color is a pool color
        let _ = ledger.add(color, 1);
        if state.prior.remove(color, 1).is_ok() && spend == Spend::Cost {
            let _ = state.plan.consumed_from_pool.add(color, 1);
        }
        true
    }

    /// Tap the best candidate able to make `want`. Returns the color the
    /// caller should consume.
    fn tap_for(&self, state: &mut Working, want: Want<'_>, depth: u32) -> Option<ManaColor> {
        let sources = self.request.sources;
        let mut candidates: Vec<(usize, SourceAbility)> = Vec::new();
        for (index, source) in sources.iter().enumerate() {
            if state.charges[index] == 0 {
                continue;
            }
            for ability in source.abilities() {
                if ability.ability_type != AbilityType::Passive && want.matches(&ability.yields) {
                    candidates.push((index, ability));
                }
            }
        }
        // Flexibility outranks rule slot; the primary only wins a tie within its source
        candidates.sort_by_key(|(index, ability)| {
            (
                sources[*index].auto_tap_priority,
                ability.is_flexible(),
                *index,
                ability.choice == RuleChoice::Alternative,
            )
        });

        for (index, ability) in candidates {
            if let Some(cost) = &ability.activation_cost {
                if depth >= self.request.max_depth {
                    continue;
                }
                let mut trial = state.clone();
                trial.charges[index] -= 1;
                if self.pay(&mut trial, cost, depth + 1, Spend::Activation).is_err() {
                    continue;
                }
                *state = trial;
            } else {
                state.charges[index] -= 1;
            }

            let source = &sources[index];
            let color = self.pick_color(&ability.yields, want);
            let produced = ability.yields.produce(color);

            if let (Want::AnyOf(options), true) = (want, ability.is_flexible()) {
                let satisfiable: SmallVec<[ManaColor; 5]> =
                    options.iter().copied().filter(|&c| ability.yields.can_make(c)).collect();
                if satisfiable.len() >= 2 {
                    state.plan.pending_choices.push(PendingChoice {
                        object_id: source.object_id,
                        card_name: source.card_name.clone(),
                        options: satisfiable,
                        provisional: color,
                        excess: produced.get(color).saturating_sub(1),
                    });
                }
            }

            state.plan.floating_mana_remaining.merge(&produced);
            state.plan.mana_produced_from_tap.merge(&produced);
            state.plan.tapped_source_ids.push(source.object_id);
            state.plan.taps.push(SourceTap {
                object_id: source.object_id,
                card_name: source.card_name.clone(),
                choice: ability.choice,
                color,
                produced,
                for_activation: depth > 0,
            });
            return Some(color);
        }
        None
    }

    fn pick_color(&self, yields: &Yield, want: Want<'_>) -> ManaColor {
        match want {
            Want::Color(color) => color,
            Want::AnyOf(options) => {
                let satisfiable: SmallVec<[ManaColor; 5]> =
                    options.iter().copied().filter(|&c| yields.can_make(c)).collect();
                self.preferred(&satisfiable)
            }
            Want::Any => self.preferred(&yields.options()),
        }
    }

    /// Commander identity first, then the first option
    fn preferred(&self, options: &[ManaColor]) -> ManaColor {
        options
            .iter()
            .find(|&&c| self.request.identity.contains(c))
            .or_else(|| options.first())
            .copied()
            .unwrap_or(ManaColor::Colorless)
    }
}

/// Acceptable color with the least mana floating, ties in WUBRG order
fn least_floating(pool: &ManaPool, options: &[ManaColor]) -> Option<ManaColor> {
    options
        .iter()
        .copied()
        .filter(|&c| pool.get(c) > 0)
        .min_by_key(|&c| pool.get(c))
}

fn generic_floating(pool: &ManaPool) -> Option<ManaColor> {
    GENERIC_ORDER.into_iter().find(|&c| pool.get(c) > 0)
}
