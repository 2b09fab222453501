//! Per-player mana engine
//!
//! `ManaEngine` is what the UI talks to. It owns the player's floating pool,
//! undo ledger, choice resolver and rule book, and reads the board through
//! [`BoardView`]. It never mutates the board: every operation returns the
//! [`BoardIntent`]s the board collaborator must apply.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = ManaEngine::new(player, EngineConfig::default());
//! let outcome = engine.auto_pay(&board, "{2}{G}", 0)?;
//! board.apply(&outcome.intents);
//! ```

use crate::board::{BoardIntent, BoardView, Permanent, Rotation};
use crate::config::{EngineConfig, PoolEvent};
use crate::core::{CardIdentity, ManaColor, ManaPool, ManaRule, ObjectId, ParsedCost, PlayerId, RuleBook, RuleChoice};
use crate::game::catalog::{build_catalog, commander_identity, SourceAbility, SourceCatalog};
use crate::game::choice::{ChoiceResolver, ColorOrigin, Prompt};
use crate::game::logger::EngineLogger;
use crate::game::mana_payment::{GreedyManaResolver, ManaPaymentResolver, PaymentPlan, PaymentRequest};
use crate::undo::{TapSnapshot, UndoLedger, UndoRecord};
use crate::{ManaError, Result};
use std::fmt;

/// A completed auto-pay or card play
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub plan: PaymentPlan,
    pub intents: Vec<BoardIntent>,
}

/// Result of a manual tap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    Tapped {
        produced: ManaPool,
        intents: Vec<BoardIntent>,
    },
    /// Nothing happened yet; the player must answer the prompt first
    AwaitingChoice(Prompt),
}

pub struct ManaEngine {
    player_id: PlayerId,
    config: EngineConfig,
    rules: RuleBook,
    pool: ManaPool,
    ledger: UndoLedger,
    choices: ChoiceResolver,
    logger: EngineLogger,
    resolver: Box<dyn ManaPaymentResolver>,
}

impl ManaEngine {
    pub fn new(player_id: PlayerId, config: EngineConfig) -> Self {
        ManaEngine {
            player_id,
            ledger: UndoLedger::new(config.undo_capacity),
            logger: EngineLogger::with_verbosity(config.verbosity),
            config,
            rules: RuleBook::new(),
            pool: ManaPool::new(),
            choices: ChoiceResolver::new(),
            resolver: Box::new(GreedyManaResolver::new()),
        }
    }

    pub fn with_rules(mut self, rules: RuleBook) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_resolver(mut self, resolver: Box<dyn ManaPaymentResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Start from mana already floating (not undoable)
    pub fn with_pool(mut self, pool: ManaPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn pool(&self) -> &ManaPool {
        &self.pool
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn choices(&self) -> &ChoiceResolver {
        &self.choices
    }

    pub fn ledger(&self) -> &UndoLedger {
        &self.ledger
    }

    pub fn logger(&self) -> &EngineLogger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut EngineLogger {
        &mut self.logger
    }

    fn ensure_no_pending_choice(&self) -> Result<()> {
        match self.choices.current() {
            Some(prompt) => Err(ManaError::ChoicePending(prompt.object_id)),
            None => Ok(()),
        }
    }

    fn pool_intent(&self) -> BoardIntent {
        BoardIntent::PoolChanged {
            player: self.player_id,
            pool: self.pool,
        }
    }

    // ---- sources ----

    pub fn compute_sources(&self, board: &dyn BoardView) -> SourceCatalog {
        let identity = commander_identity(board, self.player_id);
        build_catalog(board.permanents(), self.player_id, &self.rules, identity)
    }

    /// Whether `cost` (with `x` for each `{X}`) could be paid right now
    pub fn can_pay(&self, board: &dyn BoardView, cost: &str, x: u32) -> bool {
        let cost = ParsedCost::parse(cost).with_x(x);
        let catalog = self.compute_sources(board);
        let request = PaymentRequest::new(&cost, &catalog.available, self.pool)
            .with_identity(commander_identity(board, self.player_id))
            .with_max_depth(self.config.max_activation_depth);
        self.resolver.can_pay(&request)
    }

    // ---- auto-pay ----

    fn solve(&self, board: &dyn BoardView, cost: &ParsedCost) -> Result<PaymentPlan> {
        let catalog = self.compute_sources(board);
        let request = PaymentRequest::new(cost, &catalog.available, self.pool)
            .with_identity(commander_identity(board, self.player_id))
            .with_max_depth(self.config.max_activation_depth);
        let plan = self.resolver.plan(&request);
        if let Err(ManaError::InsufficientMana { unpaid, .. }) = &plan {
            self.logger.auto_pay_failed(&cost.to_string(), *unpaid);
        }
        plan
    }

    /// Tap intents for a plan, plus the pre-image of every object it touches
    fn plan_intents(&self, board: &dyn BoardView, plan: &PaymentPlan) -> Result<(Vec<TapSnapshot>, Vec<BoardIntent>)> {
        let mut snapshots = Vec::new();
        let mut intents = Vec::new();
        for (object_id, count) in plan.tap_counts() {
            let permanent = board.permanent(object_id).ok_or(ManaError::UnknownSource(object_id))?;
            snapshots.push(TapSnapshot::new(object_id, permanent.tap_state()));
            intents.push(BoardIntent::set_tap_state(object_id, permanent.tap_state_after(count)));
        }
        for tap in &plan.taps {
            self.logger.activation(&tap.card_name, tap.object_id, &tap.produced);
            intents.push(BoardIntent::AbilityActivated {
                object_id: tap.object_id,
                card_name: tap.card_name.clone(),
                produced: tap.produced,
            });
        }
        Ok((snapshots, intents))
    }

    fn commit_plan(&mut self, cost: &ParsedCost, plan: &PaymentPlan) {
        self.pool = plan.floating_mana_remaining;
        self.choices.request_all(&plan.pending_choices);
        self.logger
            .auto_pay(&cost.to_string(), plan.tapped_source_ids.len(), &self.pool);
        self.logger.detail(format_args!(
            "used {} from pool, {} on activations",
            plan.consumed_from_pool, plan.activation_mana_used
        ));
    }

    /// Pay `cost` automatically. On failure nothing changes.
    pub fn auto_pay(&mut self, board: &dyn BoardView, cost: &str, x: u32) -> Result<PaymentOutcome> {
        self.ensure_no_pending_choice()?;
        let cost = ParsedCost::parse(cost).with_x(x);
        let plan = self.solve(board, &cost)?;
        let (taps, mut intents) = self.plan_intents(board, &plan)?;

        self.ledger.push(UndoRecord::AutoTapBatch {
            taps,
            prior_pool: self.pool,
        });
        self.commit_plan(&cost, &plan);
        intents.push(self.pool_intent());
        Ok(PaymentOutcome { plan, intents })
    }

    /// Pay for `card` (held by the board, not yet on the battlefield) and
    /// put it onto the battlefield
    pub fn play_card(&mut self, board: &dyn BoardView, card: &Permanent, x: u32) -> Result<PaymentOutcome> {
        self.ensure_no_pending_choice()?;
        let cost = card.card.parsed_mana_cost().with_x(x);
        let plan = self.solve(board, &cost)?;
        let (taps, mut intents) = self.plan_intents(board, &plan)?;
        let enters_tapped = self.rules.effective_rule(&card.card).enters_tapped;

        self.ledger.push(UndoRecord::PlayCard {
            card: card.object_id,
            taps,
            prior_pool: self.pool,
        });
        self.commit_plan(&cost, &plan);
        intents.push(self.pool_intent());
        intents.push(BoardIntent::CardPlayed {
            object_id: card.object_id,
            enters_tapped,
        });
        Ok(PaymentOutcome { plan, intents })
    }

    // ---- pool ----

    pub fn manual_add_to_pool(&mut self, color: ManaColor, amount: u32) -> Result<Vec<BoardIntent>> {
        let prior_pool = self.pool;
        self.pool.add(color, amount)?;
        self.ledger.push(UndoRecord::PoolAdjust { prior_pool });
        Ok(vec![self.pool_intent()])
    }

    /// Fails without changing anything if not enough is floating
    pub fn manual_remove_from_pool(&mut self, color: ManaColor, amount: u32) -> Result<Vec<BoardIntent>> {
        let prior_pool = self.pool;
        self.pool.remove(color, amount)?;
        self.ledger.push(UndoRecord::PoolAdjust { prior_pool });
        Ok(vec![self.pool_intent()])
    }

    /// Apply a turn-structure event to the pool per the persistence setting
    pub fn on_pool_event(&mut self, event: PoolEvent) -> Vec<BoardIntent> {
        if self.pool.is_empty() || !self.config.persistence.should_reset(event, self.player_id) {
            return Vec::new();
        }
        self.pool.reset();
        vec![self.pool_intent()]
    }

    // ---- manual taps ----

    /// Tap one source by hand
    ///
    /// A source with an alternative ability asks which to use unless
    /// `ability` is given; a source that makes one of several colors asks
    /// for the color. Activation costs are paid from the pool only.
    pub fn tap_source(
        &mut self,
        board: &dyn BoardView,
        object_id: ObjectId,
        ability: Option<RuleChoice>,
    ) -> Result<TapOutcome> {
        self.ensure_no_pending_choice()?;
        let catalog = self.compute_sources(board);
        let source = match catalog.available.iter().find(|s| s.object_id == object_id) {
            Some(source) => source,
            None if catalog.find(object_id).is_some() => return Err(ManaError::SourceUnavailable(object_id)),
            None => return Err(ManaError::UnknownSource(object_id)),
        };

        let choice = match ability {
            Some(choice) => choice,
            None if source.has_alternative() && source.yields().is_some() => {
                let prompt = Prompt::rule(object_id, source.card_name.clone());
                self.choices.request(prompt.clone());
                return Ok(TapOutcome::AwaitingChoice(prompt));
            }
            None => source.abilities().first().map_or(RuleChoice::Primary, |a| a.choice),
        };
        self.tap_with(board, &catalog, object_id, choice, None)
    }

    fn tap_with(
        &mut self,
        board: &dyn BoardView,
        catalog: &SourceCatalog,
        object_id: ObjectId,
        choice: RuleChoice,
        color: Option<ManaColor>,
    ) -> Result<TapOutcome> {
        let source = catalog
            .available
            .iter()
            .find(|s| s.object_id == object_id)
            .ok_or(ManaError::SourceUnavailable(object_id))?;
        let ability = source
            .ability(choice)
            .ok_or_else(|| ManaError::InvalidChoice(format!("{} has no {choice:?} ability", source.card_name)))?;

        let color = match color {
            Some(color) => color,
            None if ability.is_flexible() => {
                let prompt = Prompt::color(
                    object_id,
                    source.card_name.clone(),
                    ability.yields.options(),
                    ColorOrigin::ManualTap { ability: choice },
                );
                self.choices.request(prompt.clone());
                return Ok(TapOutcome::AwaitingChoice(prompt));
            }
            None => ability.yields.options().first().copied().unwrap_or(ManaColor::Colorless),
        };

        let card_name = source.card_name.clone();
        self.perform_tap(board, object_id, &card_name, &ability, color)
    }

    fn perform_tap(
        &mut self,
        board: &dyn BoardView,
        object_id: ObjectId,
        card_name: &str,
        ability: &SourceAbility,
        color: ManaColor,
    ) -> Result<TapOutcome> {
        let permanent = board.permanent(object_id).ok_or(ManaError::UnknownSource(object_id))?;

        let mut pool = self.pool;
        if let Some(cost) = &ability.activation_cost {
            let request = PaymentRequest::new(cost, &[], pool).with_max_depth(0);
            pool = self.resolver.plan(&request)?.floating_mana_remaining;
        }
        let produced = ability.yields.produce(color);
        pool.merge(&produced);

        self.ledger.push(UndoRecord::SingleTap {
            tap: TapSnapshot::new(object_id, permanent.tap_state()),
            prior_pool: self.pool,
        });
        self.pool = pool;
        self.logger.activation(card_name, object_id, &produced);

        let intents = vec![
            BoardIntent::set_tap_state(object_id, permanent.tap_state_after(1)),
            BoardIntent::AbilityActivated {
                object_id,
                card_name: card_name.to_string(),
                produced,
            },
            self.pool_intent(),
        ];
        Ok(TapOutcome::Tapped { produced, intents })
    }

    // ---- choices ----

    /// Answer a color prompt
    ///
    /// For a manual tap this performs the tap. For an auto-pay choice it
    /// moves any floating excess from the provisional color to `color`.
    pub fn choose_color(&mut self, board: &dyn BoardView, color: ManaColor) -> Result<Vec<BoardIntent>> {
        let answer = self.choices.choose_color(color)?;
        match answer.origin {
            ColorOrigin::ManualTap { ability } => {
                let catalog = self.compute_sources(board);
                match self.tap_with(board, &catalog, answer.object_id, ability, Some(color))? {
                    TapOutcome::Tapped { intents, .. } => Ok(intents),
                    TapOutcome::AwaitingChoice(_) => Ok(Vec::new()),
                }
            }
            ColorOrigin::AutoPay { provisional, excess } => {
                let amount = excess.min(self.pool.get(provisional));
                if color == provisional || amount == 0 {
                    return Ok(Vec::new());
                }
                let mut swapped = self.pool;
                swapped.remove(provisional, amount)?;
                swapped.add(color, amount)?;
                let prior_pool = std::mem::replace(&mut self.pool, swapped);
                self.ledger.push(UndoRecord::PoolAdjust { prior_pool });
                Ok(vec![self.pool_intent()])
            }
        }
    }

    /// Answer a rule prompt and continue the tap
    pub fn choose_rule(&mut self, board: &dyn BoardView, choice: RuleChoice) -> Result<TapOutcome> {
        let answer = self.choices.choose_rule(choice)?;
        let catalog = self.compute_sources(board);
        self.tap_with(board, &catalog, answer.object_id, answer.choice, None)
    }

    /// Drop pending prompts without changing anything
    pub fn dismiss_choice(&mut self) -> usize {
        self.choices.dismiss()
    }

    // ---- untap and undo ----

    /// Untap every permanent this player controls
    pub fn untap_all(&mut self, board: &dyn BoardView) -> Vec<BoardIntent> {
        let mut taps = Vec::new();
        let mut intents = Vec::new();
        for permanent in board.permanents().iter().filter(|p| p.controller == self.player_id) {
            let state = permanent.tap_state();
            if state.rotation == Rotation::Untapped && state.tapped_quantity == 0 {
                continue;
            }
            taps.push(TapSnapshot::new(permanent.object_id, state));
            intents.push(BoardIntent::SetTapState {
                object_id: permanent.object_id,
                rotation: Rotation::Untapped,
                tapped_quantity: 0,
            });
        }
        if !taps.is_empty() {
            self.ledger.push(UndoRecord::UntapAll {
                taps,
                prior_pool: self.pool,
            });
        }
        intents
    }

    /// Revert the most recent action. Pending prompts are dropped since
    /// they may refer to the reverted action.
    pub fn undo(&mut self) -> Option<Vec<BoardIntent>> {
        let inverse = self.ledger.pop_and_apply_inverse()?;
        self.choices.dismiss();
        self.pool = inverse.pool;
        self.logger.normal("undo");
        Some(inverse.to_intents(self.player_id))
    }

    // ---- rules ----

    pub fn set_rule(&mut self, identity: CardIdentity, rule: ManaRule) {
        self.rules.set(identity, rule);
    }

    /// Revert a card to its generated default rule
    pub fn clear_rule(&mut self, identity: &CardIdentity) -> Option<ManaRule> {
        self.rules.remove(identity)
    }

    pub fn rules_to_json(&self) -> Result<String> {
        self.rules.to_json()
    }

    pub fn rules_from_json(&mut self, json: &str) -> Result<()> {
        self.rules = RuleBook::from_json(json)?;
        Ok(())
    }
}

impl fmt::Debug for ManaEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManaEngine")
            .field("player_id", &self.player_id)
            .field("pool", &self.pool)
            .field("rules", &self.rules.len())
            .field("undo", &self.ledger.len())
            .field("choices", self.choices.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Battlefield;
    use crate::core::{CardFace, CardType, ManaAbility};
    use crate::game::choice::ChoiceState;

    fn player() -> PlayerId {
        PlayerId::new(1)
    }

    fn engine() -> ManaEngine {
        ManaEngine::new(player(), EngineConfig::default())
    }

    fn board_with(cards: Vec<CardFace>) -> Battlefield {
        let mut board = Battlefield::new();
        for (i, card) in cards.into_iter().enumerate() {
            board.add(Permanent::new(ObjectId::new(i as u32 + 1), card, player()));
        }
        board
    }

    fn tundra() -> CardFace {
        CardFace::new("Tundra")
            .with_type(CardType::Land)
            .with_subtype("Plains")
            .with_subtype("Island")
    }

    #[test]
    fn test_auto_pay_applies_and_undoes() {
        let mut board = board_with(vec![CardFace::basic_land("Forest"), CardFace::basic_land("Forest")]);
        let mut engine = engine();
        let before = board.tap_snapshot();

        let outcome = engine.auto_pay(&board, "{1}{G}", 0).unwrap();
        board.apply(&outcome.intents);
        assert!(board.permanents.iter().all(|p| p.rotation == Rotation::Tapped));
        assert_eq!(engine.ledger().len(), 1);

        let intents = engine.undo().unwrap();
        board.apply(&intents);
        assert_eq!(board.tap_snapshot(), before);
        assert!(engine.pool().is_empty());
        assert!(engine.undo().is_none());
    }

    #[test]
    fn test_failed_auto_pay_changes_nothing() {
        let board = board_with(vec![CardFace::basic_land("Forest")]);
        let mut engine = engine();
        let err = engine.auto_pay(&board, "{U}", 0).unwrap_err();
        assert!(matches!(err, ManaError::InsufficientMana { .. }));
        assert!(engine.ledger().is_empty());
        assert!(engine.pool().is_empty());
    }

    #[test]
    fn test_x_cost() {
        let board = board_with(vec![
            CardFace::basic_land("Mountain"),
            CardFace::basic_land("Mountain"),
            CardFace::basic_land("Mountain"),
        ]);
        let mut engine = engine();
        assert!(engine.can_pay(&board, "{X}{R}", 2));
        assert!(!engine.can_pay(&board, "{X}{R}", 3));
        let outcome = engine.auto_pay(&board, "{X}{R}", 2).unwrap();
        assert_eq!(outcome.plan.mana_used.total(), 3);
    }

    #[test]
    fn test_manual_tap_fixed_source() {
        let mut board = board_with(vec![CardFace::basic_land("Island")]);
        let mut engine = engine();
        let outcome = engine.tap_source(&board, ObjectId::new(1), None).unwrap();
        let TapOutcome::Tapped { produced, intents } = outcome else {
            panic!("expected a tap");
        };
        assert_eq!(produced.blue, 1);
        board.apply(&intents);
        assert_eq!(engine.pool().blue, 1);

        // Tapped now: not available
        assert!(matches!(
            engine.tap_source(&board, ObjectId::new(1), None),
            Err(ManaError::SourceUnavailable(_))
        ));
        assert!(matches!(
            engine.tap_source(&board, ObjectId::new(42), None),
            Err(ManaError::UnknownSource(_))
        ));
    }

    #[test]
    fn test_manual_tap_flexible_source_asks_for_color() {
        let mut board = board_with(vec![tundra()]);
        let mut engine = engine();
        let outcome = engine.tap_source(&board, ObjectId::new(1), None).unwrap();
        assert!(matches!(outcome, TapOutcome::AwaitingChoice(_)));
        assert!(engine.pool().is_empty());

        // Other operations wait for the answer
        assert!(matches!(
            engine.auto_pay(&board, "{1}", 0),
            Err(ManaError::ChoicePending(_))
        ));

        let intents = engine.choose_color(&board, ManaColor::Blue).unwrap();
        board.apply(&intents);
        assert_eq!(engine.pool().blue, 1);
        assert_eq!(*engine.choices().state(), ChoiceState::Idle);
        assert_eq!(board.get(ObjectId::new(1)).unwrap().rotation, Rotation::Tapped);
    }

    #[test]
    fn test_dismiss_choice_changes_nothing() {
        let board = board_with(vec![tundra()]);
        let mut engine = engine();
        engine.tap_source(&board, ObjectId::new(1), None).unwrap();
        assert_eq!(engine.dismiss_choice(), 1);
        assert!(engine.pool().is_empty());
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn test_alternative_rule_prompt() {
        let stone = CardFace::new("Mind Stone").with_type(CardType::Artifact);
        let mut board = board_with(vec![stone.clone()]);
        let mut engine = engine().with_pool(ManaPool {
            colorless: 1,
            ..ManaPool::default()
        });
        engine.set_rule(
            stone.identity(),
            ManaRule::new(ManaAbility::fixed(ManaColor::Colorless, 1))
                .with_alternative(ManaAbility::fixed(ManaColor::Red, 2).with_activation_cost("{1}")),
        );

        let outcome = engine.tap_source(&board, ObjectId::new(1), None).unwrap();
        assert!(matches!(outcome, TapOutcome::AwaitingChoice(_)));

        let outcome = engine.choose_rule(&board, RuleChoice::Alternative).unwrap();
        let TapOutcome::Tapped { intents, .. } = outcome else {
            panic!("expected a tap");
        };
        board.apply(&intents);
        // Paid {1} from the floating colorless, made RR
        assert_eq!(engine.pool().colorless, 0);
        assert_eq!(engine.pool().red, 2);
    }

    #[test]
    fn test_manual_tap_activation_needs_pool() {
        let signet = CardFace::new("Azorius Signet")
            .with_type(CardType::Artifact)
            .with_text("{1}, {T}: Add {W}{U}.");
        let board = board_with(vec![signet]);
        let mut engine = engine();
        assert!(matches!(
            engine.tap_source(&board, ObjectId::new(1), None),
            Err(ManaError::InsufficientMana { .. })
        ));
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn test_manual_pool_edits() {
        let mut engine = engine();
        engine.manual_add_to_pool(ManaColor::Green, 2).unwrap();
        assert!(matches!(
            engine.manual_remove_from_pool(ManaColor::Green, 3),
            Err(ManaError::PoolUnderflow { .. })
        ));
        assert_eq!(engine.pool().green, 2);
        engine.manual_remove_from_pool(ManaColor::Green, 1).unwrap();
        assert_eq!(engine.pool().green, 1);

        engine.undo().unwrap();
        assert_eq!(engine.pool().green, 2);
        engine.undo().unwrap();
        assert!(engine.pool().is_empty());
    }

    #[test]
    fn test_pool_overflow_is_rejected() {
        let mut engine = engine();
        engine.manual_add_to_pool(ManaColor::Red, u32::MAX).unwrap();
        assert!(matches!(
            engine.manual_add_to_pool(ManaColor::Red, 1),
            Err(ManaError::PoolOverflow { .. })
        ));
        assert_eq!(engine.pool().red, u32::MAX);
        assert_eq!(engine.ledger().len(), 1);
    }

    #[test]
    fn test_huge_x_is_insufficient() {
        let board = board_with(vec![CardFace::basic_land("Mountain")]);
        let mut engine = engine();
        assert!(!engine.can_pay(&board, "{X}{R}", u32::MAX));
        assert!(matches!(
            engine.auto_pay(&board, "{X}{R}", u32::MAX),
            Err(ManaError::InsufficientMana { .. })
        ));
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn test_tap_uses_alternative_when_primary_makes_nothing() {
        let tower = CardFace::new("Command Tower").with_type(CardType::Land);
        let mut board = board_with(vec![tower.clone()]);
        let mut engine = engine();
        engine.set_rule(
            tower.identity(),
            ManaRule::new(ManaAbility::one_of(&[ManaColor::CommanderIdentity]))
                .with_alternative(ManaAbility::fixed(ManaColor::Colorless, 1)),
        );

        let outcome = engine.tap_source(&board, ObjectId::new(1), None).unwrap();
        let TapOutcome::Tapped { intents, .. } = outcome else {
            panic!("only the alternative can make mana");
        };
        board.apply(&intents);
        assert_eq!(engine.pool().colorless, 1);
    }

    #[test]
    fn test_untap_all() {
        let mut board = Battlefield::new();
        board.add(Permanent::new(ObjectId::new(1), CardFace::basic_land("Forest"), player()).tapped());
        board.add(Permanent::new(ObjectId::new(2), CardFace::basic_land("Island"), player()).stacked(3, 2));
        board.add(Permanent::new(ObjectId::new(3), CardFace::basic_land("Swamp"), player()));
        let before = board.tap_snapshot();
        let mut engine = engine();

        let intents = engine.untap_all(&board);
        assert_eq!(intents.len(), 2);
        board.apply(&intents);
        assert_eq!(board.get(ObjectId::new(2)).unwrap().tapped_quantity, 0);

        board.apply(&engine.undo().unwrap());
        assert_eq!(board.tap_snapshot(), before);
    }

    #[test]
    fn test_play_card_and_undo() {
        let mut board = board_with(vec![CardFace::basic_land("Forest"), CardFace::basic_land("Forest")]);
        let bear = Permanent::new(
            ObjectId::new(10),
            CardFace::new("Grizzly Bears")
                .with_type(CardType::Creature)
                .with_mana_cost("{1}{G}"),
            player(),
        );
        board.stage(bear.clone());
        let mut engine = engine();

        let outcome = engine.play_card(&board, &bear, 0).unwrap();
        board.apply(&outcome.intents);
        assert!(board.get(ObjectId::new(10)).is_some());

        board.apply(&engine.undo().unwrap());
        assert!(board.get(ObjectId::new(10)).is_none());
        assert!(board.permanents.iter().all(|p| p.rotation == Rotation::Untapped));
    }

    #[test]
    fn test_pool_events_follow_persistence() {
        use crate::config::ManaPersistence;

        let mut engine = ManaEngine::new(
            player(),
            EngineConfig::default().with_persistence(ManaPersistence::UntilEndOfTurn),
        );
        engine.manual_add_to_pool(ManaColor::Red, 1).unwrap();
        assert!(engine.on_pool_event(PoolEvent::PriorityPassed).is_empty());
        assert_eq!(engine.pool().red, 1);
        assert_eq!(engine.on_pool_event(PoolEvent::EndOfTurn).len(), 1);
        assert!(engine.pool().is_empty());
    }

    #[test]
    fn test_rules_json_round_trip() {
        let mut engine = engine();
        engine.set_rule(CardIdentity::new("Sol Ring"), ManaRule::disabled());
        let json = engine.rules_to_json().unwrap();

        let mut other = ManaEngine::new(PlayerId::new(2), EngineConfig::default());
        other.rules_from_json(&json).unwrap();
        assert_eq!(other.rules(), engine.rules());

        assert!(engine.clear_rule(&CardIdentity::new("sol ring")).is_some());
        assert!(engine.rules().is_empty());
    }
}
