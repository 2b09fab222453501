//! Color and rule choices
//!
//! Some taps cannot finish without the player: a source that makes one of
//! several colors, a source with an alternative ability, or a flexible source
//! auto-pay tapped for a hybrid pip. The resolver holds those prompts. It
//! never picks on the player's behalf; it only checks that an answer is one
//! of the options it offered.
//!
//! The resolver is either `Idle` or `AwaitingChoice`. Further prompts wait in
//! a queue and surface one at a time.

use crate::core::{ManaColor, ObjectId, RuleChoice};
use crate::game::mana_payment::PendingChoice;
use crate::{ManaError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Where a color prompt came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum ColorOrigin {
    /// The player tapped the source by hand; nothing has been produced yet
    ManualTap { ability: RuleChoice },
    /// Auto-pay already produced `provisional`; `excess` of it is floating
    AutoPay { provisional: ManaColor, excess: u32 },
}

/// What the player is asked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromptKind {
    Color {
        options: SmallVec<[ManaColor; 5]>,
        origin: ColorOrigin,
    },
    /// Pick the primary or the alternative ability
    Rule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub object_id: ObjectId,
    pub card_name: String,
    pub kind: PromptKind,
}

impl Prompt {
    pub fn color(
        object_id: ObjectId,
        card_name: impl Into<String>,
        options: SmallVec<[ManaColor; 5]>,
        origin: ColorOrigin,
    ) -> Self {
        Prompt {
            object_id,
            card_name: card_name.into(),
            kind: PromptKind::Color { options, origin },
        }
    }

    pub fn rule(object_id: ObjectId, card_name: impl Into<String>) -> Self {
        Prompt {
            object_id,
            card_name: card_name.into(),
            kind: PromptKind::Rule,
        }
    }
}

impl From<&PendingChoice> for Prompt {
    fn from(pending: &PendingChoice) -> Self {
        Prompt::color(
            pending.object_id,
            pending.card_name.clone(),
            pending.options.clone(),
            ColorOrigin::AutoPay {
                provisional: pending.provisional,
                excess: pending.excess,
            },
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChoiceState {
    #[default]
    Idle,
    AwaitingChoice(Prompt),
}

/// An accepted color answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorAnswer {
    pub object_id: ObjectId,
    pub card_name: String,
    pub color: ManaColor,
    pub origin: ColorOrigin,
}

/// An accepted rule answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleAnswer {
    pub object_id: ObjectId,
    pub card_name: String,
    pub choice: RuleChoice,
}

#[derive(Debug, Clone, Default)]
pub struct ChoiceResolver {
    state: ChoiceState,
    queue: VecDeque<Prompt>,
}

impl ChoiceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ChoiceState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ChoiceState::Idle
    }

    pub fn current(&self) -> Option<&Prompt> {
        match &self.state {
            ChoiceState::AwaitingChoice(prompt) => Some(prompt),
            ChoiceState::Idle => None,
        }
    }

    /// Prompts waiting behind the current one
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Show `prompt` now, or queue it behind the current one
    pub fn request(&mut self, prompt: Prompt) {
        if self.is_idle() {
            self.state = ChoiceState::AwaitingChoice(prompt);
        } else {
            self.queue.push_back(prompt);
        }
    }

    pub fn request_all(&mut self, pending: &[PendingChoice]) {
        for choice in pending {
            self.request(Prompt::from(choice));
        }
    }

    fn advance(&mut self) {
        self.state = match self.queue.pop_front() {
            Some(next) => ChoiceState::AwaitingChoice(next),
            None => ChoiceState::Idle,
        };
    }

    /// Answer the current color prompt. A color that was not offered is
    /// rejected and the prompt stays up.
    pub fn choose_color(&mut self, color: ManaColor) -> Result<ColorAnswer> {
        let prompt = self.current().ok_or(ManaError::NoPendingChoice)?;
        let PromptKind::Color { options, origin } = &prompt.kind else {
            return Err(ManaError::InvalidChoice(format!(
                "{} is waiting for an ability choice, not a color",
                prompt.card_name
            )));
        };
        if !options.contains(&color) {
            return Err(ManaError::InvalidChoice(format!(
                "{} cannot make {color}",
                prompt.card_name
            )));
        }
        let answer = ColorAnswer {
            object_id: prompt.object_id,
            card_name: prompt.card_name.clone(),
            color,
            origin: *origin,
        };
        self.advance();
        Ok(answer)
    }

    /// Answer the current rule prompt
    pub fn choose_rule(&mut self, choice: RuleChoice) -> Result<RuleAnswer> {
        let prompt = self.current().ok_or(ManaError::NoPendingChoice)?;
        if prompt.kind != PromptKind::Rule {
            return Err(ManaError::InvalidChoice(format!(
                "{} is waiting for a color, not an ability choice",
                prompt.card_name
            )));
        }
        let answer = RuleAnswer {
            object_id: prompt.object_id,
            card_name: prompt.card_name.clone(),
            choice,
        };
        self.advance();
        Ok(answer)
    }

    /// Drop every prompt and return to `Idle`. Auto-pay choices keep their
    /// provisional colors. Returns how many prompts were dropped.
    pub fn dismiss(&mut self) -> usize {
        let dropped = self.queue.len() + usize::from(!self.is_idle());
        self.queue.clear();
        self.state = ChoiceState::Idle;
        dropped
    }
}
