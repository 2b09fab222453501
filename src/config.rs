//! Engine configuration
//!
//! Loaded from JSON; every field has a default so an empty object is a
//! valid config.

use crate::core::PlayerId;
use crate::game::logger::VerbosityLevel;
use crate::game::mana_payment::DEFAULT_ACTIVATION_DEPTH;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of undo records kept
pub const DEFAULT_UNDO_CAPACITY: usize = 64;

/// How long floating mana survives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManaPersistence {
    /// Emptied whenever priority passes or the turn changes
    #[default]
    None,
    /// Emptied at end of turn
    UntilEndOfTurn,
    /// Kept until the owner's next turn starts
    UntilNextTurn,
}

/// Game events that may empty a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    PriorityPassed,
    EndOfTurn,
    TurnStarted { active_player: PlayerId },
}

impl ManaPersistence {
    /// Whether `owner`'s pool must be emptied on `event`
    pub fn should_reset(self, event: PoolEvent, owner: PlayerId) -> bool {
        match self {
            ManaPersistence::None => true,
            ManaPersistence::UntilEndOfTurn => {
                matches!(event, PoolEvent::EndOfTurn | PoolEvent::TurnStarted { .. })
            }
            ManaPersistence::UntilNextTurn => {
                matches!(event, PoolEvent::TurnStarted { active_player } if active_player == owner)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub persistence: ManaPersistence,
    pub undo_capacity: usize,
    /// How deep activation costs may nest during auto-pay
    pub max_activation_depth: u32,
    pub verbosity: VerbosityLevel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            persistence: ManaPersistence::default(),
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            max_activation_depth: DEFAULT_ACTIVATION_DEPTH,
            verbosity: VerbosityLevel::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn with_persistence(mut self, persistence: ManaPersistence) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_undo_capacity(mut self, capacity: usize) -> Self {
        self.undo_capacity = capacity;
        self
    }
}
