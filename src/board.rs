//! Board-state seam
//!
//! The engine never owns the battlefield. It reads permanents through
//! [`BoardView`] and answers with [`BoardIntent`]s that the board collaborator
//! applies and mirrors to other players. [`Battlefield`] is a plain in-memory
//! collaborator used by the CLI and by tests.

use crate::core::{CardFace, ManaPool, ObjectId, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a permanent is turned sideways
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    Untapped,
    Tapped,
}

/// Tapped state of one board object, enough to restore it exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TapState {
    pub rotation: Rotation,
    pub tapped_quantity: u32,
}

fn one() -> u32 {
    1
}

/// A permanent on the battlefield
///
/// Several identical copies may be grouped into one object (a stack) with a
/// quantity and an independently tracked tapped count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permanent {
    pub object_id: ObjectId,
    pub card: CardFace,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default = "one")]
    pub stack_quantity: u32,
    #[serde(default)]
    pub tapped_quantity: u32,
    pub controller: PlayerId,
    /// Set by the board for creatures that cannot tap yet this turn
    #[serde(default)]
    pub summoning_sick: bool,
}

impl Permanent {
    pub fn new(object_id: ObjectId, card: CardFace, controller: PlayerId) -> Self {
        Permanent {
            object_id,
            card,
            rotation: Rotation::Untapped,
            stack_quantity: 1,
            tapped_quantity: 0,
            controller,
            summoning_sick: false,
        }
    }

    /// Group `quantity` copies, `tapped` of which are already tapped
    pub fn stacked(mut self, quantity: u32, tapped: u32) -> Self {
        self.stack_quantity = quantity;
        self.tapped_quantity = tapped.min(quantity);
        if quantity > 0 && self.tapped_quantity == quantity {
            self.rotation = Rotation::Tapped;
        }
        self
    }

    pub fn tapped(mut self) -> Self {
        self.rotation = Rotation::Tapped;
        self
    }

    pub fn is_stack(&self) -> bool {
        self.stack_quantity > 1
    }

    /// How many copies could still be tapped for mana
    pub fn untapped_copies(&self) -> u32 {
        if self.is_stack() {
            self.stack_quantity.saturating_sub(self.tapped_quantity)
        } else if self.rotation == Rotation::Untapped {
            1
        } else {
            0
        }
    }

    pub fn tap_state(&self) -> TapState {
        TapState {
            rotation: self.rotation,
            tapped_quantity: self.tapped_quantity,
        }
    }

    /// The state after tapping `copies` more copies
    ///
    /// A stack only rotates once every copy is tapped.
    pub fn tap_state_after(&self, copies: u32) -> TapState {
        if self.is_stack() {
            let tapped_quantity = (self.tapped_quantity + copies).min(self.stack_quantity);
            let rotation = if tapped_quantity == self.stack_quantity {
                Rotation::Tapped
            } else {
                self.rotation
            };
            TapState {
                rotation,
                tapped_quantity,
            }
        } else if copies > 0 {
            TapState {
                rotation: Rotation::Tapped,
                tapped_quantity: self.tapped_quantity,
            }
        } else {
            self.tap_state()
        }
    }
}

/// A change the engine asks the board collaborator to make or broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum BoardIntent {
    /// Set rotation and tapped count for one object
    SetTapState {
        object_id: ObjectId,
        rotation: Rotation,
        tapped_quantity: u32,
    },
    /// An object's mana ability was activated (for the game log)
    AbilityActivated {
        object_id: ObjectId,
        card_name: String,
        produced: ManaPool,
    },
    /// The player's floating mana now equals `pool` (for display)
    PoolChanged { player: PlayerId, pool: ManaPool },
    /// A card paid for from hand enters the battlefield
    CardPlayed { object_id: ObjectId, enters_tapped: bool },
    /// An undone play: the card goes back to hand
    CardReturned { object_id: ObjectId },
}

impl BoardIntent {
    pub fn set_tap_state(object_id: ObjectId, state: TapState) -> Self {
        BoardIntent::SetTapState {
            object_id,
            rotation: state.rotation,
            tapped_quantity: state.tapped_quantity,
        }
    }
}

/// Read access to the board
pub trait BoardView {
    fn permanents(&self) -> &[Permanent];

    /// The commander card a player's color identity derives from
    fn commander(&self, player: PlayerId) -> Option<&CardFace>;

    fn permanent(&self, object_id: ObjectId) -> Option<&Permanent> {
        self.permanents().iter().find(|p| p.object_id == object_id)
    }
}

/// In-memory board collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Battlefield {
    #[serde(default)]
    pub permanents: Vec<Permanent>,

    #[serde(default)]
    pub commanders: BTreeMap<PlayerId, CardFace>,

    /// Cards cast from hand that have not entered yet (or were undone)
    #[serde(default)]
    pub staged: Vec<Permanent>,

    /// Mirrored floating mana per player
    #[serde(skip)]
    pub pools: BTreeMap<PlayerId, ManaPool>,

    /// Activation log as (object, card name)
    #[serde(skip)]
    pub activations: Vec<(ObjectId, String)>,
}

impl Battlefield {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, permanent: Permanent) {
        self.permanents.push(permanent);
    }

    /// Hold a card in hand so a later `CardPlayed` intent can put it onto the battlefield
    pub fn stage(&mut self, permanent: Permanent) {
        self.staged.push(permanent);
    }

    pub fn set_commander(&mut self, player: PlayerId, card: CardFace) {
        self.commanders.insert(player, card);
    }

    pub fn get(&self, object_id: ObjectId) -> Option<&Permanent> {
        self.permanents.iter().find(|p| p.object_id == object_id)
    }

    fn get_mut(&mut self, object_id: ObjectId) -> Option<&mut Permanent> {
        self.permanents.iter_mut().find(|p| p.object_id == object_id)
    }

    /// Tap state of every permanent, for before/after comparisons
    pub fn tap_snapshot(&self) -> Vec<(ObjectId, TapState)> {
        self.permanents.iter().map(|p| (p.object_id, p.tap_state())).collect()
    }

    /// Apply intents in order. Intents naming unknown objects are skipped.
    pub fn apply(&mut self, intents: &[BoardIntent]) {
        for intent in intents {
            match intent {
                BoardIntent::SetTapState {
                    object_id,
                    rotation,
                    tapped_quantity,
                } => {
                    if let Some(permanent) = self.get_mut(*object_id) {
                        permanent.rotation = *rotation;
                        permanent.tapped_quantity = *tapped_quantity;
                    }
                }
                BoardIntent::AbilityActivated {
                    object_id, card_name, ..
                } => {
                    self.activations.push((*object_id, card_name.clone()));
                }
                BoardIntent::PoolChanged { player, pool } => {
                    self.pools.insert(*player, *pool);
                }
                BoardIntent::CardPlayed {
                    object_id,
                    enters_tapped,
                } => {
                    if let Some(pos) = self.staged.iter().position(|p| p.object_id == *object_id) {
                        let mut permanent = self.staged.remove(pos);
                        if *enters_tapped {
                            permanent.rotation = Rotation::Tapped;
                        }
                        self.permanents.push(permanent);
                    }
                }
                BoardIntent::CardReturned { object_id } => {
                    if let Some(pos) = self.permanents.iter().position(|p| p.object_id == *object_id) {
                        let mut permanent = self.permanents.remove(pos);
                        permanent.rotation = Rotation::Untapped;
                        permanent.tapped_quantity = 0;
                        self.staged.push(permanent);
                    }
                }
            }
        }
    }
}

impl BoardView for Battlefield {
    fn permanents(&self) -> &[Permanent] {
        &self.permanents
    }

    fn commander(&self, player: PlayerId) -> Option<&CardFace> {
        self.commanders.get(&player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn island_stack(quantity: u32, tapped: u32) -> Permanent {
        Permanent::new(ObjectId::new(1), CardFace::basic_land("Island"), PlayerId::new(1))
            .stacked(quantity, tapped)
    }

    #[test]
    fn test_untapped_copies() {
        assert_eq!(island_stack(4, 1).untapped_copies(), 3);
        let single = Permanent::new(ObjectId::new(2), CardFace::basic_land("Forest"), PlayerId::new(1));
        assert_eq!(single.untapped_copies(), 1);
        assert_eq!(single.tapped().untapped_copies(), 0);
    }

    #[test]
    fn test_stack_rotates_only_when_exhausted() {
        let stack = island_stack(4, 1);
        let partly = stack.tap_state_after(2);
        assert_eq!(partly.tapped_quantity, 3);
        assert_eq!(partly.rotation, Rotation::Untapped);

        let exhausted = stack.tap_state_after(3);
        assert_eq!(exhausted.tapped_quantity, 4);
        assert_eq!(exhausted.rotation, Rotation::Tapped);
    }

    #[test]
    fn test_apply_intents() {
        let mut board = Battlefield::new();
        board.add(island_stack(4, 1));
        board.stage(Permanent::new(ObjectId::new(9), CardFace::new("Sol Ring"), PlayerId::new(1)));

        board.apply(&[
            BoardIntent::SetTapState {
                object_id: ObjectId::new(1),
                rotation: Rotation::Untapped,
                tapped_quantity: 3,
            },
            BoardIntent::CardPlayed {
                object_id: ObjectId::new(9),
                enters_tapped: true,
            },
            BoardIntent::PoolChanged {
                player: PlayerId::new(1),
                pool: ManaPool::new(),
            },
        ]);

        assert_eq!(board.get(ObjectId::new(1)).unwrap().tapped_quantity, 3);
        assert_eq!(board.get(ObjectId::new(9)).unwrap().rotation, Rotation::Tapped);
        assert!(board.staged.is_empty());
        assert!(board.pools.contains_key(&PlayerId::new(1)));

        board.apply(&[BoardIntent::CardReturned {
            object_id: ObjectId::new(9),
        }]);
        assert!(board.get(ObjectId::new(9)).is_none());
        assert_eq!(board.staged.len(), 1);
    }

    #[test]
    fn test_board_deserializes_with_defaults() {
        let json = r#"{
            "permanents": [
                {"object_id": 1, "card": {"name": "Forest", "types": ["Land"], "subtypes": ["Forest"]}, "controller": 1}
            ]
        }"#;
        let board: Battlefield = serde_json::from_str(json).unwrap();
        let forest = board.get(ObjectId::new(1)).unwrap();
        assert_eq!(forest.stack_quantity, 1);
        assert_eq!(forest.rotation, Rotation::Untapped);
    }
}
