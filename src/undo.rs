//! Undo ledger for mana actions
//!
//! Every mutating engine operation pushes one record holding the pre-image
//! of what it touched: the tap state of each affected object and the pool as
//! it was. Popping a record yields the exact inverse. The ledger is a
//! bounded ring; once full, the oldest record is dropped. There is no redo.

use crate::board::{BoardIntent, TapState};
use crate::core::{ManaPool, ObjectId, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Tap state of one object before an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapSnapshot {
    pub object_id: ObjectId,
    pub state: TapState,
}

impl TapSnapshot {
    pub fn new(object_id: ObjectId, state: TapState) -> Self {
        TapSnapshot { object_id, state }
    }
}

/// One undoable engine action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UndoRecord {
    /// A manual tap of one source
    SingleTap {
        tap: TapSnapshot,
        prior_pool: ManaPool,
    },
    /// Untapping every permanent
    UntapAll {
        taps: Vec<TapSnapshot>,
        prior_pool: ManaPool,
    },
    /// Paying for a card from hand and putting it onto the battlefield
    PlayCard {
        card: ObjectId,
        taps: Vec<TapSnapshot>,
        prior_pool: ManaPool,
    },
    /// One auto-pay run
    AutoTapBatch {
        taps: Vec<TapSnapshot>,
        prior_pool: ManaPool,
    },
    /// A manual pool edit or a color swap
    PoolAdjust { prior_pool: ManaPool },
}

impl UndoRecord {
    pub fn prior_pool(&self) -> ManaPool {
        match self {
            UndoRecord::SingleTap { prior_pool, .. }
            | UndoRecord::UntapAll { prior_pool, .. }
            | UndoRecord::PlayCard { prior_pool, .. }
            | UndoRecord::AutoTapBatch { prior_pool, .. }
            | UndoRecord::PoolAdjust { prior_pool } => *prior_pool,
        }
    }

    pub fn taps(&self) -> &[TapSnapshot] {
        match self {
            UndoRecord::SingleTap { tap, .. } => std::slice::from_ref(tap),
            UndoRecord::UntapAll { taps, .. }
            | UndoRecord::PlayCard { taps, .. }
            | UndoRecord::AutoTapBatch { taps, .. } => taps,
            UndoRecord::PoolAdjust { .. } => &[],
        }
    }

    /// The changes that put things back as they were
    pub fn inverse(&self) -> InverseMutation {
        InverseMutation {
            tap_restores: self.taps().to_vec(),
            pool: self.prior_pool(),
            returned_card: match self {
                UndoRecord::PlayCard { card, .. } => Some(*card),
                _ => None,
            },
        }
    }
}

/// What undoing a record changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InverseMutation {
    pub tap_restores: Vec<TapSnapshot>,
    /// The pool to restore wholesale
    pub pool: ManaPool,
    /// A played card that goes back to hand
    pub returned_card: Option<ObjectId>,
}

impl InverseMutation {
    /// Board intents for this inverse, in the order they should be applied
    pub fn to_intents(&self, player: PlayerId) -> Vec<BoardIntent> {
        let mut intents = Vec::with_capacity(self.tap_restores.len() + 2);
        if let Some(card) = self.returned_card {
            intents.push(BoardIntent::CardReturned { object_id: card });
        }
        for snapshot in &self.tap_restores {
            intents.push(BoardIntent::set_tap_state(snapshot.object_id, snapshot.state));
        }
        intents.push(BoardIntent::PoolChanged {
            player,
            pool: self.pool,
        });
        intents
    }
}

/// Bounded stack of undo records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoLedger {
    /// Oldest at the front
    records: VecDeque<UndoRecord>,
    capacity: usize,
}

impl UndoLedger {
    pub fn new(capacity: usize) -> Self {
        UndoLedger {
            records: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    /// Record an action, dropping the oldest beyond capacity
    pub fn push(&mut self, record: UndoRecord) {
        self.records.push_back(record);
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    /// Remove the most recent record and return its inverse
    pub fn pop_and_apply_inverse(&mut self) -> Option<InverseMutation> {
        self.records.pop_back().map(|record| record.inverse())
    }

    pub fn peek(&self) -> Option<&UndoRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for UndoLedger {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_UNDO_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Rotation;

    fn untapped(id: u32) -> TapSnapshot {
        TapSnapshot::new(
            ObjectId::new(id),
            TapState {
                rotation: Rotation::Untapped,
                tapped_quantity: 0,
            },
        )
    }

    fn pool_with_red(red: u32) -> ManaPool {
        ManaPool {
            red,
            ..ManaPool::default()
        }
    }

    #[test]
    fn test_push_and_pop() {
        let mut ledger = UndoLedger::new(4);
        assert!(ledger.pop_and_apply_inverse().is_none());

        ledger.push(UndoRecord::SingleTap {
            tap: untapped(1),
            prior_pool: ManaPool::new(),
        });
        ledger.push(UndoRecord::PoolAdjust {
            prior_pool: pool_with_red(1),
        });
        assert_eq!(ledger.len(), 2);

        let inverse = ledger.pop_and_apply_inverse().unwrap();
        assert!(inverse.tap_restores.is_empty());
        assert_eq!(inverse.pool.red, 1);

        let inverse = ledger.pop_and_apply_inverse().unwrap();
        assert_eq!(inverse.tap_restores, vec![untapped(1)]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut ledger = UndoLedger::new(2);
        for red in 0..3 {
            ledger.push(UndoRecord::PoolAdjust {
                prior_pool: pool_with_red(red),
            });
        }
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.pop_and_apply_inverse().unwrap().pool.red, 2);
        assert_eq!(ledger.pop_and_apply_inverse().unwrap().pool.red, 1);
        assert!(ledger.pop_and_apply_inverse().is_none());
    }

    #[test]
    fn test_play_card_inverse_returns_card() {
        let record = UndoRecord::PlayCard {
            card: ObjectId::new(9),
            taps: vec![untapped(1), untapped(2)],
            prior_pool: ManaPool::new(),
        };
        let intents = record.inverse().to_intents(PlayerId::new(1));
        assert_eq!(intents.len(), 4);
        assert_eq!(
            intents[0],
            BoardIntent::CardReturned {
                object_id: ObjectId::new(9)
            }
        );
        assert!(matches!(intents[3], BoardIntent::PoolChanged { .. }));
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let record = UndoRecord::AutoTapBatch {
            taps: vec![untapped(3)],
            prior_pool: ManaPool::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "auto_tap_batch");
        let back: UndoRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
