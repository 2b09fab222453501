//! Error types for the mana engine

use crate::core::{ManaColor, ObjectId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManaError {
    #[error("Insufficient mana to pay {cost}: {unpaid} pip(s) left unpaid")]
    InsufficientMana { cost: String, unpaid: u32 },

    #[error("Pool underflow: tried to remove {requested} {color} but only {available} floating")]
    PoolUnderflow {
        color: ManaColor,
        requested: u32,
        available: u32,
    },

    #[error("Pool overflow: cannot add {requested} {color} to {available} floating")]
    PoolOverflow {
        color: ManaColor,
        requested: u32,
        available: u32,
    },

    #[error("{0} is not a pool color")]
    NotAPoolColor(ManaColor),

    #[error("Unknown mana source: {0}")]
    UnknownSource(ObjectId),

    #[error("Mana source {0} has no untapped copies")]
    SourceUnavailable(ObjectId),

    #[error("A choice is pending for source {0}")]
    ChoicePending(ObjectId),

    #[error("No choice is pending")]
    NoPendingChoice,

    #[error("Invalid choice: {0}")]
    InvalidChoice(String),

    #[error("Invalid mana rule: {0}")]
    InvalidRule(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for ManaError {
    fn from(err: serde_json::Error) -> Self {
        ManaError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ManaError>;
