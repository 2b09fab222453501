//! MTG mana engine
//!
//! Mana accounting for a shared virtual tabletop: cost parsing, mana source
//! cataloguing, automatic payment, floating pools, player choices and undo.
//! The board itself lives elsewhere; the engine reads it through
//! [`board::BoardView`] and answers with [`board::BoardIntent`]s.

pub mod board;
pub mod config;
pub mod core;
pub mod error;
pub mod game;
pub mod undo;

pub use error::{ManaError, Result};
