//! Identifiers for board objects, players and card identities

use deunicode::deunicode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Simple integer ID for a board object (a permanent or a stack of copies)
///
/// Assigned by the board collaborator. Stable for as long as the object stays
/// on the battlefield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u32);

impl ObjectId {
    pub fn new(id: u32) -> Self {
        ObjectId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Player identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(u32);

impl PlayerId {
    pub fn new(id: u32) -> Self {
        PlayerId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Stable key for per-card configuration
///
/// Every copy of the same card shares one identity, so mana rules never key
/// off per-object IDs. Names are folded to ASCII, trimmed and lowercased:
/// "Lórien Revealed" and "lorien revealed" are the same card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CardIdentity(String);

impl CardIdentity {
    pub fn new(name: &str) -> Self {
        CardIdentity(deunicode(name.trim()).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CardIdentity {
    fn from(s: &str) -> Self {
        CardIdentity::new(s)
    }
}

impl From<String> for CardIdentity {
    fn from(s: String) -> Self {
        CardIdentity::new(&s)
    }
}

impl From<CardIdentity> for String {
    fn from(id: CardIdentity) -> Self {
        id.0
    }
}
