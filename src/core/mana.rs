//! Mana colors and the floating mana pool

use crate::{ManaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mana symbols
///
/// The six real symbols (five colors plus colorless) can float in a pool.
/// `AnyColor` and `CommanderIdentity` only appear in mana rules and are
/// resolved to real colors before any mana is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ManaColor {
    #[serde(rename = "W")]
    White,
    #[serde(rename = "U")]
    Blue,
    #[serde(rename = "B")]
    Black,
    #[serde(rename = "R")]
    Red,
    #[serde(rename = "G")]
    Green,
    #[serde(rename = "C")]
    Colorless,
    /// One mana of any of the five colors
    #[serde(rename = "any")]
    AnyColor,
    /// One mana of any color in the commander's color identity
    #[serde(rename = "commander")]
    CommanderIdentity,
}

impl ManaColor {
    /// The five colors in WUBRG order
    pub const COLORS: [ManaColor; 5] = [
        ManaColor::White,
        ManaColor::Blue,
        ManaColor::Black,
        ManaColor::Red,
        ManaColor::Green,
    ];

    /// Every symbol that can float in a pool
    pub const POOL_COLORS: [ManaColor; 6] = [
        ManaColor::White,
        ManaColor::Blue,
        ManaColor::Black,
        ManaColor::Red,
        ManaColor::Green,
        ManaColor::Colorless,
    ];

    /// True for the five colors (not colorless, not pseudo-symbols)
    pub fn is_colored(self) -> bool {
        matches!(
            self,
            ManaColor::White | ManaColor::Blue | ManaColor::Black | ManaColor::Red | ManaColor::Green
        )
    }

    pub fn is_pool_color(self) -> bool {
        self.is_colored() || self == ManaColor::Colorless
    }

    pub fn is_pseudo(self) -> bool {
        matches!(self, ManaColor::AnyColor | ManaColor::CommanderIdentity)
    }

    /// Convert to single-character representation (W, U, B, R, G, C)
    pub fn to_char(self) -> Option<char> {
        match self {
            ManaColor::White => Some('W'),
            ManaColor::Blue => Some('U'),
            ManaColor::Black => Some('B'),
            ManaColor::Red => Some('R'),
            ManaColor::Green => Some('G'),
            ManaColor::Colorless => Some('C'),
            _ => None,
        }
    }

    /// Parse from single-character representation
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'W' | 'w' => Some(ManaColor::White),
            'U' | 'u' => Some(ManaColor::Blue),
            'B' | 'b' => Some(ManaColor::Black),
            'R' | 'r' => Some(ManaColor::Red),
            'G' | 'g' => Some(ManaColor::Green),
            'C' | 'c' => Some(ManaColor::Colorless),
            _ => None,
        }
    }

    /// Index into WUBRGC order, None for pseudo-symbols
    fn pool_index(self) -> Option<usize> {
        ManaColor::POOL_COLORS.iter().position(|&c| c == self)
    }
}

impl fmt::Display for ManaColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_char() {
            Some(c) => write!(f, "{c}"),
            None if *self == ManaColor::AnyColor => write!(f, "Any"),
            None => write!(f, "Commander"),
        }
    }
}

/// A set of the five colors, stored as a bitmask
///
/// Used for commander color identity. Colorless and pseudo-symbols are never
/// members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorSet(u8);

impl ColorSet {
    pub fn empty() -> Self {
        ColorSet(0)
    }

    pub fn all() -> Self {
        ManaColor::COLORS.iter().copied().collect()
    }

    fn bit(color: ManaColor) -> Option<u8> {
        ManaColor::COLORS.iter().position(|&c| c == color).map(|i| 1 << i)
    }

    /// Insert a color; ignores colorless and pseudo-symbols
    pub fn insert(&mut self, color: ManaColor) {
        if let Some(bit) = Self::bit(color) {
            self.0 |= bit;
        }
    }

    pub fn contains(&self, color: ManaColor) -> bool {
        Self::bit(color).is_some_and(|bit| self.0 & bit != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate members in WUBRG order
    pub fn iter(&self) -> impl Iterator<Item = ManaColor> + '_ {
        ManaColor::COLORS.into_iter().filter(move |&c| self.contains(c))
    }
}

impl FromIterator<ManaColor> for ColorSet {
    fn from_iter<I: IntoIterator<Item = ManaColor>>(iter: I) -> Self {
        let mut set = ColorSet::empty();
        for color in iter {
            set.insert(color);
        }
        set
    }
}

/// Floating mana for one player
///
/// Counts never go negative: `remove` refuses instead of underflowing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManaPool {
    #[serde(default)]
    pub white: u32,
    #[serde(default)]
    pub blue: u32,
    #[serde(default)]
    pub black: u32,
    #[serde(default)]
    pub red: u32,
    #[serde(default)]
    pub green: u32,
    #[serde(default)]
    pub colorless: u32,
}

impl ManaPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, color: ManaColor) -> Option<&u32> {
        match color.pool_index()? {
            0 => Some(&self.white),
            1 => Some(&self.blue),
            2 => Some(&self.black),
            3 => Some(&self.red),
            4 => Some(&self.green),
            _ => Some(&self.colorless),
        }
    }

    fn slot_mut(&mut self, color: ManaColor) -> Option<&mut u32> {
        match color.pool_index()? {
            0 => Some(&mut self.white),
            1 => Some(&mut self.blue),
            2 => Some(&mut self.black),
            3 => Some(&mut self.red),
            4 => Some(&mut self.green),
            _ => Some(&mut self.colorless),
        }
    }

    /// Amount of one color floating (pseudo-symbols always read 0)
    pub fn get(&self, color: ManaColor) -> u32 {
        self.slot(color).copied().unwrap_or(0)
    }

    pub fn add(&mut self, color: ManaColor, amount: u32) -> Result<()> {
        let slot = self.slot_mut(color).ok_or(ManaError::NotAPoolColor(color))?;
        *slot = slot.checked_add(amount).ok_or(ManaError::PoolOverflow {
            color,
            requested: amount,
            available: *slot,
        })?;
        Ok(())
    }

    /// Remove mana of one color. Fails without touching the pool if there
    /// is not enough floating.
    pub fn remove(&mut self, color: ManaColor, amount: u32) -> Result<()> {
        let slot = self.slot_mut(color).ok_or(ManaError::NotAPoolColor(color))?;
        if *slot < amount {
            return Err(ManaError::PoolUnderflow {
                color,
                requested: amount,
                available: *slot,
            });
        }
        *slot -= amount;
        Ok(())
    }

    /// Add every count of `other` into this pool, saturating at `u32::MAX`
    pub fn merge(&mut self, other: &ManaPool) {
        self.white = self.white.saturating_add(other.white);
        self.blue = self.blue.saturating_add(other.blue);
        self.black = self.black.saturating_add(other.black);
        self.red = self.red.saturating_add(other.red);
        self.green = self.green.saturating_add(other.green);
        self.colorless = self.colorless.saturating_add(other.colorless);
    }

    pub fn reset(&mut self) {
        *self = ManaPool::default();
    }

    /// Total mana in pool
    pub fn total(&self) -> u32 {
        [self.white, self.blue, self.black, self.red, self.green, self.colorless]
            .into_iter()
            .fold(0u32, u32::saturating_add)
    }

    pub fn is_empty(&self) -> bool {
        *self == ManaPool::default()
    }

    /// Iterate (color, amount) in WUBRGC order, including zero entries
    pub fn iter(&self) -> impl Iterator<Item = (ManaColor, u32)> + '_ {
        ManaColor::POOL_COLORS.into_iter().map(move |c| (c, self.get(c)))
    }
}

impl fmt::Display for ManaPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "empty");
        }
        let mut first = true;
        for (color, amount) in self.iter().filter(|(_, n)| *n > 0) {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{amount}{color}")?;
            first = false;
        }
        Ok(())
    }
}
