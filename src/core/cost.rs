//! Mana cost parsing
//!
//! Costs are written as bracketed symbols: `{2}{G}`, `{1}{W/U}`, `{X}{R}`,
//! `{2/W}`. Parsing is fail-soft: unknown or malformed symbols are dropped and
//! a missing cost is free, so `ParsedCost::parse` never returns an error.

use crate::core::{ColorSet, ManaColor};
use nom::{
    bytes::complete::{take_till, take_while},
    character::complete::char,
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// One required mana symbol in a cost (generic mana is tracked separately)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pip {
    /// Exactly one mana of this symbol (e.g. `{G}`, `{C}`)
    Single(ManaColor),
    /// One mana of any listed color (e.g. `{W/U}`), kept in WUBRG order
    Hybrid(SmallVec<[ManaColor; 2]>),
    /// One mana of `color`, or `generic` mana of any type (e.g. `{2/W}`)
    ColorOrGeneric { color: ManaColor, generic: u32 },
}

impl Pip {
    /// Colors that pay this pip with a single mana
    pub fn options(&self) -> SmallVec<[ManaColor; 2]> {
        match self {
            Pip::Single(color) => smallvec::smallvec![*color],
            Pip::Hybrid(colors) => colors.clone(),
            Pip::ColorOrGeneric { color, .. } => smallvec::smallvec![*color],
        }
    }

    pub fn accepts(&self, color: ManaColor) -> bool {
        match self {
            Pip::Single(c) | Pip::ColorOrGeneric { color: c, .. } => *c == color,
            Pip::Hybrid(colors) => colors.contains(&color),
        }
    }

    pub fn is_hybrid(&self) -> bool {
        !matches!(self, Pip::Single(_))
    }
}

impl fmt::Display for Pip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pip::Single(color) => write!(f, "{{{color}}}"),
            Pip::Hybrid(colors) => {
                write!(f, "{{")?;
                for (i, color) in colors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "/")?;
                    }
                    write!(f, "{color}")?;
                }
                write!(f, "}}")
            }
            Pip::ColorOrGeneric { color, generic } => write!(f, "{{{generic}/{color}}}"),
        }
    }
}

/// A structured mana cost
///
/// Invariant: `total_converted_value == generic_amount + symbols.len()`.
/// `{X}` pips contribute nothing until a value is chosen with [`ParsedCost::with_x`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ParsedCost {
    generic_amount: u32,
    symbols: SmallVec<[Pip; 4]>,
    x_count: u8,
    total_converted_value: u32,
}

impl ParsedCost {
    pub fn new(generic_amount: u32, symbols: impl IntoIterator<Item = Pip>, x_count: u8) -> Self {
        let symbols: SmallVec<[Pip; 4]> = symbols.into_iter().collect();
        let pips = u32::try_from(symbols.len()).unwrap_or(u32::MAX);
        // Generic is capped so the mana value never wraps
        let generic_amount = generic_amount.min(u32::MAX - pips);
        let total_converted_value = generic_amount + pips;
        ParsedCost {
            generic_amount,
            symbols,
            x_count,
            total_converted_value,
        }
    }

    /// A cost of nothing
    pub fn free() -> Self {
        Self::default()
    }

    /// A purely generic cost (e.g. `{2}`)
    pub fn generic(amount: u32) -> Self {
        Self::new(amount, [], 0)
    }

    /// Parse a bracketed mana cost. Never fails.
    pub fn parse(s: &str) -> Self {
        let groups = match bracket_groups(s) {
            Ok((_, groups)) => groups,
            Err(_) => Vec::new(),
        };

        let mut generic: u32 = 0;
        let mut symbols: SmallVec<[Pip; 4]> = SmallVec::new();
        let mut x_count: u8 = 0;

        for group in groups {
            let group = group.trim();
            if group.eq_ignore_ascii_case("x") {
                x_count = x_count.saturating_add(1);
            } else if let Ok(n) = group.parse::<u32>() {
                generic = generic.saturating_add(n);
            } else if group.contains('/') {
                if let Some(pip) = parse_slash_group(group) {
                    symbols.push(pip);
                }
            } else {
                let mut chars = group.chars();
                if let (Some(c), None) = (chars.next(), chars.next()) {
                    if let Some(color) = ManaColor::from_char(c) {
                        symbols.push(Pip::Single(color));
                    }
                }
            }
        }

        Self::new(generic, symbols, x_count)
    }

    pub fn generic_amount(&self) -> u32 {
        self.generic_amount
    }

    pub fn symbols(&self) -> &[Pip] {
        &self.symbols
    }

    pub fn has_variable_x(&self) -> bool {
        self.x_count > 0
    }

    /// Number of `{X}` pips
    pub fn x_count(&self) -> u8 {
        self.x_count
    }

    pub fn total_converted_value(&self) -> u32 {
        self.total_converted_value
    }

    pub fn is_free(&self) -> bool {
        self.total_converted_value == 0
    }

    /// Fold a chosen X value into the generic amount
    ///
    /// Each `{X}` pip becomes `x` generic mana; the result no longer has X.
    pub fn with_x(&self, x: u32) -> Self {
        let extra = x.saturating_mul(self.x_count as u32);
        Self::new(
            self.generic_amount.saturating_add(extra),
            self.symbols.iter().cloned(),
            0,
        )
    }

    /// This cost plus `amount` more generic mana
    pub fn plus_generic(&self, amount: u32) -> Self {
        Self::new(
            self.generic_amount.saturating_add(amount),
            self.symbols.iter().cloned(),
            self.x_count,
        )
    }

    /// Colors appearing in any pip, used to derive commander color identity
    pub fn color_identity(&self) -> ColorSet {
        self.symbols.iter().flat_map(|pip| pip.options()).collect()
    }
}

/// Split a cost string into the contents of its `{...}` groups.
/// Text between groups is skipped; parsing stops at the first malformed group.
fn bracket_groups(input: &str) -> IResult<&str, Vec<&str>> {
    many0(preceded(
        take_till(|c: char| c == '{'),
        delimited(char('{'), take_while(|c: char| c != '{' && c != '}'), char('}')),
    ))(input)
}

fn parse_slash_group(group: &str) -> Option<Pip> {
    let mut colors: SmallVec<[ManaColor; 2]> = SmallVec::new();
    let mut generic = None;

    for part in group.split('/') {
        let part = part.trim();
        if let Ok(n) = part.parse::<u32>() {
            generic = Some(n);
            continue;
        }
        let mut chars = part.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(color) = ManaColor::from_char(c) {
                if !colors.contains(&color) {
                    colors.push(color);
                }
            }
        }
    }
    colors.sort();

    match (colors.len(), generic) {
        (0, _) => None,
        (1, Some(generic)) => Some(Pip::ColorOrGeneric {
            color: colors[0],
            generic,
        }),
        (1, None) => Some(Pip::Single(colors[0])),
        _ => Some(Pip::Hybrid(colors)),
    }
}

impl FromStr for ParsedCost {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ParsedCost::parse(s))
    }
}

impl From<String> for ParsedCost {
    fn from(s: String) -> Self {
        ParsedCost::parse(&s)
    }
}

impl From<ParsedCost> for String {
    fn from(cost: ParsedCost) -> Self {
        cost.to_string()
    }
}

impl fmt::Display for ParsedCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.x_count {
            write!(f, "{{X}}")?;
        }
        if self.generic_amount > 0 || (self.symbols.is_empty() && self.x_count == 0) {
            write!(f, "{{{}}}", self.generic_amount)?;
        }
        for pip in &self.symbols {
            write!(f, "{pip}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_parse_generic_and_color() {
        let cost = ParsedCost::parse("{2}{G}");
        assert_eq!(cost.generic_amount(), 2);
        assert_eq!(cost.symbols(), &[Pip::Single(ManaColor::Green)]);
        assert_eq!(cost.total_converted_value(), 3);
        assert!(!cost.has_variable_x());
    }

    #[test]
    fn test_parse_hybrid_normalizes_order() {
        let cost = ParsedCost::parse("{1}{U/W}");
        assert_eq!(
            cost.symbols(),
            &[Pip::Hybrid(smallvec![ManaColor::White, ManaColor::Blue])]
        );
        assert_eq!(cost.total_converted_value(), 2);
        assert_eq!(cost.to_string(), "{1}{W/U}");
    }

    #[test]
    fn test_parse_color_or_generic() {
        let cost = ParsedCost::parse("{2/W}{2/W}");
        assert_eq!(cost.symbols().len(), 2);
        assert_eq!(
            cost.symbols()[0],
            Pip::ColorOrGeneric {
                color: ManaColor::White,
                generic: 2
            }
        );
        assert_eq!(cost.total_converted_value(), 2);
    }

    #[test]
    fn test_parse_x() {
        let cost = ParsedCost::parse("{X}{X}{R}");
        assert!(cost.has_variable_x());
        assert_eq!(cost.x_count(), 2);
        assert_eq!(cost.total_converted_value(), 1);

        let paid = cost.with_x(3);
        assert!(!paid.has_variable_x());
        assert_eq!(paid.generic_amount(), 6);
        assert_eq!(paid.total_converted_value(), 7);
    }

    #[test]
    fn test_fail_soft() {
        assert!(ParsedCost::parse("").is_free());
        assert!(ParsedCost::parse("no cost here").is_free());
        // Unknown symbols are dropped, known ones survive
        let cost = ParsedCost::parse("{S}{Q}{1}{B}{HW}");
        assert_eq!(cost.generic_amount(), 1);
        assert_eq!(cost.symbols(), &[Pip::Single(ManaColor::Black)]);
        // Phyrexian marker is not a color: {W/P} is a plain white pip
        assert_eq!(ParsedCost::parse("{W/P}").symbols(), &[Pip::Single(ManaColor::White)]);
        // Unclosed group ends parsing without failing
        assert_eq!(ParsedCost::parse("{1}{G").generic_amount(), 1);
        // Oversized numbers clamp instead of wrapping
        let huge = ParsedCost::parse("{4294967295}{G}");
        assert_eq!(huge.symbols(), &[Pip::Single(ManaColor::Green)]);
        assert_eq!(huge.generic_amount(), u32::MAX - 1);
        assert_eq!(huge.total_converted_value(), u32::MAX);
        let huge_x = ParsedCost::parse("{X}{R}").with_x(u32::MAX);
        assert_eq!(huge_x.generic_amount(), u32::MAX - 1);
        assert_eq!(huge_x.total_converted_value(), u32::MAX);
        assert_eq!(ParsedCost::parse("{X}{X}{R}").with_x(u32::MAX), huge_x);
    }

    #[test]
    fn test_round_trip() {
        for text in ["{2}{G}", "{X}{1}{W/U}{B}", "{0}", "{C}{C}", "{2/R}{G/W}{U}"] {
            let cost = ParsedCost::parse(text);
            let reparsed = ParsedCost::parse(&cost.to_string());
            assert_eq!(cost, reparsed, "round trip of {text}");
        }
    }

    #[test]
    fn test_serde_as_string() {
        let cost = ParsedCost::parse("{1}{R}");
        let json = serde_json::to_string(&cost).unwrap();
        assert_eq!(json, "\"{1}{R}\"");
        let back: ParsedCost = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cost);
    }

    #[test]
    fn test_color_identity() {
        let identity = ParsedCost::parse("{2}{G}{W/U}{2/B}").color_identity();
        assert_eq!(
            identity.iter().collect::<Vec<_>>(),
            vec![ManaColor::White, ManaColor::Blue, ManaColor::Black, ManaColor::Green]
        );
        assert!(ParsedCost::parse("{C}").color_identity().is_empty());
    }
}
