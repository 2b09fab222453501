//! Printed card data the engine reads to derive default mana rules

use crate::core::{CardIdentity, ManaColor, ParsedCost};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Card types that matter for mana production
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Creature,
    Artifact,
    Enchantment,
    Land,
    Planeswalker,
    Battle,
    Instant,
    Sorcery,
}

/// Names of the basic lands and the color each produces
const BASIC_LANDS: [(&str, ManaColor); 6] = [
    ("Plains", ManaColor::White),
    ("Island", ManaColor::Blue),
    ("Swamp", ManaColor::Black),
    ("Mountain", ManaColor::Red),
    ("Forest", ManaColor::Green),
    ("Wastes", ManaColor::Colorless),
];

/// The printed face of a card
///
/// Many permanents can share one face; the face's identity is what mana
/// rules are keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFace {
    /// Card name (e.g., "Sol Ring")
    pub name: String,

    /// Card types (a card can be multiple types)
    #[serde(default)]
    pub types: SmallVec<[CardType; 2]>,

    /// Basic supertype
    #[serde(default)]
    pub basic: bool,

    /// Card subtypes (e.g., "Forest", "Island")
    #[serde(default)]
    pub subtypes: SmallVec<[String; 2]>,

    /// Mana cost as printed (bracketed symbols)
    #[serde(default)]
    pub mana_cost: String,

    /// Oracle text
    #[serde(default)]
    pub text: String,

    /// Printed list of mana this card can produce, if the card data carries one
    #[serde(default)]
    pub produced_mana: SmallVec<[ManaColor; 2]>,
}

impl CardFace {
    pub fn new(name: impl Into<String>) -> Self {
        CardFace {
            name: name.into(),
            types: SmallVec::new(),
            basic: false,
            subtypes: SmallVec::new(),
            mana_cost: String::new(),
            text: String::new(),
            produced_mana: SmallVec::new(),
        }
    }

    /// A basic land whose subtype matches its name ("Forest" is a Forest)
    pub fn basic_land(name: &str) -> Self {
        let mut face = CardFace::new(name);
        face.types.push(CardType::Land);
        face.basic = true;
        face.subtypes.push(name.to_string());
        face
    }

    pub fn with_type(mut self, card_type: CardType) -> Self {
        self.types.push(card_type);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_mana_cost(mut self, cost: impl Into<String>) -> Self {
        self.mana_cost = cost.into();
        self
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtypes.push(subtype.into());
        self
    }

    pub fn identity(&self) -> CardIdentity {
        CardIdentity::new(&self.name)
    }

    pub fn is_type(&self, card_type: CardType) -> bool {
        self.types.contains(&card_type)
    }

    pub fn is_land(&self) -> bool {
        self.is_type(CardType::Land)
    }

    pub fn is_creature(&self) -> bool {
        self.is_type(CardType::Creature)
    }

    /// Basic by supertype or by carrying a basic land's name
    pub fn is_basic_land(&self) -> bool {
        self.is_land() && (self.basic || BASIC_LANDS.iter().any(|(name, _)| *name == self.name))
    }

    /// Colors implied by basic land subtypes (a Tundra is a Plains Island)
    pub fn basic_land_colors(&self) -> SmallVec<[ManaColor; 2]> {
        let mut colors = SmallVec::new();
        for subtype in &self.subtypes {
            if let Some((_, color)) = BASIC_LANDS.iter().find(|(name, _)| name == subtype) {
                if !colors.contains(color) {
                    colors.push(*color);
                }
            }
        }
        colors
    }

    pub fn parsed_mana_cost(&self) -> ParsedCost {
        ParsedCost::parse(&self.mana_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_land() {
        let forest = CardFace::basic_land("Forest");
        assert!(forest.is_land());
        assert!(forest.is_basic_land());
        assert_eq!(forest.basic_land_colors().as_slice(), &[ManaColor::Green]);
        assert_eq!(forest.identity(), CardIdentity::new("forest"));
    }

    #[test]
    fn test_dual_land_subtypes() {
        let tundra = CardFace::new("Tundra")
            .with_type(CardType::Land)
            .with_subtype("Plains")
            .with_subtype("Island");
        assert!(!tundra.is_basic_land());
        assert_eq!(
            tundra.basic_land_colors().as_slice(),
            &[ManaColor::White, ManaColor::Blue]
        );
    }

    #[test]
    fn test_card_face_deserialize_defaults() {
        let face: CardFace = serde_json::from_str(r#"{"name": "Sol Ring", "types": ["Artifact"]}"#).unwrap();
        assert!(face.is_type(CardType::Artifact));
        assert!(face.text.is_empty());
        assert!(face.parsed_mana_cost().is_free());
    }
}
