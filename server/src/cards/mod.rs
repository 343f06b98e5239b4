use std::collections::HashMap;

use chrono::{Months, NaiveDate};
use uuid::Uuid;

pub mod cockatrice;
pub mod export;
pub mod scryfall;

/// Set codes whose cards make up the bonus sheet.
pub const BONUS_SHEET_SETS: &[&str] = &["plst", "spg"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Mythic,
    Rare,
    Uncommon,
    Common,
    Special,
    Bonus,
}

impl Rarity {
    /// Position when sorting by desirability, lower first.
    pub fn rank(self) -> u8 {
        match self {
            Rarity::Mythic => 0,
            Rarity::Rare => 1,
            Rarity::Uncommon => 2,
            Rarity::Common => 3,
            Rarity::Special | Rarity::Bonus => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Colour {
    W,
    U,
    B,
    R,
    G,
}

impl Colour {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "W" => Some(Colour::W),
            "U" => Some(Colour::U),
            "B" => Some(Colour::B),
            "R" => Some(Colour::R),
            "G" => Some(Colour::G),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finish {
    Foil,
    Nonfoil,
    Etched,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CardFace {
    pub name: String,
    pub type_line: String,
    pub image: Option<String>,
}

/// A single printing of a card. Cards are never mutated once loaded; foil and
/// bonus sheet variants are produced with `as_foil` and `as_bonus`.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Card {
    pub id: Uuid,
    pub name: String,
    pub set: String,
    pub collector_number: String,
    pub rarity: Rarity,
    pub colours: Vec<Colour>,
    pub type_line: String,
    pub mana_value: f32,
    pub booster: bool,
    pub finishes: Vec<Finish>,
    pub frame_effects: Vec<String>,
    pub border: String,
    pub full_art: bool,
    pub promo_types: Vec<String>,
    pub layout: String,
    pub released: Option<NaiveDate>,
    pub faces: Vec<CardFace>,
    pub image: Option<String>,

    /// This copy was opened as a foil.
    pub foil: bool,

    /// This copy came from the bonus sheet rather than the set itself.
    pub bonus: bool,
}

impl Card {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_finish(&self, finish: Finish) -> bool {
        self.finishes.contains(&finish)
    }

    /// Printed only in foil, under its own collector number.
    pub fn foil_only(&self) -> bool {
        self.has_finish(Finish::Foil) && !self.has_finish(Finish::Nonfoil)
    }

    pub fn as_foil(&self) -> Card {
        Card {
            foil: true,
            ..self.clone()
        }
    }

    pub fn as_bonus(&self) -> Card {
        Card {
            bonus: true,
            ..self.clone()
        }
    }

    #[cfg(test)]
    pub fn sample(rarity: Rarity) -> Self {
        static ID: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(1);

        let id = ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Self {
            id: Uuid::new_v4(),
            name: format!("Card {id}"),
            set: "tst".to_string(),
            collector_number: id.to_string(),
            rarity,
            colours: Vec::new(),
            type_line: "Creature — Test".to_string(),
            mana_value: 2.0,
            booster: true,
            finishes: vec![Finish::Nonfoil],
            frame_effects: Vec::new(),
            border: "black".to_string(),
            full_art: false,
            promo_types: Vec::new(),
            layout: "normal".to_string(),
            released: NaiveDate::from_ymd_opt(2024, 1, 1),
            faces: Vec::new(),
            image: Some(format!("https://example.com/card-{id}-art.jpg")),
            foil: false,
            bonus: false,
        }
    }

    #[cfg(test)]
    pub fn coloured(rarity: Rarity, colours: &[Colour]) -> Self {
        Self {
            colours: colours.to_vec(),
            ..Self::sample(rarity)
        }
    }
}

/// All known printings, grouped by set code.
pub struct CardDatabase {
    /// Map from lowercased set code to the printings in that set.
    sets: HashMap<String, Vec<Card>>,
}

impl CardDatabase {
    pub fn new() -> Self {
        Self {
            sets: HashMap::new(),
        }
    }

    pub fn add(&mut self, card: Card) {
        let key = card.set.to_ascii_lowercase();
        self.sets.entry(key).or_default().push(card);
    }

    /// Every printing in the given set. Empty if the set is unknown.
    pub fn set(&self, code: &str) -> &[Card] {
        self.sets
            .get(&code.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Earliest release date of the booster cards in a set.
    pub fn release_date(&self, code: &str) -> Option<NaiveDate> {
        self.set(code)
            .iter()
            .filter(|card| card.booster)
            .filter_map(|card| card.released)
            .min()
    }

    /// Cards for the bonus sheet slot. If a date is provided, only cards
    /// released within the window either side of it are used, unless fewer
    /// than `minimum` such cards exist.
    pub fn bonus_sheet(&self, around: Option<NaiveDate>, window: u32, minimum: usize) -> Vec<Card> {
        let sheet: Vec<Card> = BONUS_SHEET_SETS
            .iter()
            .flat_map(|code| self.set(code).iter().cloned())
            .collect();

        let Some(date) = around else {
            return sheet;
        };
        let (Some(from), Some(to)) = (
            date.checked_sub_months(Months::new(window)),
            date.checked_add_months(Months::new(window)),
        ) else {
            return sheet;
        };

        let near: Vec<Card> = sheet
            .iter()
            .filter(|card| card.released.is_some_and(|d| d >= from && d <= to))
            .cloned()
            .collect();
        if near.len() < minimum {
            tracing::debug!(
                "Only {} bonus sheet cards near {date}, using full sheet of {}.",
                near.len(),
                sheet.len()
            );
            sheet
        } else {
            near
        }
    }

    pub fn size(&self) -> usize {
        self.sets.values().map(Vec::len).sum()
    }
}
