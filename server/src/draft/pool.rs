use std::fmt::Debug;

use crate::cards::{Card, Finish, Rarity};

const DISCARDED_LAYOUTS: &[&str] = &["token", "double_faced_token", "art_series", "emblem"];
const PROMO_ONLY: &[&str] = &["buyabox", "bundle", "prerelease", "judgegift"];
const SPECIAL_FRAMES: &[&str] = &[
    "showcase",
    "extendedart",
    "inverted",
    "etched",
    "fullart",
    "textless",
];

/// Named partition of a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bucket {
    Common,
    Uncommon,
    Rare,
    Mythic,
    BasicLand,
    Variant,
}

impl Bucket {
    pub fn of(rarity: Rarity) -> Option<Self> {
        match rarity {
            Rarity::Common => Some(Bucket::Common),
            Rarity::Uncommon => Some(Bucket::Uncommon),
            Rarity::Rare => Some(Bucket::Rare),
            Rarity::Mythic => Some(Bucket::Mythic),
            Rarity::Special | Rarity::Bonus => None,
        }
    }
}

/// The cards of one set, partitioned for booster generation. Built once and
/// read-only afterwards.
#[derive(Clone, Default)]
pub struct CardPool {
    pub commons: Vec<Card>,
    pub uncommons: Vec<Card>,
    pub rares: Vec<Card>,
    pub mythics: Vec<Card>,
    pub basic_lands: Vec<Card>,

    /// Alternate frame printings not normally in boosters.
    pub variants: Vec<Card>,

    /// Printings which exist only in foil. These also appear in one of the
    /// buckets above.
    pub foil_only: Vec<Card>,

    /// Every card in the partition that may be printed foil.
    pub foil_eligible: Vec<Card>,

    /// Every card given to the builder, unfiltered.
    pub all: Vec<Card>,
}

fn special_frame(card: &Card) -> bool {
    card.frame_effects
        .iter()
        .any(|e| SPECIAL_FRAMES.contains(&e.as_str()))
        || card.border == "borderless"
        || card.full_art
        || card.promo_types.iter().any(|p| p == "boosterfun")
}

impl CardPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition a set's card list. Rules are applied in order and the first
    /// matching rule decides where a card goes.
    pub fn build(cards: &[Card]) -> Self {
        let mut pool = Self::new();
        pool.all = cards.to_vec();

        for card in cards {
            if DISCARDED_LAYOUTS.contains(&card.layout.as_str()) {
                continue;
            }
            if card.type_line.contains("Basic Land") {
                pool.basic_lands.push(card.clone());
                continue;
            }
            if card
                .promo_types
                .iter()
                .any(|p| PROMO_ONLY.contains(&p.as_str()))
            {
                continue;
            }
            if !card.booster {
                if special_frame(card) {
                    pool.variants.push(card.clone());
                }
                continue;
            }
            pool.add(card.clone());
        }

        let mut foil_only = Vec::new();
        let mut foil_eligible = Vec::new();
        for card in pool.partition().filter(|c| c.has_finish(Finish::Foil)) {
            if card.foil_only() {
                foil_only.push(card.clone());
            }
            foil_eligible.push(card.clone());
        }
        pool.foil_only = foil_only;
        pool.foil_eligible = foil_eligible;

        tracing::debug!("Built card pool: {pool:?}");
        pool
    }

    /// Add a card to the bucket for its rarity. Special and bonus rarities
    /// aren't part of the pool.
    fn add(&mut self, card: Card) {
        match card.rarity {
            Rarity::Mythic => self.mythics.push(card),
            Rarity::Rare => self.rares.push(card),
            Rarity::Uncommon => self.uncommons.push(card),
            Rarity::Common => self.commons.push(card),
            Rarity::Bonus | Rarity::Special => {}
        }
    }

    pub fn partition(&self) -> impl Iterator<Item = &Card> {
        self.commons
            .iter()
            .chain(&self.uncommons)
            .chain(&self.rares)
            .chain(&self.mythics)
            .chain(&self.basic_lands)
            .chain(&self.variants)
    }

    /// No booster-eligible cards at all.
    pub fn is_empty(&self) -> bool {
        self.commons.is_empty()
            && self.uncommons.is_empty()
            && self.rares.is_empty()
            && self.mythics.is_empty()
            && self.basic_lands.is_empty()
            && self.variants.is_empty()
    }

    pub fn cards_of(&self, bucket: Bucket) -> &[Card] {
        match bucket {
            Bucket::Common => &self.commons,
            Bucket::Uncommon => &self.uncommons,
            Bucket::Rare => &self.rares,
            Bucket::Mythic => &self.mythics,
            Bucket::BasicLand => &self.basic_lands,
            Bucket::Variant => &self.variants,
        }
    }

    /// Variant printings of the given rarity.
    pub fn variants_of(&self, rarity: Rarity) -> Vec<Card> {
        self.variants
            .iter()
            .filter(|c| c.rarity == rarity)
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub fn sample(mythics: usize, rares: usize, uncommons: usize, commons: usize) -> Self {
        let mut cards = Vec::new();
        for (rarity, count) in [
            (Rarity::Mythic, mythics),
            (Rarity::Rare, rares),
            (Rarity::Uncommon, uncommons),
            (Rarity::Common, commons),
        ] {
            for _ in 0..count {
                cards.push(Card::sample(rarity));
            }
        }
        Self::build(&cards)
    }
}

impl Debug for CardPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CardPool {{ mythics: {}, rares: {}, uncommons: {}, commons: {}, lands: {}, variants: {}, foil only: {}, all: {} }}",
            self.mythics.len(),
            self.rares.len(),
            self.uncommons.len(),
            self.commons.len(),
            self.basic_lands.len(),
            self.variants.len(),
            self.foil_only.len(),
            self.all.len()
        )
    }
}
