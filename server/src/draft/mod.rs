use std::time::Duration;

use crate::error::{Error, Res};

pub mod bot;
pub mod game;
pub mod handlers;
pub mod packs;
pub mod pickers;
pub mod pool;
pub mod server;
mod timer;

/// Booster product being opened. Each has its own slot layout.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    /// 14 cards, with a bonus sheet slot and a foil.
    Play,
    /// 15 cards, commons, uncommons, a rare and a land.
    Draft,
    /// 12 cards, two rare slots and a foil chance.
    Set,
    #[serde(other)]
    Unknown,
}

impl ProductType {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "play" => ProductType::Play,
            "draft" => ProductType::Draft,
            "set" => ProductType::Set,
            _ => ProductType::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One human against bots.
    Draft,
    /// Open packs without drafting.
    Sealed,
    /// Several humans, remaining seats filled by bots.
    Multiplayer,
}

impl Mode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(Mode::Draft),
            "sealed" => Some(Mode::Sealed),
            "multiplayer" => Some(Mode::Multiplayer),
            _ => None,
        }
    }
}

pub const MAX_PACKS: usize = 12;
pub const MAX_PLAYERS: usize = 16;

#[derive(Clone, Debug, serde::Serialize)]
pub struct DraftSettings {
    pub set: String,
    pub product: ProductType,
    pub packs: usize,
    pub players: usize,

    /// Time allowed for each pick. Zero for no limit.
    pub pick_time: Duration,

    pub mode: Mode,
}

impl DraftSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timed(&self) -> Option<Duration> {
        (self.mode == Mode::Draft && !self.pick_time.is_zero()).then_some(self.pick_time)
    }

    /// Pack and player counts must be between one and their maximums.
    pub fn check(&self) -> Res<()> {
        if !(1..=MAX_PACKS).contains(&self.packs) {
            return Err(Error::Settings(format!(
                "pack count must be between 1 and {MAX_PACKS}, got {}",
                self.packs
            )));
        }
        if !(1..=MAX_PLAYERS).contains(&self.players) {
            return Err(Error::Settings(format!(
                "number of players must be between 1 and {MAX_PLAYERS}, got {}",
                self.players
            )));
        }
        Ok(())
    }
}

impl Default for DraftSettings {
    fn default() -> Self {
        DraftSettings {
            set: String::new(),
            product: ProductType::Draft,
            packs: 3,
            players: 8,
            pick_time: Duration::ZERO,
            mode: Mode::Draft,
        }
    }
}

/// Probabilities used when filling booster slots.
#[derive(Clone, Debug)]
pub struct SlotOdds {
    /// Chance a rare slot is a mythic in play and set boosters.
    pub mythic_rate_play: f64,
    /// Chance a rare slot is a mythic in draft boosters.
    pub mythic_rate_draft: f64,

    /// Wildcard rarity weights: common, uncommon, rare, mythic.
    pub wildcard_weights: [f64; 4],
    /// Chance a wildcard is replaced by a same rarity variant.
    pub variant_rate: f64,

    /// Chance a foil slot is drawn from the foil-only printings.
    pub foil_only_rate: f64,
    /// Chance the second rare slot of a set booster is a foil instead.
    pub set_foil_rate: f64,

    /// Chance the seventh common of a play booster is from the bonus sheet.
    pub bonus_rate: f64,
    /// Months either side of a set's release for the bonus sheet.
    pub bonus_window_months: u32,
    /// Fewer bonus sheet cards than this in the window uses the full sheet.
    pub bonus_minimum: usize,
}

impl Default for SlotOdds {
    fn default() -> Self {
        SlotOdds {
            mythic_rate_play: 1.0 / 7.0,
            mythic_rate_draft: 1.0 / 8.0,
            wildcard_weights: [0.49, 0.35, 0.125, 0.035],
            variant_rate: 0.3,
            foil_only_rate: 0.15,
            set_foil_rate: 0.5,
            bonus_rate: 0.125,
            bonus_window_months: 6,
            bonus_minimum: 50,
        }
    }
}
