use std::path::Path;

use bytes::Buf;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    cards::{Card, CardFace, Colour, Finish, Rarity},
    error::{Error, Res},
};

const BULK_DATA_URI: &str = "https://api.scryfall.com/bulk-data/default-cards";
const CACHE_FILE: &str = "scryfall-default-cards.json";

fn data_err<E: ToString>(e: E) -> Error {
    Error::CardData(e.to_string())
}

async fn get_bytes(uri: &str) -> Res<bytes::Bytes> {
    reqwest::get(uri)
        .await
        .map_err(data_err)?
        .bytes()
        .await
        .map_err(data_err)
}

fn decode_json<T: DeserializeOwned>(bytes: bytes::Bytes) -> Res<T> {
    serde_json::de::from_reader(bytes.reader()).map_err(data_err)
}

async fn download_list(path: &Path) -> Res<()> {
    #[derive(serde::Deserialize)]
    struct BulkDataInfo {
        download_uri: String,
    }

    let info: BulkDataInfo = decode_json(get_bytes(BULK_DATA_URI).await?)?;
    let raw = get_bytes(&info.download_uri).await?;

    tokio::fs::write(path, raw).await.map_err(data_err)?;
    Ok(())
}

#[derive(serde::Deserialize, Debug)]
struct ScryfallCardImages {
    png: Option<String>,
    large: Option<String>,
    normal: Option<String>,
    small: Option<String>,
}

impl ScryfallCardImages {
    fn choose(self) -> Option<String> {
        self.normal.or(self.large).or(self.png).or(self.small)
    }
}

#[derive(serde::Deserialize, Debug)]
struct ScryfallCardFace {
    name: String,

    #[serde(default)]
    type_line: String,

    #[serde(default)]
    colors: Option<Vec<String>>,

    image_uris: Option<ScryfallCardImages>,
}

#[derive(serde::Deserialize, Debug)]
struct ScryfallCard {
    id: Uuid,

    /// Card name. Includes both faces (!).
    name: String,

    /// Set code.
    set: String,

    collector_number: String,

    /// Rarity string, mythic, rare, uncommon, common, special, bonus.
    rarity: String,

    /// Absent on multi-faced cards, where each face has its own.
    colors: Option<Vec<String>>,

    #[serde(default)]
    type_line: String,

    #[serde(default)]
    cmc: f32,

    #[serde(default)]
    booster: bool,

    #[serde(default)]
    finishes: Vec<String>,

    #[serde(default)]
    frame_effects: Vec<String>,

    #[serde(default)]
    border_color: String,

    #[serde(default)]
    full_art: bool,

    #[serde(default)]
    promo_types: Vec<String>,

    #[serde(default)]
    layout: String,

    /// Release date, YYYY-MM-DD.
    released_at: Option<String>,

    /// Object containing image URIs.
    image_uris: Option<ScryfallCardImages>,

    card_faces: Option<Vec<ScryfallCardFace>>,
}

fn colours(colors: &[String]) -> impl Iterator<Item = Colour> + '_ {
    colors.iter().filter_map(|c| Colour::parse(c))
}

impl ScryfallCard {
    fn to_card(self) -> Option<Card> {
        let rarity = match self.rarity.as_str() {
            "mythic" => Rarity::Mythic,
            "rare" => Rarity::Rare,
            "uncommon" => Rarity::Uncommon,
            "common" => Rarity::Common,
            "special" => Rarity::Special,
            "bonus" => Rarity::Bonus,
            _ => return None,
        };

        let faces_src = self.card_faces.unwrap_or_default();
        let mut card_colours: Vec<Colour> = match &self.colors {
            Some(colors) => colours(colors).collect(),
            None => faces_src
                .iter()
                .filter_map(|face| face.colors.as_deref())
                .flat_map(colours)
                .collect(),
        };
        card_colours.sort();
        card_colours.dedup();

        let faces: Vec<CardFace> = faces_src
            .into_iter()
            .map(|face| CardFace {
                name: face.name,
                type_line: face.type_line,
                image: face.image_uris.and_then(ScryfallCardImages::choose),
            })
            .collect();

        let image = self
            .image_uris
            .and_then(ScryfallCardImages::choose)
            .or_else(|| faces.first().and_then(|face| face.image.clone()));

        let finishes = self
            .finishes
            .iter()
            .filter_map(|f| match f.as_str() {
                "foil" => Some(Finish::Foil),
                "nonfoil" => Some(Finish::Nonfoil),
                "etched" => Some(Finish::Etched),
                _ => None,
            })
            .collect();

        Some(Card {
            id: self.id,
            name: self.name,
            set: self.set,
            collector_number: self.collector_number,
            rarity,
            colours: card_colours,
            type_line: self.type_line,
            mana_value: self.cmc,
            booster: self.booster,
            finishes,
            frame_effects: self.frame_effects,
            border: self.border_color,
            full_art: self.full_art,
            promo_types: self.promo_types,
            layout: self.layout,
            released: self
                .released_at
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            faces,
            image,
            foil: false,
            bonus: false,
        })
    }
}

fn parse_cards(bytes: bytes::Bytes) -> Res<Vec<Card>> {
    let cards: Vec<ScryfallCard> = decode_json(bytes)?;
    tracing::debug!("Converting parsed JSON into card structs.");
    Ok(cards
        .into_iter()
        .filter_map(ScryfallCard::to_card)
        .collect())
}

pub async fn load_cards(data: &Path) -> Res<Vec<Card>> {
    tracing::debug!("Loading scryfall card data.");

    tokio::fs::create_dir_all(data).await.map_err(data_err)?;
    let file = data.join(CACHE_FILE);

    if !file.exists() {
        tracing::debug!("File not found in cache, downloading to {}", file.display());
        download_list(&file).await?;
        tracing::debug!("Successfully downloaded data.");
    }

    let raw = tokio::fs::read(&file).await.map_err(data_err)?;
    tracing::debug!("Read scryfall data from disk. Parsing JSON.");
    parse_cards(bytes::Bytes::from(raw))
}
