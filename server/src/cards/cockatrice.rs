use crate::{
    cards::{export::aggregate, Card},
    error::{Error, Res},
};

#[derive(serde::Serialize)]
struct XmlDeckCard<'a> {
    #[serde(rename = "@number")]
    number: usize,

    #[serde(rename = "@name")]
    name: &'a str,
}

#[derive(serde::Serialize)]
struct XmlZone<'a> {
    #[serde(rename = "@name")]
    name: &'a str,

    #[serde(rename = "card")]
    cards: Vec<XmlDeckCard<'a>>,
}

#[derive(serde::Serialize)]
#[serde(rename = "cockatrice_deck")]
struct XmlDeck<'a> {
    #[serde(rename = "@version")]
    version: u32,

    deckname: &'a str,

    #[serde(rename = "zone")]
    zones: Vec<XmlZone<'a>>,
}

/// Encode a card pool as a cockatrice `.cod` deck, with every card in the main
/// zone. Cockatrice identifies cards by name only so printings are merged.
pub fn encode_deck(name: &str, cards: &[Card]) -> Res<String> {
    let mut merged: Vec<XmlDeckCard> = Vec::new();
    for entry in aggregate(cards, false) {
        match merged.iter_mut().find(|c| c.name == entry.card.name) {
            Some(card) => card.number += entry.count,
            None => merged.push(XmlDeckCard {
                number: entry.count,
                name: &entry.card.name,
            }),
        }
    }

    let deck = XmlDeck {
        version: 1,
        deckname: name,
        zones: vec![XmlZone {
            name: "main",
            cards: merged,
        }],
    };

    let body = quick_xml::se::to_string(&deck).map_err(|e| Error::Export(e.to_string()))?;
    Ok(format!(r#"<?xml version="1.0" encoding="UTF-8"?>{body}"#))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cards::Rarity;

    #[test]
    fn test_encode() {
        let a = Card {
            name: "Nibbles, Corpse Companion".to_string(),
            ..Card::sample(Rarity::Uncommon)
        };
        let b = Card::sample(Rarity::Common);
        let xml = encode_deck("Draft", &[a.clone(), b.clone(), a.as_foil()]).unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(r#"<cockatrice_deck version="1">"#));
        assert!(xml.contains("<deckname>Draft</deckname>"));
        assert!(xml.contains(r#"<zone name="main">"#));
        assert!(xml.contains(r#"<card number="2" name="Nibbles, Corpse Companion"/>"#));
        assert!(xml.contains(&format!(r#"<card number="1" name="{}"/>"#, b.name)));
    }
}
