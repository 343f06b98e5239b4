use std::collections::BTreeSet;

use crate::cards::{Card, Colour};

/// Choose which card a bot takes from its hand. Cards are ranked by rarity;
/// once a bot has colours it takes the best card sharing one of them, falling
/// back to the best card overall. Returns an index into the hand.
pub fn choose(hand: &[Card], colours: &BTreeSet<Colour>) -> Option<usize> {
    let mut ranked: Vec<usize> = (0..hand.len()).collect();
    // Stable, so equal rarities keep hand order.
    ranked.sort_by_key(|&i| hand[i].rarity.rank());

    if !colours.is_empty() {
        let on_colour = ranked
            .iter()
            .copied()
            .find(|&i| hand[i].colours.iter().any(|c| colours.contains(c)));
        if on_colour.is_some() {
            return on_colour;
        }
    }
    ranked.first().copied()
}

/// Add a picked card's colours to a bot's preferences.
pub fn absorb(colours: &mut BTreeSet<Colour>, card: &Card) {
    colours.extend(card.colours.iter().copied());
}
