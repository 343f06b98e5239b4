use std::fmt::Write;

use crate::cards::Card;

/// A card and the number of copies of it in a list.
pub struct Entry<'a> {
    pub card: &'a Card,
    pub count: usize,
}

/// Group identical printings, keeping the order in which each was first seen.
/// If `split_foil` is set foil and non-foil copies are counted separately.
pub fn aggregate(cards: &[Card], split_foil: bool) -> Vec<Entry<'_>> {
    let mut entries: Vec<Entry> = Vec::new();
    for card in cards {
        let existing = entries.iter_mut().find(|e| {
            e.card.name == card.name
                && e.card.set == card.set
                && e.card.collector_number == card.collector_number
                && (!split_foil || e.card.foil == card.foil)
        });
        match existing {
            Some(entry) => entry.count += 1,
            None => entries.push(Entry { card, count: 1 }),
        }
    }
    entries
}

fn write_list(cards: &[Card], foil: bool) -> String {
    let mut out = String::new();
    for Entry { card, count } in aggregate(cards, foil) {
        write!(
            out,
            "{count} {} ({}) {}",
            card.name,
            card.set.to_uppercase(),
            card.collector_number
        )
        .ok();
        if foil && card.foil {
            out.push_str(" *F*");
        }
        out.push('\n');
    }
    out
}

/// Deck list with one `<count> <name> (<SET>) <collector number>` per line.
pub fn decklist(cards: &[Card]) -> String {
    write_list(cards, false)
}

/// As `decklist`, with foil copies on their own lines marked `*F*`.
pub fn decklist_foil(cards: &[Card]) -> String {
    write_list(cards, true)
}
