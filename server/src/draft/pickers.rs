//! Random selection primitives shared by the booster generators. Every picker
//! is pure given the pool and the random source.

use rand::{seq::SliceRandom, Rng};

use crate::cards::{Card, Rarity};

use super::{
    pool::{Bucket, CardPool},
    SlotOdds,
};

/// Choose a single card uniformly.
pub fn pick_random<R: Rng + ?Sized>(cards: &[Card], rng: &mut R) -> Option<Card> {
    cards.choose(rng).cloned()
}

/// Up to `n` distinct cards, fewer if the list is short.
fn pick_unique<R: Rng + ?Sized>(cards: &[Card], n: usize, rng: &mut R) -> Vec<Card> {
    cards.choose_multiple(rng, n).cloned().collect()
}

/// Exactly `n` cards from a non-empty list. Cards only repeat once every card
/// in the list has been taken.
pub fn pick_random_n<R: Rng + ?Sized>(cards: &[Card], n: usize, rng: &mut R) -> Vec<Card> {
    let mut picked = Vec::with_capacity(n);
    while picked.len() < n && !cards.is_empty() {
        let need = n - picked.len();
        picked.extend(pick_unique(cards, need, rng));
    }
    picked
}

/// Given a bucket we are short of, which buckets should we take the rest of
/// the slot from, in priority order.
fn fallbacks(bucket: Bucket) -> &'static [Bucket] {
    use Bucket::*;

    match bucket {
        Common => &[Uncommon, Rare],
        Uncommon => &[Common, Rare],
        Rare => &[Mythic, Uncommon, Common],
        Mythic => &[Rare, Uncommon, Common],
        BasicLand => &[Common],
        Variant => &[Rare, Uncommon, Common],
    }
}

/// `n` cards from a bucket. Shortfalls are made up from the fallback buckets,
/// then from any bucket, and last from the unfiltered card list, so this only
/// comes up short if the pool has no cards at all.
pub fn pick_safe<R: Rng + ?Sized>(
    pool: &CardPool,
    bucket: Bucket,
    n: usize,
    rng: &mut R,
) -> Vec<Card> {
    let mut picked = pick_unique(pool.cards_of(bucket), n, rng);
    for &fallback in fallbacks(bucket) {
        if picked.len() >= n {
            break;
        }
        let need = n - picked.len();
        picked.extend(pick_unique(pool.cards_of(fallback), need, rng));
    }
    if picked.len() < n {
        let need = n - picked.len();
        let partition: Vec<Card> = pool.partition().cloned().collect();
        let rest = if partition.is_empty() {
            &pool.all
        } else {
            &partition
        };
        picked.extend(pick_random_n(rest, need, rng));
    }
    picked
}

fn pick_one<R: Rng + ?Sized>(pool: &CardPool, bucket: Bucket, rng: &mut R) -> Option<Card> {
    pick_safe(pool, bucket, 1, rng).pop()
}

/// A rare, or a mythic with the given probability. If only one of the two
/// buckets has cards, that bucket is used.
pub fn pick_rare_or_mythic<R: Rng + ?Sized>(
    pool: &CardPool,
    mythic_rate: f64,
    rng: &mut R,
) -> Option<Card> {
    let mythic = rng.gen::<f64>() < mythic_rate;
    let bucket = match (mythic, pool.mythics.is_empty(), pool.rares.is_empty()) {
        (true, false, _) | (false, false, true) => Bucket::Mythic,
        _ => Bucket::Rare,
    };
    pick_one(pool, bucket, rng)
}

fn roll_rarity<R: Rng + ?Sized>(weights: &[f64; 4], rng: &mut R) -> Rarity {
    const RARITIES: [Rarity; 4] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Mythic,
    ];

    let total: f64 = weights.iter().sum();
    let mut roll = rng.gen::<f64>() * total;
    for (rarity, weight) in RARITIES.into_iter().zip(weights) {
        if roll < *weight {
            return rarity;
        }
        roll -= weight;
    }
    Rarity::Common
}

/// A card of any rarity, weighted. Sometimes swapped for a variant printing
/// of the same rarity.
pub fn pick_wildcard<R: Rng + ?Sized>(
    pool: &CardPool,
    odds: &SlotOdds,
    rng: &mut R,
) -> Option<Card> {
    let rarity = roll_rarity(&odds.wildcard_weights, rng);
    if rng.gen::<f64>() < odds.variant_rate {
        if let Some(card) = pick_random(&pool.variants_of(rarity), rng) {
            return Some(card);
        }
    }
    let bucket = Bucket::of(rarity).unwrap_or(Bucket::Common);
    pick_one(pool, bucket, rng)
}

/// A foil copy of a card. Usually any foil-eligible card, sometimes one of the
/// foil-only printings. None if nothing in the pool can be foil.
pub fn pick_foil<R: Rng + ?Sized>(pool: &CardPool, odds: &SlotOdds, rng: &mut R) -> Option<Card> {
    if !pool.foil_only.is_empty() && rng.gen::<f64>() < odds.foil_only_rate {
        return pick_random(&pool.foil_only, rng).map(|c| c.as_foil());
    }
    pick_random(&pool.foil_eligible, rng).map(|c| c.as_foil())
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::cards::Finish;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn test_pick_random_n() {
        let cards: Vec<Card> = (0..5).map(|_| Card::sample(Rarity::Common)).collect();
        let ids: HashSet<_> = cards.iter().map(|c| c.id).collect();
        let rng = &mut rng(1);

        // Enough cards, so no repeats.
        let picked = pick_random_n(&cards, 4, rng);
        assert_eq!(picked.len(), 4);
        let unique: HashSet<_> = picked.iter().map(|c| c.id).collect();
        assert_eq!(unique.len(), 4);

        // Undersized list degrades to repeats, but every card is used first.
        let picked = pick_random_n(&cards, 12, rng);
        assert_eq!(picked.len(), 12);
        assert!(picked.iter().all(|c| ids.contains(&c.id)));
        let first: HashSet<_> = picked[..5].iter().map(|c| c.id).collect();
        assert_eq!(first, ids);

        assert!(pick_random_n(&[], 3, rng).is_empty());
    }

    #[test]
    fn test_pick_safe_fallback() {
        let rng = &mut rng(2);
        let pool = CardPool::sample(0, 1, 0, 2);

        // Commons short, fall back to the rare, then the whole pool.
        let picked = pick_safe(&pool, Bucket::Common, 5, rng);
        assert_eq!(picked.len(), 5);
        assert_eq!(
            picked
                .iter()
                .take(3)
                .filter(|c| c.rarity == Rarity::Common)
                .count(),
            2
        );
        assert_eq!(picked[2].rarity, Rarity::Rare);

        // No lands, fall back to commons.
        let picked = pick_safe(&pool, Bucket::BasicLand, 1, rng);
        assert_eq!(picked[0].rarity, Rarity::Common);

        assert!(pick_safe(&CardPool::new(), Bucket::Rare, 1, rng).is_empty());
    }

    #[test]
    fn test_pick_safe_skips_discarded() {
        let rng = &mut rng(12);
        let common = Card::sample(Rarity::Common);
        let token = Card {
            layout: "token".to_string(),
            ..Card::sample(Rarity::Common)
        };
        let pool = CardPool::build(&[token.clone(), common.clone()]);
        assert_eq!(pool.all.len(), 2);

        // Shortfall repeats the partition rather than reaching the token.
        let picked = pick_safe(&pool, Bucket::Rare, 4, rng);
        assert_eq!(picked.len(), 4);
        assert!(picked.iter().all(|c| c.id == common.id));

        // A pool of nothing but discarded cards still fills the slot.
        let pool = CardPool {
            all: vec![token.clone()],
            ..Default::default()
        };
        let picked = pick_safe(&pool, Bucket::Common, 2, rng);
        assert!(picked.iter().all(|c| c.id == token.id));
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_rare_or_mythic() {
        let rng = &mut rng(3);
        let pool = CardPool::sample(1, 1, 0, 0);
        assert_eq!(
            pick_rare_or_mythic(&pool, 1.0, rng).unwrap().rarity,
            Rarity::Mythic
        );
        assert_eq!(
            pick_rare_or_mythic(&pool, 0.0, rng).unwrap().rarity,
            Rarity::Rare
        );

        // Degrade to whichever bucket has cards.
        let mythics_only = CardPool::sample(1, 0, 0, 0);
        assert_eq!(
            pick_rare_or_mythic(&mythics_only, 0.0, rng).unwrap().rarity,
            Rarity::Mythic
        );
        let rares_only = CardPool::sample(0, 1, 0, 0);
        assert_eq!(
            pick_rare_or_mythic(&rares_only, 1.0, rng).unwrap().rarity,
            Rarity::Rare
        );
    }

    #[test]
    fn test_wildcard_variant() {
        let rng = &mut rng(4);
        let mut variant = Card::sample(Rarity::Common);
        variant.booster = false;
        variant.frame_effects = vec!["showcase".to_string()];
        let pool = CardPool::build(&[variant.clone(), Card::sample(Rarity::Common)]);

        let odds = SlotOdds {
            wildcard_weights: [1.0, 0.0, 0.0, 0.0],
            variant_rate: 1.0,
            ..Default::default()
        };
        for _ in 0..10 {
            assert_eq!(pick_wildcard(&pool, &odds, rng).unwrap().id, variant.id);
        }

        let odds = SlotOdds {
            variant_rate: 0.0,
            ..odds
        };
        for _ in 0..10 {
            assert_ne!(pick_wildcard(&pool, &odds, rng).unwrap().id, variant.id);
        }
    }

    #[test]
    fn test_wildcard_sparse() {
        let rng = &mut rng(5);
        let pool = CardPool::sample(0, 0, 1, 0);
        let odds = SlotOdds::default();
        for _ in 0..50 {
            assert_eq!(
                pick_wildcard(&pool, &odds, rng).unwrap().rarity,
                Rarity::Uncommon
            );
        }
    }

    #[test]
    fn test_foil_only_sole_candidate() {
        let mut foil = Card::sample(Rarity::Rare);
        foil.finishes = vec![Finish::Foil];
        let pool = CardPool::build(&[foil.clone(), Card::sample(Rarity::Common)]);
        let odds = SlotOdds::default();

        for seed in 0..100 {
            let card = pick_foil(&pool, &odds, &mut rng(seed)).unwrap();
            assert_eq!(card.id, foil.id);
            assert!(card.foil);
        }
    }

    #[test]
    fn test_no_foils() {
        let pool = CardPool::sample(1, 1, 1, 1);
        assert!(pick_foil(&pool, &SlotOdds::default(), &mut rng(6)).is_none());
    }
}
