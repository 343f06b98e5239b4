use rand::Rng;

use crate::{
    cards::Card,
    error::{err, Error, Res},
};

use super::{
    pickers::{
        pick_foil, pick_random, pick_random_n, pick_rare_or_mythic, pick_safe, pick_wildcard,
    },
    pool::{Bucket, CardPool},
    DraftSettings, ProductType, SlotOdds,
};

pub type Pack = Vec<Card>;

pub const PLAY_BOOSTER_SIZE: usize = 14;
pub const DRAFT_BOOSTER_SIZE: usize = 15;
pub const SET_BOOSTER_SIZE: usize = 12;

/// An opened booster.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Booster {
    pub set: String,
    pub product: ProductType,
    pub cards: Pack,
}

/// Everything a generator draws from.
pub struct BoosterSource<'a> {
    pub pool: &'a CardPool,

    /// Cards for the play booster bonus slot, already narrowed to the set's
    /// release window.
    pub bonus_sheet: &'a [Card],

    pub odds: &'a SlotOdds,
}

fn slot(name: &str, card: Option<Card>) -> Res<Card> {
    match card {
        Some(card) => Ok(card),
        None => err(format!("No card available for {name} slot.")),
    }
}

fn check_size(pack: Pack, size: usize) -> Res<Pack> {
    if pack.len() == size {
        Ok(pack)
    } else {
        err(format!("Generated {} cards, expected {size}.", pack.len()))
    }
}

fn play_booster<R: Rng + ?Sized>(src: &BoosterSource, rng: &mut R) -> Res<Pack> {
    let BoosterSource {
        pool,
        bonus_sheet,
        odds,
    } = src;

    let mut pack = pick_safe(pool, Bucket::Common, 7, rng);
    if rng.gen::<f64>() < odds.bonus_rate {
        if let Some(bonus) = pick_random(bonus_sheet, rng) {
            pack.pop();
            pack.push(bonus.as_bonus());
        }
    }
    pack.extend(pick_safe(pool, Bucket::Uncommon, 3, rng));
    pack.push(slot(
        "rare",
        pick_rare_or_mythic(pool, odds.mythic_rate_play, rng),
    )?);
    pack.extend(pick_safe(pool, Bucket::BasicLand, 1, rng));
    pack.push(slot("wildcard", pick_wildcard(pool, odds, rng))?);
    let foil = match pick_foil(pool, odds, rng) {
        Some(card) => card,
        None => slot("foil", pick_wildcard(pool, odds, rng))?,
    };
    pack.push(foil);

    check_size(pack, PLAY_BOOSTER_SIZE)
}

fn draft_booster<R: Rng + ?Sized>(src: &BoosterSource, rng: &mut R) -> Res<Pack> {
    let pool = src.pool;

    let mut pack = pick_safe(pool, Bucket::Common, 10, rng);
    pack.extend(pick_safe(pool, Bucket::Uncommon, 3, rng));
    pack.push(slot(
        "rare",
        pick_rare_or_mythic(pool, src.odds.mythic_rate_draft, rng),
    )?);
    pack.extend(pick_safe(pool, Bucket::BasicLand, 1, rng));

    check_size(pack, DRAFT_BOOSTER_SIZE)
}

fn set_booster<R: Rng + ?Sized>(src: &BoosterSource, rng: &mut R) -> Res<Pack> {
    let BoosterSource { pool, odds, .. } = src;

    let merged: Vec<Card> = pool
        .commons
        .iter()
        .chain(&pool.uncommons)
        .cloned()
        .collect();
    let base: &[Card] = if !merged.is_empty() {
        &merged
    } else if !pool.rares.is_empty() {
        &pool.rares
    } else {
        &pool.all
    };

    let mut pack = pick_random_n(base, 6, rng);
    pack.extend(pick_safe(pool, Bucket::Uncommon, 2, rng));
    pack.push(slot(
        "rare",
        pick_rare_or_mythic(pool, odds.mythic_rate_play, rng),
    )?);
    let second = if rng.gen::<f64>() < odds.set_foil_rate {
        match pick_foil(pool, odds, rng) {
            Some(card) => Some(card),
            None => pick_wildcard(pool, odds, rng),
        }
    } else {
        pick_rare_or_mythic(pool, odds.mythic_rate_play, rng)
    };
    pack.push(slot("second rare", second)?);
    pack.extend(pick_safe(pool, Bucket::BasicLand, 1, rng));
    // Stands in for the art card.
    pack.extend(pick_safe(pool, Bucket::Common, 1, rng));

    check_size(pack, SET_BOOSTER_SIZE)
}

/// Simplified mix used for unknown products or when a product's generator
/// can't fill its slots. May have fewer than 14 cards but is never empty for
/// a pool with any cards.
fn fallback_booster<R: Rng + ?Sized>(src: &BoosterSource, rng: &mut R) -> Pack {
    let pool = src.pool;

    let mut pack = pick_random_n(&pool.commons, 9, rng);
    pack.extend(pick_random_n(&pool.uncommons, 3, rng));
    let rares = if rng.gen::<f64>() < src.odds.mythic_rate_draft && !pool.mythics.is_empty() {
        &pool.mythics
    } else {
        &pool.rares
    };
    pack.extend(pick_random(rares, rng));
    pack.extend(pick_wildcard(pool, src.odds, rng));

    if pack.is_empty() {
        pack = pick_random_n(&pool.all, PLAY_BOOSTER_SIZE, rng);
    }
    pack
}

/// Open a single booster. Never fails: if the product's generator can't build
/// a pack the fallback mix is used instead.
pub fn make_booster<R: Rng + ?Sized>(
    set: &str,
    product: &ProductType,
    src: &BoosterSource,
    rng: &mut R,
) -> Booster {
    let generated = match product {
        ProductType::Play => play_booster(src, rng),
        ProductType::Draft => draft_booster(src, rng),
        ProductType::Set => set_booster(src, rng),
        ProductType::Unknown => Ok(fallback_booster(src, rng)),
    };

    let cards = generated.unwrap_or_else(|e| {
        tracing::warn!("{product:?} booster for {set} failed, using fallback: {e}");
        fallback_booster(src, rng)
    });

    Booster {
        set: set.to_string(),
        product: product.clone(),
        cards,
    }
}

/// Generate the packs for a draft, indexed by round and then by seat.
pub fn make_packs<R: Rng + ?Sized>(
    settings: &DraftSettings,
    src: &BoosterSource,
    rng: &mut R,
) -> Res<Vec<Vec<Pack>>> {
    settings.check()?;
    if src.pool.is_empty() {
        return Err(Error::NoEligibleCards(settings.set.clone()));
    }

    let mut rounds = Vec::with_capacity(settings.packs);
    for _ in 0..settings.packs {
        let mut packs = Vec::with_capacity(settings.players);
        for _ in 0..settings.players {
            packs.push(make_booster(&settings.set, &settings.product, src, rng).cards);
        }
        rounds.push(packs);
    }
    Ok(rounds)
}

/// Open boosters for a sealed pool.
pub fn open_sealed<R: Rng + ?Sized>(
    settings: &DraftSettings,
    src: &BoosterSource,
    rng: &mut R,
) -> Res<Vec<Booster>> {
    settings.check()?;
    if src.pool.is_empty() {
        return Err(Error::NoEligibleCards(settings.set.clone()));
    }

    Ok((0..settings.packs)
        .map(|_| make_booster(&settings.set, &settings.product, src, rng))
        .collect())
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::cards::{Finish, Rarity};

    fn source<'a>(pool: &'a CardPool, bonus: &'a [Card], odds: &'a SlotOdds) -> BoosterSource<'a> {
        BoosterSource {
            pool,
            bonus_sheet: bonus,
            odds,
        }
    }

    fn full_pool() -> CardPool {
        let mut cards = Vec::new();
        for (rarity, count) in [
            (Rarity::Mythic, 5),
            (Rarity::Rare, 20),
            (Rarity::Uncommon, 40),
            (Rarity::Common, 60),
        ] {
            for _ in 0..count {
                let mut card = Card::sample(rarity);
                card.finishes = vec![Finish::Nonfoil, Finish::Foil];
                cards.push(card);
            }
        }
        for _ in 0..5 {
            let mut land = Card::sample(Rarity::Common);
            land.type_line = "Basic Land — Island".to_string();
            cards.push(land);
        }
        CardPool::build(&cards)
    }

    #[test]
    fn test_booster_sizes() {
        let pool = full_pool();
        let odds = SlotOdds::default();
        let rng = &mut StdRng::seed_from_u64(7);
        let src = source(&pool, &[], &odds);

        for (product, size) in [
            (ProductType::Play, PLAY_BOOSTER_SIZE),
            (ProductType::Draft, DRAFT_BOOSTER_SIZE),
            (ProductType::Set, SET_BOOSTER_SIZE),
        ] {
            for _ in 0..20 {
                assert_eq!(make_booster("tst", &product, &src, rng).cards.len(), size);
            }
        }
    }

    #[test]
    fn test_sparse_pool_sizes() {
        let odds = SlotOdds::default();
        let rng = &mut StdRng::seed_from_u64(8);

        for rarity in [Rarity::Common, Rarity::Uncommon, Rarity::Rare, Rarity::Mythic] {
            let pool = CardPool::build(&[Card::sample(rarity)]);
            let src = source(&pool, &[], &odds);
            assert_eq!(
                make_booster("tst", &ProductType::Play, &src, rng).cards.len(),
                PLAY_BOOSTER_SIZE
            );
            assert_eq!(
                make_booster("tst", &ProductType::Draft, &src, rng).cards.len(),
                DRAFT_BOOSTER_SIZE
            );
            assert_eq!(
                make_booster("tst", &ProductType::Set, &src, rng).cards.len(),
                SET_BOOSTER_SIZE
            );
        }
    }

    #[test]
    fn test_draft_booster_layout() {
        let pool = full_pool();
        let odds = SlotOdds::default();
        let rng = &mut StdRng::seed_from_u64(9);
        let pack = draft_booster(&source(&pool, &[], &odds), rng).unwrap();

        let count = |r: Rarity| pack.iter().filter(|c| c.rarity == r).count();
        // Ten commons and the basic land, which is also common.
        assert_eq!(count(Rarity::Common), 11);
        assert_eq!(count(Rarity::Uncommon), 3);
        assert_eq!(count(Rarity::Rare) + count(Rarity::Mythic), 1);
        assert!(pack[14].type_line.contains("Basic Land"));
        assert!(pack.iter().all(|c| !c.foil));
    }

    #[test]
    fn test_play_booster_foil_and_bonus() {
        let pool = full_pool();
        let bonus: Vec<Card> = (0..3).map(|_| Card::sample(Rarity::Rare)).collect();
        let odds = SlotOdds {
            bonus_rate: 1.0,
            ..Default::default()
        };
        let rng = &mut StdRng::seed_from_u64(10);
        let pack = play_booster(&source(&pool, &bonus, &odds), rng).unwrap();

        assert!(pack[6].bonus);
        assert!(bonus.iter().any(|c| c.id == pack[6].id));
        assert!(pack[..6].iter().all(|c| c.rarity == Rarity::Common && !c.bonus));
        assert!(pack[13].foil);
        assert!(pack[..13].iter().all(|c| !c.foil));
    }

    #[test]
    fn test_play_booster_no_foils() {
        let pool = CardPool::sample(2, 5, 10, 20);
        let odds = SlotOdds::default();
        let rng = &mut StdRng::seed_from_u64(11);
        let pack = play_booster(&source(&pool, &[], &odds), rng).unwrap();
        assert_eq!(pack.len(), PLAY_BOOSTER_SIZE);
        assert!(!pack[13].foil);
    }

    #[test]
    fn test_unknown_product_fallback() {
        let pool = full_pool();
        let odds = SlotOdds::default();
        let rng = &mut StdRng::seed_from_u64(12);
        let booster = make_booster("tst", &ProductType::Unknown, &source(&pool, &[], &odds), rng);
        assert_eq!(booster.cards.len(), PLAY_BOOSTER_SIZE);
        assert_eq!(booster.product, ProductType::Unknown);
    }

    #[test]
    fn test_failed_generator_falls_back() {
        // Nothing to fill the common and uncommon slots of a set booster with.
        let pool = CardPool {
            mythics: vec![Card::sample(Rarity::Mythic)],
            ..Default::default()
        };
        let odds = SlotOdds::default();
        let rng = &mut StdRng::seed_from_u64(13);
        let src = source(&pool, &[], &odds);

        assert!(set_booster(&src, rng).is_err());
        let booster = make_booster("tst", &ProductType::Set, &src, rng);
        assert!(!booster.cards.is_empty());
        assert!(booster.cards.len() <= PLAY_BOOSTER_SIZE);
    }

    #[test]
    fn test_set_booster_layout() {
        let pool = full_pool();
        let rng = &mut StdRng::seed_from_u64(16);
        let rare = |c: &Card| matches!(c.rarity, Rarity::Rare | Rarity::Mythic);

        let odds = SlotOdds {
            set_foil_rate: 0.0,
            ..Default::default()
        };
        let pack = set_booster(&source(&pool, &[], &odds), rng).unwrap();
        assert_eq!(pack.len(), SET_BOOSTER_SIZE);
        assert!(pack[..6]
            .iter()
            .all(|c| matches!(c.rarity, Rarity::Common | Rarity::Uncommon)));
        assert!(!pack[..6].iter().any(|c| c.type_line.contains("Basic Land")));
        assert!(pack[6..8].iter().all(|c| c.rarity == Rarity::Uncommon));
        assert!(rare(&pack[8]));
        assert!(rare(&pack[9]) && !pack[9].foil);
        assert!(pack[10].type_line.contains("Basic Land"));
        assert_eq!(pack[11].rarity, Rarity::Common);
        assert!(!pack[11].type_line.contains("Basic Land"));
        assert!(pack.iter().all(|c| !c.foil));

        let odds = SlotOdds {
            set_foil_rate: 1.0,
            ..Default::default()
        };
        for _ in 0..10 {
            let pack = set_booster(&source(&pool, &[], &odds), rng).unwrap();
            assert!(rare(&pack[8]) && !pack[8].foil);
            assert!(pack[9].foil);
            assert_eq!(pack.iter().filter(|c| c.foil).count(), 1);
        }

        // Without commons or uncommons the first slots come from the rares.
        let pool = CardPool::sample(0, 3, 0, 0);
        let pack = set_booster(&source(&pool, &[], &odds), rng).unwrap();
        assert_eq!(pack.len(), SET_BOOSTER_SIZE);
        assert!(pack[..6].iter().all(|c| c.rarity == Rarity::Rare));
    }

    #[test]
    fn test_make_packs() {
        let pool = full_pool();
        let odds = SlotOdds::default();
        let rng = &mut StdRng::seed_from_u64(14);
        let settings = DraftSettings {
            set: "tst".to_string(),
            packs: 3,
            players: 4,
            ..Default::default()
        };

        let packs = make_packs(&settings, &source(&pool, &[], &odds), rng).unwrap();
        assert_eq!(packs.len(), 3);
        assert!(packs.iter().all(|round| round.len() == 4));
        assert!(packs.iter().flatten().all(|p| p.len() == DRAFT_BOOSTER_SIZE));

        let sealed = open_sealed(&settings, &source(&pool, &[], &odds), rng).unwrap();
        assert_eq!(sealed.len(), 3);
    }

    #[test]
    fn test_oversized_settings_rejected() {
        let pool = full_pool();
        let odds = SlotOdds::default();
        let rng = &mut StdRng::seed_from_u64(17);
        let src = source(&pool, &[], &odds);

        let settings = DraftSettings {
            set: "tst".to_string(),
            packs: usize::MAX / 2,
            players: 2,
            ..Default::default()
        };
        assert!(matches!(make_packs(&settings, &src, rng), Err(Error::Settings(_))));
        assert!(matches!(open_sealed(&settings, &src, rng), Err(Error::Settings(_))));

        let settings = DraftSettings {
            set: "tst".to_string(),
            players: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(make_packs(&settings, &src, rng), Err(Error::Settings(_))));
    }

    #[test]
    fn test_empty_pool_fatal() {
        let pool = CardPool::new();
        let odds = SlotOdds::default();
        let settings = DraftSettings {
            set: "nil".to_string(),
            ..Default::default()
        };
        let rng = &mut StdRng::seed_from_u64(15);
        assert!(matches!(
            make_packs(&settings, &source(&pool, &[], &odds), rng),
            Err(Error::NoEligibleCards(set)) if set == "nil"
        ));
    }
}
