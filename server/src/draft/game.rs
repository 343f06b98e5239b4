use std::collections::BTreeSet;

use thiserror::Error;
use uuid::Uuid;

use crate::cards::{Card, Colour};

use super::{bot, packs::Pack};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PassDirection {
    /// Each seat receives the previous seat's hand.
    Left,
    /// Each seat receives the next seat's hand.
    Right,
}

impl PassDirection {
    fn for_pack(pack: usize) -> Self {
        if pack % 2 == 0 {
            PassDirection::Left
        } else {
            PassDirection::Right
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatKind {
    Human,
    Bot,
}

#[derive(Debug)]
pub struct Seat {
    pub id: Uuid,
    pub name: String,
    pub kind: SeatKind,
    picks: Vec<Card>,
    hand: Pack,
    picked: bool,

    /// Colours of every card picked so far. Only tracked for bots.
    colours: BTreeSet<Colour>,
}

impl Seat {
    pub fn new(id: Uuid, name: String, kind: SeatKind) -> Self {
        Self {
            id,
            name,
            kind,
            picks: Vec::new(),
            hand: Vec::new(),
            picked: false,
            colours: BTreeSet::new(),
        }
    }

    pub fn human(id: Uuid, name: String) -> Self {
        Self::new(id, name, SeatKind::Human)
    }

    pub fn bot(number: usize) -> Self {
        Self::new(Uuid::new_v4(), format!("Bot {number}"), SeatKind::Bot)
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn picks(&self) -> &[Card] {
        &self.picks
    }

    /// Nothing left for this seat to do this round.
    fn done(&self) -> bool {
        self.picked || self.hand.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Dealing,
    AwaitingPicks,
    Complete,
}

/// Position in the draft, zero-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Round {
    pub pack: usize,
    pub pick: usize,
}

/// What a successful pick led to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickOutcome {
    /// Other seats still have to pick.
    Waiting,
    /// Every seat picked and hands were passed.
    Passed,
    /// The pack round finished and fresh packs were dealt.
    NextPack,
    /// The final pack round finished.
    Complete,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PickError {
    #[error("Seat not in draft.")]
    UnknownSeat,
    #[error("Draft has not started.")]
    NotStarted,
    #[error("Already picked this round.")]
    AlreadyPicked,
    #[error("Card not in hand.")]
    NotInHand,
    #[error("Draft is complete.")]
    DraftComplete,
}

/// State sent to a seat so it can render the draft.
#[derive(Clone, Debug, serde::Serialize)]
pub struct DraftSnapshot {
    pub hand: Vec<Card>,

    /// One-based pack number.
    pub pack: usize,

    /// One-based pick number within the pack.
    pub pick: usize,

    /// Names of seats yet to pick this round.
    pub pending: Vec<String>,
}

pub struct Draft {
    seats: Vec<Seat>,

    /// Undealt packs, indexed by round then seat.
    packs: Vec<Vec<Pack>>,

    pack: usize,
    pick: usize,
    phase: Phase,
}

impl Draft {
    pub fn new(seats: Vec<Seat>, packs: Vec<Vec<Pack>>) -> Self {
        debug_assert!(packs.iter().all(|round| round.len() == seats.len()));

        Self {
            seats,
            packs,
            pack: 0,
            pick: 0,
            phase: Phase::Dealing,
        }
    }

    /// Deal the first pack to each seat. May only be called once.
    pub fn begin(&mut self) {
        debug_assert!(self.phase == Phase::Dealing);

        self.deal();
    }

    /// Take a card from a seat's hand. Once every seat has picked the hands
    /// are passed, or if they are all empty the next packs are dealt. On error
    /// nothing has changed.
    pub fn pick(&mut self, seat: usize, card: Uuid) -> Result<PickOutcome, PickError> {
        self.accepting_picks()?;

        let seat = self.seats.get_mut(seat).ok_or(PickError::UnknownSeat)?;
        if seat.picked {
            return Err(PickError::AlreadyPicked);
        }
        let index = seat
            .hand
            .iter()
            .position(|c| c.id == card)
            .ok_or(PickError::NotInHand)?;

        let card = seat.hand.remove(index);
        if seat.kind == SeatKind::Bot {
            bot::absorb(&mut seat.colours, &card);
        }
        seat.picks.push(card);
        seat.picked = true;

        Ok(self.advance())
    }

    /// Pick the first card in a seat's hand, used when a pick timer expires.
    pub fn auto_pick(&mut self, seat: usize) -> Result<PickOutcome, PickError> {
        self.accepting_picks()?;
        let card = self
            .seats
            .get(seat)
            .ok_or(PickError::UnknownSeat)?
            .hand
            .first()
            .map(|c| c.id)
            .ok_or(PickError::NotInHand)?;
        self.pick(seat, card)
    }

    fn accepting_picks(&self) -> Result<(), PickError> {
        match self.phase {
            Phase::Dealing => Err(PickError::NotStarted),
            Phase::Complete => Err(PickError::DraftComplete),
            Phase::AwaitingPicks => Ok(()),
        }
    }

    /// Make picks for every bot that has yet to pick, repeating until only
    /// humans are left to pick or the draft is over.
    pub fn run_bots(&mut self) -> Vec<PickOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let next = self
                .seats
                .iter()
                .enumerate()
                .filter(|(_, s)| s.kind == SeatKind::Bot && !s.done())
                .find_map(|(i, s)| bot::choose(&s.hand, &s.colours).map(|c| (i, s.hand[c].id)));
            let Some((seat, card)) = next else {
                break;
            };

            match self.pick(seat, card) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::warn!("Bot pick rejected: {e}");
                    break;
                }
            }
        }
        outcomes
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> Round {
        Round {
            pack: self.pack,
            pick: self.pick,
        }
    }

    /// Check if this draft is completed. This is true when the final card has
    /// been drafted from the final pack.
    pub fn draft_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn seat_index(&self, id: Uuid) -> Option<usize> {
        self.seats.iter().position(|s| s.id == id)
    }

    /// Get the hand currently in front of this seat, if any.
    pub fn current_pack(&self, seat: usize) -> Option<&[Card]> {
        self.seats.get(seat).map(Seat::hand)
    }

    /// Get the cards drafted by this seat so far.
    pub fn drafted_cards(&self, seat: usize) -> Option<&[Card]> {
        self.seats.get(seat).map(Seat::picks)
    }

    /// Whether the seat can pick right now.
    pub fn is_pending(&self, seat: usize) -> bool {
        self.phase == Phase::AwaitingPicks && self.seats.get(seat).is_some_and(|s| !s.done())
    }

    /// Seats yet to pick this round.
    pub fn pending(&self) -> Vec<&Seat> {
        if self.phase != Phase::AwaitingPicks {
            return Vec::new();
        }
        self.seats.iter().filter(|s| !s.done()).collect()
    }

    pub fn snapshot(&self, seat: usize) -> Option<DraftSnapshot> {
        let hand = self.current_pack(seat)?.to_vec();
        Some(DraftSnapshot {
            hand,
            pack: self.pack + 1,
            pick: self.pick + 1,
            pending: self.pending().iter().map(|s| s.name.clone()).collect(),
        })
    }

    /// Each seat's picks, the final pools once the draft is complete.
    pub fn pools(&self) -> impl Iterator<Item = (Uuid, &[Card])> {
        self.seats.iter().map(|s| (s.id, s.picks()))
    }

    /// Give each seat the pack for the current round. Rounds in which every
    /// pack is empty are skipped. Completes the draft when out of packs.
    fn deal(&mut self) {
        while self.pack < self.packs.len() {
            let packs = std::mem::take(&mut self.packs[self.pack]);
            for (seat, pack) in self.seats.iter_mut().zip(packs) {
                seat.hand = pack;
                seat.picked = false;
            }
            self.pick = 0;

            if self.seats.iter().any(|s| !s.hand.is_empty()) {
                self.phase = Phase::AwaitingPicks;
                return;
            }
            self.pack += 1;
        }

        tracing::debug!("Draft complete after {} packs.", self.pack);
        self.phase = Phase::Complete;
    }

    /// Called after each pick. Rotates hands or deals new packs if every seat
    /// is done with this round.
    fn advance(&mut self) -> PickOutcome {
        if !self.seats.iter().all(Seat::done) {
            return PickOutcome::Waiting;
        }

        if self.seats.iter().all(|s| s.hand.is_empty()) {
            self.pack += 1;
            self.deal();
            return if self.draft_complete() {
                PickOutcome::Complete
            } else {
                PickOutcome::NextPack
            };
        }

        self.pass(PassDirection::for_pack(self.pack));
        PickOutcome::Passed
    }

    fn pass(&mut self, direction: PassDirection) {
        let mut hands: Vec<Pack> = self
            .seats
            .iter_mut()
            .map(|s| std::mem::take(&mut s.hand))
            .collect();
        match direction {
            PassDirection::Left => hands.rotate_right(1),
            PassDirection::Right => hands.rotate_left(1),
        }
        for (seat, hand) in self.seats.iter_mut().zip(hands) {
            seat.hand = hand;
            seat.picked = false;
        }
        self.pick += 1;
    }
}
