use std::{collections::HashMap, time::Duration};

use rand::rngs::StdRng;
use tokio::sync::mpsc::{
    unbounded_channel, UnboundedReceiver, UnboundedSender, WeakUnboundedSender,
};
use uuid::Uuid;

use crate::cards::{cockatrice, export, Card};

use super::{
    game::{Draft, DraftSnapshot, Phase as DraftPhase, Round, Seat, SeatKind},
    packs::{make_packs, BoosterSource},
    pool::CardPool,
    timer::PickTimer,
    DraftSettings, Mode, SlotOdds,
};

/// A draft with nobody connected closes after this long without a request.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, Debug, serde::Serialize)]
pub struct SeatInfo {
    pub name: String,
    pub kind: SeatKind,
}

#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DraftServerMessage {
    RoomJoined {
        draft: Uuid,
        seat: Uuid,
        host: bool,
    },
    LobbyUpdate {
        players: Vec<String>,
        host: Option<String>,
        seats: usize,
    },
    DraftStarted {
        settings: DraftSettings,
        seats: Vec<SeatInfo>,
    },
    DraftState(DraftSnapshot),
    PickConfirmed {
        card: Card,
    },
    PlayerStatusUpdate {
        pending: Vec<String>,
    },
    DraftComplete {
        pool: Vec<Card>,
        decklist: String,
        decklist_foil: String,
        cockatrice: String,
    },
    Error {
        message: String,
    },
}

impl DraftServerMessage {
    pub fn error<S: ToString>(message: S) -> Self {
        DraftServerMessage::Error {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DraftClientMessage {
    JoinRequest { name: String },
    StartDraft,
    MakePick { card: Uuid },
    RequestState,
}

pub enum DraftServerRequest {
    Connect(Uuid, UnboundedSender<DraftServerMessage>),
    Disconnect(Uuid),
    Message(Uuid, DraftClientMessage),
    PickTimeout(Round),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Lobby,
    Draft,
    Finished,
}

struct Client {
    name: String,
    chan: Option<UnboundedSender<DraftServerMessage>>,
}

/// Owns a single draft. Every request is handled to completion before the
/// next is read from the queue.
pub struct DraftServer {
    id: Uuid,
    settings: DraftSettings,
    pool: CardPool,
    bonus_sheet: Vec<Card>,
    odds: SlotOdds,
    rng: StdRng,

    phase: Phase,
    chan: UnboundedReceiver<DraftServerRequest>,
    weak: WeakUnboundedSender<DraftServerRequest>,
    clients: HashMap<Uuid, Client>,

    /// Human seats in join order. The first is the host.
    joined: Vec<Uuid>,

    draft: Option<Draft>,
    timer: PickTimer,
}

impl DraftServer {
    pub fn new(
        settings: DraftSettings,
        pool: CardPool,
        bonus_sheet: Vec<Card>,
        odds: SlotOdds,
        rng: StdRng,
    ) -> (Self, UnboundedSender<DraftServerRequest>) {
        let (tx, rx) = unbounded_channel();
        let server = Self {
            id: Uuid::new_v4(),
            settings,
            pool,
            bonus_sheet,
            odds,
            rng,
            phase: Phase::Lobby,
            chan: rx,
            weak: tx.downgrade(),
            clients: HashMap::new(),
            joined: Vec::new(),
            draft: None,
            timer: PickTimer::default(),
        };
        (server, tx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn run(mut self) {
        tracing::info!("Draft {} open for {} seats.", self.id, self.settings.players);
        loop {
            let req = match tokio::time::timeout(IDLE_TIMEOUT, self.chan.recv()).await {
                Ok(Some(req)) => req,
                Ok(None) => break,
                Err(_) if self.abandoned() => {
                    tracing::info!("Draft {} abandoned.", self.id);
                    break;
                }
                Err(_) => continue,
            };

            let left = matches!(req, DraftServerRequest::Disconnect(_));
            match req {
                DraftServerRequest::Connect(id, chan) => self.connect(id, chan),
                DraftServerRequest::Disconnect(id) => self.disconnect(id),
                DraftServerRequest::Message(id, msg) => self.handle(id, msg),
                DraftServerRequest::PickTimeout(round) => self.timeout(round),
            }

            let over = match self.phase {
                Phase::Lobby => left,
                Phase::Draft => false,
                Phase::Finished => true,
            };
            if over && self.abandoned() {
                break;
            }
        }
        self.timer.cancel();
        tracing::info!("Draft {} closed.", self.id);
    }

    fn connect(&mut self, id: Uuid, chan: UnboundedSender<DraftServerMessage>) {
        if let Some(client) = self.clients.get_mut(&id) {
            client.chan = Some(chan);
            if self.joined.contains(&id) {
                tracing::debug!("Seat {id} reconnected to draft {}.", self.id);
                self.send(id, self.room_joined(id));
                self.send_state(id);
            }
        } else {
            self.clients.insert(
                id,
                Client {
                    name: String::new(),
                    chan: Some(chan),
                },
            );
        }
    }

    fn disconnect(&mut self, id: Uuid) {
        if self.phase == Phase::Lobby {
            self.clients.remove(&id);
            if self.joined.contains(&id) {
                self.joined.retain(|j| *j != id);
                self.broadcast(self.lobby_update());
            }
        } else if let Some(client) = self.clients.get_mut(&id) {
            client.chan = None;
        }
    }

    fn handle(&mut self, id: Uuid, msg: DraftClientMessage) {
        if !self.clients.contains_key(&id) {
            tracing::debug!("Message from unknown client {id} ignored.");
            return;
        }

        match msg {
            DraftClientMessage::JoinRequest { name } => self.join(id, name),
            DraftClientMessage::StartDraft => {
                if self.phase != Phase::Lobby {
                    self.send(id, DraftServerMessage::error("Draft already started."));
                } else if self.host() != Some(id) {
                    self.send(id, DraftServerMessage::error("Only the host can start the draft."));
                } else {
                    self.start();
                }
            }
            DraftClientMessage::MakePick { card } => self.make_pick(id, card),
            DraftClientMessage::RequestState => self.send_state(id),
        }
    }

    fn join(&mut self, id: Uuid, name: String) {
        if self.phase != Phase::Lobby {
            self.send(id, DraftServerMessage::error("Draft already started."));
            return;
        }
        let capacity = match self.settings.mode {
            Mode::Draft => 1,
            _ => self.settings.players,
        };
        if !self.joined.contains(&id) {
            if self.joined.len() >= capacity {
                self.send(id, DraftServerMessage::error("Draft is full."));
                return;
            }
            self.joined.push(id);
        }
        if let Some(client) = self.clients.get_mut(&id) {
            client.name = name;
        }

        tracing::debug!("Seat {id} joined draft {}.", self.id);
        self.send(id, self.room_joined(id));
        self.broadcast(self.lobby_update());

        if self.settings.mode == Mode::Draft {
            self.start();
        }
    }

    fn start(&mut self) {
        let mut seats: Vec<Seat> = self
            .joined
            .iter()
            .map(|id| Seat::human(*id, self.name_of(*id)))
            .collect();
        let humans = seats.len();
        for number in 1..=self.settings.players.saturating_sub(humans) {
            seats.push(Seat::bot(number));
        }
        self.settings.players = seats.len();

        let src = BoosterSource {
            pool: &self.pool,
            bonus_sheet: &self.bonus_sheet,
            odds: &self.odds,
        };
        let packs = match make_packs(&self.settings, &src, &mut self.rng) {
            Ok(packs) => packs,
            Err(e) => {
                tracing::warn!("Failed to start draft {}: {e}", self.id);
                self.broadcast(DraftServerMessage::error(e));
                return;
            }
        };

        let infos = seats
            .iter()
            .map(|s| SeatInfo {
                name: s.name.clone(),
                kind: s.kind,
            })
            .collect();

        let mut draft = Draft::new(seats, packs);
        draft.begin();
        draft.run_bots();
        self.draft = Some(draft);
        self.phase = Phase::Draft;

        tracing::info!(
            "Draft {} started with {humans} players and {} bots.",
            self.id,
            self.settings.players - humans
        );
        self.broadcast(DraftServerMessage::DraftStarted {
            settings: self.settings.clone(),
            seats: infos,
        });
        self.after_round();
    }

    fn make_pick(&mut self, id: Uuid, card: Uuid) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        let Some(seat) = draft.seat_index(id) else {
            return;
        };

        let before = draft.round();
        if let Err(e) = draft.pick(seat, card) {
            tracing::debug!("Rejected pick from {id}: {e}");
            return;
        }
        self.timer.cancel();

        if let Some(card) = draft.drafted_cards(seat).and_then(|c| c.last()).cloned() {
            tracing::debug!("Seat {id} picked {}.", card.name());
            self.send(id, DraftServerMessage::PickConfirmed { card });
        }
        self.after_pick(before);
    }

    fn timeout(&mut self, round: Round) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        if draft.phase() != DraftPhase::AwaitingPicks || draft.round() != round {
            return;
        }

        let before = draft.round();
        let pending: Vec<usize> = (0..draft.seats().len())
            .filter(|&i| draft.seats()[i].kind == SeatKind::Human && draft.is_pending(i))
            .collect();
        for seat in pending {
            tracing::info!("Pick timer expired, auto-picking for {}.", draft.seats()[seat].name);
            if let Err(e) = draft.auto_pick(seat) {
                tracing::warn!("Auto-pick failed: {e}");
            }
        }
        self.after_pick(before);
    }

    /// Let bots respond to a pick, then tell everyone what changed.
    fn after_pick(&mut self, before: Round) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        draft.run_bots();

        if draft.round() != before || draft.draft_complete() {
            self.after_round();
        } else {
            let pending = self.pending_names();
            self.broadcast(DraftServerMessage::PlayerStatusUpdate { pending });
        }
    }

    fn after_round(&mut self) {
        let complete = self.draft.as_ref().is_some_and(Draft::draft_complete);
        if complete {
            self.finish();
            return;
        }

        for id in self.joined.clone() {
            self.send_state(id);
        }
        self.arm_timer();
    }

    fn finish(&mut self) {
        self.phase = Phase::Finished;
        self.timer.cancel();
        tracing::info!("Draft {} complete.", self.id);
        if let Some(draft) = &self.draft {
            for (seat, pool) in draft.pools() {
                tracing::debug!("Seat {seat} drafted {} cards.", pool.len());
            }
        }

        for id in self.joined.clone() {
            self.send_state(id);
        }
    }

    fn arm_timer(&mut self) {
        let (Some(after), Some(draft)) = (self.settings.timed(), &self.draft) else {
            return;
        };
        if !draft.draft_complete() {
            self.timer.arm(draft.round(), after, self.weak.clone());
        }
    }

    /// Current state for one client, answered from the live draft.
    fn send_state(&self, id: Uuid) {
        let msg = match (&self.phase, &self.draft) {
            (Phase::Lobby, _) | (_, None) => self.lobby_update(),
            (Phase::Draft, Some(draft)) => match draft.seat_index(id).and_then(|s| draft.snapshot(s)) {
                Some(snapshot) => DraftServerMessage::DraftState(snapshot),
                None => DraftServerMessage::error("Not in this draft."),
            },
            (Phase::Finished, Some(draft)) => {
                match draft.seat_index(id).and_then(|s| draft.drafted_cards(s)) {
                    Some(pool) => self.complete_message(pool),
                    None => DraftServerMessage::error("Not in this draft."),
                }
            }
        };
        self.send(id, msg);
    }

    fn complete_message(&self, pool: &[Card]) -> DraftServerMessage {
        let cockatrice = cockatrice::encode_deck(&self.settings.set, pool).unwrap_or_else(|e| {
            tracing::warn!("{e}");
            String::new()
        });
        DraftServerMessage::DraftComplete {
            pool: pool.to_vec(),
            decklist: export::decklist(pool),
            decklist_foil: export::decklist_foil(pool),
            cockatrice,
        }
    }

    /// No client has a live connection.
    fn abandoned(&self) -> bool {
        self.clients.values().all(|c| c.chan.is_none())
    }

    fn host(&self) -> Option<Uuid> {
        self.joined.first().copied()
    }

    fn name_of(&self, id: Uuid) -> String {
        self.clients
            .get(&id)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn pending_names(&self) -> Vec<String> {
        self.draft
            .as_ref()
            .map(|d| d.pending().iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }

    fn room_joined(&self, id: Uuid) -> DraftServerMessage {
        DraftServerMessage::RoomJoined {
            draft: self.id,
            seat: id,
            host: self.host() == Some(id),
        }
    }

    fn lobby_update(&self) -> DraftServerMessage {
        DraftServerMessage::LobbyUpdate {
            players: self.joined.iter().map(|id| self.name_of(*id)).collect(),
            host: self.host().map(|id| self.name_of(id)),
            seats: self.settings.players,
        }
    }

    fn send(&self, id: Uuid, msg: DraftServerMessage) {
        if let Some(chan) = self.clients.get(&id).and_then(|c| c.chan.as_ref()) {
            chan.send(msg).ok();
        }
    }

    /// Send to everyone in the lobby, or once the draft has started to the
    /// seated players only.
    fn broadcast(&self, msg: DraftServerMessage) {
        match self.phase {
            Phase::Lobby => {
                for id in self.clients.keys() {
                    self.send(*id, msg.clone());
                }
            }
            Phase::Draft | Phase::Finished => {
                for id in &self.joined {
                    self.send(*id, msg.clone());
                }
            }
        }
    }
}
