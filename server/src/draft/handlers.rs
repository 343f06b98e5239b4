use std::{collections::HashMap, sync::Mutex, time::Duration};

use axum::{
    extract::ws::{Message, WebSocket},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use uuid::Uuid;

use crate::{
    cards::{cockatrice, export, Card, CardDatabase},
    error::Error,
    Resp,
};

use super::{
    packs::{open_sealed, Booster, BoosterSource},
    pool::CardPool,
    server::{DraftClientMessage, DraftServer, DraftServerMessage, DraftServerRequest},
    DraftSettings, Mode, ProductType, SlotOdds,
};

/// Shared by every request. Each running draft is reachable through the
/// sender for its server task.
pub struct AppState {
    pub carddb: CardDatabase,
    pub odds: SlotOdds,
    drafts: Mutex<HashMap<Uuid, UnboundedSender<DraftServerRequest>>>,
}

impl AppState {
    pub fn new(carddb: CardDatabase) -> Self {
        Self {
            carddb,
            odds: SlotOdds::default(),
            drafts: Mutex::new(HashMap::new()),
        }
    }

    fn register(&self, id: Uuid, chan: UnboundedSender<DraftServerRequest>) {
        if let Ok(mut drafts) = self.drafts.lock() {
            drafts.retain(|_, chan| !chan.is_closed());
            drafts.insert(id, chan);
        }
    }

    /// The server for a draft, if it is still running.
    pub fn draft(&self, id: Uuid) -> Option<UnboundedSender<DraftServerRequest>> {
        self.drafts
            .lock()
            .ok()?
            .get(&id)
            .filter(|chan| !chan.is_closed())
            .cloned()
    }
}

#[derive(serde::Serialize)]
struct SealedPool {
    boosters: Vec<Booster>,
    pool: Vec<Card>,
    decklist: String,
    decklist_foil: String,
    cockatrice: String,
}

async fn parse_settings(data: &mut axum::extract::Multipart) -> Result<DraftSettings, Response<String>> {
    let mut settings = DraftSettings::new();
    while let Ok(Some(field)) = data.next_field().await {
        let field_name = field.name().unwrap_or("").to_string();
        let s = match field.text().await {
            Ok(s) => s,
            Err(e) => return Err(Resp::e500(e)),
        };

        match field_name.as_str() {
            "set" => settings.set = s.trim().to_lowercase(),
            "product" => settings.product = ProductType::parse(&s),
            "packs" => match s.trim().parse::<usize>() {
                Ok(n) if n > 0 => settings.packs = n,
                _ => return Err(Resp::e422(format!("Invalid pack count: {s}"))),
            },
            "players" => match s.trim().parse::<usize>() {
                Ok(n) if n > 0 => settings.players = n,
                _ => return Err(Resp::e422(format!("Invalid number of players: {s}"))),
            },
            "pick_time" => match s.trim().parse::<u64>() {
                Ok(secs) => settings.pick_time = Duration::from_secs(secs),
                Err(_) => return Err(Resp::e422(format!("Invalid pick time: {s}"))),
            },
            "mode" => match Mode::parse(&s) {
                Some(mode) => settings.mode = mode,
                None => return Err(Resp::e422(format!("Invalid mode: {s}"))),
            },
            _ => {}
        }
    }

    if settings.set.is_empty() {
        return Err(Resp::e422("No set provided for draft."));
    }
    if let Err(e) = settings.check() {
        return Err(Resp::e422(e));
    }
    Ok(settings)
}

pub async fn handle_launch_request(
    state: std::sync::Arc<AppState>,
    mut data: axum::extract::Multipart,
) -> Response<String> {
    let settings = match parse_settings(&mut data).await {
        Ok(settings) => settings,
        Err(resp) => return resp,
    };

    let pool = CardPool::build(state.carddb.set(&settings.set));
    if pool.is_empty() {
        return Resp::e422(Error::NoEligibleCards(settings.set));
    }
    let bonus_sheet = state.carddb.bonus_sheet(
        state.carddb.release_date(&settings.set),
        state.odds.bonus_window_months,
        state.odds.bonus_minimum,
    );

    if settings.mode == Mode::Sealed {
        return open_sealed_pool(&settings, &pool, &bonus_sheet, &state.odds);
    }

    let (server, chan) = DraftServer::new(
        settings,
        pool,
        bonus_sheet,
        state.odds.clone(),
        StdRng::from_entropy(),
    );
    let id = server.id();
    state.register(id, chan);
    tokio::spawn(server.run());

    Resp::ok(id)
}

fn open_sealed_pool(
    settings: &DraftSettings,
    pool: &CardPool,
    bonus_sheet: &[Card],
    odds: &SlotOdds,
) -> Response<String> {
    let src = BoosterSource {
        pool,
        bonus_sheet,
        odds,
    };
    let boosters = match open_sealed(settings, &src, &mut rand::thread_rng()) {
        Ok(boosters) => boosters,
        Err(e) => return Resp::e422(e),
    };

    let cards: Vec<Card> = boosters.iter().flat_map(|b| b.cards.iter().cloned()).collect();
    let cockatrice = match cockatrice::encode_deck(&settings.set, &cards) {
        Ok(xml) => xml,
        Err(e) => return Resp::e500(e),
    };
    tracing::debug!("Opened {} boosters of {}.", boosters.len(), settings.set);

    Resp::json(&SealedPool {
        decklist: export::decklist(&cards),
        decklist_foil: export::decklist_foil(&cards),
        cockatrice,
        pool: cards,
        boosters,
    })
}

/// Relay messages between a websocket and a draft server until either closes.
pub async fn handle_socket(socket: WebSocket, chan: UnboundedSender<DraftServerRequest>, seat: Uuid) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = unbounded_channel();
    let local = tx.clone();
    if chan.send(DraftServerRequest::Connect(seat, tx)).is_err() {
        return;
    }

    let outgoing = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!("Failed to encode message: {e}"),
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<DraftClientMessage>(&text) {
                Ok(msg) => {
                    if chan.send(DraftServerRequest::Message(seat, msg)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    local
                        .send(DraftServerMessage::error(format!("Invalid message: {e}")))
                        .ok();
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    chan.send(DraftServerRequest::Disconnect(seat)).ok();
    outgoing.abort();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_client_messages() {
        let msg: DraftClientMessage =
            serde_json::from_str(r#"{"type": "join_request", "payload": {"name": "Ann"}}"#).unwrap();
        assert!(matches!(msg, DraftClientMessage::JoinRequest { name } if name == "Ann"));

        let msg: DraftClientMessage = serde_json::from_str(r#"{"type": "request_state"}"#).unwrap();
        assert!(matches!(msg, DraftClientMessage::RequestState));

        let id = Uuid::new_v4();
        let msg: DraftClientMessage = serde_json::from_str(&format!(
            r#"{{"type": "make_pick", "payload": {{"card": "{id}"}}}}"#
        ))
        .unwrap();
        assert!(matches!(msg, DraftClientMessage::MakePick { card } if card == id));

        assert!(serde_json::from_str::<DraftClientMessage>(r#"{"type": "cheat"}"#).is_err());
    }

    #[test]
    fn test_server_message_shape() {
        let value = serde_json::to_value(DraftServerMessage::PlayerStatusUpdate {
            pending: vec!["Ann".to_string()],
        })
        .unwrap();
        assert_eq!(value["type"], "player_status_update");
        assert_eq!(value["payload"]["pending"][0], "Ann");

        let value = serde_json::to_value(DraftServerMessage::error("nope")).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["payload"]["message"], "nope");
    }

    #[test]
    fn test_registry_drops_closed_drafts() {
        let state = AppState::new(CardDatabase::new());
        let (tx, rx) = unbounded_channel();
        let id = Uuid::new_v4();
        state.register(id, tx);
        assert!(state.draft(id).is_some());

        drop(rx);
        assert!(state.draft(id).is_none());

        let (tx, _rx) = unbounded_channel();
        let live = Uuid::new_v4();
        state.register(live, tx);
        let drafts = state.drafts.lock().unwrap();
        assert_eq!(drafts.len(), 1);
        assert!(drafts.contains_key(&live));
    }

    #[test]
    fn test_sealed_pool() {
        let pool = CardPool::sample(2, 6, 12, 24);
        let settings = DraftSettings {
            set: "tst".to_string(),
            mode: Mode::Sealed,
            packs: 6,
            ..Default::default()
        };
        let resp = open_sealed_pool(&settings, &pool, &[], &SlotOdds::default());
        assert_eq!(resp.status(), axum::http::StatusCode::OK);

        let value: serde_json::Value = serde_json::from_str(resp.body()).unwrap();
        assert_eq!(value["boosters"].as_array().unwrap().len(), 6);
        assert_eq!(value["pool"].as_array().unwrap().len(), 90);

        let resp = open_sealed_pool(&settings, &CardPool::new(), &[], &SlotOdds::default());
        assert_eq!(resp.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }
}
