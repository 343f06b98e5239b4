use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use axum::{
    extract::{Multipart, Path as UrlPath, Query, State, WebSocketUpgrade},
    http::{Response, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use cards::CardDatabase;
use draft::handlers::AppState;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use uuid::Uuid;

mod cards;
mod draft;
mod error;

#[derive(serde::Serialize)]
struct Resp {
    message: String,
    success: bool,
}

impl Resp {
    fn axum<S: ToString>(message: S, status: StatusCode) -> Response<String> {
        match serde_json::ser::to_string(&Self {
            message: message.to_string(),
            success: status == StatusCode::OK,
        }) {
            Ok(body) => {
                let mut resp = Response::new(body);
                *resp.status_mut() = status;
                resp
            }
            Err(e) => Self::encode_failure(e),
        }
    }

    fn encode_failure(e: serde_json::Error) -> Response<String> {
        let mut resp = Response::new(format!("Failed to JSON encode response: {e}"));
        *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        resp
    }

    fn ok<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::OK)
    }

    fn json<T: serde::Serialize>(body: &T) -> Response<String> {
        match serde_json::ser::to_string(body) {
            Ok(body) => Response::new(body),
            Err(e) => Self::encode_failure(e),
        }
    }

    fn e500<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn e422<S: ToString>(message: S) -> Response<String> {
        Self::axum(message, StatusCode::UNPROCESSABLE_ENTITY)
    }
}

#[derive(serde::Deserialize)]
struct WsParams {
    /// Seat to reconnect as. A new seat is created if absent.
    seat: Option<Uuid>,
}

async fn ws_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(draft): UrlPath<Uuid>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> axum::response::Response {
    let Some(chan) = state.draft(draft) else {
        return Resp::e422(format!("No such draft: {draft}")).into_response();
    };
    let seat = params.seat.unwrap_or_else(Uuid::new_v4);
    ws.on_upgrade(move |socket| draft::handlers::handle_socket(socket, chan, seat))
}

async fn launch_handler(
    State(state): State<Arc<AppState>>,
    data: Multipart,
) -> axum::http::Response<String> {
    draft::handlers::handle_launch_request(state, data).await
}

async fn load_card_database(data: &Path) -> error::Res<CardDatabase> {
    let scryfall_cards = cards::scryfall::load_cards(data).await?;
    tracing::debug!("Inserting scryfall data to card database.");
    let mut database = CardDatabase::new();
    for card in scryfall_cards {
        database.add(card);
    }
    tracing::debug!(
        "Succesfully populated card database with {} cards.",
        database.size()
    );
    Ok(database)
}

#[tokio::main]
async fn main() {
    const USAGE: &str = "Usage: server <static path> <data path> <port>";

    let content = std::env::args().nth(1).expect(USAGE);
    let data = std::env::args().nth(2).expect(USAGE);
    let port = std::env::args()
        .nth(3)
        .map(|s| s.parse::<u16>().unwrap_or_else(|_| panic!("Invalid port number: {s}")))
        .expect(USAGE);

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let card_db = match load_card_database(&PathBuf::from(data)).await {
        Ok(db) => db,
        Err(e) => panic!("Failed to load scryfall card list: {e}"),
    };

    let app = Router::new()
        .fallback_service(ServeDir::new(content).append_index_html_on_directories(true))
        .route("/ws/:draft", get(ws_handler))
        .route("/api/start", post(launch_handler))
        .with_state(Arc::new(AppState::new(card_db)))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .unwrap_or_else(|_| panic!("Failed to open port {port}"));

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Closed due to error: {e}");
    }
}
