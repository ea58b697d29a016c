//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::service::{BoardService, RollRequest};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// The one board this controller drives
    pub service: BoardService,
    /// Mapping from client ID to their message sender
    pub clients: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new(service: BoardService) -> Self {
        Self {
            service,
            clients: DashMap::new(),
        }
    }

    /// Send a message to a specific client.
    pub fn send_to_client(&self, client_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.clients.get(&client_id) {
            let _ = sender.send(msg);
        }
    }

    /// Send a message to every connected client.
    pub fn broadcast(&self, msg: ServerMessage) {
        for client in self.clients.iter() {
            let _ = client.value().send(msg.clone());
        }
    }

    fn broadcast_board(&self) {
        self.broadcast(ServerMessage::BoardState {
            state: self.service.state(),
        });
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Hexlight server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let client_id = Uuid::new_v4();

    // Welcome goes out before the client is registered so it is always first
    let welcome = ServerMessage::Welcome { client_id };
    ws_sender
        .send(Message::Text(serde_json::to_string(&welcome)?.into()))
        .await?;

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.clients.insert(client_id, tx);
    state.send_to_client(
        client_id,
        ServerMessage::BoardState {
            state: state.service.state(),
        },
    );

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if ws_sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to encode {:?}: {}", msg, e),
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(client_id, client_msg, &state).await,
                Err(e) => {
                    warn!("Invalid message from {}: {}", client_id, text);
                    state.send_to_client(client_id, ServerMessage::malformed(e.to_string()));
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", client_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to_client(client_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", client_id, e);
                break;
            }
            _ => {}
        }
    }

    state.clients.remove(&client_id);
    send_task.abort();

    info!("Connection closed for {}", client_id);
    Ok(())
}

/// Handle a client message.
async fn handle_message(client_id: Uuid, msg: ClientMessage, state: &ServerState) {
    debug!(%client_id, ?msg, "Request");
    let service = &state.service;

    match msg {
        ClientMessage::GetState => {
            state.send_to_client(
                client_id,
                ServerMessage::BoardState {
                    state: service.state(),
                },
            );
        }

        ClientMessage::Randomize { config } => match service.randomize(config).await {
            Ok(_) => state.broadcast_board(),
            Err(e) => state.send_to_client(client_id, ServerMessage::error(&e)),
        },

        ClientMessage::StartGame => {
            service.start_game().await;
            state.broadcast_board();
        }

        ClientMessage::BackToSetup => {
            service.back_to_setup();
            state.broadcast_board();
        }

        ClientMessage::GetConfig => {
            state.send_to_client(
                client_id,
                ServerMessage::Config {
                    config: service.config(),
                },
            );
        }

        ClientMessage::UpdateConfig { config } => match service.update_config(config) {
            Ok(config) => {
                state.send_to_client(client_id, ServerMessage::Config { config });
                state.broadcast_board();
            }
            Err(e) => state.send_to_client(client_id, ServerMessage::error(&e)),
        },

        ClientMessage::Roll { auto, value } => {
            let reply = match service.roll(RollRequest { auto, value }) {
                Ok(outcome) => ServerMessage::RollResult { outcome },
                Err(e) => ServerMessage::error(&e),
            };
            state.send_to_client(client_id, reply);
        }

        ClientMessage::FlashUnit { tile_index } => {
            let reply = ServerMessage::flash(tile_index, service.flash_unit(tile_index));
            state.send_to_client(client_id, reply);
        }

        ClientMessage::GetPalette => {
            state.send_to_client(
                client_id,
                ServerMessage::Palette {
                    colors: service.palette(),
                },
            );
        }

        ClientMessage::Ping => {
            state.send_to_client(client_id, ServerMessage::Pong);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimationCoordinator, AnimationTiming};
    use crate::indicator::NullIndicator;
    use crate::protocol::{ErrorKind, FlashStatus};
    use crate::service::RollAnimation;
    use hexlight_core::{BoardConfiguration, Mode, DEFAULT_MAX_ATTEMPTS};

    fn state() -> ServerState {
        let animations =
            AnimationCoordinator::new(Box::new(NullIndicator::new(18)), AnimationTiming::default());
        ServerState::new(BoardService::new(
            BoardConfiguration::standard(),
            animations,
            DEFAULT_MAX_ATTEMPTS,
        ))
    }

    fn connect(state: &ServerState) -> (Uuid, mpsc::UnboundedReceiver<ServerMessage>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        state.clients.insert(id, tx);
        (id, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_randomize_broadcasts_board() {
        let state = state();
        let (alice, mut alice_rx) = connect(&state);
        let (_bob, mut bob_rx) = connect(&state);

        handle_message(alice, ClientMessage::Randomize { config: None }, &state).await;

        for rx in [&mut alice_rx, &mut bob_rx] {
            let msgs = drain(rx);
            assert_eq!(msgs.len(), 1);
            match &msgs[0] {
                ServerMessage::BoardState { state } => assert!(state.is_laid_out()),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_randomize_only_tells_sender() {
        let state = state();
        let (alice, mut alice_rx) = connect(&state);
        let (_bob, mut bob_rx) = connect(&state);

        let mut config = BoardConfiguration::standard();
        config.numbers.pop();
        handle_message(
            alice,
            ClientMessage::Randomize {
                config: Some(config),
            },
            &state,
        )
        .await;

        assert!(matches!(
            drain(&mut alice_rx).as_slice(),
            [ServerMessage::Error {
                kind: ErrorKind::InvalidConfig,
                ..
            }]
        ));
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_roll_replies_to_sender() {
        let state = state();
        let (alice, mut alice_rx) = connect(&state);
        let (_bob, mut bob_rx) = connect(&state);

        handle_message(
            alice,
            ClientMessage::Roll {
                auto: false,
                value: Some(7),
            },
            &state,
        )
        .await;
        match drain(&mut alice_rx).as_slice() {
            [ServerMessage::RollResult { outcome }] => {
                assert_eq!(outcome.total, 7);
                assert_eq!(outcome.animation, RollAnimation::Alert);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(drain(&mut bob_rx).is_empty());

        handle_message(
            alice,
            ClientMessage::Roll {
                auto: false,
                value: Some(8),
            },
            &state,
        )
        .await;
        assert!(matches!(
            drain(&mut alice_rx).as_slice(),
            [ServerMessage::Error {
                kind: ErrorKind::Busy,
                ..
            }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flash_desert_reports_status() {
        let state = state();
        let (alice, mut rx) = connect(&state);
        handle_message(alice, ClientMessage::Randomize { config: None }, &state).await;
        drain(&mut rx);

        handle_message(alice, ClientMessage::FlashUnit { tile_index: 0 }, &state).await;
        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::FlashResult {
                status: FlashStatus::NoIndicator,
                tile_index: 0,
                unit: None
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_flash_index_is_invalid_tile() {
        let state = state();
        let (alice, mut rx) = connect(&state);

        handle_message(alice, ClientMessage::FlashUnit { tile_index: -3 }, &state).await;
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [ServerMessage::Error {
                kind: ErrorKind::InvalidTile,
                ..
            }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_changes_broadcast() {
        let state = state();
        let (alice, mut rx) = connect(&state);

        handle_message(alice, ClientMessage::StartGame, &state).await;
        match drain(&mut rx).as_slice() {
            [ServerMessage::BoardState { state }] => assert_eq!(state.mode, Mode::Play),
            other => panic!("unexpected {:?}", other),
        }

        handle_message(alice, ClientMessage::BackToSetup, &state).await;
        match drain(&mut rx).as_slice() {
            [ServerMessage::BoardState { state }] => assert_eq!(state.mode, Mode::Setup),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_client_is_skipped() {
        let state = state();
        let (alice, mut rx) = connect(&state);
        let (_gone, gone_rx) = connect(&state);
        drop(gone_rx);

        handle_message(alice, ClientMessage::Ping, &state).await;
        handle_message(alice, ClientMessage::BackToSetup, &state).await;
        let msgs = drain(&mut rx);
        assert_eq!(msgs[0], ServerMessage::Pong);
        assert!(matches!(msgs[1], ServerMessage::BoardState { .. }));
    }
}
