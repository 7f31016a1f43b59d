//! WebSocket handling for player connections.
//!
//! One task per connection processes client messages strictly in order.
//! Outbound messages go through a bounded channel drained by a send task.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use shardline_domain::ConnectionId;
use shardline_shared::{error_codes, ClientMessage, ServerMessage};
use tokio::sync::mpsc;

use crate::app::App;
use crate::session::{PlayerHandle, PlayerSession};
use crate::use_cases::movement::{PathUpdateError, PathUpdateInput};
use crate::use_cases::session::JoinGameError;

/// Buffer size for per-connection message channel.
const CONNECTION_CHANNEL_BUFFER: usize = 256;

/// How long queued messages may take to flush once the connection ends.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// What the dispatcher wants done after a message.
#[derive(Debug, Default)]
struct Dispatch {
    /// Sent in order
    replies: Vec<ServerMessage>,
    /// The player now belongs to another server
    close: bool,
}

impl Dispatch {
    fn reply(message: ServerMessage) -> Self {
        Self {
            replies: vec![message],
            close: false,
        }
    }

    fn none() -> Self {
        Self::default()
    }
}

/// WebSocket upgrade handler - entry point for new connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app): State<Arc<App>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

/// Handle an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, app: Arc<App>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection_id = ConnectionId::new();

    let (tx, mut rx) = mpsc::channel::<ServerMessage>(CONNECTION_CHANNEL_BUFFER);

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    // Forward messages from the channel to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
        let _ = ws_sender.close().await;
    });

    let mut session: Option<Arc<PlayerSession>> = None;

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(msg) => {
                    let dispatch = handle_message(msg, &app, &mut session, connection_id, &tx).await;
                    for reply in dispatch.replies {
                        if tx.try_send(reply).is_err() {
                            tracing::warn!(
                                connection_id = %connection_id,
                                "Failed to send response, channel full or closed"
                            );
                        }
                    }
                    if dispatch.close {
                        tracing::info!(connection_id = %connection_id, "Player redirected, closing connection");
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "Failed to parse message");
                    let _ = tx.try_send(ServerMessage::error(
                        error_codes::INVALID_MESSAGE,
                        format!("Invalid message format: {e}"),
                    ));
                }
            },
            Ok(Message::Ping(_)) => {
                let _ = tx.try_send(ServerMessage::Pong);
            }
            Ok(Message::Close(_)) => {
                tracing::info!(connection_id = %connection_id, "WebSocket closed by client");
                break;
            }
            Err(e) => {
                tracing::error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    // Clean up
    if let Some(session) = session.take() {
        app.use_cases.session.leave_game.execute(&session).await;
    }
    drop(tx);
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }

    tracing::info!(connection_id = %connection_id, "WebSocket connection terminated");
}

/// Dispatch a parsed client message to the appropriate use case.
async fn handle_message(
    msg: ClientMessage,
    app: &App,
    session: &mut Option<Arc<PlayerSession>>,
    connection_id: ConnectionId,
    sender: &mpsc::Sender<ServerMessage>,
) -> Dispatch {
    match msg {
        ClientMessage::Heartbeat => Dispatch::reply(ServerMessage::Pong),
        ClientMessage::JoinGame { primary_key } => {
            if session.is_some() {
                return Dispatch::reply(ServerMessage::error(
                    error_codes::ALREADY_CONNECTED,
                    "This connection already joined",
                ));
            }
            let handle = PlayerHandle::new(primary_key, connection_id, sender.clone());
            match app.use_cases.session.join_game.execute(handle).await {
                Ok(joined) => {
                    let welcome = joined.placement.welcome(joined.session.primary_key());
                    *session = Some(joined.session);
                    Dispatch {
                        replies: vec![welcome, joined.occupants],
                        close: false,
                    }
                }
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "Join failed");
                    let code = match &e {
                        JoinGameError::AlreadyConnected(_) => error_codes::ALREADY_CONNECTED,
                        _ => error_codes::NO_SPAWN,
                    };
                    Dispatch::reply(ServerMessage::error(code, e.to_string()))
                }
            }
        }
        ClientMessage::Unknown => Dispatch::reply(ServerMessage::error(
            error_codes::INVALID_MESSAGE,
            "Unknown message type",
        )),
        other => match session.as_ref() {
            Some(session) => handle_player_message(other, app, session).await,
            None => Dispatch::reply(ServerMessage::error(
                error_codes::NOT_JOINED,
                "Send JoinGame first",
            )),
        },
    }
}

/// Messages that need a joined player.
async fn handle_player_message(msg: ClientMessage, app: &App, session: &PlayerSession) -> Dispatch {
    let movement = &app.use_cases.movement;

    if let Some((origin, request)) = msg.as_leave_request() {
        let outcome = movement.leave_map.execute(session, origin, request).await;
        return Dispatch {
            replies: outcome.replies(session.primary_key()),
            close: outcome.ends_session(),
        };
    }

    match msg {
        ClientMessage::EnteringRoom {
            primary_key,
            location,
        } => {
            let outcome = movement.enter_room.execute(session, &primary_key, location).await;
            Dispatch {
                replies: outcome.replies(session.primary_key()),
                close: false,
            }
        }
        ClientMessage::PathUpdate {
            primary_key,
            sync_id,
            path,
            moving,
        } => {
            let input = PathUpdateInput {
                primary_key,
                sync_id,
                path,
                moving,
            };
            match movement.path_update.execute(session, input).await {
                Ok(_) => Dispatch::none(),
                Err(PathUpdateError::InvalidPath(reason)) => {
                    Dispatch::reply(ServerMessage::error(error_codes::INVALID_PATH, reason))
                }
                Err(e) => {
                    tracing::debug!(primary_key = %session.primary_key(), error = %e, "Path update dropped");
                    Dispatch::none()
                }
            }
        }
        _ => Dispatch::none(),
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use shardline_domain::{Location, PlayerKey, SyncId};
    use shardline_shared::LeaveMapRequest;
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    use super::*;
    use crate::infrastructure::ports::{GatewayPort, MockGatewayPort};
    use crate::test_fixtures::{hall, sample_app, town, vault, REMOTE};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn serve(app: Arc<App>) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = crate::api::router(app);
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    async fn connect(addr: SocketAddr) -> Client {
        let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        client
    }

    async fn send(client: &mut Client, msg: &ClientMessage) {
        let json = serde_json::to_string(msg).unwrap();
        client.send(WsMessage::Text(json)).await.unwrap();
    }

    async fn recv(client: &mut Client) -> ServerMessage {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .expect("timed out waiting for server")
                .expect("stream ended")
                .unwrap();
            if let WsMessage::Text(text) = frame {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    fn leave(key: &str, target: Location, x: i32, y: i32) -> LeaveMapRequest {
        LeaveMapRequest {
            primary_key: PlayerKey::new(key),
            location: target,
            x,
            y,
            orientation: 0.0,
        }
    }

    fn join(key: &str) -> ClientMessage {
        ClientMessage::JoinGame {
            primary_key: PlayerKey::new(key),
        }
    }

    #[tokio::test]
    async fn join_then_leave_town_through_an_exit() {
        let addr = serve(sample_app(Arc::new(MockGatewayPort::new()))).await;
        let mut client = connect(addr).await;

        send(&mut client, &join("alice")).await;
        assert!(matches!(
            recv(&mut client).await,
            ServerMessage::Welcome { location, x: 120, y: 80, .. } if location == town()
        ));
        assert!(matches!(
            recv(&mut client).await,
            ServerMessage::ScopeOccupants { players, .. } if players.is_empty()
        ));

        send(&mut client, &ClientMessage::CanLeaveTown(leave("alice", hall(), 60, 60))).await;
        assert!(matches!(
            recv(&mut client).await,
            ServerMessage::YouCanLeaveMap { location, x: 60, y: 60, sync_id, .. }
                if location == hall() && sync_id == SyncId::new(1)
        ));
        assert!(matches!(
            recv(&mut client).await,
            ServerMessage::ScopeOccupants { location, .. } if location == hall()
        ));

        // Stale path produces nothing, so the next reply is the heartbeat's
        send(
            &mut client,
            &ClientMessage::PathUpdate {
                primary_key: PlayerKey::new("alice"),
                sync_id: SyncId::INITIAL,
                path: vec![shardline_domain::ScreenPoint::new(1, 1)],
                moving: true,
            },
        )
        .await;
        send(&mut client, &ClientMessage::Heartbeat).await;
        assert_eq!(recv(&mut client).await, ServerMessage::Pong);
    }

    #[tokio::test]
    async fn joining_player_sees_who_is_already_in_town() {
        let addr = serve(sample_app(Arc::new(MockGatewayPort::new()))).await;
        let mut bob = connect(addr).await;
        send(&mut bob, &join("bob")).await;
        recv(&mut bob).await;
        recv(&mut bob).await;

        let mut alice = connect(addr).await;
        send(&mut alice, &join("alice")).await;
        assert!(matches!(recv(&mut alice).await, ServerMessage::Welcome { .. }));
        let ServerMessage::ScopeOccupants { location, players } = recv(&mut alice).await else {
            panic!("expected occupants after welcome");
        };
        assert_eq!(location, town());
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].primary_key, PlayerKey::new("bob"));
        assert_eq!((players[0].x, players[0].y), (120, 80));

        assert!(matches!(
            recv(&mut bob).await,
            ServerMessage::PlayerEnteredScope { primary_key, .. } if primary_key.as_str() == "alice"
        ));
    }

    #[tokio::test]
    async fn requests_before_join_are_refused() {
        let addr = serve(sample_app(Arc::new(MockGatewayPort::new()))).await;
        let mut client = connect(addr).await;

        send(&mut client, &ClientMessage::CanLeaveTown(leave("alice", hall(), 60, 60))).await;
        assert!(matches!(
            recv(&mut client).await,
            ServerMessage::Error { code, .. } if code == error_codes::NOT_JOINED
        ));
    }

    #[tokio::test]
    async fn second_connection_for_a_player_is_refused() {
        let addr = serve(sample_app(Arc::new(MockGatewayPort::new()))).await;
        let mut first = connect(addr).await;
        send(&mut first, &join("alice")).await;
        recv(&mut first).await;

        let mut second = connect(addr).await;
        send(&mut second, &join("alice")).await;
        assert!(matches!(
            recv(&mut second).await,
            ServerMessage::Error { code, .. } if code == error_codes::ALREADY_CONNECTED
        ));
    }

    #[tokio::test]
    async fn redirect_closes_the_connection_and_frees_the_player() {
        let mut gateway = MockGatewayPort::new();
        gateway.expect_transfer_account().returning(|_, _| Ok(()));
        let gateway: Arc<dyn GatewayPort> = Arc::new(gateway);
        let app = sample_app(gateway);
        let addr = serve(Arc::clone(&app)).await;
        let mut client = connect(addr).await;

        send(&mut client, &join("alice")).await;
        recv(&mut client).await;
        recv(&mut client).await;

        send(&mut client, &ClientMessage::CanLeaveTown(leave("alice", vault(), 40, 40))).await;
        assert_eq!(
            recv(&mut client).await,
            ServerMessage::RedirectConnection {
                primary_key: PlayerKey::new("alice"),
                server_id: REMOTE,
            }
        );

        // The server closes its side
        let closed = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match client.next().await {
                    None | Some(Err(_)) | Some(Ok(WsMessage::Close(_))) => break,
                    Some(Ok(_)) => {}
                }
            }
        })
        .await;
        assert!(closed.is_ok());

        for _ in 0..50 {
            if app.connections.count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(app.connections.count(), 0);
        assert_eq!(app.registry.get(&town()).unwrap().size(), 0);
    }
}
