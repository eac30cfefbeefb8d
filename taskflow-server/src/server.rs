//! Store server core: shared state, WebSocket handler, connection registry,
//! and snapshot broadcasting.
//!
//! Every connection opens with [`StoreRequest::Hello`] naming a user; all
//! later requests operate on that user's documents. After each committed
//! mutation the server pushes a fresh full snapshot to every open connection
//! of the same user, so multiple terminals stay in step.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use taskflow_proto::store::{self, StoreRequest, StoreResponse};
use tokio::sync::{RwLock, mpsc};

use crate::documents::{Changed, DocumentStore};

/// One open WebSocket connection of a user.
struct Connection {
    id: u64,
    sender: mpsc::UnboundedSender<Message>,
}

/// Shared server state holding the connection registry and document store.
pub struct ServerState {
    /// Maps user id to that user's open connections.
    connections: RwLock<HashMap<String, Vec<Connection>>>,
    next_conn_id: AtomicU64,
    /// Task and category documents, partitioned by user.
    pub documents: DocumentStore,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerState {
    /// Creates server state with an empty registry and document store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_documents(DocumentStore::new())
    }

    /// Creates server state around a pre-configured document store.
    #[must_use]
    pub fn with_documents(documents: DocumentStore) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_conn_id: AtomicU64::new(0),
            documents,
        }
    }

    /// Registers a connection for a user, returning its connection id.
    ///
    /// Unlike a chat peer registry, several simultaneous connections per user
    /// are expected; each gets its own id.
    pub async fn register(&self, user_id: &str, sender: mpsc::UnboundedSender<Message>) -> u64 {
        let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let mut conns = self.connections.write().await;
        conns
            .entry(user_id.to_string())
            .or_default()
            .push(Connection { id, sender });
        id
    }

    /// Removes a connection from the registry.
    pub async fn unregister(&self, user_id: &str, conn_id: u64) {
        let mut conns = self.connections.write().await;
        if let Some(user_conns) = conns.get_mut(user_id) {
            user_conns.retain(|c| c.id != conn_id);
            if user_conns.is_empty() {
                conns.remove(user_id);
            }
        }
    }

    /// Sends a response to every open connection of a user.
    pub async fn broadcast(&self, user_id: &str, response: &StoreResponse) {
        let Ok(bytes) = store::encode_response(response) else {
            tracing::error!(user_id = %user_id, "failed to encode broadcast response");
            return;
        };
        let conns = self.connections.read().await;
        if let Some(user_conns) = conns.get(user_id) {
            for conn in user_conns {
                // A dead sender is cleaned up when its handler unregisters.
                let _ = conn.sender.send(Message::Binary(bytes.clone().into()));
            }
        }
    }

    /// Number of open connections for a user.
    pub async fn connection_count(&self, user_id: &str) -> usize {
        let conns = self.connections.read().await;
        conns.get(user_id).map_or(0, Vec::len)
    }
}

/// Handles an upgraded WebSocket connection.
///
/// The connection lifecycle:
/// 1. Wait for a `Hello` naming the user.
/// 2. Register the connection and push initial task/category snapshots.
/// 3. Enter the request loop, acking mutations and broadcasting snapshots.
/// 4. On disconnect, unregister the connection.
pub async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let Some(user_id) = wait_for_hello(&mut ws_receiver).await else {
        tracing::warn!("connection closed before hello");
        return;
    };

    tracing::info!(user_id = %user_id, "connection opened");

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let conn_id = state.register(&user_id, tx.clone()).await;

    // Push the initial snapshots before any request is processed.
    let initial = [
        StoreResponse::TaskSnapshot {
            tasks: state.documents.task_snapshot(&user_id).await,
        },
        StoreResponse::CategorySnapshot {
            categories: state.documents.category_snapshot(&user_id).await,
        },
    ];
    for response in &initial {
        if let Err(e) = send_response(&mut ws_sender, response).await {
            tracing::error!(user_id = %user_id, error = %e, "failed to send initial snapshot");
            state.unregister(&user_id, conn_id).await;
            return;
        }
    }

    // Writer task: forward channel messages to the WebSocket.
    let writer_user = user_id.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(user_id = %writer_user, "WebSocket write failed");
                break;
            }
        }
    });

    // Reader task: apply incoming requests.
    let reader_user = user_id.clone();
    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Binary(data) => {
                    handle_request(&reader_user, &data, &reader_state, &tx).await;
                }
                Message::Close(_) => {
                    tracing::info!(user_id = %reader_user, "received close frame");
                    break;
                }
                _ => {
                    // Ignore text, ping, pong frames.
                }
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    state.unregister(&user_id, conn_id).await;
    tracing::info!(user_id = %user_id, "connection closed and unregistered");
}

/// Waits for the first message on the WebSocket, expecting a `Hello`.
///
/// Returns the user id, or `None` if the connection closes or a different
/// message arrives first.
async fn wait_for_hello(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
) -> Option<String> {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Binary(data) => match store::decode_request(&data) {
                Ok(StoreRequest::Hello { user_id }) => {
                    if user_id.is_empty() {
                        tracing::warn!("received Hello with empty user_id");
                        return None;
                    }
                    return Some(user_id);
                }
                Ok(other) => {
                    tracing::warn!(msg = ?other, "expected Hello, got different request");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to decode hello message");
                    return None;
                }
            },
            Message::Close(_) => return None,
            _ => {
                // Skip non-binary frames during the handshake.
            }
        }
    }
    None
}

/// Handles one binary request from an open connection.
async fn handle_request(
    user_id: &str,
    data: &[u8],
    state: &Arc<ServerState>,
    reply: &mpsc::UnboundedSender<Message>,
) {
    let request = match store::decode_request(data) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "failed to decode request");
            return;
        }
    };

    let Some(request_id) = request_id(&request) else {
        tracing::warn!(user_id = %user_id, "received Hello on an open connection");
        return;
    };

    match state.documents.apply(user_id, &request).await {
        Ok(changed) => {
            tracing::debug!(user_id = %user_id, request_id, "request committed");
            send_on_channel(reply, &StoreResponse::Ack { request_id });
            let snapshot = match changed {
                Changed::Tasks => StoreResponse::TaskSnapshot {
                    tasks: state.documents.task_snapshot(user_id).await,
                },
                Changed::Categories => StoreResponse::CategorySnapshot {
                    categories: state.documents.category_snapshot(user_id).await,
                },
            };
            state.broadcast(user_id, &snapshot).await;
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, request_id, error = %e, "request rejected");
            send_on_channel(
                reply,
                &StoreResponse::Error {
                    request_id,
                    reason: e.to_string(),
                },
            );
        }
    }
}

/// Correlation id of a request, or `None` for `Hello`.
const fn request_id(request: &StoreRequest) -> Option<u64> {
    match request {
        StoreRequest::Hello { .. } => None,
        StoreRequest::CreateTask { request_id, .. }
        | StoreRequest::UpdateTask { request_id, .. }
        | StoreRequest::DeleteTask { request_id, .. }
        | StoreRequest::BatchUpdate { request_id, .. }
        | StoreRequest::CreateCategory { request_id, .. }
        | StoreRequest::UpdateCategory { request_id, .. }
        | StoreRequest::DeleteCategory { request_id, .. } => Some(*request_id),
    }
}

/// Encodes a response and queues it on a connection's channel.
fn send_on_channel(sender: &mpsc::UnboundedSender<Message>, response: &StoreResponse) {
    if let Ok(bytes) = store::encode_response(response) {
        let _ = sender.send(Message::Binary(bytes.into()));
    }
}

/// Encodes and sends a response directly on a WebSocket sender.
async fn send_response(
    ws_sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    response: &StoreResponse,
) -> Result<(), String> {
    let bytes = store::encode_response(response)?;
    ws_sender
        .send(Message::Binary(bytes.into()))
        .await
        .map_err(|e| format!("WebSocket send error: {e}"))
}

/// Starts the store server on the given address and returns the bound address
/// and a join handle.
///
/// This is the primary entry point used by both `main.rs` and test code.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(ServerState::new())).await
}

/// Starts the store server with a pre-configured [`ServerState`].
///
/// Use [`ServerState::with_documents`] with [`DocumentStore::with_max_tasks`]
/// to apply limits from the resolved [`crate::config::ServerConfig`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = axum::Router::new()
        .route("/store", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "store server error");
        }
    });

    Ok((bound_addr, handle))
}

/// Starts the store server in-process for testing.
///
/// Binds to `127.0.0.1:0` (OS-assigned port) and returns the bound address
/// and a [`tokio::task::JoinHandle`] for cleanup.
///
/// # Panics
///
/// Panics if the listener cannot bind.
pub async fn start_test_server() -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    match start_server("127.0.0.1:0").await {
        Ok(bound) => bound,
        Err(e) => panic!("failed to start test server: {e}"),
    }
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<ServerState>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}
