//! WebSocket store backend.
//!
//! Connects to a `taskflow-server` document store, opens the session with a
//! `Hello` for the user, and then maps every [`WritePlan`] onto one store
//! request. Writes are strictly one-at-a-time: `submit` does not return
//! until the server acks or rejects the request, so ack correlation reduces
//! to matching a single outstanding `request_id`. Snapshots that arrive
//! while an ack is awaited are queued for the next `next_event` call.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use taskflow_proto::store::{StoreRequest, StoreResponse, decode_response, encode_request};

use crate::checklist::WritePlan;

use super::{StoreError, StoreEvent, TaskStore};

type WsSender = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Timeout for establishing the WebSocket connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for a single write to be acked or rejected.
const ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Store backend over a WebSocket connection to `taskflow-server`.
pub struct RemoteStore {
    sender: WsSender,
    reader: WsReader,
    next_request_id: u64,
    /// Snapshots received while waiting for an ack.
    queued: VecDeque<StoreEvent>,
}

impl RemoteStore {
    /// Connects to the store and opens a session for `user_id`.
    ///
    /// The server answers the hello with initial task and category
    /// snapshots; those surface through [`TaskStore::next_event`].
    ///
    /// # Errors
    ///
    /// Fails on connection timeout, a refused connection, or a hello that
    /// cannot be sent.
    pub async fn connect(url: &str, user_id: &str) -> Result<Self, StoreError> {
        let (ws_stream, _response) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| {
                tracing::warn!(url, "store connect timed out");
                StoreError::Timeout
            })?
            .map_err(|e| {
                tracing::warn!(url, err = %e, "store connect failed");
                StoreError::Io(e.to_string())
            })?;

        let (mut sender, reader) = ws_stream.split();

        let hello = StoreRequest::Hello {
            user_id: user_id.to_string(),
        };
        let bytes = encode_request(&hello).map_err(StoreError::Codec)?;
        sender
            .send(Message::Binary(bytes.into()))
            .await
            .map_err(|e| StoreError::Io(format!("failed to send hello: {e}")))?;
        tracing::info!(url, user_id, "connected to document store");

        Ok(Self {
            sender,
            reader,
            next_request_id: 0,
            queued: VecDeque::new(),
        })
    }

    /// Reads the next decoded response, skipping control frames.
    async fn read_response(&mut self) -> Result<StoreResponse, StoreError> {
        loop {
            match self.reader.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return decode_response(&data).map_err(StoreError::Codec);
                }
                Some(Ok(Message::Close(_))) | None => return Err(StoreError::Closed),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(StoreError::Io(e.to_string())),
            }
        }
    }
}

/// Maps a write plan onto the wire request carrying `request_id`.
fn plan_to_request(plan: &WritePlan, request_id: u64) -> StoreRequest {
    match plan {
        WritePlan::CreateTask(record) => StoreRequest::CreateTask {
            request_id,
            record: record.clone(),
        },
        WritePlan::UpdateTask(id, patch) => StoreRequest::UpdateTask {
            request_id,
            id: *id,
            patch: patch.clone(),
        },
        WritePlan::DeleteTask(id) => StoreRequest::DeleteTask {
            request_id,
            id: *id,
        },
        WritePlan::BatchUpdate(patches) => StoreRequest::BatchUpdate {
            request_id,
            patches: patches.clone(),
        },
        WritePlan::CreateCategory(record) => StoreRequest::CreateCategory {
            request_id,
            record: record.clone(),
        },
        WritePlan::UpdateCategory(id, patch) => StoreRequest::UpdateCategory {
            request_id,
            id: *id,
            patch: patch.clone(),
        },
        WritePlan::DeleteCategory(id) => StoreRequest::DeleteCategory {
            request_id,
            id: *id,
        },
    }
}

impl TaskStore for RemoteStore {
    async fn submit(&mut self, plan: &WritePlan) -> Result<(), StoreError> {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        let request = plan_to_request(plan, request_id);
        let bytes = encode_request(&request).map_err(StoreError::Codec)?;
        self.sender
            .send(Message::Binary(bytes.into()))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        loop {
            let response = tokio::time::timeout(ACK_TIMEOUT, self.read_response())
                .await
                .map_err(|_| StoreError::Timeout)??;
            match response {
                StoreResponse::Ack { request_id: id } if id == request_id => return Ok(()),
                StoreResponse::Error {
                    request_id: id,
                    reason,
                } if id == request_id => return Err(StoreError::Rejected(reason)),
                StoreResponse::TaskSnapshot { tasks } => {
                    self.queued.push_back(StoreEvent::Tasks(tasks));
                }
                StoreResponse::CategorySnapshot { categories } => {
                    self.queued.push_back(StoreEvent::Categories(categories));
                }
                other => {
                    // One write in flight, so a mismatched id is a protocol bug.
                    tracing::debug!(?other, "ignoring stray store response");
                }
            }
        }
    }

    async fn next_event(&mut self) -> Result<StoreEvent, StoreError> {
        if let Some(event) = self.queued.pop_front() {
            return Ok(event);
        }
        loop {
            match self.read_response().await? {
                StoreResponse::TaskSnapshot { tasks } => return Ok(StoreEvent::Tasks(tasks)),
                StoreResponse::CategorySnapshot { categories } => {
                    return Ok(StoreEvent::Categories(categories));
                }
                other => {
                    tracing::debug!(?other, "ignoring stray store response");
                }
            }
        }
    }
}
