//! Backend adapter for the real-time document store.
//!
//! Writes are single HTTP round trips and never patch local state: the live
//! channel opened by [`ItemStore::subscribe`] is the only source of items.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use shared::{
    domain::{Item, ItemDraft, ItemId},
    error::ApiError,
    protocol::{
        item_route, item_toggle_route, items_route, live_channel_route, ServerEvent,
        SNAPSHOT_REVISION_HEADER,
    },
};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{protocol::frame::coding::CloseCode, Message},
};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    clock::Clock,
    error::StoreError,
    session::{is_unauthorized, join, AuthenticatedSession},
    store::{BackendMode, ItemStore, Snapshot, SnapshotEvent, Subscription, WriteAck},
};

pub struct RemoteStore {
    http: Client,
    session: AuthenticatedSession,
    namespace: String,
    clock: std::sync::Arc<dyn Clock>,
}

impl RemoteStore {
    pub fn new(
        session: AuthenticatedSession,
        namespace: impl Into<String>,
        clock: std::sync::Arc<dyn Clock>,
    ) -> Self {
        Self {
            http: Client::new(),
            session,
            namespace: namespace.into(),
            clock,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `namespace/items` path as shown to users.
    pub fn collection_path(&self) -> String {
        shared::protocol::collection_path(&self.namespace)
    }

    fn url(&self, route: &str) -> Result<Url, StoreError> {
        let mut url = join(self.session.server_url(), route)?;
        url.query_pairs_mut()
            .append_pair("principal_id", self.session.principal().as_str());
        Ok(url)
    }

    fn live_channel_url(&self) -> Result<Url, StoreError> {
        let mut url = self.url(&live_channel_route(&self.namespace))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|()| {
            StoreError::Initialization(format!("cannot derive live channel url from {url}"))
        })?;
        Ok(url)
    }
}

/// Revision announced by the document store for an accepted write.
fn announced_revision(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(SNAPSHOT_REVISION_HEADER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn transport_failure(err: reqwest::Error) -> StoreError {
    StoreError::BackendWrite(err.to_string())
}

async fn rejected_write(response: reqwest::Response) -> StoreError {
    let status = response.status();
    let message = match response.json::<ApiError>().await {
        Ok(body) => body.message,
        Err(_) => format!("request failed with status {status}"),
    };
    if status == StatusCode::BAD_REQUEST {
        StoreError::Validation(message)
    } else if is_unauthorized(status) {
        StoreError::Auth(message)
    } else {
        StoreError::BackendWrite(message)
    }
}

#[async_trait]
impl ItemStore for RemoteStore {
    fn mode(&self) -> BackendMode {
        BackendMode::Remote
    }

    async fn create(&self, draft: ItemDraft) -> Result<WriteAck<Item>, StoreError> {
        let draft = draft.validate()?;
        let document = draft.into_document(self.clock.now_millis());
        let response = self
            .http
            .post(self.url(&items_route(&self.namespace))?)
            .json(&document)
            .send()
            .await
            .map_err(transport_failure)?;
        if !response.status().is_success() {
            return Err(rejected_write(response).await);
        }
        let revision = announced_revision(&response);
        let item: Item = response.json().await.map_err(transport_failure)?;
        debug!(
            namespace = %self.namespace,
            item_id = %item.id,
            ?revision,
            "remote store: create acknowledged"
        );
        Ok(WriteAck::new(item, revision))
    }

    async fn toggle(&self, id: &ItemId) -> Result<WriteAck, StoreError> {
        let response = self
            .http
            .post(self.url(&item_toggle_route(&self.namespace, &id.to_string()))?)
            .send()
            .await
            .map_err(transport_failure)?;
        match response.status() {
            status if status.is_success() => Ok(WriteAck::new((), announced_revision(&response))),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(id.clone())),
            _ => Err(rejected_write(response).await),
        }
    }

    async fn delete(&self, id: &ItemId) -> Result<WriteAck, StoreError> {
        let response = self
            .http
            .delete(self.url(&item_route(&self.namespace, &id.to_string()))?)
            .send()
            .await
            .map_err(transport_failure)?;
        match response.status() {
            status if status.is_success() => Ok(WriteAck::new((), announced_revision(&response))),
            StatusCode::NOT_FOUND => {
                debug!(namespace = %self.namespace, item_id = %id, "remote store: delete target absent");
                Ok(WriteAck::unchanged())
            }
            _ => Err(rejected_write(response).await),
        }
    }

    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        let ws_url = self.live_channel_url()?;
        let (mut ws_stream, _) = connect_async(ws_url.as_str()).await.map_err(|err| {
            error!(namespace = %self.namespace, %err, "remote store: live channel connect failed");
            StoreError::BackendSubscription(format!("failed to open live channel: {err}"))
        })?;
        info!(namespace = %self.namespace, "remote store: live channel open");

        let (tx, rx) = mpsc::unbounded_channel();
        let namespace = self.namespace.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_stream.next().await {
                let event = match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(ServerEvent::Snapshot(snapshot)) => {
                            if snapshot.namespace != namespace {
                                warn!(
                                    expected = %namespace,
                                    received = %snapshot.namespace,
                                    "remote store: ignoring snapshot for another namespace"
                                );
                                continue;
                            }
                            SnapshotEvent::Snapshot(Snapshot {
                                revision: snapshot.revision,
                                items: snapshot.items,
                            })
                        }
                        Ok(ServerEvent::Error(err)) => {
                            SnapshotEvent::Error(StoreError::BackendSubscription(err.message))
                        }
                        Err(err) => SnapshotEvent::Error(StoreError::BackendSubscription(
                            format!("invalid server event: {err}"),
                        )),
                    },
                    Ok(Message::Close(frame)) => {
                        let reason = match frame {
                            Some(frame) if frame.code != CloseCode::Normal => {
                                format!("live channel closed: {} {}", frame.code, frame.reason)
                            }
                            _ => "live channel closed by server".to_string(),
                        };
                        let _ = tx.send(SnapshotEvent::Error(StoreError::BackendSubscription(
                            reason,
                        )));
                        return;
                    }
                    Ok(_) => continue,
                    Err(err) => {
                        let _ = tx.send(SnapshotEvent::Error(StoreError::BackendSubscription(
                            format!("live channel receive failed: {err}"),
                        )));
                        return;
                    }
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
            let _ = tx.send(SnapshotEvent::Error(StoreError::BackendSubscription(
                "live channel ended".to_string(),
            )));
        });

        Ok(Subscription::new(rx).with_cancel(move || reader.abort()))
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
