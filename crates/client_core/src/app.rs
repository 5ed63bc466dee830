//! Startup: select the backend, wait for the session, open the live
//! subscription and hand the orchestrator to the caller.

use std::sync::Arc;

use shared::{domain::PrincipalId, protocol::collection_path};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info};

use crate::{
    clock::{Clock, SystemClock},
    config::{BackendConfig, ListConfig},
    error::StoreError,
    local::LocalStore,
    orchestrator::ListOrchestrator,
    remote::RemoteStore,
    render::RenderSink,
    session::{
        readiness_channel, AuthenticatedSession, HttpSessionProvider, LocalSession, ReadySession,
        Readiness, SessionProvider,
    },
    status::{Status, INITIALIZING_MESSAGE},
    store::{BackendMode, ItemStore},
};

/// A running list: the orchestrator plus the task feeding it snapshots.
pub struct ShoppingList {
    pub orchestrator: Arc<ListOrchestrator>,
    pub principal: PrincipalId,
    /// `namespace/items` path the list reads and writes.
    pub collection: String,
    readiness: watch::Sender<Readiness>,
    pump: JoinHandle<()>,
}

impl ShoppingList {
    /// Stops the snapshot feed and releases the subscription.
    pub fn shutdown(self) {
        self.pump.abort();
        let _ = self
            .readiness
            .send(Readiness::Failed("list closed".to_string()));
        info!("shopping list closed");
    }
}

pub async fn start(config: &ListConfig, sink: Arc<dyn RenderSink>) -> Result<ShoppingList, StoreError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    sink.render_status(&Status::info(INITIALIZING_MESSAGE));

    let result = match &config.backend {
        BackendConfig::Local => {
            let principal = LocalSession.await_authenticated_session().await?;
            let store = if config.seed_mock_data {
                LocalStore::with_mock_data(Arc::clone(&clock))
            } else {
                LocalStore::new(Arc::clone(&clock))
            };
            info!(namespace = %config.namespace, "starting in local mode");
            Ok((principal, Arc::new(store) as Arc<dyn ItemStore>))
        }
        BackendConfig::Remote {
            server_url,
            auth_token,
        } => connect_remote(config, server_url, auth_token.clone(), Arc::clone(&clock)).await,
    };

    let (principal, store) = match result {
        Ok(pair) => pair,
        Err(err) => {
            error!(%err, "initialization failed");
            sink.render_status(&Status::error(format!("Initialization error: {err}")));
            return Err(err);
        }
    };
    start_with_store(principal, collection_path(&config.namespace), store, sink, clock).await
}

async fn connect_remote(
    config: &ListConfig,
    server_url: &str,
    auth_token: Option<String>,
    clock: Arc<dyn Clock>,
) -> Result<(PrincipalId, Arc<dyn ItemStore>), StoreError> {
    let provider = HttpSessionProvider::new(server_url, auth_token)?;
    let principal = provider.await_authenticated_session().await?;
    let session = AuthenticatedSession::new(provider.server_url().clone(), principal.clone());
    let store = RemoteStore::new(session, config.namespace.clone(), clock);
    info!(
        collection = %store.collection_path(),
        principal_id = %principal,
        "starting in remote mode"
    );
    Ok((principal, Arc::new(store)))
}

/// Wires an already selected store: subscribes, marks the session ready and
/// starts feeding snapshots to the orchestrator.
pub async fn start_with_store(
    principal: PrincipalId,
    collection: String,
    store: Arc<dyn ItemStore>,
    sink: Arc<dyn RenderSink>,
    clock: Arc<dyn Clock>,
) -> Result<ShoppingList, StoreError> {
    let mode: BackendMode = store.mode();
    let (readiness, readiness_rx) = readiness_channel();
    let orchestrator = ListOrchestrator::new(mode, readiness_rx, Arc::clone(&sink), clock);

    let subscription = match store.subscribe().await {
        Ok(subscription) => subscription,
        Err(err) => {
            error!(%err, "failed to open item subscription");
            let _ = readiness.send(Readiness::Failed(err.to_string()));
            sink.render_status(&Status::error(format!("Initialization error: {err}")));
            return Err(err);
        }
    };

    let _ = readiness.send(Readiness::Ready(ReadySession {
        principal: principal.clone(),
        store,
    }));
    let pump = orchestrator.spawn_snapshot_pump(subscription);

    Ok(ShoppingList {
        orchestrator,
        principal,
        collection,
        readiness,
        pump,
    })
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
