//! Turns user intents (add, toggle, delete) into backend calls and keeps the
//! status line in step with the latest snapshot.
//!
//! Each intent moves through `Idle -> Validating -> Pending -> {Settled, Failed}`.
//! Intents never touch the rendered list directly: items only change when a
//! snapshot arrives from the active backend.

use std::sync::Arc;

use futures::StreamExt;
use shared::domain::{ItemDraft, ItemId};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    clock::Clock,
    error::StoreError,
    reconcile::ViewState,
    render::RenderSink,
    session::{Readiness, ReadySession},
    status::{
        added_message, adding_message, deleted_message, deleting_message,
        derive_status_with_connection, Status, NOT_READY_MESSAGE, TOGGLE_FAILED_MESSAGE,
        VALIDATION_MESSAGE,
    },
    store::{BackendMode, SnapshotEvent, Subscription},
};

pub const DEFAULT_QUANTITY: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentPhase {
    Idle,
    Validating,
    Pending,
    Settled,
    Failed,
}

impl IntentPhase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Pending => "pending",
            Self::Settled => "settled",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentOutcome {
    Settled,
    /// Refused before any backend call.
    Rejected(StoreError),
    /// The backend round trip failed.
    Failed(StoreError),
    /// Dropped silently because the session is not ready.
    Skipped,
}

/// Contents of the add-item inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputForm {
    pub name: String,
    pub quantity: String,
}

impl Default for InputForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            quantity: DEFAULT_QUANTITY.to_string(),
        }
    }
}

/// A progress or confirmation message shown instead of the summary.
struct Transient {
    text: String,
    /// Snapshots up to this revision already reflect the write that set the
    /// message and must not clear it. `None` lets any newer snapshot clear it.
    hold_through: Option<u64>,
}

#[derive(Default)]
struct OrchestratorState {
    view: ViewState,
    transient: Option<Transient>,
    connection_error: Option<String>,
    form: InputForm,
    in_flight: usize,
}

impl OrchestratorState {
    fn applied_revision(&self) -> Option<u64> {
        self.view.current().map(|view| view.revision)
    }

    /// Drops the transient message once the view has moved past the write
    /// that produced it.
    fn expire_transient(&mut self) {
        let applied = self.applied_revision();
        let expired = match &self.transient {
            Some(transient) => match (transient.hold_through, applied) {
                (Some(hold), Some(applied)) => applied > hold,
                (Some(_), None) => false,
                (None, _) => true,
            },
            None => false,
        };
        if expired {
            self.transient = None;
        }
    }
}

pub struct ListOrchestrator {
    mode: BackendMode,
    readiness: watch::Receiver<Readiness>,
    sink: Arc<dyn RenderSink>,
    clock: Arc<dyn Clock>,
    state: Mutex<OrchestratorState>,
}

fn trace_phase(intent: &'static str, phase: IntentPhase) {
    debug!(intent, phase = phase.as_str(), "intent transition");
}

fn parse_quantity(raw: &str) -> Option<u32> {
    let parsed = raw.trim().parse::<i64>().ok()?;
    if parsed < 1 {
        return None;
    }
    u32::try_from(parsed).ok()
}

impl ListOrchestrator {
    pub fn new(
        mode: BackendMode,
        readiness: watch::Receiver<Readiness>,
        sink: Arc<dyn RenderSink>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            mode,
            readiness,
            sink,
            clock,
            state: Mutex::new(OrchestratorState::default()),
        })
    }

    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    fn ready_session(&self) -> Option<ReadySession> {
        self.readiness.borrow().ready().cloned()
    }

    pub async fn form(&self) -> InputForm {
        self.state.lock().await.form.clone()
    }

    pub async fn set_form(&self, form: InputForm) {
        self.state.lock().await.form = form;
    }

    pub async fn in_flight(&self) -> usize {
        self.state.lock().await.in_flight
    }

    pub async fn items(&self) -> Vec<shared::domain::Item> {
        self.state.lock().await.view.items().to_vec()
    }

    pub async fn current_status(&self) -> Status {
        let state = self.state.lock().await;
        self.status_for(&state)
    }

    fn status_for(&self, state: &OrchestratorState) -> Status {
        derive_status_with_connection(
            state.view.items(),
            state.transient.as_ref().map(|t| t.text.as_str()),
            self.mode,
            state.connection_error.as_deref(),
        )
    }

    async fn set_transient(&self, text: String, hold_through: Option<u64>) {
        let status = {
            let mut state = self.state.lock().await;
            state.transient = Some(Transient { text, hold_through });
            self.status_for(&state)
        };
        self.sink.render_status(&status);
    }

    async fn clear_transient(&self) {
        let status = {
            let mut state = self.state.lock().await;
            state.transient = None;
            self.status_for(&state)
        };
        self.sink.render_status(&status);
    }

    /// Shows a blocking notice without touching the transient message.
    fn notice(&self, status: Status) {
        self.sink.render_status(&status);
    }

    async fn begin_request(&self) {
        self.state.lock().await.in_flight += 1;
    }

    async fn end_request(&self) {
        let mut state = self.state.lock().await;
        state.in_flight = state.in_flight.saturating_sub(1);
    }

    /// Submits the current [`InputForm`]. The form is kept when validation
    /// fails and reset once a backend attempt has completed.
    pub async fn add_item(&self) -> IntentOutcome {
        const INTENT: &str = "add_item";
        let Some(session) = self.ready_session() else {
            warn!(intent = INTENT, "rejected: session not ready");
            self.notice(Status::error(NOT_READY_MESSAGE));
            return IntentOutcome::Rejected(StoreError::Initialization(
                NOT_READY_MESSAGE.to_string(),
            ));
        };

        trace_phase(INTENT, IntentPhase::Validating);
        let form = self.form().await;
        let name = form.name.trim();
        let quantity = match parse_quantity(&form.quantity) {
            Some(quantity) if !name.is_empty() => quantity,
            _ => {
                self.notice(Status::warning(VALIDATION_MESSAGE));
                return IntentOutcome::Rejected(StoreError::Validation(
                    VALIDATION_MESSAGE.to_string(),
                ));
            }
        };

        trace_phase(INTENT, IntentPhase::Pending);
        let draft = ItemDraft::new(name, quantity, session.principal.clone())
            .with_created_at(self.clock.now_millis());
        self.begin_request().await;
        self.set_transient(adding_message(), None).await;

        let result = session.store.create(draft).await;

        self.end_request().await;
        let outcome = match result {
            Ok(ack) => {
                trace_phase(INTENT, IntentPhase::Settled);
                info!(item_id = %ack.value.id, name = %ack.value.name, revision = ?ack.revision, "item added");
                self.set_transient(added_message(&ack.value.name), ack.revision)
                    .await;
                IntentOutcome::Settled
            }
            Err(err) => {
                trace_phase(INTENT, IntentPhase::Failed);
                error!(%err, "failed to add item");
                self.clear_transient().await;
                self.notice(Status::error(format!("Failed to add: {err}")));
                IntentOutcome::Failed(err)
            }
        };
        self.set_form(InputForm::default()).await;
        outcome
    }

    pub async fn toggle_purchase(&self, id: &ItemId, currently_purchased: bool) -> IntentOutcome {
        const INTENT: &str = "toggle_purchase";
        let Some(session) = self.ready_session() else {
            debug!(intent = INTENT, "skipped: session not ready");
            return IntentOutcome::Skipped;
        };

        trace_phase(INTENT, IntentPhase::Pending);
        self.begin_request().await;
        let result = session.store.toggle(id).await;
        self.end_request().await;

        match result {
            Ok(ack) => {
                trace_phase(INTENT, IntentPhase::Settled);
                debug!(
                    item_id = %id,
                    purchased = !currently_purchased,
                    revision = ?ack.revision,
                    "purchase toggled"
                );
                IntentOutcome::Settled
            }
            Err(StoreError::NotFound(_)) => {
                trace_phase(INTENT, IntentPhase::Settled);
                debug!(item_id = %id, "toggle target already gone");
                IntentOutcome::Settled
            }
            Err(err) => {
                trace_phase(INTENT, IntentPhase::Failed);
                error!(item_id = %id, %err, "failed to toggle item");
                self.notice(Status::error(TOGGLE_FAILED_MESSAGE));
                IntentOutcome::Failed(err)
            }
        }
    }

    pub async fn remove_item(&self, id: &ItemId, name: &str) -> IntentOutcome {
        const INTENT: &str = "remove_item";
        let Some(session) = self.ready_session() else {
            debug!(intent = INTENT, "skipped: session not ready");
            return IntentOutcome::Skipped;
        };

        trace_phase(INTENT, IntentPhase::Pending);
        self.begin_request().await;
        self.set_transient(deleting_message(name), None).await;
        let result = match session.store.delete(id).await {
            Ok(ack) => Ok(ack.revision),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        };
        self.end_request().await;

        match result {
            Ok(revision) => {
                trace_phase(INTENT, IntentPhase::Settled);
                info!(item_id = %id, name, ?revision, "item deleted");
                self.set_transient(deleted_message(name), revision).await;
                IntentOutcome::Settled
            }
            Err(err) => {
                trace_phase(INTENT, IntentPhase::Failed);
                error!(item_id = %id, %err, "failed to delete item");
                self.clear_transient().await;
                self.notice(Status::error(format!("Failed to delete: {err}")));
                IntentOutcome::Failed(err)
            }
        }
    }

    /// Applies one event from the live subscription and re-renders.
    pub async fn apply_event(&self, event: SnapshotEvent) {
        match event {
            SnapshotEvent::Snapshot(snapshot) => {
                let (view, status) = {
                    let mut state = self.state.lock().await;
                    let Some(view) = state.view.apply(snapshot).cloned() else {
                        return;
                    };
                    state.connection_error = None;
                    state.expire_transient();
                    let status = self.status_for(&state);
                    (view, status)
                };
                self.sink.render(&view.items, view.aggregates);
                self.sink.render_status(&status);
            }
            SnapshotEvent::Error(err) => {
                error!(%err, "live subscription failed");
                let status = {
                    let mut state = self.state.lock().await;
                    state.connection_error = Some(err.to_string());
                    self.status_for(&state)
                };
                self.sink.render_status(&status);
            }
        }
    }

    /// Feeds every event of `subscription` into [`Self::apply_event`] until the
    /// feed ends or the returned task is aborted.
    pub fn spawn_snapshot_pump(self: &Arc<Self>, mut subscription: Subscription) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                orchestrator.apply_event(event).await;
            }
            warn!("snapshot feed ended");
        })
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
