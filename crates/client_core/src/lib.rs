//! Shopping list synchronisation core: one mutation/query contract over a
//! local and a remote backend, snapshot reconciliation, status derivation and
//! the orchestrator that turns user intents into backend calls.

pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod local;
pub mod orchestrator;
pub mod reconcile;
pub mod remote;
pub mod render;
pub mod session;
pub mod status;
pub mod store;

pub use app::{start, start_with_store, ShoppingList};
pub use clock::{Clock, SystemClock};
pub use config::{load_config, BackendConfig, ListConfig};
pub use error::StoreError;
pub use local::LocalStore;
pub use orchestrator::{InputForm, IntentOutcome, IntentPhase, ListOrchestrator};
pub use reconcile::{aggregates, compare_items, reconcile, sort_items, ReconciledView, ViewState};
pub use remote::RemoteStore;
pub use render::RenderSink;
pub use session::{
    readiness_channel, AuthenticatedSession, HttpSessionProvider, LocalSession, ReadySession,
    Readiness, SessionProvider,
};
pub use status::{derive_status, derive_status_with_connection, Severity, Status};
pub use store::{BackendMode, ItemStore, Snapshot, SnapshotEvent, Subscription, WriteAck};
