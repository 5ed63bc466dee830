use shared::domain::{Aggregates, Item};

use crate::status::Status;

/// Presentation endpoint fed by the orchestrator. Nothing it returns is
/// consumed by the core.
pub trait RenderSink: Send + Sync {
    fn render(&self, sorted_items: &[Item], aggregates: Aggregates);
    fn render_status(&self, status: &Status);
}
