use engine::InteractionEvent;
use tracing::{debug, info};

/// Receives what the session reports to the presentation layer. Narrative
/// content is not rendered here; the bridge only records which view is open.
#[derive(Debug, Default)]
pub(crate) struct UiBridge {
    open_view: Option<InteractionEvent>,
    nearby_id: Option<String>,
    opened_count: u32,
}

impl UiBridge {
    pub(crate) fn open(&mut self, event: InteractionEvent) {
        info!(
            interactable_type = %event.kind,
            interactable_id = %event.id,
            "interaction_view_opened"
        );
        self.opened_count = self.opened_count.saturating_add(1);
        self.open_view = Some(event);
    }

    /// Dismisses the open view, returning it.
    pub(crate) fn close(&mut self) -> Option<InteractionEvent> {
        let closed = self.open_view.take();
        if let Some(event) = &closed {
            info!(interactable_id = %event.id, "interaction_view_closed");
        }
        closed
    }

    pub(crate) fn open_view(&self) -> Option<&InteractionEvent> {
        self.open_view.as_ref()
    }

    pub(crate) fn opened_count(&self) -> u32 {
        self.opened_count
    }

    /// Records the nearby interactable; returns true when it changed.
    pub(crate) fn track_nearby(&mut self, nearby_id: Option<&str>) -> bool {
        if self.nearby_id.as_deref() == nearby_id {
            return false;
        }
        debug!(
            from = self.nearby_id.as_deref().unwrap_or("-"),
            to = nearby_id.unwrap_or("-"),
            "nearby_changed"
        );
        self.nearby_id = nearby_id.map(str::to_string);
        true
    }

    pub(crate) fn nearby_id(&self) -> Option<&str> {
        self.nearby_id.as_deref()
    }
}
