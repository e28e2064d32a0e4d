use crate::engine::{EngineEvent, PositionEvent, Rendition};
use log::debug;

/// The live handle/label pair for one open document. A display label can
/// only exist alongside a rendition, so the pair lives in one struct.
pub struct ActiveSession {
    rendition: Box<dyn Rendition>,
    page_label: String,
}

impl ActiveSession {
    fn new(rendition: Box<dyn Rendition>) -> Self {
        Self {
            rendition,
            page_label: String::new(),
        }
    }

    pub fn rendition(&self) -> &dyn Rendition {
        self.rendition.as_ref()
    }

    pub fn rendition_mut(&mut self) -> &mut dyn Rendition {
        self.rendition.as_mut()
    }

    pub fn page_label(&self) -> &str {
        &self.page_label
    }

    /// The label is derived solely from the engine's position payload;
    /// an absent page clears it.
    fn apply_position(&mut self, event: PositionEvent) {
        self.page_label = event.page.unwrap_or_default();
    }

    /// Pull queued engine notifications into session state. Called once per
    /// loop tick, which is what makes label updates eventual rather than
    /// synchronous with navigation calls.
    pub fn drain_engine_events(&mut self) {
        while let Some(event) = self.rendition.poll_event() {
            match event {
                EngineEvent::Relocated(position) => self.apply_position(position),
            }
        }
    }
}

/// Viewing-session state: at most one active document plus the last load
/// error. Replaced wholesale on every successful load, never merged.
#[derive(Default)]
pub struct SessionState {
    active: Option<ActiveSession>,
    last_error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a freshly prepared rendition. The previous session, if any,
    /// is dropped in full and the error slate is wiped.
    pub fn install(&mut self, rendition: Box<dyn Rendition>) {
        debug!("installing new viewing session");
        self.active = Some(ActiveSession::new(rendition));
        self.last_error = None;
    }

    /// Record a failed load: no session may linger alongside the error.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.active = None;
        self.last_error = Some(message.into());
    }

    /// Tear down the active session without recording an error.
    pub fn close(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveSession> {
        self.active.as_mut()
    }

    pub fn has_session(&self) -> bool {
        self.active.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PositionEvent;
    use crate::test_utils::FakeRendition;

    #[test]
    fn install_clears_previous_error() {
        let mut state = SessionState::new();
        state.fail("Failed to load EPUB file.");
        assert!(state.last_error().is_some());

        state.install(Box::new(FakeRendition::with_pages(3)));
        assert!(state.has_session());
        assert!(state.last_error().is_none());
    }

    #[test]
    fn fail_drops_the_active_session() {
        let mut state = SessionState::new();
        state.install(Box::new(FakeRendition::with_pages(3)));

        state.fail("Failed to read file data.");
        assert!(!state.has_session());
        assert_eq!(state.last_error(), Some("Failed to read file data."));
    }

    #[test]
    fn label_follows_position_events() {
        let mut state = SessionState::new();
        let mut fake = FakeRendition::with_pages(3);
        fake.queue_relocated(Some("7"));
        state.install(Box::new(fake));

        let active = state.active_mut().unwrap();
        assert_eq!(active.page_label(), "");
        active.drain_engine_events();
        assert_eq!(active.page_label(), "7");
    }

    #[test]
    fn absent_page_clears_the_label() {
        let mut active = ActiveSession::new(Box::new(FakeRendition::with_pages(1)));
        active.apply_position(PositionEvent {
            page: Some("3".into()),
        });
        assert_eq!(active.page_label(), "3");

        active.apply_position(PositionEvent { page: None });
        assert_eq!(active.page_label(), "");
    }
}
