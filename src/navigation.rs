use crate::session::SessionState;
use log::debug;

/// A discrete page-turn request, independent of the modality that produced
/// it. Produced, dispatched, forgotten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavIntent {
    Previous,
    Next,
}

/// The one choke point between input modalities and the rendering engine.
/// Buttons, arrow keys and swipes all end up here; with no active session
/// the intent is silently dropped.
pub fn dispatch(intent: NavIntent, session: &mut SessionState) {
    let Some(active) = session.active_mut() else {
        debug!("ignoring {intent:?}: no document loaded");
        return;
    };
    match intent {
        NavIntent::Previous => active.rendition_mut().prev(),
        NavIntent::Next => active.rendition_mut().next(),
    }
}
