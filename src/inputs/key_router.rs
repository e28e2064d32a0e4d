use crate::navigation::NavIntent;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use log::debug;

/// Arrow-key binding for the reader screen.
///
/// The binding is a value, not a global: it exists exactly as long as the
/// reader screen is mounted, and key events stop reaching the rendition the
/// moment it is dropped. That is the entire unmount guarantee, so never
/// stash a router anywhere that outlives its screen.
#[derive(Debug)]
pub struct KeyRouter {
    _scoped: (),
}

impl KeyRouter {
    pub fn new() -> Self {
        debug!("reader key bindings attached");
        Self { _scoped: () }
    }

    /// Map one key event to a navigation intent. Left and Right arrows turn
    /// pages; everything else is someone else's problem.
    pub fn route(&self, key: KeyEvent) -> Option<NavIntent> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            KeyCode::Left => Some(NavIntent::Previous),
            KeyCode::Right => Some(NavIntent::Next),
            _ => None,
        }
    }
}

impl Default for KeyRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for KeyRouter {
    fn drop(&mut self) {
        debug!("reader key bindings released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_map_to_intents() {
        let router = KeyRouter::new();
        assert_eq!(router.route(press(KeyCode::Left)), Some(NavIntent::Previous));
        assert_eq!(router.route(press(KeyCode::Right)), Some(NavIntent::Next));
    }

    #[test]
    fn other_keys_are_ignored() {
        let router = KeyRouter::new();
        assert_eq!(router.route(press(KeyCode::Up)), None);
        assert_eq!(router.route(press(KeyCode::Char('l'))), None);
        assert_eq!(router.route(press(KeyCode::Enter)), None);
    }

    #[test]
    fn key_release_does_not_navigate() {
        let router = KeyRouter::new();
        let mut release = press(KeyCode::Right);
        release.kind = KeyEventKind::Release;
        assert_eq!(router.route(release), None);
    }
}
