//! Boundary to the document-rendering engine.
//!
//! The viewing session never parses or paginates anything itself: it hands
//! raw bytes to an engine and drives the paginated result through this
//! trait. `EpubRendition` is the production implementation; tests substitute
//! their own.

pub mod epub_rendition;
pub mod html_text;

pub use epub_rendition::EpubRendition;

use crate::theme::{StyleProps, StyleRules};
use thiserror::Error;

/// Display area the rendition lays pages out for, in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Structural text elements the theming hook can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Body,
    Paragraph,
    /// Heading level 1 through 6.
    Heading(u8),
}

/// One laid-out line of the current page, tagged with the element it came
/// from so styling can be resolved per line.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLine {
    pub text: String,
    pub element: Element,
}

/// Snapshot of the currently displayed page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub lines: Vec<PageLine>,
    /// Zero-based index into the whole layout.
    pub page_index: usize,
    pub page_count: usize,
}

/// Position payload pushed by the engine whenever the visible page changes.
/// The session derives its display label solely from `page`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PositionEvent {
    pub page: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Relocated(PositionEvent),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("document could not be parsed: {0}")]
    Parse(String),
    #[error("rendition is not attached to a display area")]
    NotAttached,
}

/// A constructed engine instance holding one parsed document.
///
/// Call order for a fresh instance is `render_to`, then `apply_theme`, then
/// `display`; navigation is valid afterwards. Position changes are not
/// reported synchronously: they surface as `EngineEvent::Relocated` through
/// `poll_event`, drained by the owner on its own schedule.
pub trait Rendition {
    /// Attach to a display area and lay pages out for it. Re-attaching with
    /// a new viewport relays out and keeps the reading position on the same
    /// chapter.
    fn render_to(&mut self, viewport: Viewport) -> Result<(), EngineError>;

    /// Whether layout has completed and the instance accepts style rules and
    /// display calls.
    fn is_ready(&self) -> bool;

    /// Install the theming rules. Replaces any previous rules; applying the
    /// same rules twice is a no-op in effect.
    fn apply_theme(&mut self, rules: &StyleRules);

    /// Show the first page and start reporting positions.
    fn display(&mut self) -> Result<(), EngineError>;

    /// Move one page back. Pagination and chapter boundaries are the
    /// engine's own business; at the start of the document this does
    /// nothing.
    fn prev(&mut self);

    /// Move one page forward. At the end of the document this does nothing.
    fn next(&mut self);

    /// Next queued engine notification, if any.
    fn poll_event(&mut self) -> Option<EngineEvent>;

    /// The page currently on display. `None` before `display`.
    fn page_view(&self) -> Option<PageView>;

    /// The style an element actually renders with: theme rules first, then
    /// document-embedded styling, then nothing (the chrome's defaults).
    fn resolved_style(&self, element: Element) -> StyleProps;

    /// Document title from the engine's metadata, when present.
    fn title(&self) -> Option<String>;
}
