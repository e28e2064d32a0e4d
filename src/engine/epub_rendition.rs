use std::collections::VecDeque;
use std::io::Cursor;

use epub::doc::EpubDoc;
use log::{debug, warn};

use crate::engine::html_text::{self, TextBlock};
use crate::engine::{
    Element, EngineError, EngineEvent, PageLine, PageView, PositionEvent, Rendition, Viewport,
};
use crate::theme::{StyleProps, StyleRules};

/// Rendition backed by the `epub` crate.
///
/// Construction parses the whole spine into structural text blocks;
/// `render_to` wraps them to the viewport width and cuts them into
/// viewport-height pages. Chapters never share a page, so the engine's
/// chapter boundaries survive pagination.
#[derive(Debug)]
pub struct EpubRendition {
    chapters: Vec<Vec<TextBlock>>,
    title: Option<String>,
    document_styles: StyleRules,
    theme: StyleRules,
    viewport: Option<Viewport>,
    pages: Vec<Page>,
    current: usize,
    displayed: bool,
    events: VecDeque<EngineEvent>,
}

#[derive(Debug, Clone)]
struct Page {
    chapter: usize,
    lines: Vec<PageLine>,
}

impl EpubRendition {
    /// Parse a document from raw bytes. Fails on anything the `epub` crate
    /// rejects and on documents with no readable text at all.
    pub fn new(bytes: Vec<u8>) -> Result<Self, EngineError> {
        let mut doc = EpubDoc::from_reader(Cursor::new(bytes))
            .map_err(|e| EngineError::Parse(e.to_string()))?;

        let title = doc.mdata("title").map(|m| m.value.clone());
        let chapter_count = doc.get_num_chapters();
        let mut chapters = Vec::with_capacity(chapter_count);
        let mut document_styles = StyleRules::new();

        for index in 0..chapter_count {
            if !doc.set_current_chapter(index) {
                warn!("could not open spine item {index}");
                continue;
            }
            let Some((content, _mime)) = doc.get_current_str() else {
                warn!("spine item {index} has no readable content");
                continue;
            };
            document_styles.merge_under(&html_text::document_styles(&content));
            let blocks = html_text::flatten(&content);
            if !blocks.is_empty() {
                chapters.push(blocks);
            }
        }

        if chapters.is_empty() {
            return Err(EngineError::Parse("document has no text content".into()));
        }
        debug!(
            "parsed {:?}: {} chapters with text",
            title,
            chapters.len()
        );

        Ok(Self {
            chapters,
            title,
            document_styles,
            theme: StyleRules::new(),
            viewport: None,
            pages: Vec::new(),
            current: 0,
            displayed: false,
            events: VecDeque::new(),
        })
    }

    fn relayout(&mut self) {
        let Some(viewport) = self.viewport else {
            return;
        };
        let width = viewport.width.max(1) as usize;
        let height = viewport.height.max(1) as usize;
        let keep_chapter = self.pages.get(self.current).map(|p| p.chapter);

        self.pages.clear();
        for (chapter, blocks) in self.chapters.iter().enumerate() {
            let mut lines: Vec<PageLine> = Vec::new();
            for (i, block) in blocks.iter().enumerate() {
                if i > 0 {
                    lines.push(PageLine {
                        text: String::new(),
                        element: Element::Body,
                    });
                }
                for raw in block.text.lines() {
                    if raw.is_empty() {
                        lines.push(PageLine {
                            text: String::new(),
                            element: block.element,
                        });
                        continue;
                    }
                    for wrapped in textwrap::wrap(raw, width) {
                        lines.push(PageLine {
                            text: wrapped.into_owned(),
                            element: block.element,
                        });
                    }
                }
            }

            let mut start = 0;
            while start < lines.len() {
                let end = (start + height).min(lines.len());
                self.pages.push(Page {
                    chapter,
                    lines: lines[start..end].to_vec(),
                });
                start = end;
            }
        }

        self.current = keep_chapter
            .and_then(|ch| self.pages.iter().position(|p| p.chapter == ch))
            .unwrap_or(0);
    }

    fn push_relocated(&mut self) {
        self.events
            .push_back(EngineEvent::Relocated(PositionEvent {
                page: Some((self.current + 1).to_string()),
            }));
    }
}

impl Rendition for EpubRendition {
    fn render_to(&mut self, viewport: Viewport) -> Result<(), EngineError> {
        if viewport.is_empty() {
            warn!("attaching to an empty viewport, clamping to 1x1");
        }
        self.viewport = Some(viewport);
        self.relayout();
        debug!(
            "laid out {} pages for {}x{}",
            self.pages.len(),
            viewport.width,
            viewport.height
        );
        if self.displayed {
            self.push_relocated();
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.viewport.is_some() && !self.pages.is_empty()
    }

    fn apply_theme(&mut self, rules: &StyleRules) {
        self.theme = rules.clone();
    }

    fn display(&mut self) -> Result<(), EngineError> {
        if !self.is_ready() {
            return Err(EngineError::NotAttached);
        }
        self.displayed = true;
        self.push_relocated();
        Ok(())
    }

    fn prev(&mut self) {
        if !self.displayed {
            return;
        }
        if self.current > 0 {
            self.current -= 1;
            self.push_relocated();
        }
    }

    fn next(&mut self) {
        if !self.displayed {
            return;
        }
        if self.current + 1 < self.pages.len() {
            self.current += 1;
            self.push_relocated();
        }
    }

    fn poll_event(&mut self) -> Option<EngineEvent> {
        self.events.pop_front()
    }

    fn page_view(&self) -> Option<PageView> {
        if !self.displayed {
            return None;
        }
        let page = self.pages.get(self.current)?;
        Some(PageView {
            lines: page.lines.clone(),
            page_index: self.current,
            page_count: self.pages.len(),
        })
    }

    fn resolved_style(&self, element: Element) -> StyleProps {
        self.theme
            .get(element)
            .unwrap_or_default()
            .over(self.document_styles.get(element).unwrap_or_default())
    }

    fn title(&self) -> Option<String> {
        self.title.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use crate::theme::{READABLE_BACKGROUND, READABLE_TEXT};
    use ratatui::style::Color;

    fn two_chapter_rendition() -> EpubRendition {
        let bytes = fixtures::minimal_epub(&[
            ("One", "<h1>One</h1><p>First chapter text that goes on for a while.</p>"),
            ("Two", "<h1>Two</h1><p>Second chapter text.</p>"),
        ]);
        EpubRendition::new(bytes).unwrap()
    }

    #[test]
    fn rejects_arbitrary_bytes() {
        let err = EpubRendition::new(b"definitely not an epub".to_vec());
        assert!(matches!(err, Err(EngineError::Parse(_))));
    }

    #[test]
    fn paginates_chapters_separately() {
        let mut rendition = two_chapter_rendition();
        rendition.render_to(Viewport::new(20, 4)).unwrap();

        let view_pages: Vec<usize> = rendition.pages.iter().map(|p| p.chapter).collect();
        assert!(view_pages.contains(&0));
        assert!(view_pages.contains(&1));
        // Chapter two starts on a fresh page.
        let first_of_two = view_pages.iter().position(|&c| c == 1).unwrap();
        assert!(rendition.pages[first_of_two - 1].chapter == 0);
    }

    #[test]
    fn display_reports_first_page() {
        let mut rendition = two_chapter_rendition();
        rendition.render_to(Viewport::new(20, 4)).unwrap();
        assert!(rendition.is_ready());

        rendition.display().unwrap();
        let event = rendition.poll_event().unwrap();
        assert_eq!(
            event,
            EngineEvent::Relocated(PositionEvent {
                page: Some("1".into())
            })
        );
    }

    #[test]
    fn next_then_prev_round_trips() {
        let mut rendition = two_chapter_rendition();
        rendition.render_to(Viewport::new(20, 4)).unwrap();
        rendition.display().unwrap();
        while rendition.poll_event().is_some() {}

        let before = rendition.page_view().unwrap().page_index;
        rendition.next();
        assert_eq!(rendition.page_view().unwrap().page_index, before + 1);
        rendition.prev();
        assert_eq!(rendition.page_view().unwrap().page_index, before);
    }

    #[test]
    fn navigation_stops_at_document_edges() {
        let mut rendition = two_chapter_rendition();
        rendition.render_to(Viewport::new(20, 4)).unwrap();
        rendition.display().unwrap();
        while rendition.poll_event().is_some() {}

        rendition.prev();
        assert!(rendition.poll_event().is_none());

        let last = rendition.pages.len() - 1;
        for _ in 0..last + 5 {
            rendition.next();
        }
        assert_eq!(rendition.page_view().unwrap().page_index, last);
    }

    #[test]
    fn navigation_before_display_is_inert() {
        let mut rendition = two_chapter_rendition();
        rendition.render_to(Viewport::new(20, 4)).unwrap();

        rendition.next();
        rendition.prev();
        assert!(rendition.poll_event().is_none());
        assert!(rendition.page_view().is_none());
    }

    #[test]
    fn theme_overrides_document_palette() {
        let bytes = fixtures::minimal_epub(&[(
            "Styled",
            "<style>body { color: #fff; background: #000 } h1 { color: #0f0 }</style>\
             <h1>Styled</h1><p>text</p>",
        )]);
        let mut rendition = EpubRendition::new(bytes).unwrap();
        rendition.render_to(Viewport::new(20, 4)).unwrap();

        // Before the override the document's own palette resolves.
        assert_eq!(
            rendition.resolved_style(Element::Body).color,
            Some(Color::Rgb(0xff, 0xff, 0xff))
        );

        rendition.apply_theme(&StyleRules::readable());
        for element in [
            Element::Body,
            Element::Paragraph,
            Element::Heading(1),
            Element::Heading(6),
        ] {
            assert_eq!(rendition.resolved_style(element).color, Some(READABLE_TEXT));
        }
        assert_eq!(
            rendition.resolved_style(Element::Body).background,
            Some(READABLE_BACKGROUND)
        );

        // Reapplying changes nothing.
        rendition.apply_theme(&StyleRules::readable());
        assert_eq!(rendition.resolved_style(Element::Body).color, Some(READABLE_TEXT));
    }

    #[test]
    fn relayout_keeps_the_current_chapter() {
        let mut rendition = two_chapter_rendition();
        rendition.render_to(Viewport::new(20, 4)).unwrap();
        rendition.display().unwrap();

        while rendition.pages[rendition.current].chapter == 0 {
            rendition.next();
        }
        rendition.render_to(Viewport::new(40, 10)).unwrap();
        assert_eq!(rendition.pages[rendition.current].chapter, 1);
    }
}
