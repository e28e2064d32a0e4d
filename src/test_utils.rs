//! Shared helpers for unit and integration tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engine::{
    Element, EngineError, EngineEvent, PageLine, PageView, PositionEvent, Rendition, Viewport,
};
use crate::theme::{StyleProps, StyleRules};

/// Shared prev/next call counters that outlive the rendition they observe,
/// so a test can assert "nothing reached the engine" even after the session
/// holding it was torn down.
#[derive(Debug, Clone, Default)]
pub struct CallCounts {
    prev: Arc<AtomicUsize>,
    next: Arc<AtomicUsize>,
}

impl CallCounts {
    pub fn prev(&self) -> usize {
        self.prev.load(Ordering::SeqCst)
    }

    pub fn next(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.prev() + self.next()
    }
}

/// Scriptable stand-in for the rendering engine.
pub struct FakeRendition {
    counts: CallCounts,
    ready: bool,
    displayed: bool,
    page: usize,
    page_count: usize,
    theme: StyleRules,
    events: VecDeque<EngineEvent>,
}

impl FakeRendition {
    /// A rendition that considers itself laid out already.
    pub fn with_pages(page_count: usize) -> Self {
        Self {
            counts: CallCounts::default(),
            ready: true,
            displayed: false,
            page: 0,
            page_count: page_count.max(1),
            theme: StyleRules::new(),
            events: VecDeque::new(),
        }
    }

    pub fn call_counts(&self) -> CallCounts {
        self.counts.clone()
    }

    pub fn applied_theme(&self) -> &StyleRules {
        &self.theme
    }

    pub fn queue_relocated(&mut self, page: Option<&str>) {
        self.events.push_back(EngineEvent::Relocated(PositionEvent {
            page: page.map(str::to_string),
        }));
    }

    fn push_relocated(&mut self) {
        let page = Some((self.page + 1).to_string());
        self.events
            .push_back(EngineEvent::Relocated(PositionEvent { page }));
    }
}

impl Rendition for FakeRendition {
    fn render_to(&mut self, _viewport: Viewport) -> Result<(), EngineError> {
        self.ready = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn apply_theme(&mut self, rules: &StyleRules) {
        self.theme = rules.clone();
    }

    fn display(&mut self) -> Result<(), EngineError> {
        if !self.ready {
            return Err(EngineError::NotAttached);
        }
        self.displayed = true;
        self.push_relocated();
        Ok(())
    }

    fn prev(&mut self) {
        self.counts.prev.fetch_add(1, Ordering::SeqCst);
        if self.displayed && self.page > 0 {
            self.page -= 1;
            self.push_relocated();
        }
    }

    fn next(&mut self) {
        self.counts.next.fetch_add(1, Ordering::SeqCst);
        if self.displayed && self.page + 1 < self.page_count {
            self.page += 1;
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
        Some(PageView {
            lines: vec![PageLine {
                text: format!("fake page {}", self.page + 1),
                element: Element::Paragraph,
            }],
            page_index: self.page,
            page_count: self.page_count,
        })
    }

    fn resolved_style(&self, element: Element) -> StyleProps {
        self.theme.get(element).unwrap_or_default()
    }

    fn title(&self) -> Option<String> {
        Some("Fake Book".to_string())
    }
}

/// In-memory EPUB fixtures, small but structurally honest: mimetype first
/// and uncompressed, container pointing at the package, one spine item per
/// chapter.
pub mod fixtures {
    use std::io::{Cursor, Write};
    use std::path::{Path, PathBuf};

    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// Build an EPUB with the given `(title, body-html)` chapters.
    pub fn minimal_epub(chapters: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = FileOptions::default();

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        zip.start_file("META-INF/container.xml", deflated).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
        )
        .unwrap();

        let mut manifest = String::new();
        let mut spine = String::new();
        let mut nav_map = String::new();
        for (i, (title, _)) in chapters.iter().enumerate() {
            let n = i + 1;
            manifest.push_str(&format!(
                r#"    <item id="chapter{n}" href="chapter{n}.xhtml" media-type="application/xhtml+xml"/>
"#
            ));
            spine.push_str(&format!("    <itemref idref=\"chapter{n}\"/>\n"));
            nav_map.push_str(&format!(
                r#"    <navPoint id="np-{n}" playOrder="{n}"><navLabel><text>{title}</text></navLabel><content src="chapter{n}.xhtml"/></navPoint>
"#
            ));
        }

        zip.start_file("OEBPS/content.opf", deflated).unwrap();
        zip.write_all(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="bookid" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Fixture Book</dc:title>
    <dc:identifier id="bookid">fixture-0001</dc:identifier>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>"#
            )
            .as_bytes(),
        )
        .unwrap();

        zip.start_file("OEBPS/toc.ncx", deflated).unwrap();
        zip.write_all(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="fixture-0001"/></head>
  <docTitle><text>Fixture Book</text></docTitle>
  <navMap>
{nav_map}  </navMap>
</ncx>"#
            )
            .as_bytes(),
        )
        .unwrap();

        for (i, (title, body)) in chapters.iter().enumerate() {
            let n = i + 1;
            zip.start_file(format!("OEBPS/chapter{n}.xhtml"), deflated)
                .unwrap();
            zip.write_all(
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>{title}</title></head>
<body>{body}</body>
</html>"#
                )
                .as_bytes(),
            )
            .unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    /// Write a fixture EPUB to disk and return its path.
    pub fn epub_file(dir: &Path, name: &str, chapters: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, minimal_epub(chapters)).unwrap();
        path
    }
}

pub mod test_helpers {
    use crate::event_source::{Event, SimulatedEventSource};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    /// Builder for scripted user-input scenarios.
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl Default for TestScenarioBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self { events: Vec::new() }
        }

        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        pub fn press_left(mut self) -> Self {
            self.events.push(SimulatedEventSource::arrow_left());
            self
        }

        pub fn press_right(mut self) -> Self {
            self.events.push(SimulatedEventSource::arrow_right());
            self
        }

        pub fn press_enter(mut self) -> Self {
            self.events.push(SimulatedEventSource::key_event(
                crossterm::event::KeyCode::Enter,
                crossterm::event::KeyModifiers::empty(),
            ));
            self
        }

        /// A full pointer swipe across one row: down, a couple of movement
        /// samples, up.
        pub fn swipe(mut self, from_x: u16, to_x: u16, row: u16) -> Self {
            let mid = from_x.midpoint(to_x);
            self.events.push(SimulatedEventSource::mouse_down(from_x, row));
            self.events.push(SimulatedEventSource::mouse_drag(mid, row));
            self.events.push(SimulatedEventSource::mouse_drag(to_x, row));
            self.events.push(SimulatedEventSource::mouse_up(to_x, row));
            self
        }

        pub fn quit(mut self) -> Self {
            self.events.push(SimulatedEventSource::char_key('q'));
            self
        }

        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    /// Fixed-size terminal for snapshot-style assertions.
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).unwrap()
    }

    /// Flatten the terminal buffer to trimmed text lines.
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                if let Some(cell) = buffer.cell((x, y)) {
                    line.push_str(cell.symbol());
                }
            }
            lines.push(line.trim_end().to_string());
        }

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }
}
